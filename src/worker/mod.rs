mod entry;

pub(crate) use self::entry::WorkerEntry;

use crate::pool::Pool;
use crate::task::{Task, WaitHandle};
use crate::wait::set_thread_wait_handler;

use std::cell::{Cell, RefCell};
use std::ptr;
use std::sync::atomic::fence;
use std::sync::atomic::Ordering::SeqCst;
use std::sync::Arc;

use crossbeam_deque::Steal;
use log::trace;
use rand::rngs::SmallRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

thread_local! {
    // Worker running on the current thread; null outside the pool.
    static CURRENT_WORKER: Cell<*const Worker> = Cell::new(ptr::null());
}

/// A worker thread's view of the pool it belongs to.
///
/// Created on the worker thread itself and reachable from anywhere on that
/// thread through [`Worker::with_current`], which is how the submit path
/// and the nested wait handler find their way back to the pool.
pub(crate) struct Worker {
    pool: Arc<Pool>,
    index: usize,

    // Seeded with the worker index so every worker tries victims in a
    // different order.
    rng: RefCell<SmallRng>,
}

impl Worker {
    pub fn new(pool: Arc<Pool>, index: usize) -> Worker {
        let rng = RefCell::new(SmallRng::seed_from_u64(index as u64));

        Worker { pool, index, rng }
    }

    pub fn pool(&self) -> &Pool {
        &self.pool
    }

    pub fn index(&self) -> usize {
        self.index
    }

    /// Call `f` with the worker running on the current thread, if any.
    pub fn with_current<F, R>(f: F) -> R
    where
        F: FnOnce(Option<&Worker>) -> R,
    {
        CURRENT_WORKER.with(|current| {
            let worker = current.get();

            if worker.is_null() {
                f(None)
            } else {
                f(Some(unsafe { &*worker }))
            }
        })
    }

    /// Thread entry point: install the thread-local context and the nested
    /// wait handler, then run the scheduling loop until shutdown.
    pub fn run(self) {
        CURRENT_WORKER.with(|current| current.set(&self as *const Worker));
        set_thread_wait_handler(threadpool_wait_handler);

        trace!("worker start; idx={}", self.index);
        self.work();
        trace!("worker exit; idx={}", self.index);

        CURRENT_WORKER.with(|current| current.set(ptr::null()));
    }

    fn work(&self) {
        let entry = self.entry();
        let event = entry.event().clone();

        loop {
            // Local tasks first, most recent first.
            if let Some(task) = entry.pop() {
                task.run();
                continue;
            }

            loop {
                // The public queue beats stealing.
                if let Some(task) = self.pool.pop() {
                    task.run();
                    break;
                }

                // Exit only with the local deque and public queue empty;
                // other workers drain their own deques before exiting.
                if self.pool.is_shutdown() {
                    return;
                }

                if let Some(task) = self.steal() {
                    task.run();
                    break;
                }

                // Park. Clear any stale signal before registering, then
                // re-check shutdown and the task sources while registered:
                // a flag set or a task pushed before the registration
                // would otherwise be missed.
                event.reset();
                self.pool.register_waiter(&event);

                // Pairs with the fence on the submit path.
                fence(SeqCst);

                if self.pool.is_shutdown() {
                    self.pool.deregister_waiter(&event);
                    return;
                }

                if let Some(task) = self.pool.pop().or_else(|| self.steal()) {
                    self.pool.deregister_waiter(&event);
                    task.run();
                    break;
                }

                trace!("worker park; idx={}", self.index);
                event.wait();
                self.pool.deregister_waiter(&event);
            }
        }
    }

    /// Block on `wait_task` while continuing to execute scheduled tasks.
    ///
    /// The loop structure mirrors `work`, with the awaited task's
    /// readiness taking the place of the shutdown flag as the exit
    /// condition. A completion callback on the awaited task is installed
    /// lazily, on the first park attempt; waits that stay busy never
    /// install one.
    fn wait_until_ready(&self, wait_task: &WaitHandle) {
        let entry = self.entry();
        let event = entry.event().clone();

        let mut added_continuation = false;

        loop {
            if wait_task.is_ready() {
                return;
            }

            if let Some(task) = entry.pop() {
                task.run();
                continue;
            }

            loop {
                if let Some(task) = self.pool.pop() {
                    task.run();
                    break;
                }

                if let Some(task) = self.steal() {
                    task.run();
                    break;
                }

                event.reset();

                // Order the reset before the readiness re-check. The
                // completing thread stores the ready flag and then signals
                // the event; this thread must either see the flag or keep
                // the signal, and a release/acquire pair is not enough for
                // both sides to observe each other's stores.
                fence(SeqCst);

                if wait_task.is_ready() {
                    return;
                }

                if !added_continuation {
                    let signal = event.clone();
                    wait_task.on_finish(move || signal.signal());
                    added_continuation = true;
                }

                self.pool.register_waiter(&event);

                // Pairs with the fence on the submit path.
                fence(SeqCst);

                // Same pre-wait re-check as in `work`: a task pushed
                // before the registration would otherwise be missed.
                if let Some(task) = self.pool.pop().or_else(|| self.steal()) {
                    self.pool.deregister_waiter(&event);
                    task.run();
                    break;
                }

                trace!("worker park in wait; idx={}", self.index);
                event.wait();
                self.pool.deregister_waiter(&event);

                if wait_task.is_ready() {
                    return;
                }
            }
        }
    }

    /// Try to steal a task from another worker's deque.
    ///
    /// Victims are tried in an order shuffled per call; the first
    /// successful steal wins. Contention (`Steal::Retry`) is treated like
    /// an empty deque; a task missed here is picked up by another thread.
    fn steal(&self) -> Option<Task> {
        let workers = &self.pool.workers;

        let mut victims: Vec<usize> = (0..workers.len()).collect();
        victims.shuffle(&mut *self.rng.borrow_mut());

        for victim in victims {
            if victim == self.index {
                continue;
            }

            if let Steal::Success(task) = workers[victim].steal() {
                trace!("steal; idx={} victim={}", self.index, victim);
                return Some(task);
            }
        }

        None
    }

    fn entry(&self) -> &WorkerEntry {
        &self.pool.workers[self.index]
    }
}

/// Wait handler installed on every worker thread.
///
/// Turns a blocking wait into more scheduling work instead of idling the
/// worker.
pub(crate) fn threadpool_wait_handler(wait_task: &WaitHandle) {
    Worker::with_current(|worker| match worker {
        Some(worker) => worker.wait_until_ready(wait_task),
        None => panic!("thread pool wait handler invoked outside the pool"),
    })
}
