mod stack;

use self::stack::SleepStack;

use crate::park::AutoResetEvent;
use crate::task::Task;
use crate::worker::{Worker, WorkerEntry};

use std::fmt;
use std::ptr;
use std::sync::atomic::Ordering::SeqCst;
use std::sync::atomic::{fence, AtomicBool};
use std::sync::Arc;

use crossbeam_queue::SegQueue;
use crossbeam_utils::CachePadded;
use log::trace;

/// Shared state for a thread pool.
///
/// Holds the per-worker entries, the public submission queue, and the
/// registry of sleeping workers. `ThreadPool` and every `Sender` hold an
/// `Arc` to one of these.
pub(crate) struct Pool {
    // Per-worker state, padded to a cache line so workers hammering their
    // own deques do not share lines.
    pub workers: Box<[CachePadded<WorkerEntry>]>,

    // Queue for tasks submitted from outside the pool.
    queue: SegQueue<Task>,

    // Workers currently parked.
    sleep_stack: SleepStack,

    // Transitions false -> true exactly once, at teardown.
    shutdown: AtomicBool,
}

// `WorkerEntry` contains the owner half of a deque, which is deliberately
// not `Sync`. Only the thread running worker `i` calls `push`/`pop` on
// `workers[i]`; every other thread goes through the stealer or the public
// queue, which synchronize internally.
unsafe impl Send for Pool {}
unsafe impl Sync for Pool {}

impl Pool {
    pub fn new(num_workers: usize) -> Pool {
        let workers: Vec<_> = (0..num_workers)
            .map(|_| CachePadded::new(WorkerEntry::new()))
            .collect();

        Pool {
            workers: workers.into_boxed_slice(),
            queue: SegQueue::new(),
            sleep_stack: SleepStack::with_capacity(num_workers),
            shutdown: AtomicBool::new(false),
        }
    }

    pub fn num_workers(&self) -> usize {
        self.workers.len()
    }

    /// Submit a task for execution.
    ///
    /// Called from any thread. A worker of this pool pushes onto its own
    /// deque; everyone else goes through the public queue. At most one
    /// parked worker is woken per submission.
    pub fn schedule(&self, task: Task) {
        // Submissions racing with teardown run inline rather than being
        // dropped.
        if self.is_shutdown() {
            task.run();
            return;
        }

        Worker::with_current(|current| match current {
            Some(worker) if ptr::eq(worker.pool(), self) => {
                trace!("schedule; local push; idx={}", worker.index());
                self.workers[worker.index()].push(task);
            }
            _ => {
                trace!("schedule; public push");
                self.queue.push(task);
            }
        });

        self.wake_one();
    }

    /// Pop a task from the public queue.
    pub fn pop(&self) -> Option<Task> {
        self.queue.pop()
    }

    /// Wake at most one parked worker.
    fn wake_one(&self) {
        // Order the push above against the registry read below. A parking
        // worker fences between registering and re-checking the queues, so
        // either this thread sees the registration or the worker sees the
        // task.
        fence(SeqCst);

        // Racy fast path; the stack re-checks under its lock.
        if self.sleep_stack.is_empty() {
            return;
        }

        if let Some(event) = self.sleep_stack.pop() {
            trace!("wake one");
            event.signal();
        }
    }

    pub fn register_waiter(&self, event: &Arc<AutoResetEvent>) {
        self.sleep_stack.register(event);
    }

    pub fn deregister_waiter(&self, event: &Arc<AutoResetEvent>) {
        self.sleep_stack.deregister(event);
    }

    pub fn is_shutdown(&self) -> bool {
        self.shutdown.load(SeqCst)
    }

    /// Begin teardown: set the shutdown flag, then wake every parked
    /// worker so it can observe the flag and exit.
    pub fn trigger_shutdown(&self) {
        self.shutdown.store(true, SeqCst);

        let waiters = self.sleep_stack.drain();
        trace!("shutdown; waking {} parked workers", waiters.len());

        for event in waiters {
            event.signal();
        }
    }

    /// Run every task remaining in the public queue on the calling thread.
    ///
    /// Called after the workers have been joined, so no task submitted
    /// before teardown is lost.
    pub fn drain(&self) {
        let mut drained = 0;

        while let Some(task) = self.queue.pop() {
            task.run();
            drained += 1;
        }

        if drained > 0 {
            trace!("shutdown; drained {} tasks from the public queue", drained);
        }
    }
}

impl fmt::Debug for Pool {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt.debug_struct("Pool")
            .field("num_workers", &self.workers.len())
            .field("shutdown", &self.shutdown)
            .finish()
    }
}
