//! Task handles.
//!
//! A unit of work is split across two handles. [`Task`] owns the unique
//! right to execute the body; it is what schedulers move between queues and
//! eventually consume. [`WaitHandle`] is a cloneable observer used to query
//! completion and to register completion callbacks.

use crate::wait;

use std::fmt;
use std::mem;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering::{Acquire, Release};
use std::sync::Arc;

use parking_lot::Mutex;

type Body = Box<dyn FnOnce() + Send + 'static>;
type Callback = Box<dyn FnOnce() + Send + 'static>;

/// An owned, runnable unit of work.
///
/// Running the task consumes the handle; a task body executes at most once
/// no matter which thread ends up running it. `Task` values are created with
/// [`Task::new`] and handed to a [`Scheduler`], which guarantees the body
/// runs exactly once after submission.
///
/// [`Scheduler`]: crate::Scheduler
pub struct Task {
    inner: Arc<Inner>,
}

/// Observer half of a [`Task`].
///
/// Obtained from [`Task::wait_handle`] before the task is scheduled. The
/// handle can be cloned freely and sent to other threads.
#[derive(Clone)]
pub struct WaitHandle {
    inner: Arc<Inner>,
}

struct Inner {
    // Set by `run` once the body has returned. Release/Acquire pairs with
    // the loads in `is_ready`.
    finished: AtomicBool,

    // The body is taken out exactly once, by `run`.
    body: Mutex<Option<Body>>,

    // `done` and the callback list are updated under one lock so that a
    // callback registered concurrently with completion fires exactly once.
    completion: Mutex<Completion>,
}

#[derive(Default)]
struct Completion {
    done: bool,
    callbacks: Vec<Callback>,
}

// ===== impl Task =====

impl Task {
    /// Create a task from a closure.
    pub fn new<F>(f: F) -> Task
    where
        F: FnOnce() + Send + 'static,
    {
        Task {
            inner: Arc::new(Inner {
                finished: AtomicBool::new(false),
                body: Mutex::new(Some(Box::new(f))),
                completion: Mutex::new(Completion::default()),
            }),
        }
    }

    /// Return an observer handle for this task.
    ///
    /// Call before scheduling; the run handle is consumed by the scheduler.
    pub fn wait_handle(&self) -> WaitHandle {
        WaitHandle {
            inner: self.inner.clone(),
        }
    }

    /// Execute the task body, then mark the task finished and invoke every
    /// registered callback.
    ///
    /// Callbacks observe `is_ready() == true` and each runs exactly once on
    /// the thread calling `run`.
    pub fn run(self) {
        let body = self.inner.body.lock().take();

        if let Some(body) = body {
            body();
        }

        let callbacks = {
            let mut completion = self.inner.completion.lock();
            completion.done = true;
            self.inner.finished.store(true, Release);
            mem::take(&mut completion.callbacks)
        };

        for callback in callbacks {
            callback();
        }
    }

    /// Convert the task into an opaque pointer-sized token.
    ///
    /// Useful for storing tasks in queues that hold raw pointers. The token
    /// must be turned back into a `Task` with [`Task::from_raw`] to run or
    /// release it.
    pub fn into_raw(self) -> *const () {
        Arc::into_raw(self.inner) as *const ()
    }

    /// Rebuild a task from a token produced by [`Task::into_raw`].
    ///
    /// # Safety
    ///
    /// `ptr` must come from `into_raw` and must not be used again
    /// afterwards; the unique run right transfers back to the returned
    /// handle.
    pub unsafe fn from_raw(ptr: *const ()) -> Task {
        Task {
            inner: Arc::from_raw(ptr as *const Inner),
        }
    }
}

impl fmt::Debug for Task {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt.debug_struct("Task")
            .field("finished", &self.inner.finished)
            .finish()
    }
}

// ===== impl WaitHandle =====

impl WaitHandle {
    /// Returns `true` once the task body has finished running.
    pub fn is_ready(&self) -> bool {
        self.inner.finished.load(Acquire)
    }

    /// Register a callback to run exactly once after the task completes.
    ///
    /// If the task is already complete, the callback runs inline before
    /// this call returns. Otherwise it runs on the thread that completes
    /// the task.
    pub fn on_finish<F>(&self, callback: F)
    where
        F: FnOnce() + Send + 'static,
    {
        let mut completion = self.inner.completion.lock();

        if completion.done {
            drop(completion);
            callback();
            return;
        }

        completion.callbacks.push(Box::new(callback));
    }

    /// Block the current thread until the task completes.
    ///
    /// Equivalent to [`wait_for_task`]; the blocking strategy is the
    /// calling thread's wait handler.
    ///
    /// [`wait_for_task`]: crate::wait_for_task
    pub fn wait(&self) {
        wait::wait_for_task(self);
    }
}

impl fmt::Debug for WaitHandle {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt.debug_struct("WaitHandle")
            .field("ready", &self.is_ready())
            .finish()
    }
}
