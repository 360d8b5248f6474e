//! The `Scheduler` trait and the process-wide scheduler accessors.

use crate::builder::Builder;
use crate::task::Task;
use crate::thread_pool::ThreadPool;

use std::thread;

use lazy_static::lazy_static;

/// A sink for tasks.
///
/// Implementations differ only in *where* the task body runs; each one
/// guarantees that the body runs exactly once, after `schedule` was called.
pub trait Scheduler {
    /// Hand `task` off for execution.
    fn schedule(&self, task: Task);
}

/// Scheduler that runs each task inline, on the submitting thread.
///
/// `schedule` returns once the task body has completed.
#[derive(Debug)]
pub struct InlineScheduler {
    _priv: (),
}

impl Scheduler for InlineScheduler {
    fn schedule(&self, task: Task) {
        task.run();
    }
}

/// Scheduler that spawns one detached thread per task.
#[derive(Debug)]
pub struct ThreadScheduler {
    _priv: (),
}

impl Scheduler for ThreadScheduler {
    fn schedule(&self, task: Task) {
        thread::Builder::new()
            .spawn(move || task.run())
            .expect("failed to spawn task thread");
    }
}

lazy_static! {
    static ref GLOBAL_POOL: ThreadPool = {
        let mut builder = Builder::new();
        builder.name_prefix("libasync-worker-");
        builder.build()
    };
}

static INLINE_SCHEDULER: InlineScheduler = InlineScheduler { _priv: () };
static THREAD_SCHEDULER: ThreadScheduler = ThreadScheduler { _priv: () };

/// The process-wide thread pool, initialized on first use.
///
/// The pool size comes from `LIBASYNC_NUM_THREADS` (see [`Builder`]).
/// Statics are not dropped, so the global pool's workers live for the
/// remainder of the process; pools that must tear down with their owner are
/// built explicitly via [`Builder`].
pub fn threadpool_scheduler() -> &'static ThreadPool {
    &GLOBAL_POOL
}

/// A scheduler that runs every task directly on the submitting thread.
pub fn inline_scheduler() -> &'static InlineScheduler {
    &INLINE_SCHEDULER
}

/// A scheduler that runs every task on its own detached thread.
pub fn thread_scheduler() -> &'static ThreadScheduler {
    &THREAD_SCHEDULER
}
