#![deny(missing_docs, missing_debug_implementations)]

//! A work-stealing thread pool for executing short-lived tasks.
//!
//! The pool runs many independent units of work across a fixed set of
//! worker threads. It is optimized for tasks with limited computation that
//! may spawn further tasks and wait on each other; a worker blocked on
//! another task's completion keeps executing tasks instead of idling.
//!
//! ## Worker overview
//!
//! Each worker owns a deque. Tasks submitted from that worker's thread are
//! pushed onto the deque and popped in LIFO order; other workers may steal
//! the oldest tasks from it. Tasks submitted from outside the pool enter a
//! shared public queue.
//!
//! A worker repeatedly drains its own deque, then the public queue, then
//! tries to steal from a randomly ordered list of victims. When every
//! source is empty the worker parks on its event after registering itself
//! in a sleep stack; submitting a task wakes at most one parked worker, the
//! most recently parked first.
//!
//! ## Nested waits
//!
//! Blocking on a task goes through a per-thread wait handler (see
//! [`wait_for_task`]). Threads outside the pool sleep on a one-shot event.
//! Worker threads install a handler that runs the scheduling loop until the
//! awaited task completes, so recursive task-dependency waits cannot starve
//! the pool.
//!
//! ## Schedulers
//!
//! Anything that accepts a [`Task`] implements [`Scheduler`]. Besides the
//! pool there are two trivial schedulers: [`inline_scheduler`] runs tasks
//! on the submitting thread and [`thread_scheduler`] spawns one thread per
//! task. [`threadpool_scheduler`] returns a lazily initialized process-wide
//! pool sized by the `LIBASYNC_NUM_THREADS` environment variable.
//!
//! # Examples
//!
//! ```
//! use libasync::Builder;
//!
//! let pool = Builder::new().pool_size(4).build();
//!
//! let handle = pool.spawn(|| {
//!     println!("called from a worker thread");
//! });
//!
//! // Block until the task has run. Dropping the pool would also wait for
//! // all submitted work to finish.
//! handle.wait();
//! ```

mod builder;
mod park;
mod pool;
mod scheduler;
mod sender;
mod task;
mod thread_pool;
mod wait;
mod worker;

pub use crate::builder::Builder;
pub use crate::scheduler::{
    inline_scheduler, thread_scheduler, threadpool_scheduler, InlineScheduler, Scheduler,
    ThreadScheduler,
};
pub use crate::sender::Sender;
pub use crate::task::{Task, WaitHandle};
pub use crate::thread_pool::ThreadPool;
pub use crate::wait::{set_thread_wait_handler, wait_for_task, WaitHandler};
