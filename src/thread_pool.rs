use crate::builder::Builder;
use crate::scheduler::Scheduler;
use crate::sender::Sender;
use crate::task::{Task, WaitHandle};

use std::fmt;
use std::mem;
use std::thread::JoinHandle;

use log::error;
use parking_lot::Mutex;

/// Work-stealing thread pool for executing tasks.
///
/// The pool owns a fixed set of worker threads, spawned at construction by
/// [`Builder::build`]. Dropping the pool (or calling [`shutdown`]) stops
/// the workers: parked workers are woken, every worker exits once its own
/// deque and the public queue are empty, and any task still in the public
/// queue afterwards is executed on the tearing-down thread. No submitted
/// task is ever dropped.
///
/// [`shutdown`]: ThreadPool::shutdown
///
/// # Examples
///
/// ```
/// use libasync::ThreadPool;
///
/// let pool = ThreadPool::new();
///
/// let handle = pool.spawn(|| {
///     println!("called from a worker thread");
/// });
///
/// handle.wait();
/// ```
pub struct ThreadPool {
    sender: Sender,

    // Worker join handles, taken at teardown. Guarded by a lock so the
    // pool stays `Sync` and teardown runs at most once.
    threads: Mutex<Vec<JoinHandle<()>>>,
}

impl ThreadPool {
    /// Create a pool with default configuration values.
    ///
    /// Use [`Builder`] for a configured pool.
    pub fn new() -> ThreadPool {
        Builder::new().build()
    }

    pub(crate) fn from_parts(sender: Sender, threads: Vec<JoinHandle<()>>) -> ThreadPool {
        ThreadPool {
            sender,
            threads: Mutex::new(threads),
        }
    }

    /// Spawn a closure onto the pool, returning a handle to wait on it.
    pub fn spawn<F>(&self, f: F) -> WaitHandle
    where
        F: FnOnce() + Send + 'static,
    {
        self.sender.spawn(f)
    }

    /// Return a reference to the submit handle.
    ///
    /// The handle can be cloned and moved into tasks; it is how work
    /// running on the pool submits follow-up work.
    pub fn sender(&self) -> &Sender {
        &self.sender
    }

    /// Number of worker threads in the pool.
    pub fn pool_size(&self) -> usize {
        self.sender.pool.num_workers()
    }

    /// Shut the pool down, blocking until every worker has exited.
    ///
    /// Equivalent to dropping the pool.
    pub fn shutdown(self) {
        // Teardown runs in `drop`.
    }

    fn shutdown_impl(&self) {
        let threads = mem::take(&mut *self.threads.lock());

        if threads.is_empty() {
            // Already shut down.
            return;
        }

        self.sender.pool.trigger_shutdown();

        for thread in threads {
            if thread.join().is_err() {
                error!("worker thread panicked");
            }
        }

        // The workers are gone; anything left in the public queue runs
        // here.
        self.sender.pool.drain();
    }
}

impl Scheduler for ThreadPool {
    fn schedule(&self, task: Task) {
        self.sender.pool.schedule(task);
    }
}

impl Drop for ThreadPool {
    fn drop(&mut self) {
        self.shutdown_impl();
    }
}

impl fmt::Debug for ThreadPool {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt.debug_struct("ThreadPool")
            .field("pool", &self.sender.pool)
            .finish()
    }
}
