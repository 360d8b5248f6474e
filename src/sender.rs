use crate::pool::Pool;
use crate::scheduler::Scheduler;
use crate::task::{Task, WaitHandle};

use std::sync::Arc;

/// Submit tasks to the associated thread pool.
///
/// A `Sender` is a handle to a single pool, obtained from
/// [`ThreadPool::sender`]. It can be cloned freely and moved into tasks,
/// which is how work running on the pool submits follow-up work.
///
/// A `Sender` does not keep the pool's workers alive: dropping the
/// [`ThreadPool`] still shuts the pool down, and tasks submitted through an
/// outstanding `Sender` afterwards run inline on the submitting thread.
///
/// [`ThreadPool`]: crate::ThreadPool
/// [`ThreadPool::sender`]: crate::ThreadPool::sender
#[derive(Clone, Debug)]
pub struct Sender {
    pub(crate) pool: Arc<Pool>,
}

impl Sender {
    pub(crate) fn new(pool: Arc<Pool>) -> Sender {
        Sender { pool }
    }

    /// Spawn a closure onto the pool, returning a handle to wait on it.
    ///
    /// If the caller is a worker of this pool, the task goes onto that
    /// worker's own deque; otherwise it enters the public queue.
    pub fn spawn<F>(&self, f: F) -> WaitHandle
    where
        F: FnOnce() + Send + 'static,
    {
        let task = Task::new(f);
        let handle = task.wait_handle();

        self.pool.schedule(task);
        handle
    }
}

impl Scheduler for Sender {
    fn schedule(&self, task: Task) {
        self.pool.schedule(task);
    }
}
