use crate::park::AutoResetEvent;
use crate::task::Task;

use std::fmt;
use std::sync::Arc;

use crossbeam_deque::{Steal, Stealer, Worker};

/// State for a single worker, shared through `Pool`.
///
/// The deque runs in LIFO mode: the owner pushes and pops at one end while
/// thieves steal the oldest tasks from the other. Only the thread running
/// this worker may call `push` and `pop`; `steal` is safe from any thread.
pub(crate) struct WorkerEntry {
    // Owner half of the deque. See the `Sync` impl on `Pool` for the
    // access contract.
    worker: Worker<Task>,

    // Stealer half of the deque.
    stealer: Stealer<Task>,

    // Event this worker parks on.
    event: Arc<AutoResetEvent>,
}

impl WorkerEntry {
    pub fn new() -> WorkerEntry {
        let worker = Worker::new_lifo();
        let stealer = worker.stealer();

        WorkerEntry {
            worker,
            stealer,
            event: Arc::new(AutoResetEvent::new()),
        }
    }

    /// Push a task onto this worker's deque.
    ///
    /// Owner only.
    #[inline]
    pub fn push(&self, task: Task) {
        self.worker.push(task);
    }

    /// Pop the most recently pushed task.
    ///
    /// Owner only.
    #[inline]
    pub fn pop(&self) -> Option<Task> {
        self.worker.pop()
    }

    /// Steal the oldest task on the deque.
    ///
    /// Callable from any thread. Callers treat `Steal::Retry` the same as
    /// `Steal::Empty`.
    #[inline]
    pub fn steal(&self) -> Steal<Task> {
        self.stealer.steal()
    }

    /// The event this worker parks on.
    pub fn event(&self) -> &Arc<AutoResetEvent> {
        &self.event
    }
}

impl fmt::Debug for WorkerEntry {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt.debug_struct("WorkerEntry")
            .field("worker", &"Worker<Task>")
            .field("stealer", &"Stealer<Task>")
            .finish()
    }
}
