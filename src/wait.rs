//! Per-thread blocking strategy.
//!
//! Blocking on a task goes through a thread-local handler. Threads outside
//! the pool sleep on a one-shot event; worker threads install a handler
//! that keeps executing tasks until the awaited task completes.

use crate::park::AutoResetEvent;
use crate::task::WaitHandle;

use std::cell::Cell;
use std::sync::Arc;

/// Strategy used by the current thread to block on a task.
///
/// Installed per thread with [`set_thread_wait_handler`] and invoked by
/// [`wait_for_task`] whenever the awaited task is not already complete.
pub type WaitHandler = fn(&WaitHandle);

thread_local! {
    static WAIT_HANDLER: Cell<WaitHandler> = Cell::new(generic_wait_handler as WaitHandler);
}

/// Block the current thread until `task` completes.
///
/// Worker threads keep executing other tasks while they wait; any other
/// thread sleeps until the task finishes. Returns immediately if the task
/// is already complete.
pub fn wait_for_task(task: &WaitHandle) {
    if task.is_ready() {
        return;
    }

    let handler = WAIT_HANDLER.with(|handler| handler.get());
    handler(task);
}

/// Install `handler` as the current thread's wait handler, returning the
/// previous one so it can be restored.
pub fn set_thread_wait_handler(handler: WaitHandler) -> WaitHandler {
    WAIT_HANDLER.with(|current| current.replace(handler))
}

/// Default handler for threads outside the pool: park on a one-shot event
/// signaled by the task's completion.
pub(crate) fn generic_wait_handler(task: &WaitHandle) {
    let event = Arc::new(AutoResetEvent::new());
    let signal = event.clone();

    task.on_finish(move || signal.signal());

    event.wait();
}

#[cfg(test)]
mod tests {
    use super::wait_for_task;
    use crate::task::Task;

    use std::thread;
    use std::time::Duration;

    #[test]
    fn wait_on_completed_task_returns() {
        let task = Task::new(|| {});
        let handle = task.wait_handle();
        task.run();

        wait_for_task(&handle);
        assert!(handle.is_ready());
    }

    #[test]
    fn wait_blocks_until_another_thread_completes() {
        let task = Task::new(|| {});
        let handle = task.wait_handle();

        let runner = thread::spawn(move || {
            thread::sleep(Duration::from_millis(50));
            task.run();
        });

        wait_for_task(&handle);
        assert!(handle.is_ready());

        runner.join().unwrap();
    }
}
