//! Registry of sleeping workers.

use crate::park::AutoResetEvent;

use std::mem;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering::Relaxed;
use std::sync::Arc;

use parking_lot::Mutex;

/// Stack of parked-worker events.
///
/// A worker pushes its event immediately before blocking on it and removes
/// it immediately after waking. Producers pop the most recently parked
/// worker, whose caches are the most likely to still be warm.
///
/// Critical sections are a push, a pop, or a scan over at most the worker
/// count, all under an adaptive lock.
pub(crate) struct SleepStack {
    // Shadow of the stack length, maintained while holding the lock. Read
    // without the lock by the `is_empty` fast path; `pop` re-checks under
    // the lock, so a stale read is harmless.
    len: AtomicUsize,

    stack: Mutex<Vec<Arc<AutoResetEvent>>>,
}

impl SleepStack {
    /// Create an empty stack with room for `capacity` waiters, so pushes
    /// while the pool is running never reallocate.
    pub fn with_capacity(capacity: usize) -> SleepStack {
        SleepStack {
            len: AtomicUsize::new(0),
            stack: Mutex::new(Vec::with_capacity(capacity)),
        }
    }

    /// Racy emptiness check used to skip the lock on the submit path.
    pub fn is_empty(&self) -> bool {
        self.len.load(Relaxed) == 0
    }

    /// Add a parked worker's event.
    pub fn register(&self, event: &Arc<AutoResetEvent>) {
        let mut stack = self.stack.lock();
        stack.push(event.clone());
        self.len.store(stack.len(), Relaxed);
    }

    /// Remove the first occurrence of `event`, if present.
    ///
    /// The event may already be gone: `pop` removes it on behalf of the
    /// woken worker.
    pub fn deregister(&self, event: &Arc<AutoResetEvent>) {
        let mut stack = self.stack.lock();

        if let Some(index) = stack.iter().position(|e| Arc::ptr_eq(e, event)) {
            stack.remove(index);
            self.len.store(stack.len(), Relaxed);
        }
    }

    /// Pop the most recently parked worker's event.
    ///
    /// The lock is released before the caller signals the event.
    pub fn pop(&self) -> Option<Arc<AutoResetEvent>> {
        let mut stack = self.stack.lock();
        let event = stack.pop();
        self.len.store(stack.len(), Relaxed);
        event
    }

    /// Take every registered event, leaving the stack empty.
    ///
    /// Used once, at shutdown; the caller signals each event outside the
    /// lock.
    pub fn drain(&self) -> Vec<Arc<AutoResetEvent>> {
        let mut stack = self.stack.lock();
        self.len.store(0, Relaxed);
        mem::take(&mut *stack)
    }
}

#[cfg(test)]
mod tests {
    use super::SleepStack;
    use crate::park::AutoResetEvent;

    use std::sync::Arc;

    fn event() -> Arc<AutoResetEvent> {
        Arc::new(AutoResetEvent::new())
    }

    #[test]
    fn pop_is_lifo() {
        let stack = SleepStack::with_capacity(4);
        let (a, b, c) = (event(), event(), event());

        stack.register(&a);
        stack.register(&b);
        stack.register(&c);

        assert!(Arc::ptr_eq(&c, &stack.pop().unwrap()));
        assert!(Arc::ptr_eq(&b, &stack.pop().unwrap()));
        assert!(Arc::ptr_eq(&a, &stack.pop().unwrap()));
        assert!(stack.pop().is_none());
    }

    #[test]
    fn deregister_removes_the_entry() {
        let stack = SleepStack::with_capacity(4);
        let (a, b) = (event(), event());

        stack.register(&a);
        stack.register(&b);
        stack.deregister(&a);

        assert!(Arc::ptr_eq(&b, &stack.pop().unwrap()));
        assert!(stack.pop().is_none());
    }

    #[test]
    fn deregister_missing_entry_is_a_no_op() {
        let stack = SleepStack::with_capacity(4);
        let (a, b) = (event(), event());

        stack.register(&a);
        stack.deregister(&b);

        assert!(!stack.is_empty());
        assert!(Arc::ptr_eq(&a, &stack.pop().unwrap()));
    }

    #[test]
    fn drain_empties_the_stack() {
        let stack = SleepStack::with_capacity(4);

        stack.register(&event());
        stack.register(&event());
        assert!(!stack.is_empty());

        assert_eq!(2, stack.drain().len());
        assert!(stack.is_empty());
        assert!(stack.pop().is_none());
    }
}
