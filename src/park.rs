//! Thread parking primitive used for all sleeping in the pool.

use parking_lot::{Condvar, Mutex};

/// An auto-reset event.
///
/// `signal` unblocks exactly one waiter and is consumed by it. If nobody is
/// waiting, the signal is latched and the next call to `wait` returns
/// immediately. `reset` clears a latched signal without blocking.
///
/// The mutex establishes the release/acquire edge between a `signal` call
/// and the `wait` that returns because of it.
pub(crate) struct AutoResetEvent {
    set: Mutex<bool>,
    condvar: Condvar,
}

impl AutoResetEvent {
    pub fn new() -> AutoResetEvent {
        AutoResetEvent {
            set: Mutex::new(false),
            condvar: Condvar::new(),
        }
    }

    /// Block until the event is signaled, consuming the signal.
    pub fn wait(&self) {
        let mut set = self.set.lock();

        while !*set {
            self.condvar.wait(&mut set);
        }

        *set = false;
    }

    /// Unblock one waiter, or latch the signal if there is none.
    pub fn signal(&self) {
        let mut set = self.set.lock();

        if !*set {
            *set = true;
            self.condvar.notify_one();
        }
    }

    /// Clear a latched signal.
    pub fn reset(&self) {
        *self.set.lock() = false;
    }
}

#[cfg(test)]
mod tests {
    use super::AutoResetEvent;

    use std::sync::Arc;
    use std::thread;
    use std::time::{Duration, Instant};

    #[test]
    fn signal_is_latched() {
        let event = AutoResetEvent::new();
        event.signal();

        // Does not block; the latched signal is consumed.
        event.wait();
    }

    #[test]
    fn signal_wakes_waiter() {
        let event = Arc::new(AutoResetEvent::new());

        let handle = {
            let event = event.clone();
            thread::spawn(move || event.wait())
        };

        thread::sleep(Duration::from_millis(50));
        event.signal();
        handle.join().unwrap();
    }

    #[test]
    fn reset_clears_latched_signal() {
        let event = Arc::new(AutoResetEvent::new());
        event.signal();
        event.reset();

        let handle = {
            let event = event.clone();
            thread::spawn(move || {
                thread::sleep(Duration::from_millis(100));
                event.signal();
            })
        };

        // If the reset had not consumed the latch, this would return
        // before the helper thread signals.
        let start = Instant::now();
        event.wait();
        assert!(start.elapsed() >= Duration::from_millis(50));

        handle.join().unwrap();
    }

    #[test]
    fn each_wait_consumes_one_signal() {
        let event = Arc::new(AutoResetEvent::new());
        event.signal();
        event.wait();

        let handle = {
            let event = event.clone();
            thread::spawn(move || {
                thread::sleep(Duration::from_millis(50));
                event.signal();
            })
        };

        event.wait();
        handle.join().unwrap();
    }
}
