//! One-shot cancellation signal.
//!
//! The embedder holds a clone of the signal and calls [`AbortSignal::abort`]
//! to interrupt a running guest. The host polls the signal on syscall entry
//! and waits on it at the suspension points (stdin reads, `poll_oneoff`
//! clock waits), so an abort wakes sleeping syscalls promptly.

use parking_lot::{Condvar, Mutex};
use std::{sync::Arc, time::Duration};

#[derive(Debug, Default)]
struct AbortInner {
    aborted: Mutex<bool>,
    condvar: Condvar,
}

/// A one-shot, clonable cancellation signal. All clones observe the same
/// state; once aborted, a signal stays aborted.
#[derive(Debug, Clone, Default)]
pub struct AbortSignal {
    inner: Arc<AbortInner>,
}

impl AbortSignal {
    /// Creates a new, un-aborted signal.
    pub fn new() -> Self {
        Self::default()
    }

    /// Fires the signal and wakes every waiter.
    pub fn abort(&self) {
        let mut aborted = self.inner.aborted.lock();
        *aborted = true;
        self.inner.condvar.notify_all();
    }

    /// Returns whether the signal has fired.
    pub fn is_aborted(&self) -> bool {
        *self.inner.aborted.lock()
    }

    /// Blocks until the signal fires or `timeout` elapses. Returns whether
    /// the signal has fired.
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        let mut aborted = self.inner.aborted.lock();
        if *aborted {
            return true;
        }

        self.inner.condvar.wait_for(&mut aborted, timeout);
        *aborted
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::{thread, time::Instant};

    #[test]
    fn starts_clear() {
        assert!(!AbortSignal::new().is_aborted());
    }

    #[test]
    fn abort_is_sticky_and_shared() {
        let signal = AbortSignal::new();
        let clone = signal.clone();

        signal.abort();
        assert!(signal.is_aborted());
        assert!(clone.is_aborted());
    }

    #[test]
    fn wait_times_out_when_clear() {
        let signal = AbortSignal::new();
        assert!(!signal.wait_timeout(Duration::from_millis(10)));
    }

    #[test]
    fn wait_wakes_on_abort() {
        let signal = AbortSignal::new();
        let waker = signal.clone();

        let handle = thread::spawn(move || {
            thread::sleep(Duration::from_millis(20));
            waker.abort();
        });

        let start = Instant::now();
        assert!(signal.wait_timeout(Duration::from_secs(5)));
        assert!(start.elapsed() < Duration::from_secs(5));

        handle.join().unwrap();
    }
}
