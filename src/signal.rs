use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Condvar, Mutex};

/// How a blocked wait at an interval boundary ended.
#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) enum Wait {
    /// The advance signal arrived.
    Advanced,
    /// The run was cancelled while waiting.
    Cancelled,
}

/// Single-slot advance signal, one per running algorithm instance.
///
/// A signal is honored only while a wait is blocked on it; signals sent
/// while nobody waits are lost, not queued. Cancellation is a one-way flag
/// that also unblocks a pending wait.
pub(crate) struct AdvanceSignal {
    state: Mutex<State>,
    signal: Condvar,
    cancelled: AtomicBool,
}

struct State {
    waiting: bool,
    generation: u64,
}

impl AdvanceSignal {
    pub(crate) fn new() -> Self {
        AdvanceSignal {
            state: Mutex::new(State {
                waiting: false,
                generation: 0,
            }),
            signal: Condvar::new(),
            cancelled: AtomicBool::new(false),
        }
    }

    /// Blocks until the next advance signal or cancellation.
    pub(crate) fn wait(&self) -> Wait {
        let mut state = self.state.lock().unwrap();
        state.waiting = true;
        let seen = state.generation;
        while state.generation == seen && !self.cancelled.load(Ordering::Relaxed) {
            state = self.signal.wait(state).unwrap();
        }
        state.waiting = false;
        if self.cancelled.load(Ordering::Relaxed) {
            Wait::Cancelled
        } else {
            Wait::Advanced
        }
    }

    /// Delivers one advance signal; returns whether a wait was unblocked.
    pub(crate) fn advance(&self) -> bool {
        let mut state = self.state.lock().unwrap();
        if !state.waiting {
            return false;
        }
        state.generation += 1;
        self.signal.notify_all();
        true
    }

    /// Requests termination and unblocks a pending wait.
    pub(crate) fn cancel(&self) {
        self.cancelled.store(true, Ordering::Relaxed);
        let _state = self.state.lock().unwrap();
        self.signal.notify_all();
    }

    /// True once cancellation was requested.
    pub(crate) fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Relaxed)
    }

    /// True while a wait is blocked on this signal.
    pub(crate) fn is_waiting(&self) -> bool {
        self.state.lock().unwrap().waiting
    }
}

#[cfg(test)]
mod tests {
    use std::sync::mpsc::channel;
    use std::sync::Arc;
    use std::thread;
    use std::time::Duration;

    use crate::signal::*;

    fn deliver(signal: &AdvanceSignal) {
        while !signal.advance() {
            thread::sleep(Duration::from_millis(1));
        }
    }

    #[test]
    fn test_signal_without_waiter_is_lost() {
        let signal = Arc::new(AdvanceSignal::new());
        assert!(!signal.advance());
        assert!(!signal.advance());

        let (done, waited) = channel();
        let waiter = signal.clone();
        thread::spawn(move || done.send(waiter.wait()).unwrap());
        // the lost signals above must not pre-unblock this wait
        assert!(waited.recv_timeout(Duration::from_millis(50)).is_err());

        deliver(&signal);
        assert_eq!(
            Wait::Advanced,
            waited.recv_timeout(Duration::from_secs(5)).unwrap()
        );
    }

    #[test]
    fn test_one_signal_per_wait() {
        let signal = Arc::new(AdvanceSignal::new());
        let (done, waited) = channel();
        let waiter = signal.clone();
        thread::spawn(move || {
            done.send(waiter.wait()).unwrap();
            done.send(waiter.wait()).unwrap();
        });
        deliver(&signal);
        assert_eq!(
            Wait::Advanced,
            waited.recv_timeout(Duration::from_secs(5)).unwrap()
        );
        // the second wait needs its own signal
        assert!(waited.recv_timeout(Duration::from_millis(50)).is_err());
        deliver(&signal);
        assert_eq!(
            Wait::Advanced,
            waited.recv_timeout(Duration::from_secs(5)).unwrap()
        );
    }

    #[test]
    fn test_cancel_unblocks_wait() {
        let signal = Arc::new(AdvanceSignal::new());
        let (done, waited) = channel();
        let waiter = signal.clone();
        thread::spawn(move || done.send(waiter.wait()).unwrap());
        while !signal.is_waiting() {
            thread::sleep(Duration::from_millis(1));
        }
        signal.cancel();
        assert_eq!(
            Wait::Cancelled,
            waited.recv_timeout(Duration::from_secs(5)).unwrap()
        );
        assert!(signal.is_cancelled());
    }
}
