//! Waitable boolean flag.

use std::time::Duration;

use parking_lot::{Condvar, Mutex};

/// A boolean condition threads can block on until it is set.
///
/// Used for bridge readiness, disconnect acknowledgement, the scheduler stop
/// request, and the fully-stopped notification. Waiting never polls: waiters
/// park on a `Condvar` and are woken by [`Signal::set`].
#[derive(Debug, Default)]
pub struct Signal {
    flag: Mutex<bool>,
    condvar: Condvar,
}

impl Signal {
    /// Create a cleared signal.
    #[must_use]
    pub fn new() -> Self {
        Self {
            flag: Mutex::new(false),
            condvar: Condvar::new(),
        }
    }

    /// Create a signal that is already set.
    #[must_use]
    pub fn new_set() -> Self {
        Self {
            flag: Mutex::new(true),
            condvar: Condvar::new(),
        }
    }

    /// Set the flag and wake every waiter.
    pub fn set(&self) {
        let mut flag = self.flag.lock();
        *flag = true;
        self.condvar.notify_all();
    }

    /// Clear the flag.
    pub fn clear(&self) {
        *self.flag.lock() = false;
    }

    /// Current value.
    #[must_use]
    pub fn is_set(&self) -> bool {
        *self.flag.lock()
    }

    /// Block until the flag is set.
    pub fn wait(&self) {
        let mut flag = self.flag.lock();
        self.condvar.wait_while(&mut flag, |set| !*set);
    }

    /// Block until the flag is set or `timeout` elapses.
    ///
    /// Returns the flag value on return, so `false` means timed out.
    /// A zero timeout just samples the flag.
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        let mut flag = self.flag.lock();
        if !*flag && !timeout.is_zero() {
            self.condvar.wait_while_for(&mut flag, |set| !*set, timeout);
        }
        *flag
    }
}
