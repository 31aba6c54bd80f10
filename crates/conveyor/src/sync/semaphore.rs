//! Counting Semaphore

use std::sync::{Condvar, Mutex};
use std::time::{Duration, Instant};

/// Counting semaphore built on the monitor pattern.
///
/// `acquire` takes a permit, blocking while none are available;
/// `release` returns one and wakes a single waiter. No fairness
/// guarantee beyond condition-variable wake order.
pub struct Semaphore {
    permits: Mutex<usize>,
    condvar: Condvar,
}

impl Semaphore {
    /// Create a semaphore with the given number of permits
    pub fn new(permits: usize) -> Self {
        Self {
            permits: Mutex::new(permits),
            condvar: Condvar::new(),
        }
    }

    /// Take a permit, blocking until one is available
    pub fn acquire(&self) {
        let mut permits = self.permits.lock().unwrap();
        while *permits == 0 {
            permits = self.condvar.wait(permits).unwrap();
        }
        *permits -= 1;
    }

    /// Take a permit without blocking; `false` if none are available
    pub fn try_acquire(&self) -> bool {
        let mut permits = self.permits.lock().unwrap();
        if *permits == 0 {
            return false;
        }
        *permits -= 1;
        true
    }

    /// Take a permit, giving up after `timeout`.
    ///
    /// Returns `false` on timeout with the permit count unchanged.
    pub fn acquire_timeout(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut permits = self.permits.lock().unwrap();
        while *permits == 0 {
            let now = Instant::now();
            if now >= deadline {
                return false;
            }
            let (guard, _) = self.condvar.wait_timeout(permits, deadline - now).unwrap();
            permits = guard;
        }
        *permits -= 1;
        true
    }

    /// Return a permit and wake one waiter
    pub fn release(&self) {
        let mut permits = self.permits.lock().unwrap();
        *permits += 1;
        self.condvar.notify_one();
    }

    /// Currently available permits (advisory under concurrency)
    pub fn available(&self) -> usize {
        *self.permits.lock().unwrap()
    }
}
