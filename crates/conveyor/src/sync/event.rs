//! Thread Notification Event

use std::sync::{Condvar, Mutex};
use std::time::{Duration, Instant};

/// Thread notification event with manual- and auto-reset modes.
///
/// Manual-reset: `set` wakes every waiter and the event stays signaled
/// until `reset` is called. Auto-reset: `set` releases exactly one
/// waiter (or the next one to arrive) and the event clears itself as it
/// is consumed.
pub struct Event {
    signaled: Mutex<bool>,
    condvar: Condvar,
    manual_reset: bool,
}

impl Event {
    /// Create a manual-reset event, initially unsignaled
    pub fn manual_reset() -> Self {
        Self::with_mode(true)
    }

    /// Create an auto-reset event, initially unsignaled
    pub fn auto_reset() -> Self {
        Self::with_mode(false)
    }

    fn with_mode(manual_reset: bool) -> Self {
        Self {
            signaled: Mutex::new(false),
            condvar: Condvar::new(),
            manual_reset,
        }
    }

    /// Signal the event
    pub fn set(&self) {
        let mut signaled = self.signaled.lock().unwrap();
        *signaled = true;
        if self.manual_reset {
            self.condvar.notify_all();
        } else {
            self.condvar.notify_one();
        }
    }

    /// Clear the signaled state
    pub fn reset(&self) {
        *self.signaled.lock().unwrap() = false;
    }

    /// Whether the event is currently signaled (advisory under concurrency)
    pub fn is_set(&self) -> bool {
        *self.signaled.lock().unwrap()
    }

    /// Block until the event is signaled
    pub fn wait(&self) {
        let mut signaled = self.signaled.lock().unwrap();
        while !*signaled {
            signaled = self.condvar.wait(signaled).unwrap();
        }
        if !self.manual_reset {
            *signaled = false;
        }
    }

    /// Consume the event if it is already signaled, without blocking
    pub fn try_wait(&self) -> bool {
        let mut signaled = self.signaled.lock().unwrap();
        if !*signaled {
            return false;
        }
        if !self.manual_reset {
            *signaled = false;
        }
        true
    }

    /// Block until the event is signaled or `timeout` elapses.
    ///
    /// Returns `false` on timeout with the event untouched.
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut signaled = self.signaled.lock().unwrap();
        while !*signaled {
            let now = Instant::now();
            if now >= deadline {
                return false;
            }
            let (guard, _) = self.condvar.wait_timeout(signaled, deadline - now).unwrap();
            signaled = guard;
        }
        if !self.manual_reset {
            *signaled = false;
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_manual_reset_stays_signaled() {
        let event = Event::manual_reset();
        event.set();
        assert!(event.try_wait());
        assert!(event.try_wait());
        event.reset();
        assert!(!event.try_wait());
    }

    #[test]
    fn test_auto_reset_consumes_signal() {
        let event = Event::auto_reset();
        event.set();
        assert!(event.try_wait());
        assert!(!event.try_wait());
    }

    #[test]
    fn test_wait_timeout_expires() {
        let event = Event::auto_reset();
        let start = Instant::now();
        assert!(!event.wait_timeout(Duration::from_millis(50)));
        assert!(start.elapsed() >= Duration::from_millis(50));
    }

    #[test]
    fn test_set_wakes_waiter() {
        let event = Arc::new(Event::auto_reset());
        let waiter = {
            let event = Arc::clone(&event);
            thread::spawn(move || event.wait_timeout(Duration::from_secs(5)))
        };

        thread::sleep(Duration::from_millis(50));
        event.set();
        assert!(waiter.join().unwrap());
    }

    #[test]
    fn test_manual_reset_releases_all_waiters() {
        let event = Arc::new(Event::manual_reset());
        let released = Arc::new(AtomicU32::new(0));

        let waiters: Vec<_> = (0..3)
            .map(|_| {
                let event = Arc::clone(&event);
                let released = Arc::clone(&released);
                thread::spawn(move || {
                    if event.wait_timeout(Duration::from_secs(5)) {
                        released.fetch_add(1, Ordering::SeqCst);
                    }
                })
            })
            .collect();

        thread::sleep(Duration::from_millis(50));
        event.set();
        for waiter in waiters {
            waiter.join().unwrap();
        }
        assert_eq!(released.load(Ordering::SeqCst), 3);
    }
}
