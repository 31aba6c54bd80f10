//! Counter Latch

use std::sync::{Condvar, Mutex};
use std::time::{Duration, Instant};

struct LatchState {
    count: usize,
    sealed: bool,
}

/// One-shot latch whose count may grow as well as shrink.
///
/// Useful when the number of threads entering a guarded section varies
/// dynamically: each entering thread calls `count_up` (which fails once
/// the latch has been released), leaves with `count_down`, and a
/// coordinator blocks in `wait` until every entry has been matched by an
/// exit. After `wait` returns the latch is sealed: further `count_up`
/// calls return `false` and later `wait` calls return immediately.
pub struct CounterLatch {
    state: Mutex<LatchState>,
    condvar: Condvar,
}

impl CounterLatch {
    /// Create a latch with a count of zero
    pub fn new() -> Self {
        Self {
            state: Mutex::new(LatchState {
                count: 0,
                sealed: false,
            }),
            condvar: Condvar::new(),
        }
    }

    /// Increment the count; `false` once the latch has been released
    pub fn count_up(&self) -> bool {
        let mut state = self.state.lock().unwrap();
        if state.sealed {
            return false;
        }
        state.count += 1;
        true
    }

    /// Decrement the count, releasing waiters when it reaches zero.
    ///
    /// A decrement at zero is a no-op.
    pub fn count_down(&self) {
        let mut state = self.state.lock().unwrap();
        if state.count > 0 {
            state.count -= 1;
            if state.count == 0 {
                self.condvar.notify_all();
            }
        }
    }

    /// Block until the count reaches zero, then seal the latch
    pub fn wait(&self) {
        let mut state = self.state.lock().unwrap();
        while state.count > 0 && !state.sealed {
            state = self.condvar.wait(state).unwrap();
        }
        state.sealed = true;
    }

    /// Like `wait`, but gives up after `timeout` and returns `false`.
    ///
    /// The latch is only sealed on success.
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut state = self.state.lock().unwrap();
        while state.count > 0 && !state.sealed {
            let now = Instant::now();
            if now >= deadline {
                return false;
            }
            let (guard, _) = self.condvar.wait_timeout(state, deadline - now).unwrap();
            state = guard;
        }
        state.sealed = true;
        true
    }

    /// Current count (advisory under concurrency)
    pub fn count(&self) -> usize {
        self.state.lock().unwrap().count
    }
}

impl Default for CounterLatch {
    fn default() -> Self {
        Self::new()
    }
}
