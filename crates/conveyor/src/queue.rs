//! Bounded Queue
//!
//! Thread-safe FIFO queue with an optional capacity bound and an explicit
//! close protocol. Classic monitor pattern: one mutex, two condition
//! variables ("not empty" and "not full").

use std::collections::VecDeque;
use std::sync::{Condvar, Mutex, MutexGuard};
use std::time::{Duration, Instant};

/// How long a queue operation may wait for space or items.
#[derive(Debug, Clone, Copy)]
enum Wait {
    /// Block until the condition holds or the queue closes.
    Forever,
    /// Give up immediately without blocking.
    NoWait,
    /// Block until the given deadline passes.
    Until(Instant),
}

/// Queue storage and close flag, guarded by the queue mutex.
struct Inner<T> {
    items: VecDeque<T>,
    closed: bool,
}

/// Thread-safe bounded FIFO queue.
///
/// A capacity of 0 means unbounded: insertion never blocks for capacity
/// reasons. With a non-zero capacity, producers block (or fail, for the
/// non-blocking variants) while the queue is full, giving backpressure.
///
/// Closing is one-way and idempotent. A closed queue refuses new items
/// but keeps handing out the items already inserted until it is drained;
/// only then does `dequeue` report exhaustion with `None`.
///
/// Blocking operations release the internal lock while they wait. Do not
/// call them while holding another lock an item's producer or consumer
/// might need.
pub struct BoundedQueue<T> {
    inner: Mutex<Inner<T>>,
    not_empty: Condvar,
    not_full: Condvar,
    capacity: usize,
}

impl<T> BoundedQueue<T> {
    /// Create a queue with the given capacity (0 = unbounded)
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Mutex::new(Inner {
                items: VecDeque::new(),
                closed: false,
            }),
            not_empty: Condvar::new(),
            not_full: Condvar::new(),
            capacity,
        }
    }

    /// Insert an item at the tail, blocking while the queue is full.
    ///
    /// Returns `false` without inserting if the queue is closed, whether
    /// it was closed on entry or while this call was blocked.
    pub fn enqueue(&self, item: T) -> bool {
        self.enqueue_wait(item, Wait::Forever)
    }

    /// Non-blocking insert; `false` if the queue is full or closed
    pub fn try_enqueue(&self, item: T) -> bool {
        self.enqueue_wait(item, Wait::NoWait)
    }

    /// Like `enqueue`, but gives up after `timeout` and returns `false`
    pub fn enqueue_timeout(&self, item: T, timeout: Duration) -> bool {
        self.enqueue_wait(item, Wait::Until(Instant::now() + timeout))
    }

    /// Remove and return the head item, blocking while the queue is empty.
    ///
    /// Returns `None` only once the queue is closed and drained. Items
    /// present when `close` was called are still returned.
    pub fn dequeue(&self) -> Option<T> {
        self.dequeue_wait(Wait::Forever)
    }

    /// Non-blocking removal; `None` if nothing is immediately available
    pub fn try_dequeue(&self) -> Option<T> {
        self.dequeue_wait(Wait::NoWait)
    }

    /// Like `dequeue`, but gives up after `timeout` and returns `None`
    pub fn dequeue_timeout(&self, timeout: Duration) -> Option<T> {
        self.dequeue_wait(Wait::Until(Instant::now() + timeout))
    }

    /// Number of items currently queued (advisory under concurrency)
    pub fn len(&self) -> usize {
        self.inner.lock().unwrap().items.len()
    }

    /// Whether the queue is currently empty (advisory under concurrency)
    pub fn is_empty(&self) -> bool {
        self.inner.lock().unwrap().items.is_empty()
    }

    /// Whether the queue is currently full (advisory; always `false` when unbounded)
    pub fn is_full(&self) -> bool {
        let inner = self.inner.lock().unwrap();
        self.at_capacity(&inner)
    }

    /// Configured capacity (0 = unbounded)
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Close the queue and wake every blocked producer and consumer.
    ///
    /// Idempotent. Pending items survive and remain dequeueable.
    pub fn close(&self) {
        let mut inner = self.inner.lock().unwrap();
        if inner.closed {
            return;
        }
        inner.closed = true;
        self.not_empty.notify_all();
        self.not_full.notify_all();
    }

    /// Whether `close` has been called
    pub fn is_closed(&self) -> bool {
        self.inner.lock().unwrap().closed
    }

    fn at_capacity(&self, inner: &Inner<T>) -> bool {
        self.capacity > 0 && inner.items.len() >= self.capacity
    }

    fn enqueue_wait(&self, item: T, wait: Wait) -> bool {
        let mut inner = self.inner.lock().unwrap();
        loop {
            if inner.closed {
                return false;
            }
            if !self.at_capacity(&inner) {
                break;
            }
            inner = match self.wait_on(&self.not_full, inner, wait) {
                Some(guard) => guard,
                None => return false,
            };
        }
        inner.items.push_back(item);
        self.not_empty.notify_one();
        true
    }

    fn dequeue_wait(&self, wait: Wait) -> Option<T> {
        let mut inner = self.inner.lock().unwrap();
        loop {
            if let Some(item) = inner.items.pop_front() {
                if self.capacity > 0 {
                    self.not_full.notify_one();
                }
                return Some(item);
            }
            if inner.closed {
                return None;
            }
            inner = self.wait_on(&self.not_empty, inner, wait)?;
        }
    }

    /// Single wait routine behind every blocking, non-blocking, and timed
    /// operation. Returns the reacquired guard after a wakeup, or `None`
    /// once the caller must give up. The caller re-checks its predicate
    /// in a loop, so spurious wakeups are harmless and a wakeup that
    /// races the deadline still gets one final predicate check.
    fn wait_on<'a>(
        &self,
        condvar: &Condvar,
        guard: MutexGuard<'a, Inner<T>>,
        wait: Wait,
    ) -> Option<MutexGuard<'a, Inner<T>>> {
        match wait {
            Wait::NoWait => None,
            Wait::Forever => Some(condvar.wait(guard).unwrap()),
            Wait::Until(deadline) => {
                let now = Instant::now();
                if now >= deadline {
                    return None;
                }
                let (guard, _) = condvar.wait_timeout(guard, deadline - now).unwrap();
                Some(guard)
            }
        }
    }
}

impl<T> std::fmt::Debug for BoundedQueue<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.inner.lock().unwrap();
        f.debug_struct("BoundedQueue")
            .field("len", &inner.items.len())
            .field("capacity", &self.capacity)
            .field("closed", &inner.closed)
            .finish()
    }
}
