//! Shutdown Signal
//!
//! Injectable shutdown source for pool owners. Replaces the process-wide
//! signal-handler singleton pattern: the application layer decides what
//! trips the signal (Ctrl+C, an admin endpoint, a test), and whoever owns
//! a `WorkerPool` polls or subscribes and calls `stop` itself. Neither
//! the queue nor the pool depends on this type.

use std::mem;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

type Callback = Box<dyn FnOnce() + Send>;

struct SignalInner {
    requested: AtomicBool,
    callbacks: Mutex<Vec<Callback>>,
}

/// Cloneable one-way shutdown flag with subscription callbacks.
///
/// `request` is monotonic and idempotent: the first call flips the flag
/// and runs every subscribed callback exactly once; later calls are
/// no-ops. Subscribing after the signal has fired runs the callback
/// immediately, so no notification is ever lost.
#[derive(Clone)]
pub struct ShutdownSignal {
    inner: Arc<SignalInner>,
}

impl ShutdownSignal {
    /// Create an untripped signal
    pub fn new() -> Self {
        Self {
            inner: Arc::new(SignalInner {
                requested: AtomicBool::new(false),
                callbacks: Mutex::new(Vec::new()),
            }),
        }
    }

    /// Whether shutdown has been requested
    pub fn is_requested(&self) -> bool {
        self.inner.requested.load(Ordering::SeqCst)
    }

    /// Request shutdown, running subscribed callbacks on the first call
    pub fn request(&self) {
        if self.inner.requested.swap(true, Ordering::SeqCst) {
            return;
        }
        tracing::debug!("shutdown requested");
        let callbacks = mem::take(&mut *self.inner.callbacks.lock().unwrap());
        for callback in callbacks {
            callback();
        }
    }

    /// Register a callback to run once when shutdown is requested.
    ///
    /// Runs immediately if the signal has already fired.
    pub fn subscribe<F>(&self, callback: F)
    where
        F: FnOnce() + Send + 'static,
    {
        {
            // Flag checked under the callback lock: `request` flips the
            // flag before taking the lock, so a false reading here means
            // our push is visible to the eventual drain.
            let mut callbacks = self.inner.callbacks.lock().unwrap();
            if !self.inner.requested.load(Ordering::SeqCst) {
                callbacks.push(Box::new(callback));
                return;
            }
        }
        callback();
    }
}

impl Default for ShutdownSignal {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ShutdownSignal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShutdownSignal")
            .field("requested", &self.is_requested())
            .finish()
    }
}
