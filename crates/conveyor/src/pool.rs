//! Worker Pool
//!
//! Fixed-size pool of OS worker threads draining a shared bounded queue.
//! Lifecycle: `Created -> Running -> Stopping -> Stopped`. Stopping closes
//! the queue, lets the workers drain whatever is already queued, then
//! joins every thread. A stopped pool cannot be restarted.

use std::io;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};

use crate::config::PoolConfig;
use crate::queue::BoundedQueue;

/// Ceiling on the number of worker threads a pool will spawn
pub const MAX_WORKERS: usize = 16;

/// Task function type
pub type Task = Box<dyn FnOnce() + Send + 'static>;

/// Callback invoked with the panic message when a task panics
pub type ErrorSink = Arc<dyn Fn(&str) + Send + Sync>;

type ErrorSlot = Mutex<Option<ErrorSink>>;

/// Pool lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PoolState {
    /// Constructed, no threads spawned yet
    Created,
    /// Workers are running
    Running,
    /// Stop requested, workers draining the queue
    Stopping,
    /// All workers joined; terminal
    Stopped,
}

/// Pool startup errors.
#[derive(Debug, thiserror::Error)]
pub enum PoolError {
    /// A worker thread could not be spawned
    #[error("failed to spawn worker thread: {0}")]
    Spawn(#[from] io::Error),

    /// The pool was stopped and cannot be restarted
    #[error("pool has been stopped and cannot be restarted")]
    Terminated,
}

struct Worker {
    id: usize,
    thread: Option<JoinHandle<()>>,
}

impl std::fmt::Debug for Worker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Worker")
            .field("id", &self.id)
            .field("running", &self.thread.is_some())
            .finish()
    }
}

/// Task execution service: one bounded queue, N worker threads.
///
/// `submit` hands a task to the queue under the queue's backpressure
/// rules; an idle worker picks it up and runs it outside any lock. Tasks
/// are opaque `FnOnce()` values: no return channel, no cancellation once
/// a worker has started one.
///
/// The lifecycle API (`start`, `stop`) is meant to be driven by a single
/// owning thread, while `submit` may be called from any number of
/// threads. `stop` is also run on drop.
pub struct WorkerPool {
    name: String,
    queue: Arc<BoundedQueue<Task>>,
    state: Mutex<PoolState>,
    workers: Mutex<Vec<Worker>>,
    error_sink: Arc<ErrorSlot>,
    caller_runs: bool,
}

impl WorkerPool {
    /// Create a pool with an unbounded task queue
    pub fn new(name: &str) -> Self {
        Self::with_config(PoolConfig {
            name: name.to_string(),
            ..PoolConfig::default()
        })
    }

    /// Create a pool from a configuration
    pub fn with_config(config: PoolConfig) -> Self {
        Self {
            name: config.name,
            queue: Arc::new(BoundedQueue::new(config.queue_capacity)),
            state: Mutex::new(PoolState::Created),
            workers: Mutex::new(Vec::new()),
            error_sink: Arc::new(Mutex::new(None)),
            caller_runs: false,
        }
    }

    /// Create a pool that owns no threads and executes every submitted
    /// task synchronously on the caller's thread.
    ///
    /// The pool reports `Running` immediately; `start` is a no-op and
    /// `stop` only flips the state. Panicking tasks are reported the same
    /// way as on a threaded pool.
    pub fn direct(name: &str) -> Self {
        Self {
            name: name.to_string(),
            queue: Arc::new(BoundedQueue::new(0)),
            state: Mutex::new(PoolState::Running),
            workers: Mutex::new(Vec::new()),
            error_sink: Arc::new(Mutex::new(None)),
            caller_runs: true,
        }
    }

    /// Pool name, used as the worker thread name prefix
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Current lifecycle state
    pub fn state(&self) -> PoolState {
        *self.state.lock().unwrap()
    }

    /// Number of live worker threads
    pub fn worker_count(&self) -> usize {
        self.workers.lock().unwrap().len()
    }

    /// Number of queued tasks (advisory under concurrency)
    pub fn queue_len(&self) -> usize {
        self.queue.len()
    }

    /// Task queue capacity (0 = unbounded)
    pub fn queue_capacity(&self) -> usize {
        self.queue.capacity()
    }

    /// Install a callback invoked with the message of every task panic.
    ///
    /// Takes effect for tasks that panic after the call; defaults to none
    /// (panics are still logged).
    pub fn set_error_sink<F>(&self, sink: F)
    where
        F: Fn(&str) + Send + Sync + 'static,
    {
        *self.error_sink.lock().unwrap() = Some(Arc::new(sink));
    }

    /// Spawn `workers` threads and move to `Running`.
    ///
    /// The count is clamped to `[1, MAX_WORKERS]`; requesting 0 yields 1.
    /// Calling `start` on a pool that is already `Running` is a no-op
    /// returning `Ok`; a stopped pool cannot be restarted. If a thread
    /// fails to spawn, the workers spawned so far are shut down and
    /// joined before the error is returned.
    pub fn start(&self, workers: usize) -> Result<(), PoolError> {
        let mut state = self.state.lock().unwrap();
        match *state {
            PoolState::Created => {}
            PoolState::Running => return Ok(()),
            PoolState::Stopping | PoolState::Stopped => return Err(PoolError::Terminated),
        }

        let count = self.clamp_workers(workers);
        let mut spawned = Vec::with_capacity(count);
        for id in 0..count {
            match self.spawn_worker(id) {
                Ok(handle) => spawned.push(Worker {
                    id,
                    thread: Some(handle),
                }),
                Err(e) => {
                    *state = PoolState::Stopped;
                    drop(state);
                    self.queue.close();
                    for worker in &mut spawned {
                        if let Some(thread) = worker.thread.take() {
                            let _ = thread.join();
                        }
                    }
                    tracing::error!("pool {} failed to start: {}", self.name, e);
                    return Err(PoolError::Spawn(e));
                }
            }
        }

        *self.workers.lock().unwrap() = spawned;
        *state = PoolState::Running;
        tracing::debug!("pool {} started with {} workers", self.name, count);
        Ok(())
    }

    /// Submit a task for execution.
    ///
    /// Returns `true` once the task has been queued (or, for a `direct`
    /// pool, executed). Returns `false` without blocking indefinitely if
    /// the pool was never started or has been stopped; a caller blocked
    /// on a full queue is woken by `stop` and gets `false`. Blocks under
    /// backpressure while a bounded queue is full.
    pub fn submit<F>(&self, task: F) -> bool
    where
        F: FnOnce() + Send + 'static,
    {
        match *self.state.lock().unwrap() {
            PoolState::Running | PoolState::Stopping => {}
            PoolState::Created | PoolState::Stopped => return false,
        }
        if self.caller_runs {
            run_task(Box::new(task), &self.error_sink);
            return true;
        }
        self.queue.enqueue(Box::new(task))
    }

    /// Close the queue, wait for the workers to drain it, and join them.
    ///
    /// Tasks already queued when `stop` is called still run; only new
    /// submissions are refused. Idempotent; also invoked on drop.
    pub fn stop(&self) {
        {
            let mut state = self.state.lock().unwrap();
            match *state {
                PoolState::Running => *state = PoolState::Stopping,
                PoolState::Created => {
                    *state = PoolState::Stopped;
                    self.queue.close();
                    return;
                }
                PoolState::Stopping | PoolState::Stopped => return,
            }
        }

        tracing::debug!("stopping pool {}", self.name);
        self.queue.close();

        let mut workers = self.workers.lock().unwrap();
        for worker in workers.iter_mut() {
            if let Some(thread) = worker.thread.take() {
                let _ = thread.join();
            }
        }
        workers.clear();
        drop(workers);

        *self.state.lock().unwrap() = PoolState::Stopped;
        tracing::debug!("pool {} stopped", self.name);
    }

    fn clamp_workers(&self, requested: usize) -> usize {
        if requested == 0 {
            tracing::warn!("pool {} asked for 0 workers, using 1", self.name);
            1
        } else if requested > MAX_WORKERS {
            tracing::warn!(
                "pool {} asked for {} workers, using ceiling {}",
                self.name,
                requested,
                MAX_WORKERS
            );
            MAX_WORKERS
        } else {
            requested
        }
    }

    fn spawn_worker(&self, id: usize) -> io::Result<JoinHandle<()>> {
        let queue = Arc::clone(&self.queue);
        let sink = Arc::clone(&self.error_sink);
        thread::Builder::new()
            .name(format!("{}-{}", self.name, id))
            .spawn(move || worker_loop(&queue, &sink))
    }
}

impl std::fmt::Debug for WorkerPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkerPool")
            .field("name", &self.name)
            .field("state", &self.state())
            .field("workers", &self.worker_count())
            .field("queue_len", &self.queue.len())
            .finish()
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Pull tasks until the queue is closed and drained, isolating panics.
fn worker_loop(queue: &BoundedQueue<Task>, sink: &ErrorSlot) {
    while let Some(task) = queue.dequeue() {
        run_task(task, sink);
    }
}

fn run_task(task: Task, sink: &ErrorSlot) {
    if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(task)) {
        let message = panic_message(payload.as_ref());
        tracing::error!("task panicked: {}", message);
        let sink = sink.lock().unwrap().clone();
        if let Some(sink) = sink {
            sink(&message);
        }
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::mpsc;
    use std::time::Duration;

    #[test]
    fn test_pool_runs_all_tasks() {
        let pool = WorkerPool::with_config(PoolConfig {
            name: "test".to_string(),
            queue_capacity: 4,
        });
        pool.start(2).unwrap();

        let counter = Arc::new(AtomicU32::new(0));
        for _ in 0..10 {
            let counter = Arc::clone(&counter);
            assert!(pool.submit(move || {
                counter.fetch_add(1, Ordering::SeqCst);
            }));
        }

        pool.stop();
        assert_eq!(counter.load(Ordering::SeqCst), 10);
        assert_eq!(pool.state(), PoolState::Stopped);
        assert_eq!(pool.worker_count(), 0);
    }

    #[test]
    fn test_submit_before_start_fails() {
        let pool = WorkerPool::new("test");
        assert!(!pool.submit(|| {}));
        assert_eq!(pool.state(), PoolState::Created);
    }

    #[test]
    fn test_submit_after_stop_fails() {
        let pool = WorkerPool::new("test");
        pool.start(1).unwrap();
        pool.stop();
        assert!(!pool.submit(|| unreachable!()));
    }

    #[test]
    fn test_stop_is_idempotent() {
        let pool = WorkerPool::new("test");
        pool.start(2).unwrap();
        pool.stop();
        pool.stop();
        assert_eq!(pool.state(), PoolState::Stopped);
        assert_eq!(pool.worker_count(), 0);
    }

    #[test]
    fn test_start_twice_is_noop() {
        let pool = WorkerPool::new("test");
        pool.start(2).unwrap();
        assert!(pool.start(8).is_ok());
        assert_eq!(pool.worker_count(), 2);
        pool.stop();
    }

    #[test]
    fn test_start_after_stop_fails() {
        let pool = WorkerPool::new("test");
        pool.start(1).unwrap();
        pool.stop();
        assert!(matches!(pool.start(1), Err(PoolError::Terminated)));
        assert_eq!(pool.worker_count(), 0);
    }

    #[test]
    fn test_worker_count_clamping() {
        let pool = WorkerPool::new("clamp-low");
        pool.start(0).unwrap();
        assert_eq!(pool.worker_count(), 1);
        pool.stop();

        let pool = WorkerPool::new("clamp-high");
        pool.start(1000).unwrap();
        assert_eq!(pool.worker_count(), MAX_WORKERS);
        pool.stop();
    }

    #[test]
    fn test_panicking_task_does_not_kill_worker() {
        let pool = WorkerPool::new("test");
        pool.start(1).unwrap();

        let (tx, rx) = mpsc::channel();
        pool.set_error_sink(move |message| {
            tx.send(message.to_string()).unwrap();
        });

        pool.submit(|| panic!("boom"));

        let counter = Arc::new(AtomicU32::new(0));
        let after = Arc::clone(&counter);
        pool.submit(move || {
            after.fetch_add(1, Ordering::SeqCst);
        });

        pool.stop();
        assert_eq!(counter.load(Ordering::SeqCst), 1);
        assert_eq!(
            rx.recv_timeout(Duration::from_secs(1)).unwrap(),
            "boom"
        );
    }

    #[test]
    fn test_direct_pool_runs_on_caller_thread() {
        let pool = WorkerPool::direct("inline");
        assert_eq!(pool.state(), PoolState::Running);
        assert_eq!(pool.worker_count(), 0);

        let caller = thread::current().id();
        let (tx, rx) = mpsc::channel();
        assert!(pool.submit(move || {
            tx.send(thread::current().id()).unwrap();
        }));
        assert_eq!(rx.recv().unwrap(), caller);

        pool.stop();
        assert!(!pool.submit(|| unreachable!()));
        assert_eq!(pool.state(), PoolState::Stopped);
    }

    #[test]
    fn test_drop_stops_pool() {
        let counter = Arc::new(AtomicU32::new(0));
        {
            let pool = WorkerPool::new("test");
            pool.start(2).unwrap();
            for _ in 0..4 {
                let counter = Arc::clone(&counter);
                pool.submit(move || {
                    counter.fetch_add(1, Ordering::SeqCst);
                });
            }
        }
        // Drop joined the workers, so every queued task has run.
        assert_eq!(counter.load(Ordering::SeqCst), 4);
    }
}
