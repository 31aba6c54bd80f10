//! Conveyor
//!
//! A bounded task-dispatch engine built on OS threads.
//!
//! # Goals
//! - Backpressure under a bounded buffer, FIFO delivery
//! - Shutdown that drains queued work, never deadlocks or leaks threads
//! - Failure as return values: a full or closed queue is routine, not an error
//!
//! Two pieces do the work: [`BoundedQueue`], a monitor-based FIFO with
//! blocking, non-blocking, and timed operations plus an explicit close
//! protocol, and [`WorkerPool`], which owns one queue of tasks and a
//! fixed set of worker threads draining it. The [`sync`] module carries
//! a few companion primitives, and [`ShutdownSignal`] gives pool owners
//! an injectable stop trigger.
//!
//! # Example
//! ```rust,ignore
//! use conveyor::{PoolConfig, WorkerPool};
//!
//! let pool = WorkerPool::with_config(PoolConfig {
//!     name: "render".to_string(),
//!     queue_capacity: 64,
//! });
//! pool.start(4)?;
//! pool.submit(|| expensive_work());
//! pool.stop(); // drains the queue, joins all workers
//! ```

mod config;
mod pool;
mod queue;
mod shutdown;
pub mod sync;

pub use config::PoolConfig;
pub use pool::{ErrorSink, MAX_WORKERS, PoolError, PoolState, Task, WorkerPool};
pub use queue::BoundedQueue;
pub use shutdown::ShutdownSignal;
pub use sync::{CounterLatch, Event, Semaphore};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
