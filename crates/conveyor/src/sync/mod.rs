//! Synchronization Primitives
//!
//! Small monitor-based companions to the dispatch engine:
//! - Manual-/auto-reset event for one-off notifications
//! - Counting semaphore
//! - Latch whose count can grow until it is released

mod event;
mod latch;
mod semaphore;

pub use event::Event;
pub use latch::CounterLatch;
pub use semaphore::Semaphore;
