//! Pool Configuration

/// Worker pool configuration options
#[derive(Debug, Clone)]
pub struct PoolConfig {
    /// Pool name, used as the worker thread name prefix
    pub name: String,

    /// Task queue capacity; 0 means unbounded (no backpressure)
    pub queue_capacity: usize,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            name: "conveyor".to_string(),
            queue_capacity: 0,
        }
    }
}
