use std::time::Duration;

/// Configuration for the per-address Redis connection pools.
#[derive(Debug, Clone)]
pub struct RedisPoolConfig {
    /// Maximum number of concurrent connections per address (hard cap;
    /// acquisition blocks while the pool is at capacity).
    pub capacity: usize,

    /// How long an acquisition may block on an exhausted pool before
    /// failing with a connection error.
    pub wait_timeout: Duration,
}

impl RedisPoolConfig {
    /// Create a configuration with the given per-address capacity and the
    /// default wait timeout.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            ..Self::default()
        }
    }
}

impl Default for RedisPoolConfig {
    fn default() -> Self {
        Self {
            capacity: 10,
            wait_timeout: Duration::from_secs(5),
        }
    }
}
