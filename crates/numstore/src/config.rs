//! Store configuration

use std::time::Duration;

/// Default number of shards (power of 2 for efficient modulo)
pub const DEFAULT_NUM_SHARDS: usize = 256;

/// Store configuration
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Lifetime of an entry after create or set (default: 5 minutes)
    pub ttl: Duration,

    /// Period of the background expiration sweep (default: 10 minutes)
    pub sweep_interval: Duration,

    /// Number of lock shards (default: 256)
    pub num_shards: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            ttl: Duration::from_secs(5 * 60),
            sweep_interval: Duration::from_secs(10 * 60),
            num_shards: DEFAULT_NUM_SHARDS,
        }
    }
}

impl StoreConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set entry TTL
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    /// Set expiration sweep interval
    pub fn with_sweep_interval(mut self, interval: Duration) -> Self {
        self.sweep_interval = interval;
        self
    }

    /// Set shard count (at least one shard is always used)
    pub fn with_shards(mut self, num_shards: usize) -> Self {
        self.num_shards = num_shards.max(1);
        self
    }
}
