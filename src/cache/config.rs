//! Configuration for the cache module

use serde::{Deserialize, Serialize};

/// Configuration for the cache manager
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Whether the cache is enabled
    pub enabled: bool,

    /// Default TTL in milliseconds applied when a write carries no TTL.
    /// `None` means entries without an explicit TTL never expire.
    pub default_ttl_ms: Option<u64>,

    /// Maximum number of entries before oldest-first eviction kicks in
    pub max_entries: usize,

    /// Interval between background expiry sweeps, in milliseconds
    pub sweep_interval_ms: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            default_ttl_ms: None,
            max_entries: 1000,
            sweep_interval_ms: 60_000,
        }
    }
}
