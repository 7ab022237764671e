//! Cache entry bookkeeping and statistics types

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::{Duration, Instant};

/// Fixed bookkeeping overhead charged per entry, in bytes
const ENTRY_OVERHEAD_BYTES: usize = 64;

/// A single cached value with its expiry and usage bookkeeping
#[derive(Debug, Clone)]
pub(crate) struct CacheEntry {
    /// The cached JSON value
    pub value: Value,

    /// Monotonic insertion sequence, used for oldest-first eviction
    pub seq: u64,

    /// Absolute expiry deadline, `None` for entries that never expire
    pub expires_at: Option<Instant>,

    /// Number of successful lookups of this entry
    pub hit_count: u64,

    /// Estimated memory charge in bytes (key + serialized value + overhead)
    pub charge: usize,
}

impl CacheEntry {
    pub fn new(key: &str, value: Value, seq: u64, ttl: Option<Duration>) -> Self {
        let serialized_len = serde_json::to_string(&value).map(|s| s.len()).unwrap_or(0);
        Self {
            charge: key.len() + serialized_len + ENTRY_OVERHEAD_BYTES,
            value,
            seq,
            expires_at: ttl.map(|d| Instant::now() + d),
            hit_count: 0,
        }
    }

    pub fn is_expired(&self, now: Instant) -> bool {
        matches!(self.expires_at, Some(deadline) if now >= deadline)
    }

    pub fn remaining(&self, now: Instant) -> Option<Duration> {
        self.expires_at.map(|deadline| deadline.saturating_duration_since(now))
    }
}

/// Resolution of a key's remaining time to live
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TtlStatus {
    /// The key is not present (or already expired)
    Absent,

    /// The key is present and never expires
    NoExpiry,

    /// The key is present and expires after this duration
    Remaining(Duration),
}

/// Point-in-time cache statistics
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheStats {
    /// Number of live entries
    pub total_entries: usize,

    /// Number of lookups that found a live entry
    pub total_hits: u64,

    /// Number of lookups that found nothing
    pub total_misses: u64,

    /// Hit percentage over all lookups, rounded to two decimals.
    /// Zero when no lookup has happened yet.
    pub hit_rate: f64,

    /// Estimated memory usage
    pub memory: CacheMemoryStats,
}

/// Estimated memory footprint of the cache
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheMemoryStats {
    /// Number of entries contributing to the estimate
    pub entries: usize,

    /// Sum of per-entry charges in bytes
    pub estimated_bytes: usize,
}
