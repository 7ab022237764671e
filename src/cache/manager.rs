//! Cache manager: bounded TTL store with hit/miss accounting

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::{Mutex, RwLock};
use serde_json::Value;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::config::CacheConfig;
use super::entry::{CacheEntry, CacheMemoryStats, CacheStats, TtlStatus};
use crate::metrics::BACKPLANE_METRICS;

/// Internal store, guarded by a single lock
#[derive(Debug, Default)]
struct CacheStore {
    entries: HashMap<String, CacheEntry>,
    next_seq: u64,
    hits: u64,
    misses: u64,
}

impl CacheStore {
    /// Remove every expired entry, returning how many were dropped
    fn sweep(&mut self, now: Instant) -> usize {
        let expired: Vec<String> = self
            .entries
            .iter()
            .filter(|(_, entry)| entry.is_expired(now))
            .map(|(key, _)| key.clone())
            .collect();
        for key in &expired {
            self.entries.remove(key);
        }
        expired.len()
    }

    /// Key of the oldest live entry by insertion sequence
    fn oldest_key(&self) -> Option<String> {
        self.entries
            .iter()
            .min_by_key(|(_, entry)| entry.seq)
            .map(|(key, _)| key.clone())
    }
}

/// Bounded TTL cache over JSON values.
///
/// All data operations are synchronous; locks are held only for the duration
/// of the map access. A background sweeper drops expired entries between
/// accesses once [`CacheManager::initialize`] has run.
pub struct CacheManager {
    config: CacheConfig,
    store: Arc<RwLock<CacheStore>>,
    sweeper: Mutex<Option<JoinHandle<()>>>,
}

impl CacheManager {
    /// Create a new cache manager. No background work starts until
    /// [`CacheManager::initialize`] is called.
    pub fn new(config: CacheConfig) -> Self {
        Self {
            config,
            store: Arc::new(RwLock::new(CacheStore::default())),
            sweeper: Mutex::new(None),
        }
    }

    /// Start the background expiry sweeper. Idempotent.
    pub async fn initialize(&self) {
        if !self.config.enabled {
            info!("Cache manager disabled");
            return;
        }

        let mut guard = self.sweeper.lock();
        if guard.is_some() {
            warn!("Cache manager already initialized");
            return;
        }

        if self.config.sweep_interval_ms == 0 {
            info!(
                max_entries = self.config.max_entries,
                "Cache manager initialized without background sweeper"
            );
            return;
        }

        let store = Arc::clone(&self.store);
        let interval = Duration::from_millis(self.config.sweep_interval_ms);
        *guard = Some(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                ticker.tick().await;
                let (removed, remaining) = {
                    let mut store = store.write();
                    let removed = store.sweep(Instant::now());
                    (removed, store.entries.len())
                };
                if removed > 0 {
                    BACKPLANE_METRICS.cache_entries.set(remaining as f64);
                    debug!(removed, "Swept expired cache entries");
                }
            }
        }));

        info!(
            max_entries = self.config.max_entries,
            sweep_interval_ms = self.config.sweep_interval_ms,
            default_ttl_ms = ?self.config.default_ttl_ms,
            "Cache manager initialized"
        );
    }

    /// Stop the sweeper and drop all entries.
    pub async fn shutdown(&self) {
        if let Some(handle) = self.sweeper.lock().take() {
            handle.abort();
        }
        let dropped = {
            let mut store = self.store.write();
            let count = store.entries.len();
            store.entries.clear();
            count
        };
        BACKPLANE_METRICS.cache_entries.set(0.0);
        info!(entries_dropped = dropped, "Cache manager shut down");
    }

    /// Store a value. `ttl` falls back to the configured default when absent;
    /// entries without either never expire. Writing a key that already exists
    /// replaces the entry and refreshes its insertion order. Inserting a new
    /// key at capacity evicts the oldest entry first.
    pub fn set(&self, key: &str, value: Value, ttl: Option<Duration>) {
        if !self.config.enabled {
            return;
        }

        let ttl = ttl.or_else(|| self.config.default_ttl_ms.map(Duration::from_millis));

        let (evicted, len) = {
            let mut store = self.store.write();
            let replacing = store.entries.remove(key).is_some();

            let mut evicted = false;
            if !replacing && store.entries.len() >= self.config.max_entries {
                if let Some(oldest) = store.oldest_key() {
                    store.entries.remove(&oldest);
                    evicted = true;
                    debug!(key = %oldest, "Evicted oldest cache entry");
                }
            }

            let seq = store.next_seq;
            store.next_seq += 1;
            store
                .entries
                .insert(key.to_string(), CacheEntry::new(key, value, seq, ttl));
            (evicted, store.entries.len())
        };

        BACKPLANE_METRICS.record_cache_set(evicted);
        BACKPLANE_METRICS.cache_entries.set(len as f64);
    }

    /// Look up a value. Counts a hit or a miss; an expired entry is removed
    /// and counted as a miss.
    pub fn get(&self, key: &str) -> Option<Value> {
        if !self.config.enabled {
            return None;
        }

        let now = Instant::now();
        let result = {
            let mut guard = self.store.write();
            let store = &mut *guard;

            let expired = matches!(store.entries.get(key), Some(entry) if entry.is_expired(now));
            if expired {
                store.entries.remove(key);
            }

            match store.entries.get_mut(key) {
                Some(entry) => {
                    entry.hit_count += 1;
                    store.hits += 1;
                    Some(entry.value.clone())
                }
                None => {
                    store.misses += 1;
                    None
                }
            }
        };

        BACKPLANE_METRICS.record_cache_get(result.is_some());
        result
    }

    /// Whether a live entry exists. Never touches the hit/miss counters.
    pub fn has(&self, key: &str) -> bool {
        if !self.config.enabled {
            return false;
        }

        let now = Instant::now();
        let mut store = self.store.write();
        let expired = matches!(store.entries.get(key), Some(entry) if entry.is_expired(now));
        if expired {
            store.entries.remove(key);
        }
        store.entries.contains_key(key)
    }

    /// Remove a key. Returns whether an entry was present.
    pub fn delete(&self, key: &str) -> bool {
        let (removed, len) = {
            let mut store = self.store.write();
            let removed = store.entries.remove(key).is_some();
            (removed, store.entries.len())
        };
        if removed {
            BACKPLANE_METRICS.cache_entries.set(len as f64);
        }
        removed
    }

    /// Drop every entry. Counters are preserved.
    pub fn clear(&self) {
        let dropped = {
            let mut store = self.store.write();
            let count = store.entries.len();
            store.entries.clear();
            count
        };
        BACKPLANE_METRICS.cache_entries.set(0.0);
        debug!(entries_dropped = dropped, "Cache cleared");
    }

    /// List live keys, dropping any expired entries found on the way.
    pub fn keys(&self) -> Vec<String> {
        let mut store = self.store.write();
        store.sweep(Instant::now());
        store.entries.keys().cloned().collect()
    }

    /// Number of live entries.
    pub fn size(&self) -> usize {
        let mut store = self.store.write();
        store.sweep(Instant::now());
        store.entries.len()
    }

    /// Return the cached value for `key`, or run `factory`, cache its result
    /// and return it. Factory errors propagate and nothing is cached.
    pub async fn get_or_set<F, Fut, E>(
        &self,
        key: &str,
        ttl: Option<Duration>,
        factory: F,
    ) -> Result<Value, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Value, E>>,
    {
        if let Some(value) = self.get(key) {
            return Ok(value);
        }
        let value = factory().await?;
        self.set(key, value.clone(), ttl);
        Ok(value)
    }

    /// Look up several keys; each lookup counts independently.
    pub fn mget(&self, keys: &[&str]) -> Vec<Option<Value>> {
        keys.iter().map(|key| self.get(key)).collect()
    }

    /// Store several entries; each write applies independently.
    pub fn mset(&self, entries: Vec<(&str, Value, Option<Duration>)>) {
        for (key, value, ttl) in entries {
            self.set(key, value, ttl);
        }
    }

    /// Remove several keys, returning how many were present.
    pub fn mdelete(&self, keys: &[&str]) -> usize {
        keys.iter().filter(|key| self.delete(key)).count()
    }

    /// Reset the TTL of a live entry. Returns false when the key is absent
    /// or already expired.
    pub fn expire(&self, key: &str, ttl: Duration) -> bool {
        let now = Instant::now();
        let mut store = self.store.write();

        let expired = matches!(store.entries.get(key), Some(entry) if entry.is_expired(now));
        if expired {
            store.entries.remove(key);
            return false;
        }

        match store.entries.get_mut(key) {
            Some(entry) => {
                entry.expires_at = Some(now + ttl);
                true
            }
            None => false,
        }
    }

    /// Remaining time to live for a key, distinguishing a missing key from
    /// one that never expires.
    pub fn ttl(&self, key: &str) -> TtlStatus {
        let now = Instant::now();
        let mut store = self.store.write();

        let expired = matches!(store.entries.get(key), Some(entry) if entry.is_expired(now));
        if expired {
            store.entries.remove(key);
            return TtlStatus::Absent;
        }

        match store.entries.get(key) {
            Some(entry) => match entry.remaining(now) {
                Some(remaining) => TtlStatus::Remaining(remaining),
                None => TtlStatus::NoExpiry,
            },
            None => TtlStatus::Absent,
        }
    }

    /// Run one expiry sweep immediately, returning the number of entries
    /// removed.
    pub fn sweep_now(&self) -> usize {
        let (removed, len) = {
            let mut store = self.store.write();
            let removed = store.sweep(Instant::now());
            (removed, store.entries.len())
        };
        if removed > 0 {
            BACKPLANE_METRICS.cache_entries.set(len as f64);
            debug!(removed, "Swept expired cache entries");
        }
        removed
    }

    /// Snapshot of entry count, lookup counters and the memory estimate.
    pub fn stats(&self) -> CacheStats {
        let mut store = self.store.write();
        store.sweep(Instant::now());

        let total = store.hits + store.misses;
        let hit_rate = if total == 0 {
            0.0
        } else {
            (store.hits as f64 / total as f64 * 100.0 * 100.0).round() / 100.0
        };

        CacheStats {
            total_entries: store.entries.len(),
            total_hits: store.hits,
            total_misses: store.misses,
            hit_rate,
            memory: CacheMemoryStats {
                entries: store.entries.len(),
                estimated_bytes: store.entries.values().map(|entry| entry.charge).sum(),
            },
        }
    }
}
