//! In-memory TTL cache with bounded capacity
//!
//! This module provides a key/value cache over JSON values with per-entry
//! expiry, oldest-first eviction and hit/miss accounting.
//!
//! # Features
//!
//! - **Per-Entry TTL**: Explicit TTL per write, falling back to a configured default
//! - **Lazy Expiry**: Expired entries are dropped on access, plus a periodic sweeper
//! - **Bounded Capacity**: Inserting beyond capacity evicts the oldest entry
//! - **Hit/Miss Accounting**: Lookup counters and a rounded hit-rate statistic
//! - **Batch Operations**: Multi-key get, set and delete helpers
//!
//! # Example
//!
//! ```no_run
//! use backplane::cache::{CacheConfig, CacheManager};
//! use serde_json::json;
//!
//! #[tokio::main]
//! async fn main() {
//!     let cache = CacheManager::new(CacheConfig::default());
//!     cache.initialize().await;
//!
//!     cache.set("user:1", json!({"name": "ada"}), None);
//!     let user = cache.get("user:1");
//!     assert!(user.is_some());
//!
//!     cache.shutdown().await;
//! }
//! ```

mod config;
mod entry;
mod manager;

pub use config::CacheConfig;
pub use entry::{CacheMemoryStats, CacheStats, TtlStatus};
pub use manager::CacheManager;
