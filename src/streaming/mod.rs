//! Named channel streaming with manual fan-out
//!
//! This module provides in-process pub/sub over named channels. Each
//! subscriber owns an unbounded receiver; publishing walks the current
//! subscriber list and delivers to everyone present at that moment.
//!
//! # Features
//!
//! - **Named Channels**: Created up front from config or on demand
//! - **At-Most-Once Delivery**: No replay; late subscribers miss earlier messages
//! - **Drop To Unsubscribe**: Dropping a [`Subscription`] detaches it immediately
//! - **Filtered Views**: Predicate and source-scoped subscriptions
//! - **Observability**: Per-channel counters and Prometheus gauges
//!
//! # Example
//!
//! ```no_run
//! use backplane::streaming::{StreamingConfig, StreamingManager};
//! use serde_json::json;
//! use tokio_stream::StreamExt;
//!
//! #[tokio::main]
//! async fn main() {
//!     let streaming = StreamingManager::new(StreamingConfig::default());
//!     streaming.initialize().await;
//!
//!     let mut sub = streaming.subscribe("events");
//!     streaming.publish("events", json!({"kind": "ping"}), Some("demo"));
//!
//!     if let Some(message) = sub.next().await {
//!         println!("got {}", message.data);
//!     }
//! }
//! ```

mod config;
mod manager;
mod message;

pub use config::StreamingConfig;
pub use manager::{ChannelMetrics, StreamingManager, StreamingMetrics, Subscription};
pub use message::{DEFAULT_SOURCE, StreamMessage};
