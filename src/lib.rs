//! Backplane: a microservice coordination core
//!
//! Four managers behind one façade: an in-memory TTL cache, channel-based
//! streaming with fan-out subscriptions, a cron scheduler with retrying
//! jobs, and a registry of outbound transport clients (TCP, Redis, NATS,
//! RabbitMQ). External delivery goes through injected collaborators so the
//! core stays broker-agnostic.
//!
//! # Example
//!
//! ```no_run
//! use backplane::messaging::{InMemoryEventBus, InMemoryJobQueue};
//! use backplane::{BackplaneConfig, BackplaneService};
//! use serde_json::json;
//! use std::sync::Arc;
//! use tokio_stream::StreamExt;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let service = BackplaneService::new(
//!         BackplaneConfig::default(),
//!         Arc::new(InMemoryEventBus::new()),
//!         Arc::new(InMemoryJobQueue::new()),
//!     );
//!     service.on_init().await?;
//!
//!     service.cache_set("greeting", json!("hello"), None);
//!     let mut events = service.subscribe("events");
//!     service.publish("events", json!({"kind": "ping"}), None);
//!     if let Some(message) = events.next().await {
//!         println!("got {}", message.data);
//!     }
//!
//!     service.on_destroy().await;
//!     Ok(())
//! }
//! ```

pub mod cache;
pub mod config;
pub mod error;
pub mod messaging;
pub mod metrics;
pub mod scheduler;
pub mod service;
pub mod streaming;
pub mod transport;

pub use config::BackplaneConfig;
pub use error::{BackplaneError, Result};
pub use service::{BackplaneService, ServiceMetrics, ServiceState, ServiceStatus};
