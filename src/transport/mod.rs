//! Outbound transport clients and their registry
//!
//! This module connects the service to remote microservices over several
//! wire protocols behind one client trait. The manager owns the registry;
//! callers address a transport by name and never touch protocol details.
//!
//! # Features
//!
//! - **Uniform Client Trait**: `connect`, `close`, `send` and `emit` across protocols
//! - **Four Protocols**: TCP, Redis pub/sub, NATS and RabbitMQ adapters
//! - **Tolerant Startup**: Failed connections register as disconnected instead of failing
//! - **Local Rejection**: Unregistered or disconnected transports fail before the network
//! - **Best-Effort Teardown**: Concurrent close with errors logged, never raised
//!
//! # Example
//!
//! ```no_run
//! use backplane::transport::{TransportManager, TransportsConfig};
//! use serde_json::json;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut config = TransportsConfig::default();
//!     config.nats.enabled = true;
//!
//!     let manager = TransportManager::new(config);
//!     manager.initialize().await;
//!
//!     let reply = manager
//!         .send("users.get", json!({"id": 7}), "nats")
//!         .await?;
//!     println!("reply: {}", reply);
//!
//!     manager.destroy().await;
//!     Ok(())
//! }
//! ```

mod client;
mod config;
mod error;
mod manager;
mod nats;
mod rabbitmq;
mod redis;
mod tcp;

pub use client::{TransportClient, TransportKind};
pub use config::{
    NatsTransportConfig, RabbitMqTransportConfig, RedisTransportConfig, TcpTransportConfig,
    TransportsConfig,
};
pub use error::{TransportError, TransportResult};
pub use manager::{TransportManager, TransportMetrics, TransportStatus};
pub use nats::NatsTransport;
pub use rabbitmq::RabbitMqTransport;
pub use redis::RedisTransport;
pub use tcp::TcpTransport;
