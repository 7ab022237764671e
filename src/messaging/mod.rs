//! External messaging collaborators
//!
//! The coordination core does not own a broker or a queue backend. This
//! module defines the traits the façade talks through and ships one real
//! and one in-memory implementation per trait.
//!
//! # Features
//!
//! - **Event Bus Publishing**: Fire-and-forget topics on an external bus
//! - **Durable Job Queue**: Background jobs with delay, attempts and priority
//! - **User Event Publishing**: Optional per-user event fan-out
//! - **In-Memory Doubles**: Recording implementations for tests and demos
//!
//! # Example
//!
//! ```no_run
//! use backplane::messaging::{EventBusPublisher, InMemoryEventBus};
//! use serde_json::json;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let bus = InMemoryEventBus::new();
//!     bus.publish("alerts", json!({"level": "warning"})).await?;
//!     assert_eq!(bus.published().len(), 1);
//!     Ok(())
//! }
//! ```

mod error;
mod memory;
mod nats;
mod redis_queue;
mod traits;

pub use error::{MessagingError, MessagingResult};
pub use memory::{InMemoryEventBus, InMemoryJobQueue, InMemoryUserEvents};
pub use nats::NatsEventBus;
pub use redis_queue::RedisJobQueue;
pub use traits::{
    DurableJobQueue, EventBusPublisher, QueueJobOptions, QueuedJob, UserEventPublisher,
};
