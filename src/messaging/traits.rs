//! Collaborator trait abstractions
//!
//! The façade never talks to a broker or a queue backend directly. It takes
//! these traits as injected collaborators, so production can wire NATS and
//! Redis while tests wire the in-memory implementations.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::messaging::error::MessagingResult;

/// Publishes fire-and-forget events to an external message bus
#[async_trait]
pub trait EventBusPublisher: Send + Sync {
    /// Publish a message to a topic; delivery failures propagate to the caller
    async fn publish(&self, topic: &str, message: Value) -> MessagingResult<()>;
}

/// Enqueues durable background jobs on an external queue
#[async_trait]
pub trait DurableJobQueue: Send + Sync {
    /// Add a job to a named queue; enqueue failures propagate to the caller
    async fn enqueue(
        &self,
        queue: &str,
        job_name: &str,
        payload: Value,
        options: QueueJobOptions,
    ) -> MessagingResult<QueuedJob>;
}

/// Publishes per-user events, typically toward connected clients
#[async_trait]
pub trait UserEventPublisher: Send + Sync {
    async fn publish_user_event(
        &self,
        user_id: &str,
        event: &str,
        payload: Value,
    ) -> MessagingResult<()>;
}

/// Delivery options for a queued job
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QueueJobOptions {
    /// Delay before the job becomes runnable, in milliseconds
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delay_ms: Option<u64>,

    /// Maximum delivery attempts
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attempts: Option<u32>,

    /// Relative priority, lower runs first
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<u8>,
}

/// Receipt for a job accepted by the queue
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueuedJob {
    pub id: String,
    pub queue: String,
    pub name: String,
    pub enqueued_at: DateTime<Utc>,
}
