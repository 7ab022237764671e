//! NATS event bus implementation

use async_nats::Client;
use serde_json::Value;
use tracing::debug;

use async_trait::async_trait;

use crate::messaging::error::{MessagingError, MessagingResult};
use crate::messaging::traits::EventBusPublisher;

/// Event bus backed by a NATS connection
pub struct NatsEventBus {
    client: Client,
}

impl NatsEventBus {
    /// Connect to one or more NATS servers
    pub async fn connect(servers: &[String]) -> MessagingResult<Self> {
        let client = async_nats::connect(servers.join(",").as_str())
            .await
            .map_err(|e| {
                MessagingError::ConnectionFailed(format!("NATS connection failed: {}", e))
            })?;
        Ok(Self { client })
    }

    /// Wrap an already connected client
    pub fn from_client(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl EventBusPublisher for NatsEventBus {
    async fn publish(&self, topic: &str, message: Value) -> MessagingResult<()> {
        let payload = serde_json::to_vec(&message)?;

        self.client
            .publish(topic.to_string(), payload.into())
            .await
            .map_err(|e| MessagingError::PublishFailed(format!("NATS publish failed: {}", e)))?;

        debug!(topic = %topic, "Published to NATS");
        Ok(())
    }
}
