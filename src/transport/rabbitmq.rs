//! RabbitMQ transport client
//!
//! Requests go to the configured queue with RabbitMQ's direct reply-to
//! (`amq.rabbitmq.reply-to`) carrying the response back. The reply consumer
//! must exist in no-ack mode before the request is published, per the
//! broker's direct reply-to contract.

use std::sync::Arc;

use futures::StreamExt;
use lapin::options::{BasicCancelOptions, BasicConsumeOptions, BasicPublishOptions};
use lapin::types::FieldTable;
use lapin::{BasicProperties, Channel, Connection, ConnectionProperties};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use async_trait::async_trait;
use uuid::Uuid;

use super::client::{TransportClient, TransportKind};
use super::config::RabbitMqTransportConfig;
use super::error::{TransportError, TransportResult};

const REPLY_TO_QUEUE: &str = "amq.rabbitmq.reply-to";

#[derive(Debug, Serialize)]
struct RabbitMqRequest<'a> {
    id: &'a str,
    pattern: &'a str,
    data: &'a Value,
}

#[derive(Debug, Serialize)]
struct RabbitMqEvent<'a> {
    pattern: &'a str,
    data: &'a Value,
}

#[derive(Debug, Deserialize)]
struct RabbitMqResponse {
    #[serde(default)]
    response: Value,
    #[serde(default)]
    err: Option<String>,
}

/// Request/reply client over an AMQP channel
pub struct RabbitMqTransport {
    config: RabbitMqTransportConfig,
    connection: RwLock<Option<Arc<Connection>>>,
    channel: RwLock<Option<Channel>>,
}

impl RabbitMqTransport {
    pub fn new(config: RabbitMqTransportConfig) -> Self {
        Self {
            config,
            connection: RwLock::new(None),
            channel: RwLock::new(None),
        }
    }

    fn channel(&self) -> TransportResult<Channel> {
        self.channel
            .read()
            .clone()
            .ok_or_else(|| TransportError::NotConnected(TransportKind::RabbitMq.to_string()))
    }
}

#[async_trait]
impl TransportClient for RabbitMqTransport {
    fn kind(&self) -> TransportKind {
        TransportKind::RabbitMq
    }

    async fn connect(&self) -> TransportResult<()> {
        let connection = Connection::connect(&self.config.url, ConnectionProperties::default())
            .await
            .map_err(|e| {
                TransportError::ConnectionFailed(format!("RabbitMQ connection failed: {}", e))
            })?;

        let channel = connection.create_channel().await.map_err(|e| {
            TransportError::ConnectionFailed(format!("RabbitMQ channel failed: {}", e))
        })?;

        *self.connection.write() = Some(Arc::new(connection));
        *self.channel.write() = Some(channel);

        debug!(url = %self.config.url, queue = %self.config.queue, "RabbitMQ transport connected");
        Ok(())
    }

    fn is_connected(&self) -> bool {
        match self.connection.read().as_ref() {
            Some(connection) => connection.status().connected(),
            None => false,
        }
    }

    async fn close(&self) -> TransportResult<()> {
        self.channel.write().take();
        let connection = self.connection.write().take();
        if let Some(connection) = connection {
            if let Err(e) = connection.close(200, "shutting down").await {
                warn!(error = %e, "RabbitMQ close failed");
            }
        }
        Ok(())
    }

    async fn send(&self, pattern: &str, payload: Value) -> TransportResult<Value> {
        let channel = self.channel()?;

        let mut consumer = channel
            .basic_consume(
                REPLY_TO_QUEUE,
                "",
                BasicConsumeOptions {
                    no_ack: true,
                    ..Default::default()
                },
                FieldTable::default(),
            )
            .await
            .map_err(|e| {
                TransportError::RequestFailed(format!("RabbitMQ reply consumer failed: {}", e))
            })?;

        let id = Uuid::new_v4().to_string();
        let request = serde_json::to_vec(&RabbitMqRequest {
            id: &id,
            pattern,
            data: &payload,
        })?;

        let properties = BasicProperties::default()
            .with_reply_to(REPLY_TO_QUEUE.into())
            .with_correlation_id(id.as_str().into());

        channel
            .basic_publish(
                "",
                &self.config.queue,
                BasicPublishOptions::default(),
                &request,
                properties,
            )
            .await
            .map_err(|e| {
                TransportError::RequestFailed(format!("RabbitMQ publish failed: {}", e))
            })?
            .await
            .map_err(|e| {
                TransportError::RequestFailed(format!("RabbitMQ publish failed: {}", e))
            })?;

        let result = loop {
            let delivery = match consumer.next().await {
                Some(Ok(delivery)) => delivery,
                Some(Err(e)) => {
                    break Err(TransportError::RequestFailed(format!(
                        "RabbitMQ reply stream failed: {}",
                        e
                    )));
                }
                None => {
                    break Err(TransportError::RequestFailed(
                        "RabbitMQ reply stream closed".to_string(),
                    ));
                }
            };

            let correlation = delivery
                .properties
                .correlation_id()
                .as_ref()
                .map(|s| s.as_str());
            if correlation != Some(id.as_str()) {
                debug!(want = %id, "skipping reply for another request");
                continue;
            }

            let response: RabbitMqResponse = match serde_json::from_slice(&delivery.data) {
                Ok(r) => r,
                Err(e) => {
                    break Err(TransportError::RequestFailed(format!(
                        "unparseable RabbitMQ reply: {}",
                        e
                    )));
                }
            };
            if let Some(err) = response.err {
                break Err(TransportError::RequestFailed(err));
            }
            break Ok(response.response);
        };

        let tag = consumer.tag();
        if let Err(e) = channel
            .basic_cancel(tag.as_str(), BasicCancelOptions::default())
            .await
        {
            warn!(error = %e, "RabbitMQ reply consumer cancel failed");
        }

        result
    }

    async fn emit(&self, pattern: &str, payload: Value) -> TransportResult<()> {
        let channel = self.channel()?;

        let event = serde_json::to_vec(&RabbitMqEvent {
            pattern,
            data: &payload,
        })?;
        channel
            .basic_publish(
                "",
                &self.config.queue,
                BasicPublishOptions::default(),
                &event,
                BasicProperties::default(),
            )
            .await
            .map_err(|e| {
                TransportError::RequestFailed(format!("RabbitMQ publish failed: {}", e))
            })?
            .await
            .map_err(|e| {
                TransportError::RequestFailed(format!("RabbitMQ publish failed: {}", e))
            })?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_send_without_connection_rejects() {
        let transport = RabbitMqTransport::new(RabbitMqTransportConfig::default());
        assert!(!transport.is_connected());
        let result = transport.send("orders.create", json!({"sku": "a1"})).await;
        assert!(matches!(result, Err(TransportError::NotConnected(_))));
    }

    #[test]
    fn test_response_defaults() {
        let response: RabbitMqResponse = serde_json::from_str("{}").unwrap();
        assert!(response.err.is_none());
        assert_eq!(response.response, Value::Null);
    }
}
