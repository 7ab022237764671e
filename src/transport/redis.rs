//! Redis transport client
//!
//! Requests are published to the pattern's channel and answered on a
//! `<pattern>.reply` channel. The reply subscription is opened before the
//! request is published so a fast responder cannot slip past it.

use std::sync::atomic::{AtomicBool, Ordering};

use futures::StreamExt;
use parking_lot::RwLock;
use redis::aio::ConnectionManager;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use async_trait::async_trait;
use uuid::Uuid;

use super::client::{TransportClient, TransportKind};
use super::config::RedisTransportConfig;
use super::error::{TransportError, TransportResult};

#[derive(Debug, Serialize)]
struct RedisRequest<'a> {
    id: &'a str,
    pattern: &'a str,
    data: &'a Value,
}

#[derive(Debug, Serialize)]
struct RedisEvent<'a> {
    pattern: &'a str,
    data: &'a Value,
}

#[derive(Debug, Deserialize)]
struct RedisResponse {
    id: String,
    #[serde(default)]
    response: Value,
    #[serde(default)]
    err: Option<String>,
}

/// Request/reply client over Redis pub/sub
pub struct RedisTransport {
    config: RedisTransportConfig,
    client: RwLock<Option<redis::Client>>,
    manager: RwLock<Option<ConnectionManager>>,
    connected: AtomicBool,
}

impl RedisTransport {
    pub fn new(config: RedisTransportConfig) -> Self {
        Self {
            config,
            client: RwLock::new(None),
            manager: RwLock::new(None),
            connected: AtomicBool::new(false),
        }
    }

    fn publisher(&self) -> TransportResult<ConnectionManager> {
        self.manager
            .read()
            .clone()
            .ok_or_else(|| TransportError::NotConnected(TransportKind::Redis.to_string()))
    }

    fn subscriber_client(&self) -> TransportResult<redis::Client> {
        self.client
            .read()
            .clone()
            .ok_or_else(|| TransportError::NotConnected(TransportKind::Redis.to_string()))
    }
}

#[async_trait]
impl TransportClient for RedisTransport {
    fn kind(&self) -> TransportKind {
        TransportKind::Redis
    }

    async fn connect(&self) -> TransportResult<()> {
        let client = redis::Client::open(self.config.url.as_str()).map_err(|e| {
            TransportError::ConnectionFailed(format!("invalid redis url: {}", e))
        })?;

        let mut manager = ConnectionManager::new(client.clone()).await.map_err(|e| {
            TransportError::ConnectionFailed(format!("redis connect failed: {}", e))
        })?;

        // Verify the connection actually works before declaring it healthy.
        let _: String = redis::cmd("PING")
            .query_async(&mut manager)
            .await
            .map_err(|e| {
                TransportError::ConnectionFailed(format!("redis ping failed: {}", e))
            })?;

        *self.client.write() = Some(client);
        *self.manager.write() = Some(manager);
        self.connected.store(true, Ordering::SeqCst);

        debug!(url = %self.config.url, "Redis transport connected");
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    async fn close(&self) -> TransportResult<()> {
        self.manager.write().take();
        self.client.write().take();
        self.connected.store(false, Ordering::SeqCst);
        Ok(())
    }

    async fn send(&self, pattern: &str, payload: Value) -> TransportResult<Value> {
        let client = self.subscriber_client()?;
        let mut publisher = self.publisher()?;

        let reply_channel = format!("{}.reply", pattern);
        let mut pubsub = client
            .get_async_connection()
            .await
            .map_err(|e| {
                TransportError::RequestFailed(format!("redis subscriber failed: {}", e))
            })?
            .into_pubsub();
        pubsub.subscribe(&reply_channel).await.map_err(|e| {
            TransportError::RequestFailed(format!(
                "redis subscribe to {} failed: {}",
                reply_channel, e
            ))
        })?;

        let id = Uuid::new_v4().to_string();
        let request = serde_json::to_string(&RedisRequest {
            id: &id,
            pattern,
            data: &payload,
        })?;

        let _: i64 = redis::cmd("PUBLISH")
            .arg(pattern)
            .arg(&request)
            .query_async(&mut publisher)
            .await
            .map_err(|e| {
                TransportError::RequestFailed(format!("redis publish failed: {}", e))
            })?;

        let mut messages = pubsub.on_message();
        while let Some(message) = messages.next().await {
            let body: String = match message.get_payload() {
                Ok(b) => b,
                Err(e) => {
                    warn!(error = %e, "discarding non-text reply payload");
                    continue;
                }
            };
            let response: RedisResponse = match serde_json::from_str(&body) {
                Ok(r) => r,
                Err(e) => {
                    warn!(error = %e, "discarding unparseable reply");
                    continue;
                }
            };
            if response.id != id {
                debug!(got = %response.id, want = %id, "skipping reply for another request");
                continue;
            }
            if let Some(err) = response.err {
                return Err(TransportError::RequestFailed(err));
            }
            return Ok(response.response);
        }

        Err(TransportError::RequestFailed(
            "redis reply subscription closed".to_string(),
        ))
    }

    async fn emit(&self, pattern: &str, payload: Value) -> TransportResult<()> {
        let mut publisher = self.publisher()?;

        let event = serde_json::to_string(&RedisEvent {
            pattern,
            data: &payload,
        })?;
        let _: i64 = redis::cmd("PUBLISH")
            .arg(pattern)
            .arg(&event)
            .query_async(&mut publisher)
            .await
            .map_err(|e| {
                TransportError::RequestFailed(format!("redis publish failed: {}", e))
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
        let transport = RedisTransport::new(RedisTransportConfig::default());
        assert!(!transport.is_connected());
        let result = transport.send("jobs.run", json!({})).await;
        assert!(matches!(result, Err(TransportError::NotConnected(_))));
    }

    #[tokio::test]
    async fn test_emit_without_connection_rejects() {
        let transport = RedisTransport::new(RedisTransportConfig::default());
        let result = transport.emit("jobs.done", json!({})).await;
        assert!(matches!(result, Err(TransportError::NotConnected(_))));
    }

    #[test]
    fn test_request_envelope_shape() {
        let request = RedisRequest {
            id: "abc-123",
            pattern: "math.sum",
            data: &json!({"values": [1, 2]}),
        };
        let encoded = serde_json::to_value(&request).unwrap();
        assert_eq!(encoded["id"], "abc-123");
        assert_eq!(encoded["pattern"], "math.sum");
        assert_eq!(encoded["data"]["values"][1], 2);
    }
}
