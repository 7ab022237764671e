//! NATS transport client
//!
//! Uses native NATS request/reply, so no correlation bookkeeping is needed:
//! the server routes each reply to the request's inbox.

use async_nats::connection::State;
use async_nats::Client;
use parking_lot::RwLock;
use serde_json::Value;
use tracing::debug;

use async_trait::async_trait;

use super::client::{TransportClient, TransportKind};
use super::config::NatsTransportConfig;
use super::error::{TransportError, TransportResult};

/// Request/reply client over a NATS connection
pub struct NatsTransport {
    config: NatsTransportConfig,
    client: RwLock<Option<Client>>,
}

impl NatsTransport {
    pub fn new(config: NatsTransportConfig) -> Self {
        Self {
            config,
            client: RwLock::new(None),
        }
    }

    fn client(&self) -> TransportResult<Client> {
        self.client
            .read()
            .clone()
            .ok_or_else(|| TransportError::NotConnected(TransportKind::Nats.to_string()))
    }
}

#[async_trait]
impl TransportClient for NatsTransport {
    fn kind(&self) -> TransportKind {
        TransportKind::Nats
    }

    async fn connect(&self) -> TransportResult<()> {
        let servers = self.config.servers.join(",");
        let client = async_nats::ConnectOptions::new()
            .name(&self.config.connection_name)
            .connect(&servers)
            .await
            .map_err(|e| {
                TransportError::ConnectionFailed(format!("NATS connection failed: {}", e))
            })?;

        *self.client.write() = Some(client);
        debug!(servers = %servers, "NATS transport connected");
        Ok(())
    }

    fn is_connected(&self) -> bool {
        match self.client.read().as_ref() {
            Some(client) => client.connection_state() == State::Connected,
            None => false,
        }
    }

    async fn close(&self) -> TransportResult<()> {
        // The NATS client closes automatically on drop.
        self.client.write().take();
        Ok(())
    }

    async fn send(&self, pattern: &str, payload: Value) -> TransportResult<Value> {
        let client = self.client()?;

        let body = serde_json::to_vec(&payload)?;
        let reply = client
            .request(pattern.to_string(), body.into())
            .await
            .map_err(|e| TransportError::RequestFailed(format!("NATS request failed: {}", e)))?;

        if reply.payload.is_empty() {
            return Ok(Value::Null);
        }
        match serde_json::from_slice(&reply.payload) {
            Ok(value) => Ok(value),
            // Plain-text replies are valid NATS; surface them as strings.
            Err(_) => Ok(Value::String(
                String::from_utf8_lossy(&reply.payload).into_owned(),
            )),
        }
    }

    async fn emit(&self, pattern: &str, payload: Value) -> TransportResult<()> {
        let client = self.client()?;

        let body = serde_json::to_vec(&payload)?;
        client
            .publish(pattern.to_string(), body.into())
            .await
            .map_err(|e| TransportError::RequestFailed(format!("NATS publish failed: {}", e)))?;
        Ok(())
    }
}
