//! Transport registry and dispatch
//!
//! Owns the named transport clients. Initialization builds one client per
//! enabled transport and registers it whether or not its connection attempt
//! succeeded, so callers can observe and retry through status queries.

use std::sync::Arc;

use dashmap::DashMap;
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::metrics::BACKPLANE_METRICS;

use super::client::{TransportClient, TransportKind};
use super::config::TransportsConfig;
use super::error::{TransportError, TransportResult};
use super::nats::NatsTransport;
use super::rabbitmq::RabbitMqTransport;
use super::redis::RedisTransport;
use super::tcp::TcpTransport;

/// Registration and connection state of one transport
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransportStatus {
    pub name: String,
    pub kind: String,
    pub connected: bool,
}

/// Snapshot of the transport registry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransportMetrics {
    pub total_transports: usize,
    pub connected_transports: usize,
    pub transports: Vec<TransportStatus>,
}

/// Manages named outbound transport clients
pub struct TransportManager {
    config: TransportsConfig,
    transports: DashMap<String, Arc<dyn TransportClient>>,
}

impl TransportManager {
    pub fn new(config: TransportsConfig) -> Self {
        Self {
            config,
            transports: DashMap::new(),
        }
    }

    /// Build and connect every transport enabled in configuration
    ///
    /// A failed connection is logged and the client is registered anyway,
    /// marked disconnected.
    pub async fn initialize(&self) {
        let mut pending: Vec<(String, Arc<dyn TransportClient>)> = Vec::new();

        if self.config.tcp.enabled {
            pending.push((
                TransportKind::Tcp.to_string(),
                Arc::new(TcpTransport::new(self.config.tcp.clone())),
            ));
        }
        if self.config.redis.enabled {
            pending.push((
                TransportKind::Redis.to_string(),
                Arc::new(RedisTransport::new(self.config.redis.clone())),
            ));
        }
        if self.config.nats.enabled {
            pending.push((
                TransportKind::Nats.to_string(),
                Arc::new(NatsTransport::new(self.config.nats.clone())),
            ));
        }
        if self.config.rabbitmq.enabled {
            pending.push((
                TransportKind::RabbitMq.to_string(),
                Arc::new(RabbitMqTransport::new(self.config.rabbitmq.clone())),
            ));
        }

        let connects = pending.into_iter().map(|(name, client)| async move {
            let result = client.connect().await;
            (name, client, result)
        });

        for (name, client, result) in join_all(connects).await {
            match result {
                Ok(()) => info!(transport = %name, "Transport connected"),
                Err(e) => {
                    warn!(transport = %name, error = %e, "Transport connection failed, registered as disconnected")
                }
            }
            self.transports.insert(name, client);
        }

        self.refresh_connected_gauge();
        info!(
            total = self.transports.len(),
            connected = self.connected_transports().len(),
            "Transport manager initialized"
        );
    }

    /// Register a client under a name, replacing any previous entry
    pub fn register(&self, name: impl Into<String>, client: Arc<dyn TransportClient>) {
        let name = name.into();
        if self.transports.insert(name.clone(), client).is_some() {
            debug!(transport = %name, "Replaced registered transport");
        }
        self.refresh_connected_gauge();
    }

    /// Remove a client from the registry without closing it
    pub fn unregister(&self, name: &str) -> bool {
        let removed = self.transports.remove(name).is_some();
        self.refresh_connected_gauge();
        removed
    }

    /// Request/reply through the named transport
    pub async fn send(
        &self,
        pattern: &str,
        payload: Value,
        transport: &str,
    ) -> TransportResult<Value> {
        let client = self.lookup(transport)?;
        if !client.is_connected() {
            BACKPLANE_METRICS.record_transport_request(transport, "send", false);
            return Err(TransportError::NotConnected(transport.to_string()));
        }

        let result = client.send(pattern, payload).await;
        BACKPLANE_METRICS.record_transport_request(transport, "send", result.is_ok());
        if let Err(e) = &result {
            warn!(transport = %transport, pattern = %pattern, error = %e, "Transport send failed");
        }
        result
    }

    /// Fire-and-forget through the named transport
    pub async fn emit(
        &self,
        pattern: &str,
        payload: Value,
        transport: &str,
    ) -> TransportResult<()> {
        let client = self.lookup(transport)?;
        if !client.is_connected() {
            BACKPLANE_METRICS.record_transport_request(transport, "emit", false);
            return Err(TransportError::NotConnected(transport.to_string()));
        }

        let result = client.emit(pattern, payload).await;
        BACKPLANE_METRICS.record_transport_request(transport, "emit", result.is_ok());
        if let Err(e) = &result {
            warn!(transport = %transport, pattern = %pattern, error = %e, "Transport emit failed");
        }
        result
    }

    /// Registered transport names, not necessarily connected
    pub fn transport_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.transports.iter().map(|e| e.key().clone()).collect();
        names.sort();
        names
    }

    /// Clients that currently hold a live connection
    pub fn connected_transports(&self) -> Vec<Arc<dyn TransportClient>> {
        self.transports
            .iter()
            .filter(|e| e.value().is_connected())
            .map(|e| e.value().clone())
            .collect()
    }

    /// Per-transport registration and connection state
    pub fn transport_status(&self) -> Vec<TransportStatus> {
        let mut statuses: Vec<TransportStatus> = self
            .transports
            .iter()
            .map(|e| TransportStatus {
                name: e.key().clone(),
                kind: e.value().kind().to_string(),
                connected: e.value().is_connected(),
            })
            .collect();
        statuses.sort_by(|a, b| a.name.cmp(&b.name));
        statuses
    }

    /// Close every registered client concurrently
    ///
    /// Failures are logged, never raised. The registry is left empty.
    pub async fn destroy(&self) {
        let clients: Vec<(String, Arc<dyn TransportClient>)> = self
            .transports
            .iter()
            .map(|e| (e.key().clone(), e.value().clone()))
            .collect();

        let closes = clients.into_iter().map(|(name, client)| async move {
            if let Err(e) = client.close().await {
                warn!(transport = %name, error = %e, "Transport close failed");
            } else {
                debug!(transport = %name, "Transport closed");
            }
        });
        join_all(closes).await;

        self.transports.clear();
        self.refresh_connected_gauge();
        info!("Transport manager destroyed");
    }

    /// Registry snapshot
    pub fn metrics(&self) -> TransportMetrics {
        let transports = self.transport_status();
        let connected = transports.iter().filter(|t| t.connected).count();
        TransportMetrics {
            total_transports: transports.len(),
            connected_transports: connected,
            transports,
        }
    }

    fn lookup(&self, name: &str) -> TransportResult<Arc<dyn TransportClient>> {
        self.transports
            .get(name)
            .map(|e| e.value().clone())
            .ok_or_else(|| TransportError::NotRegistered(name.to_string()))
    }

    fn refresh_connected_gauge(&self) {
        let connected = self
            .transports
            .iter()
            .filter(|e| e.value().is_connected())
            .count();
        BACKPLANE_METRICS.transports_connected.set(connected as f64);
    }
}
