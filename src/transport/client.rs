//! Transport client abstraction
//!
//! Every concrete transport (TCP, Redis, NATS, RabbitMQ) implements
//! [`TransportClient`], so the manager can treat them uniformly.

use async_trait::async_trait;
use serde_json::Value;
use strum_macros::{Display, EnumString};

use super::error::TransportResult;

/// Identifies a concrete transport implementation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum TransportKind {
    Tcp,
    Redis,
    Nats,
    RabbitMq,
}

/// A client connection to one remote microservice transport
///
/// `send` is request/response: it delivers the payload under `pattern` and
/// resolves with the remote reply. `emit` is fire-and-forget: it delivers
/// the payload and resolves as soon as the transport has accepted it.
#[async_trait]
pub trait TransportClient: Send + Sync {
    /// Which transport this client speaks
    fn kind(&self) -> TransportKind;

    /// Establish the underlying connection
    async fn connect(&self) -> TransportResult<()>;

    /// Whether the client currently holds a live connection
    fn is_connected(&self) -> bool;

    /// Tear down the underlying connection
    async fn close(&self) -> TransportResult<()>;

    /// Send a request and wait for the remote response
    async fn send(&self, pattern: &str, payload: Value) -> TransportResult<Value>;

    /// Publish an event without waiting for a response
    async fn emit(&self, pattern: &str, payload: Value) -> TransportResult<()>;
}
