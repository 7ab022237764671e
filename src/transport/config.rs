//! Transport configuration

use serde::{Deserialize, Serialize};

/// Configuration for all built-in transports
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TransportsConfig {
    /// TCP transport
    #[serde(default)]
    pub tcp: TcpTransportConfig,

    /// Redis pub/sub transport
    #[serde(default)]
    pub redis: RedisTransportConfig,

    /// NATS transport
    #[serde(default)]
    pub nats: NatsTransportConfig,

    /// RabbitMQ transport
    #[serde(default)]
    pub rabbitmq: RabbitMqTransportConfig,
}

/// TCP transport configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TcpTransportConfig {
    /// Whether this transport is registered during initialization
    pub enabled: bool,

    /// Remote host
    pub host: String,

    /// Remote port
    pub port: u16,
}

impl Default for TcpTransportConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            host: "127.0.0.1".to_string(),
            port: 4000,
        }
    }
}

/// Redis transport configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedisTransportConfig {
    /// Whether this transport is registered during initialization
    pub enabled: bool,

    /// Redis connection string
    pub url: String,
}

impl Default for RedisTransportConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            url: "redis://127.0.0.1:6379".to_string(),
        }
    }
}

/// NATS transport configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NatsTransportConfig {
    /// Whether this transport is registered during initialization
    pub enabled: bool,

    /// NATS server URLs
    pub servers: Vec<String>,

    /// Connection name reported to the server
    pub connection_name: String,
}

impl Default for NatsTransportConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            servers: vec!["nats://localhost:4222".to_string()],
            connection_name: "backplane".to_string(),
        }
    }
}

/// RabbitMQ transport configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RabbitMqTransportConfig {
    /// Whether this transport is registered during initialization
    pub enabled: bool,

    /// AMQP connection string
    pub url: String,

    /// Queue all requests and events are published to
    pub queue: String,
}

impl Default for RabbitMqTransportConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            url: "amqp://127.0.0.1:5672".to_string(),
            queue: "backplane_queue".to_string(),
        }
    }
}
