use serde::{Deserialize, Serialize};

use crate::cache::CacheConfig;
use crate::scheduler::SchedulerConfig;
use crate::streaming::StreamingConfig;
use crate::transport::TransportsConfig;

/// Main application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BackplaneConfig {
    /// Cache configuration
    #[serde(default)]
    pub cache: CacheConfig,

    /// Streaming configuration
    #[serde(default)]
    pub streaming: StreamingConfig,

    /// Scheduler configuration
    #[serde(default)]
    pub scheduler: SchedulerConfig,

    /// Transport configurations
    #[serde(default)]
    pub transports: TransportsConfig,

    /// External collaborator configuration
    #[serde(default)]
    pub messaging: MessagingConfig,

    /// Observability configuration
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

impl BackplaneConfig {
    /// Load configuration from file and environment
    pub fn load() -> Result<Self, config::ConfigError> {
        let config_path =
            std::env::var("CONFIG_PATH").unwrap_or_else(|_| "config/default.toml".to_string());

        config::Config::builder()
            // Start with default values
            .add_source(config::File::from_str(
                include_str!("../config/default.toml"),
                config::FileFormat::Toml,
            ))
            // Override with config file if it exists
            .add_source(config::File::with_name(&config_path).required(false))
            // Override with environment variables (prefix: BACKPLANE_)
            .add_source(
                config::Environment::with_prefix("BACKPLANE")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()
    }
}

/// Configuration for the external event bus and job queue
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MessagingConfig {
    /// Event bus settings
    #[serde(default)]
    pub event_bus: EventBusConfig,

    /// Job queue settings
    #[serde(default)]
    pub job_queue: JobQueueConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventBusConfig {
    /// Connect to a real bus instead of the in-memory recorder
    #[serde(default)]
    pub enabled: bool,

    /// NATS server URLs
    #[serde(default = "default_bus_servers")]
    pub servers: Vec<String>,
}

impl Default for EventBusConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            servers: default_bus_servers(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobQueueConfig {
    /// Connect to a real queue instead of the in-memory recorder
    #[serde(default)]
    pub enabled: bool,

    /// Redis connection string
    #[serde(default = "default_queue_url")]
    pub url: String,

    /// Queue key prefix
    #[serde(default = "default_queue_prefix")]
    pub prefix: String,
}

impl Default for JobQueueConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            url: default_queue_url(),
            prefix: default_queue_prefix(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    /// Log level
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Enable JSON logging
    #[serde(default)]
    pub json_logs: bool,

    /// Service name
    #[serde(default = "default_service_name")]
    pub service_name: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            json_logs: false,
            service_name: default_service_name(),
        }
    }
}

fn default_bus_servers() -> Vec<String> {
    vec!["nats://localhost:4222".to_string()]
}

fn default_queue_url() -> String {
    "redis://127.0.0.1:6379".to_string()
}

fn default_queue_prefix() -> String {
    "queue".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_service_name() -> String {
    "backplane".to_string()
}
