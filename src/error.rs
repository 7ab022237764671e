use thiserror::Error;

/// Top-level error type for the coordination core
#[derive(Error, Debug)]
pub enum BackplaneError {
    /// Transport errors
    #[error("Transport error: {0}")]
    Transport(#[from] crate::transport::TransportError),

    /// Scheduler errors
    #[error("Scheduler error: {0}")]
    Scheduler(#[from] crate::scheduler::SchedulerError),

    /// Messaging collaborator errors
    #[error("Messaging error: {0}")]
    Messaging(#[from] crate::messaging::MessagingError),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Service lifecycle errors
    #[error("Lifecycle error: {0}")]
    Lifecycle(String),

    /// Internal errors
    #[error("Internal error: {0}")]
    Internal(String),
}

impl BackplaneError {
    /// Get error code string
    pub fn error_code(&self) -> &str {
        match self {
            BackplaneError::Transport(_) => "TRANSPORT_ERROR",
            BackplaneError::Scheduler(_) => "SCHEDULER_ERROR",
            BackplaneError::Messaging(_) => "MESSAGING_ERROR",
            BackplaneError::Configuration(_) => "CONFIGURATION_ERROR",
            BackplaneError::Serialization(_) => "SERIALIZATION_ERROR",
            BackplaneError::Io(_) => "IO_ERROR",
            BackplaneError::Lifecycle(_) => "LIFECYCLE_ERROR",
            BackplaneError::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

/// Conversion from serde_json::Error
impl From<serde_json::Error> for BackplaneError {
    fn from(err: serde_json::Error) -> Self {
        BackplaneError::Serialization(err.to_string())
    }
}

/// Conversion from config::ConfigError
impl From<config::ConfigError> for BackplaneError {
    fn from(err: config::ConfigError) -> Self {
        BackplaneError::Configuration(err.to_string())
    }
}

/// Result type alias
pub type Result<T> = std::result::Result<T, BackplaneError>;
