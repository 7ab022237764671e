//! Error types for messaging collaborators

/// Result type for messaging operations
pub type MessagingResult<T> = std::result::Result<T, MessagingError>;

/// Errors that can occur when talking to the event bus or job queue
#[derive(Debug, thiserror::Error)]
pub enum MessagingError {
    /// Connection failed
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// Publish failed
    #[error("Publish failed: {0}")]
    PublishFailed(String),

    /// Enqueue failed
    #[error("Enqueue failed: {0}")]
    EnqueueFailed(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl From<serde_json::Error> for MessagingError {
    fn from(err: serde_json::Error) -> Self {
        MessagingError::SerializationError(err.to_string())
    }
}
