//! Error types for transport operations

/// Result type for transport operations
pub type TransportResult<T> = std::result::Result<T, TransportError>;

/// Errors that can occur during transport operations
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// No transport registered under the requested name
    #[error("Transport not registered: {0}")]
    NotRegistered(String),

    /// Transport is registered but holds no usable connection
    #[error("Transport not connected: {0}")]
    NotConnected(String),

    /// Connection attempt failed
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// Request or publish failed
    #[error("Request failed: {0}")]
    RequestFailed(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for TransportError {
    fn from(err: serde_json::Error) -> Self {
        TransportError::Serialization(err.to_string())
    }
}
