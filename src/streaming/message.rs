//! Message envelope for channel streams

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Source attributed to messages published without an explicit origin
pub const DEFAULT_SOURCE: &str = "system";

/// A single message delivered to channel subscribers
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamMessage {
    /// Unique message ID
    pub id: String,

    /// Channel this message was published to
    #[serde(rename = "type")]
    pub channel: String,

    /// Message payload
    pub data: Value,

    /// Publication timestamp
    pub timestamp: DateTime<Utc>,

    /// Origin of the message; [`DEFAULT_SOURCE`] when the publisher did not
    /// identify itself
    pub source: String,
}

impl StreamMessage {
    /// Create a new message envelope
    pub fn new(channel: impl Into<String>, data: Value, source: Option<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            channel: channel.into(),
            data,
            timestamp: Utc::now(),
            source: source.unwrap_or_else(|| DEFAULT_SOURCE.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_messages_get_unique_ids() {
        let a = StreamMessage::new("events", json!(1), None);
        let b = StreamMessage::new("events", json!(1), None);
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn test_channel_serializes_as_type() {
        let message = StreamMessage::new("events", json!({"k": "v"}), Some("api".to_string()));
        let text = serde_json::to_string(&message).unwrap();
        assert!(text.contains("\"type\":\"events\""));
    }

    #[test]
    fn test_unattributed_messages_default_to_system() {
        let message = StreamMessage::new("events", json!(1), None);
        assert_eq!(message.source, DEFAULT_SOURCE);

        let text = serde_json::to_string(&message).unwrap();
        assert!(text.contains("\"source\":\"system\""));
    }
}
