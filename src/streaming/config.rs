//! Configuration for the streaming module

use serde::{Deserialize, Serialize};

/// Configuration for the streaming manager
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamingConfig {
    /// Whether streaming is enabled
    pub enabled: bool,

    /// Channels created during initialization
    pub channels: Vec<String>,
}

impl Default for StreamingConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            channels: vec![
                "events".to_string(),
                "notifications".to_string(),
                "system".to_string(),
            ],
        }
    }
}
