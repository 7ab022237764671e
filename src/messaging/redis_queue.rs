//! Redis-backed durable job queue

use chrono::Utc;
use redis::aio::ConnectionManager;
use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use async_trait::async_trait;
use uuid::Uuid;

use crate::messaging::error::{MessagingError, MessagingResult};
use crate::messaging::traits::{DurableJobQueue, QueueJobOptions, QueuedJob};

#[derive(Debug, Serialize)]
struct JobEnvelope<'a> {
    id: &'a str,
    name: &'a str,
    data: &'a Value,
    opts: &'a QueueJobOptions,
    enqueued_at: chrono::DateTime<Utc>,
}

/// Job queue that pushes JSON envelopes onto Redis lists
///
/// Each queue is one list under `<prefix>:<queue>`; workers pop from the
/// other end. Delivery options travel inside the envelope.
pub struct RedisJobQueue {
    manager: ConnectionManager,
    prefix: String,
}

impl RedisJobQueue {
    /// Connect to Redis and verify the connection with a ping
    pub async fn connect(url: &str) -> MessagingResult<Self> {
        let client = redis::Client::open(url).map_err(|e| {
            MessagingError::ConnectionFailed(format!("invalid redis url: {}", e))
        })?;
        let mut manager = ConnectionManager::new(client).await.map_err(|e| {
            MessagingError::ConnectionFailed(format!("redis connect failed: {}", e))
        })?;

        let _: String = redis::cmd("PING")
            .query_async(&mut manager)
            .await
            .map_err(|e| {
                MessagingError::ConnectionFailed(format!("redis ping failed: {}", e))
            })?;

        Ok(Self {
            manager,
            prefix: "queue".to_string(),
        })
    }

    /// Override the key prefix, default `queue`
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    fn queue_key(&self, queue: &str) -> String {
        format!("{}:{}", self.prefix, queue)
    }
}

#[async_trait]
impl DurableJobQueue for RedisJobQueue {
    async fn enqueue(
        &self,
        queue: &str,
        job_name: &str,
        payload: Value,
        options: QueueJobOptions,
    ) -> MessagingResult<QueuedJob> {
        let job = QueuedJob {
            id: Uuid::new_v4().to_string(),
            queue: queue.to_string(),
            name: job_name.to_string(),
            enqueued_at: Utc::now(),
        };

        let envelope = serde_json::to_string(&JobEnvelope {
            id: &job.id,
            name: &job.name,
            data: &payload,
            opts: &options,
            enqueued_at: job.enqueued_at,
        })?;

        let key = self.queue_key(queue);
        let mut conn = self.manager.clone();
        let _: i64 = redis::cmd("LPUSH")
            .arg(&key)
            .arg(&envelope)
            .query_async(&mut conn)
            .await
            .map_err(|e| {
                MessagingError::EnqueueFailed(format!("redis LPUSH to {} failed: {}", key, e))
            })?;

        debug!(queue = %queue, job = %job_name, id = %job.id, "Job enqueued");
        Ok(job)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_envelope_shape() {
        let options = QueueJobOptions {
            delay_ms: Some(250),
            attempts: Some(5),
            priority: None,
        };
        let payload = json!({"to": "ada@example.com"});
        let envelope = JobEnvelope {
            id: "j-1",
            name: "welcome",
            data: &payload,
            opts: &options,
            enqueued_at: Utc::now(),
        };

        let encoded = serde_json::to_value(&envelope).unwrap();
        assert_eq!(encoded["id"], "j-1");
        assert_eq!(encoded["opts"]["delay_ms"], 250);
        assert!(encoded["opts"].get("priority").is_none());
    }
}
