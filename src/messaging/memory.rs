//! In-memory collaborator implementations
//!
//! Used by tests and the demo binary. They record everything handed to them
//! so assertions can inspect exactly what the façade forwarded.

use chrono::Utc;
use parking_lot::Mutex;
use serde_json::Value;
use tracing::debug;

use async_trait::async_trait;
use uuid::Uuid;

use crate::messaging::error::MessagingResult;
use crate::messaging::traits::{
    DurableJobQueue, EventBusPublisher, QueueJobOptions, QueuedJob, UserEventPublisher,
};

/// Event bus that records published messages
#[derive(Default)]
pub struct InMemoryEventBus {
    published: Mutex<Vec<(String, Value)>>,
}

impl InMemoryEventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything published so far, in order
    pub fn published(&self) -> Vec<(String, Value)> {
        self.published.lock().clone()
    }
}

#[async_trait]
impl EventBusPublisher for InMemoryEventBus {
    async fn publish(&self, topic: &str, message: Value) -> MessagingResult<()> {
        debug!(topic = %topic, "In-memory bus publish");
        self.published.lock().push((topic.to_string(), message));
        Ok(())
    }
}

/// Job queue that records enqueued jobs
#[derive(Default)]
pub struct InMemoryJobQueue {
    jobs: Mutex<Vec<(QueuedJob, Value, QueueJobOptions)>>,
}

impl InMemoryJobQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every accepted job so far, in order
    pub fn jobs(&self) -> Vec<(QueuedJob, Value, QueueJobOptions)> {
        self.jobs.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.jobs.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.lock().is_empty()
    }
}

#[async_trait]
impl DurableJobQueue for InMemoryJobQueue {
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
        debug!(queue = %queue, job = %job_name, id = %job.id, "In-memory queue accept");
        self.jobs.lock().push((job.clone(), payload, options));
        Ok(job)
    }
}

/// User event sink that records published events
#[derive(Default)]
pub struct InMemoryUserEvents {
    events: Mutex<Vec<(String, String, Value)>>,
}

impl InMemoryUserEvents {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<(String, String, Value)> {
        self.events.lock().clone()
    }
}

#[async_trait]
impl UserEventPublisher for InMemoryUserEvents {
    async fn publish_user_event(
        &self,
        user_id: &str,
        event: &str,
        payload: Value,
    ) -> MessagingResult<()> {
        debug!(user = %user_id, event = %event, "In-memory user event");
        self.events
            .lock()
            .push((user_id.to_string(), event.to_string(), payload));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_bus_records_in_order() {
        let bus = InMemoryEventBus::new();
        bus.publish("alerts", json!({"n": 1})).await.unwrap();
        bus.publish("alerts", json!({"n": 2})).await.unwrap();

        let published = bus.published();
        assert_eq!(published.len(), 2);
        assert_eq!(published[0].1["n"], 1);
        assert_eq!(published[1].1["n"], 2);
    }

    #[tokio::test]
    async fn test_queue_returns_receipt() {
        let queue = InMemoryJobQueue::new();
        let job = queue
            .enqueue(
                "emails",
                "welcome",
                json!({"to": "ada@example.com"}),
                QueueJobOptions::default(),
            )
            .await
            .unwrap();

        assert_eq!(job.queue, "emails");
        assert_eq!(job.name, "welcome");
        assert!(!job.id.is_empty());
        assert_eq!(queue.len(), 1);
    }
}
