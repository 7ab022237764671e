//! Service façade over the four managers
//!
//! [`BackplaneService`] owns the cache, streaming, scheduler and transport
//! managers, wires them together during startup and exposes their most used
//! operations directly. External delivery (event bus, durable job queue,
//! user events) goes through injected collaborators so the core never
//! depends on a concrete broker.

use std::sync::Arc;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::future::Future;
use strum_macros::Display;
use tokio::sync::watch;
use tracing::{debug, error, info};

use crate::cache::{CacheManager, CacheStats};
use crate::config::BackplaneConfig;
use crate::error::Result;
use crate::messaging::{
    DurableJobQueue, EventBusPublisher, QueueJobOptions, QueuedJob, UserEventPublisher,
};
use crate::scheduler::{
    JobOptions, SchedulerManager, SchedulerMetrics, SchedulerResult,
};
use crate::streaming::{StreamingManager, StreamingMetrics, Subscription};
use crate::transport::{TransportManager, TransportMetrics, TransportResult};

/// Lifecycle state of the service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ServiceState {
    Uninitialized,
    Initializing,
    Ready,
    Error,
    Stopping,
}

/// Live status value published on the status watch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceStatus {
    pub status: ServiceState,
    pub transports: Vec<String>,
    pub streaming_enabled: bool,
    pub scheduler_enabled: bool,
    pub cache_enabled: bool,
}

/// Merged snapshot of all manager metrics
#[derive(Debug, Clone, Serialize)]
pub struct ServiceMetrics {
    pub status: ServiceStatus,
    pub cache: CacheStats,
    pub streaming: StreamingMetrics,
    pub scheduler: SchedulerMetrics,
    pub transport: TransportMetrics,
}

/// Coordination core façade
pub struct BackplaneService {
    config: BackplaneConfig,
    cache: Arc<CacheManager>,
    streaming: Arc<StreamingManager>,
    scheduler: Arc<SchedulerManager>,
    transport: Arc<TransportManager>,
    event_bus: Arc<dyn EventBusPublisher>,
    job_queue: Arc<dyn DurableJobQueue>,
    user_events: Option<Arc<dyn UserEventPublisher>>,
    status_tx: Mutex<Option<watch::Sender<ServiceStatus>>>,
    status_rx: watch::Receiver<ServiceStatus>,
}

impl BackplaneService {
    /// Build the service with its managers and external collaborators
    pub fn new(
        config: BackplaneConfig,
        event_bus: Arc<dyn EventBusPublisher>,
        job_queue: Arc<dyn DurableJobQueue>,
    ) -> Self {
        let initial = ServiceStatus {
            status: ServiceState::Uninitialized,
            transports: Vec::new(),
            streaming_enabled: config.streaming.enabled,
            scheduler_enabled: config.scheduler.enabled,
            cache_enabled: config.cache.enabled,
        };
        let (status_tx, status_rx) = watch::channel(initial);

        Self {
            cache: Arc::new(CacheManager::new(config.cache.clone())),
            streaming: Arc::new(StreamingManager::new(config.streaming.clone())),
            scheduler: Arc::new(SchedulerManager::new(config.scheduler.clone())),
            transport: Arc::new(TransportManager::new(config.transports.clone())),
            event_bus,
            job_queue,
            user_events: None,
            status_tx: Mutex::new(Some(status_tx)),
            status_rx,
            config,
        }
    }

    /// Attach the optional per-user event collaborator
    pub fn with_user_event_publisher(mut self, publisher: Arc<dyn UserEventPublisher>) -> Self {
        self.user_events = Some(publisher);
        self
    }

    /// Initialize every manager in dependency order
    ///
    /// Cache, streaming and scheduler come up before transports so local
    /// state is usable when remote traffic starts. Any failure flips the
    /// status to `error` and propagates; the service is then unusable.
    pub async fn on_init(&self) -> Result<()> {
        self.publish_status(ServiceState::Initializing);
        info!("Initializing coordination core");

        if let Err(e) = self.init_managers().await {
            self.publish_status(ServiceState::Error);
            error!(error = %e, "Coordination core initialization failed");
            return Err(e);
        }

        self.publish_status(ServiceState::Ready);
        info!(
            transports = ?self.transport.transport_names(),
            streaming = self.config.streaming.enabled,
            scheduler = self.config.scheduler.enabled,
            cache = self.config.cache.enabled,
            "Coordination core ready"
        );
        Ok(())
    }

    async fn init_managers(&self) -> Result<()> {
        self.cache.initialize().await;
        self.streaming.initialize().await;
        self.scheduler.initialize().await?;
        self.register_cache_cleanup()?;
        self.transport.initialize().await;
        Ok(())
    }

    /// Tear down in reverse dependency order
    ///
    /// Individual teardown failures are logged by the managers and never
    /// propagate, so destruction always completes. The status stream is
    /// finalized at the end; receivers observe the channel closing.
    pub async fn on_destroy(&self) {
        self.publish_status(ServiceState::Stopping);
        info!("Shutting down coordination core");

        self.scheduler.shutdown().await;
        self.streaming.shutdown().await;
        self.cache.shutdown().await;
        self.transport.destroy().await;

        self.status_tx.lock().take();
        info!("Coordination core destroyed");
    }

    // Transport delegates

    /// Request/reply through a named transport
    pub async fn send(
        &self,
        pattern: &str,
        payload: Value,
        transport: &str,
    ) -> TransportResult<Value> {
        self.transport.send(pattern, payload, transport).await
    }

    /// Fire-and-forget through a named transport
    pub async fn emit(
        &self,
        pattern: &str,
        payload: Value,
        transport: &str,
    ) -> TransportResult<()> {
        self.transport.emit(pattern, payload, transport).await
    }

    // Streaming delegates

    /// Publish a message to a streaming channel. Without a source the
    /// message is attributed to `system`.
    pub fn publish(&self, channel: &str, data: Value, source: Option<&str>) -> bool {
        self.streaming.publish(channel, data, source)
    }

    /// Subscribe to a streaming channel
    pub fn subscribe(&self, channel: &str) -> Subscription {
        self.streaming.subscribe(channel)
    }

    /// Create a streaming channel
    pub fn create_channel(&self, name: &str) -> bool {
        self.streaming.create_channel(name)
    }

    // Scheduler delegates

    /// Register a cron job
    pub fn add_job<F, Fut>(
        &self,
        name: &str,
        pattern: &str,
        options: JobOptions,
        task: F,
    ) -> SchedulerResult<()>
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = std::result::Result<(), String>> + Send + 'static,
    {
        self.scheduler.add_job(name, pattern, options, task)
    }

    /// Remove a cron job
    pub fn remove_job(&self, name: &str) -> bool {
        self.scheduler.remove_job(name)
    }

    /// Start a stopped job
    pub fn start_job(&self, name: &str) -> bool {
        self.scheduler.start_job(name)
    }

    /// Stop a running job
    pub fn stop_job(&self, name: &str) -> bool {
        self.scheduler.stop_job(name)
    }

    // Cache delegates

    /// Look up a cached value
    pub fn cache_get(&self, key: &str) -> Option<Value> {
        self.cache.get(key)
    }

    /// Store a value, optionally with a TTL
    pub fn cache_set(&self, key: &str, value: Value, ttl: Option<std::time::Duration>) {
        self.cache.set(key, value, ttl)
    }

    /// Whether a live entry exists
    pub fn cache_has(&self, key: &str) -> bool {
        self.cache.has(key)
    }

    /// Drop an entry
    pub fn cache_delete(&self, key: &str) -> bool {
        self.cache.delete(key)
    }

    /// Drop everything
    pub fn cache_clear(&self) {
        self.cache.clear()
    }

    // Collaborator helpers

    /// Publish to the external event bus; delivery failures propagate
    pub async fn send_bus_message(&self, topic: &str, data: Value) -> Result<()> {
        self.event_bus.publish(topic, data).await?;
        Ok(())
    }

    /// Enqueue a durable background job; enqueue failures propagate
    pub async fn add_queue_job(
        &self,
        queue: &str,
        job_name: &str,
        data: Value,
        options: QueueJobOptions,
    ) -> Result<QueuedJob> {
        let job = self.job_queue.enqueue(queue, job_name, data, options).await?;
        Ok(job)
    }

    /// Publish a per-user event when the collaborator is configured
    pub async fn publish_user_event(
        &self,
        user_id: &str,
        event: &str,
        payload: Value,
    ) -> Result<()> {
        match &self.user_events {
            Some(publisher) => {
                publisher.publish_user_event(user_id, event, payload).await?;
                Ok(())
            }
            None => {
                debug!(user = %user_id, event = %event, "No user event publisher configured");
                Ok(())
            }
        }
    }

    // Introspection

    /// Current status snapshot
    pub fn status(&self) -> ServiceStatus {
        self.status_rx.borrow().clone()
    }

    /// Live status view; the channel closes when the service is destroyed
    pub fn watch_status(&self) -> watch::Receiver<ServiceStatus> {
        self.status_rx.clone()
    }

    /// Whether initialization completed successfully
    pub fn is_ready(&self) -> bool {
        self.status().status == ServiceState::Ready
    }

    /// Merged snapshot of all manager metrics plus current status
    pub fn metrics(&self) -> ServiceMetrics {
        ServiceMetrics {
            status: self.status(),
            cache: self.cache.stats(),
            streaming: self.streaming.metrics(),
            scheduler: self.scheduler.metrics(),
            transport: self.transport.metrics(),
        }
    }

    // Manager accessors for the full per-manager API

    pub fn cache(&self) -> Arc<CacheManager> {
        Arc::clone(&self.cache)
    }

    pub fn streaming(&self) -> Arc<StreamingManager> {
        Arc::clone(&self.streaming)
    }

    pub fn scheduler(&self) -> Arc<SchedulerManager> {
        Arc::clone(&self.scheduler)
    }

    pub fn transport(&self) -> Arc<TransportManager> {
        Arc::clone(&self.transport)
    }

    fn register_cache_cleanup(&self) -> Result<()> {
        let job = &self.config.scheduler.jobs.cache_cleanup;
        if !(self.config.scheduler.enabled && self.config.cache.enabled && job.enabled) {
            return Ok(());
        }

        let cache = Arc::clone(&self.cache);
        self.scheduler.add_job(
            "cache-cleanup",
            &job.schedule,
            JobOptions {
                start_now: true,
                ..JobOptions::default()
            },
            move || {
                let cache = cache.clone();
                async move {
                    let removed = cache.sweep_now();
                    if removed > 0 {
                        debug!(removed, "Cache cleanup dropped expired entries");
                    }
                    Ok(())
                }
            },
        )?;
        Ok(())
    }

    fn publish_status(&self, state: ServiceState) {
        let status = ServiceStatus {
            status: state,
            transports: self.transport.transport_names(),
            streaming_enabled: self.config.streaming.enabled,
            scheduler_enabled: self.config.scheduler.enabled,
            cache_enabled: self.config.cache.enabled,
        };
        if let Some(tx) = self.status_tx.lock().as_ref() {
            let _ = tx.send(status);
        }
    }
}
