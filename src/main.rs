use backplane::messaging::{
    DurableJobQueue, EventBusPublisher, InMemoryEventBus, InMemoryJobQueue, NatsEventBus,
    RedisJobQueue,
};
use backplane::{BackplaneConfig, BackplaneService};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load configuration
    let config = BackplaneConfig::load().unwrap_or_else(|e| {
        eprintln!("Failed to load configuration: {}", e);
        eprintln!("Using default configuration");
        BackplaneConfig::default()
    });

    // Initialize tracing
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| format!("backplane={}", config.observability.log_level).into());
    if config.observability.json_logs {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }

    tracing::info!("Starting {} v{}", config.observability.service_name, env!("CARGO_PKG_VERSION"));

    // Initialize Prometheus metrics
    backplane::metrics::init_metrics();
    tracing::info!("✅ Prometheus metrics initialized");

    // Wire the event bus collaborator
    let event_bus: Arc<dyn EventBusPublisher> = if config.messaging.event_bus.enabled {
        match NatsEventBus::connect(&config.messaging.event_bus.servers).await {
            Ok(bus) => {
                tracing::info!("✅ NATS event bus connected");
                Arc::new(bus)
            }
            Err(e) => {
                tracing::warn!("⚠️  Event bus connection failed: {}", e);
                tracing::warn!("   Continuing with the in-memory event bus");
                Arc::new(InMemoryEventBus::new())
            }
        }
    } else {
        tracing::info!("⚠️  Event bus disabled in configuration, using in-memory recorder");
        Arc::new(InMemoryEventBus::new())
    };

    // Wire the job queue collaborator
    let job_queue: Arc<dyn DurableJobQueue> = if config.messaging.job_queue.enabled {
        match RedisJobQueue::connect(&config.messaging.job_queue.url).await {
            Ok(queue) => {
                tracing::info!("✅ Redis job queue connected");
                Arc::new(queue.with_prefix(config.messaging.job_queue.prefix.clone()))
            }
            Err(e) => {
                tracing::warn!("⚠️  Job queue connection failed: {}", e);
                tracing::warn!("   Continuing with the in-memory job queue");
                Arc::new(InMemoryJobQueue::new())
            }
        }
    } else {
        tracing::info!("⚠️  Job queue disabled in configuration, using in-memory recorder");
        Arc::new(InMemoryJobQueue::new())
    };

    // Bring the coordination core up
    let service = BackplaneService::new(config, event_bus, job_queue);
    service.on_init().await?;

    let status = service.status();
    tracing::info!(
        "✅ Coordination core ready (transports: {:?}, streaming: {}, scheduler: {}, cache: {})",
        status.transports,
        status.streaming_enabled,
        status.scheduler_enabled,
        status.cache_enabled
    );

    // Run until interrupted
    tokio::signal::ctrl_c().await?;
    tracing::info!("Shutdown signal received");

    service.on_destroy().await;
    Ok(())
}
