//! Prometheus metrics for the coordination core

use lazy_static::lazy_static;
use prometheus::{
    register_counter_vec, register_gauge, register_gauge_vec, register_histogram_vec, CounterVec,
    Gauge, GaugeVec, HistogramVec,
};

/// Process-level metrics collection
pub struct BackplaneMetrics {
    /// Cache operations by operation and outcome
    pub cache_operations: CounterVec,

    /// Number of live cache entries
    pub cache_entries: Gauge,

    /// Messages published per channel
    pub stream_messages: CounterVec,

    /// Live subscribers per channel
    pub stream_subscribers: GaugeVec,

    /// Job executions by job name and outcome
    pub job_executions: CounterVec,

    /// Job execution duration in seconds
    pub job_duration: HistogramVec,

    /// Transport requests by transport, method and outcome
    pub transport_requests: CounterVec,

    /// Number of connected transports
    pub transports_connected: Gauge,
}

impl BackplaneMetrics {
    pub fn new() -> Self {
        Self {
            cache_operations: register_counter_vec!(
                "backplane_cache_operations_total",
                "Total cache operations",
                &["operation", "outcome"]
            )
            .unwrap(),

            cache_entries: register_gauge!(
                "backplane_cache_entries",
                "Number of live cache entries"
            )
            .unwrap(),

            stream_messages: register_counter_vec!(
                "backplane_stream_messages_total",
                "Total messages published per channel",
                &["channel"]
            )
            .unwrap(),

            stream_subscribers: register_gauge_vec!(
                "backplane_stream_subscribers",
                "Live subscribers per channel",
                &["channel"]
            )
            .unwrap(),

            job_executions: register_counter_vec!(
                "backplane_job_executions_total",
                "Total job executions",
                &["job_name", "outcome"]
            )
            .unwrap(),

            job_duration: register_histogram_vec!(
                "backplane_job_duration_seconds",
                "Job execution duration in seconds",
                &["job_name"],
                vec![0.001, 0.01, 0.1, 0.5, 1.0, 5.0, 10.0, 30.0, 60.0, 120.0]
            )
            .unwrap(),

            transport_requests: register_counter_vec!(
                "backplane_transport_requests_total",
                "Total transport requests",
                &["transport", "method", "outcome"]
            )
            .unwrap(),

            transports_connected: register_gauge!(
                "backplane_transports_connected",
                "Number of connected transports"
            )
            .unwrap(),
        }
    }

    /// Record a cache lookup
    pub fn record_cache_get(&self, hit: bool) {
        let outcome = if hit { "hit" } else { "miss" };
        self.cache_operations
            .with_label_values(&["get", outcome])
            .inc();
    }

    /// Record a cache write
    pub fn record_cache_set(&self, evicted: bool) {
        self.cache_operations
            .with_label_values(&["set", "ok"])
            .inc();
        if evicted {
            self.cache_operations
                .with_label_values(&["evict", "ok"])
                .inc();
        }
    }

    /// Record a channel publish
    pub fn record_publish(&self, channel: &str) {
        self.stream_messages.with_label_values(&[channel]).inc();
    }

    /// Record a job execution
    pub fn record_job_execution(&self, job_name: &str, success: bool, duration_secs: f64) {
        let outcome = if success { "success" } else { "failure" };
        self.job_executions
            .with_label_values(&[job_name, outcome])
            .inc();
        self.job_duration
            .with_label_values(&[job_name])
            .observe(duration_secs);
    }

    /// Record a transport send or emit
    pub fn record_transport_request(&self, transport: &str, method: &str, success: bool) {
        let outcome = if success { "ok" } else { "error" };
        self.transport_requests
            .with_label_values(&[transport, method, outcome])
            .inc();
    }
}

impl Default for BackplaneMetrics {
    fn default() -> Self {
        Self::new()
    }
}

lazy_static! {
    /// Global metrics instance
    pub static ref BACKPLANE_METRICS: BackplaneMetrics = BackplaneMetrics::new();
}

/// Initialize metrics (idempotent)
pub fn init_metrics() {
    lazy_static::initialize(&BACKPLANE_METRICS);
}

/// Export all metrics in Prometheus text format
pub fn gather_metrics() -> String {
    use prometheus::Encoder;

    let encoder = prometheus::TextEncoder::new();
    let families = prometheus::gather();
    let mut buf = Vec::new();
    if let Err(err) = encoder.encode(&families, &mut buf) {
        tracing::error!(error = %err, "Failed to encode metrics");
        return String::new();
    }
    String::from_utf8_lossy(&buf).into_owned()
}
