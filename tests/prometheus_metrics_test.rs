//! Integration tests for Prometheus metrics exposure

use backplane::metrics::{gather_metrics, init_metrics, BACKPLANE_METRICS};

#[test]
fn test_init_is_idempotent() {
    init_metrics();
    init_metrics();
}

#[test]
fn test_recorded_series_appear_in_the_export() {
    init_metrics();

    BACKPLANE_METRICS.record_cache_get(true);
    BACKPLANE_METRICS.record_cache_get(false);
    BACKPLANE_METRICS.record_cache_set(true);
    BACKPLANE_METRICS.record_publish("events");
    BACKPLANE_METRICS.record_job_execution("cleanup", true, 0.02);
    BACKPLANE_METRICS.record_job_execution("cleanup", false, 0.0);
    BACKPLANE_METRICS.record_transport_request("tcp", "send", true);
    BACKPLANE_METRICS.record_transport_request("nats", "emit", false);

    let text = gather_metrics();
    assert!(text.contains("backplane_cache_operations_total"));
    assert!(text.contains(r#"operation="evict""#), "Evictions should be counted");
    assert!(text.contains(r#"backplane_stream_messages_total{channel="events"}"#));
    assert!(text.contains(r#"job_name="cleanup",outcome="success""#));
    assert!(text.contains(r#"job_name="cleanup",outcome="failure""#));
    assert!(text.contains(r#"method="send",outcome="ok",transport="tcp""#));
    assert!(text.contains("backplane_job_duration_seconds_bucket"));
}

#[test]
fn test_gauges_track_both_directions() {
    init_metrics();

    BACKPLANE_METRICS.cache_entries.set(42.0);
    assert_eq!(BACKPLANE_METRICS.cache_entries.get(), 42.0);
    BACKPLANE_METRICS.cache_entries.set(0.0);
    assert_eq!(BACKPLANE_METRICS.cache_entries.get(), 0.0);

    BACKPLANE_METRICS.transports_connected.set(3.0);
    assert_eq!(BACKPLANE_METRICS.transports_connected.get(), 3.0);
}

#[test]
fn test_export_is_valid_prometheus_text() {
    init_metrics();
    BACKPLANE_METRICS.record_publish("system");

    let text = gather_metrics();
    assert!(text.contains("# HELP backplane_stream_messages_total"));
    assert!(text.contains("# TYPE backplane_stream_messages_total counter"));
    for line in text.lines() {
        assert!(
            line.starts_with('#') || line.contains(' '),
            "Sample lines carry a value: {}",
            line
        );
    }
}
