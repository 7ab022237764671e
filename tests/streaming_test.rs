//! Integration tests for the streaming manager

use backplane::streaming::{StreamingConfig, StreamingManager};
use serde_json::json;
use tokio_stream::StreamExt;
use tokio_test::assert_pending;

fn manager_with(channels: &[&str]) -> StreamingManager {
    StreamingManager::new(StreamingConfig {
        enabled: true,
        channels: channels.iter().map(|c| c.to_string()).collect(),
    })
}

#[tokio::test]
async fn test_fan_out_delivers_one_message_to_every_subscriber() {
    let streaming = manager_with(&["events"]);
    streaming.initialize().await;

    let mut subs = vec![
        streaming.subscribe("events"),
        streaming.subscribe("events"),
        streaming.subscribe("events"),
    ];

    assert!(streaming.publish("events", json!({"kind": "signup"}), Some("api")));

    let mut ids = Vec::new();
    for sub in &mut subs {
        let message = sub.next().await.expect("Every subscriber should receive it");
        assert_eq!(message.channel, "events");
        assert_eq!(message.data["kind"], "signup");
        assert_eq!(message.source, "api");
        ids.push(message.id);
    }
    assert_eq!(ids[0], ids[1], "All copies should carry the same message id");
    assert_eq!(ids[1], ids[2]);
}

#[tokio::test]
async fn test_delivery_preserves_publish_order() {
    let streaming = manager_with(&["events"]);
    streaming.initialize().await;

    let mut sub = streaming.subscribe("events");
    for n in 1..=5 {
        streaming.publish("events", json!({"n": n}), None);
    }

    for n in 1..=5 {
        let message = sub.next().await.expect("Should receive all five");
        assert_eq!(message.data["n"], n, "Order should match publish order");
    }
}

#[tokio::test]
async fn test_channels_are_isolated() {
    let streaming = manager_with(&["events", "audit"]);
    streaming.initialize().await;

    let mut audit = streaming.subscribe("audit");
    streaming.publish("events", json!({"kind": "signup"}), None);

    let mut next = tokio_test::task::spawn(audit.next());
    assert_pending!(next.poll(), "Messages should not leak across channels");
    drop(next);

    streaming.publish("audit", json!({"kind": "login"}), None);
    let message = audit.next().await.expect("Should receive on its own channel");
    assert_eq!(message.channel, "audit");
    assert_eq!(message.data["kind"], "login");
}

#[tokio::test]
async fn test_late_subscribers_miss_earlier_messages() {
    let streaming = manager_with(&["events"]);
    streaming.initialize().await;

    streaming.publish("events", json!({"seq": "early"}), None);

    let mut sub = streaming.subscribe("events");
    streaming.publish("events", json!({"seq": "late"}), None);

    let message = sub.next().await.expect("Should receive the later message");
    assert_eq!(message.data["seq"], "late", "No replay of earlier messages");

    let mut next = tokio_test::task::spawn(sub.next());
    assert_pending!(next.poll(), "Only one message should have arrived");
}

#[tokio::test]
async fn test_filtered_subscription_skips_non_matching() {
    let streaming = manager_with(&["logs"]);
    streaming.initialize().await;

    let mut errors = streaming.subscribe_filtered("logs", |message| {
        message.data["level"] == "error"
    });

    streaming.publish("logs", json!({"level": "info", "msg": "fine"}), None);
    streaming.publish("logs", json!({"level": "error", "msg": "broken"}), None);

    let message = errors.next().await.expect("Should receive the error");
    assert_eq!(message.data["msg"], "broken");

    let mut next = tokio_test::task::spawn(errors.next());
    assert_pending!(next.poll(), "The info message should have been skipped");
}

#[tokio::test]
async fn test_source_scoped_subscription() {
    let streaming = manager_with(&["events"]);
    streaming.initialize().await;

    let mut from_api = streaming.subscribe_to_source("events", "api");

    streaming.publish("events", json!({"n": 1}), Some("worker"));
    streaming.publish("events", json!({"n": 2}), Some("api"));
    streaming.publish("events", json!({"n": 3}), None);

    let message = from_api.next().await.expect("Should receive the api message");
    assert_eq!(message.data["n"], 2);

    let mut next = tokio_test::task::spawn(from_api.next());
    assert_pending!(next.poll(), "Other sources should have been skipped");
}

#[tokio::test]
async fn test_unattributed_publishes_carry_the_system_source() {
    let streaming = manager_with(&["events"]);
    streaming.initialize().await;

    let mut sub = streaming.subscribe("events");
    let mut from_system = streaming.subscribe_to_source("events", "system");

    streaming.publish("events", json!({"kind": "tick"}), None);

    let message = sub.next().await.expect("Should receive the message");
    assert_eq!(
        message.source, "system",
        "A publish without a source should be attributed to system"
    );

    let scoped = from_system
        .next()
        .await
        .expect("A system-scoped subscription should match the default");
    assert_eq!(scoped.data["kind"], "tick");
}

#[tokio::test]
async fn test_drop_unsubscribes_and_metrics_track_it() {
    let streaming = manager_with(&["events", "audit"]);
    streaming.initialize().await;

    let sub_a = streaming.subscribe("events");
    let _sub_b = streaming.subscribe("events");
    assert_eq!(streaming.subscriber_count("events"), 2);

    drop(sub_a);
    assert_eq!(streaming.subscriber_count("events"), 1);

    streaming.publish("events", json!(1), None);
    streaming.publish("events", json!(2), None);

    let metrics = streaming.metrics();
    assert!(metrics.enabled);
    assert_eq!(metrics.total_channels, 2);
    assert_eq!(metrics.total_messages, 2);

    // Channels are reported sorted by name.
    assert_eq!(metrics.channels[0].name, "audit");
    assert!(!metrics.channels[0].active, "No subscribers on audit");
    assert_eq!(metrics.channels[1].name, "events");
    assert!(metrics.channels[1].active);
    assert_eq!(metrics.channels[1].subscribers, 1);
    assert_eq!(metrics.channels[1].messages, 2);
}

#[tokio::test]
async fn test_shutdown_completes_every_subscription() {
    let streaming = manager_with(&["events", "notifications"]);
    streaming.initialize().await;

    let mut sub_a = streaming.subscribe("events");
    let mut sub_b = streaming.subscribe("notifications");

    streaming.shutdown().await;

    assert!(sub_a.next().await.is_none(), "Stream should terminate");
    assert!(sub_b.next().await.is_none(), "Stream should terminate");
    assert!(streaming.channels().is_empty());
}

#[tokio::test]
async fn test_disabled_manager_is_inert() {
    let streaming = StreamingManager::new(StreamingConfig {
        enabled: false,
        channels: vec!["events".to_string()],
    });
    streaming.initialize().await;

    assert!(!streaming.create_channel("events"));
    assert!(!streaming.publish("events", json!(1), None));

    let mut sub = streaming.subscribe("events");
    assert!(sub.next().await.is_none(), "Subscription should be closed");
}
