//! Integration tests for the transport manager over a live TCP peer

use backplane::transport::{
    TcpTransportConfig, TransportError, TransportManager, TransportsConfig,
};
use serde_json::{json, Value};
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio::time::timeout;

fn tcp_only(port: u16) -> TransportsConfig {
    TransportsConfig {
        tcp: TcpTransportConfig {
            enabled: true,
            host: "127.0.0.1".to_string(),
            port,
        },
        ..TransportsConfig::default()
    }
}

/// Newline-JSON peer: answers `math.sum` requests, rejects unknown patterns
/// and forwards id-less event frames to the returned channel.
async fn spawn_math_server() -> (u16, mpsc::UnboundedReceiver<Value>) {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind listener");
    let port = listener
        .local_addr()
        .expect("Failed to read local addr")
        .port();
    let (events_tx, events_rx) = mpsc::unbounded_channel();

    tokio::spawn(async move {
        let (stream, _) = listener.accept().await.expect("Failed to accept");
        let (read_half, mut write_half) = stream.into_split();
        let mut reader = BufReader::new(read_half);
        let mut line = String::new();
        loop {
            line.clear();
            match reader.read_line(&mut line).await {
                Ok(0) | Err(_) => break,
                Ok(_) => {}
            }
            let frame: Value = match serde_json::from_str(line.trim()) {
                Ok(frame) => frame,
                Err(_) => continue,
            };
            if frame.get("id").is_none() {
                let _ = events_tx.send(frame);
                continue;
            }
            let reply = match frame["pattern"].as_str() {
                Some("math.sum") => {
                    let sum: i64 = frame["data"]
                        .as_array()
                        .map(|values| values.iter().filter_map(Value::as_i64).sum())
                        .unwrap_or(0);
                    json!({"id": frame["id"], "response": sum})
                }
                _ => json!({"id": frame["id"], "err": "unknown pattern"}),
            };
            if write_half
                .write_all(format!("{}\n", reply).as_bytes())
                .await
                .is_err()
            {
                break;
            }
        }
    });

    (port, events_rx)
}

#[tokio::test]
async fn test_initialize_connects_and_round_trips() {
    let (port, mut events) = spawn_math_server().await;
    let manager = TransportManager::new(tcp_only(port));
    manager.initialize().await;

    assert_eq!(manager.transport_names(), vec!["tcp"]);
    let status = manager.transport_status();
    assert_eq!(status[0].kind, "tcp");
    assert!(status[0].connected, "Should connect during initialization");

    let response = manager
        .send("math.sum", json!([1, 2, 3]), "tcp")
        .await
        .expect("Request should succeed");
    assert_eq!(response, json!(6));

    manager
        .emit("metrics.flush", json!({"source": "api"}), "tcp")
        .await
        .expect("Emit should succeed");
    let event = timeout(Duration::from_secs(1), events.recv())
        .await
        .expect("Server should receive the event")
        .expect("Event channel should stay open");
    assert_eq!(event["pattern"], "metrics.flush");
    assert_eq!(event["data"]["source"], "api");

    manager.destroy().await;
    assert!(manager.transport_names().is_empty(), "Destroy should clear the registry");
}

#[tokio::test]
async fn test_remote_error_reply_keeps_connection_usable() {
    let (port, _events) = spawn_math_server().await;
    let manager = TransportManager::new(tcp_only(port));
    manager.initialize().await;

    let result = manager.send("users.get", json!({"id": 1}), "tcp").await;
    match result {
        Err(TransportError::RequestFailed(message)) => {
            assert_eq!(message, "unknown pattern");
        }
        other => panic!("Expected RequestFailed, got {:?}", other),
    }

    // An application-level error is not a socket failure.
    let response = manager
        .send("math.sum", json!([5, 5]), "tcp")
        .await
        .expect("Connection should survive a remote error reply");
    assert_eq!(response, json!(10));

    manager.destroy().await;
}

#[tokio::test]
async fn test_unreachable_endpoint_registers_disconnected() {
    // Port 1 is essentially never listening.
    let manager = TransportManager::new(tcp_only(1));
    manager.initialize().await;

    assert_eq!(manager.transport_names(), vec!["tcp"]);
    let metrics = manager.metrics();
    assert_eq!(metrics.total_transports, 1);
    assert_eq!(metrics.connected_transports, 0);

    let result = manager.send("users.get", json!({"id": 1}), "tcp").await;
    assert!(
        matches!(result, Err(TransportError::NotConnected(_))),
        "Should reject locally without touching the network"
    );
}

#[tokio::test]
async fn test_foreign_and_garbage_frames_are_skipped() {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind listener");
    let port = listener
        .local_addr()
        .expect("Failed to read local addr")
        .port();

    tokio::spawn(async move {
        let (stream, _) = listener.accept().await.expect("Failed to accept");
        let (read_half, mut write_half) = stream.into_split();
        let mut reader = BufReader::new(read_half);
        let mut line = String::new();
        reader.read_line(&mut line).await.expect("Failed to read request");
        let request: Value = serde_json::from_str(line.trim()).expect("Failed to parse request");

        // Noise ahead of the real reply: garbage, then a stale correlation id.
        let frames = format!(
            "this is not json\n{}\n{}\n",
            json!({"id": "someone-else", "response": "stale"}),
            json!({"id": request["id"], "response": {"ok": true}}),
        );
        write_half
            .write_all(frames.as_bytes())
            .await
            .expect("Failed to write replies");
    });

    let manager = TransportManager::new(tcp_only(port));
    manager.initialize().await;

    let response = manager
        .send("users.get", json!({"id": 9}), "tcp")
        .await
        .expect("Should skip frames that do not answer this request");
    assert_eq!(response["ok"], true);
}

#[tokio::test]
async fn test_peer_disconnect_is_detected() {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind listener");
    let port = listener
        .local_addr()
        .expect("Failed to read local addr")
        .port();

    tokio::spawn(async move {
        // Accept, read one request, hang up without answering.
        let (stream, _) = listener.accept().await.expect("Failed to accept");
        let mut reader = BufReader::new(stream);
        let mut line = String::new();
        reader.read_line(&mut line).await.expect("Failed to read request");
    });

    let manager = TransportManager::new(tcp_only(port));
    manager.initialize().await;
    assert_eq!(manager.metrics().connected_transports, 1);

    let result = manager.send("users.get", json!({"id": 1}), "tcp").await;
    match result {
        Err(TransportError::RequestFailed(message)) => {
            assert!(
                message.contains("closed by peer"),
                "Should name the hangup, got: {}",
                message
            );
        }
        other => panic!("Expected RequestFailed, got {:?}", other),
    }

    // The dead socket is remembered, later calls fail locally.
    let result = manager.send("users.get", json!({"id": 2}), "tcp").await;
    assert!(matches!(result, Err(TransportError::NotConnected(_))));
    assert_eq!(manager.metrics().connected_transports, 0);
}
