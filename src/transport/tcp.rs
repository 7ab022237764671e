//! TCP transport client
//!
//! Speaks newline-delimited JSON to the remote service. Requests carry a
//! correlation id so replies arriving on the same socket can be matched.

use std::sync::atomic::{AtomicBool, Ordering};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use async_trait::async_trait;
use uuid::Uuid;

use super::client::{TransportClient, TransportKind};
use super::config::TcpTransportConfig;
use super::error::{TransportError, TransportResult};

#[derive(Debug, Serialize)]
struct TcpRequest<'a> {
    id: &'a str,
    pattern: &'a str,
    data: &'a Value,
}

#[derive(Debug, Serialize)]
struct TcpEvent<'a> {
    pattern: &'a str,
    data: &'a Value,
}

#[derive(Debug, Deserialize)]
struct TcpResponse {
    id: String,
    #[serde(default)]
    response: Value,
    #[serde(default)]
    err: Option<String>,
}

struct TcpConnection {
    reader: BufReader<OwnedReadHalf>,
    writer: OwnedWriteHalf,
}

/// Request/reply client over a single TCP socket
pub struct TcpTransport {
    config: TcpTransportConfig,
    connection: Mutex<Option<TcpConnection>>,
    connected: AtomicBool,
}

impl TcpTransport {
    pub fn new(config: TcpTransportConfig) -> Self {
        Self {
            config,
            connection: Mutex::new(None),
            connected: AtomicBool::new(false),
        }
    }

    fn mark_disconnected(&self) {
        self.connected.store(false, Ordering::SeqCst);
    }

    async fn write_line(&self, conn: &mut TcpConnection, line: &str) -> TransportResult<()> {
        conn.writer
            .write_all(line.as_bytes())
            .await
            .map_err(|e| TransportError::RequestFailed(format!("tcp write failed: {}", e)))?;
        conn.writer
            .write_all(b"\n")
            .await
            .map_err(|e| TransportError::RequestFailed(format!("tcp write failed: {}", e)))?;
        Ok(())
    }
}

#[async_trait]
impl TransportClient for TcpTransport {
    fn kind(&self) -> TransportKind {
        TransportKind::Tcp
    }

    async fn connect(&self) -> TransportResult<()> {
        let addr = format!("{}:{}", self.config.host, self.config.port);
        let stream = TcpStream::connect(&addr).await.map_err(|e| {
            TransportError::ConnectionFailed(format!("tcp connect to {} failed: {}", addr, e))
        })?;

        let (read_half, write_half) = stream.into_split();
        let mut guard = self.connection.lock().await;
        *guard = Some(TcpConnection {
            reader: BufReader::new(read_half),
            writer: write_half,
        });
        self.connected.store(true, Ordering::SeqCst);

        debug!(addr = %addr, "TCP transport connected");
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    async fn close(&self) -> TransportResult<()> {
        let mut guard = self.connection.lock().await;
        if let Some(mut conn) = guard.take() {
            if let Err(e) = conn.writer.shutdown().await {
                warn!(error = %e, "TCP shutdown failed");
            }
        }
        self.mark_disconnected();
        Ok(())
    }

    async fn send(&self, pattern: &str, payload: Value) -> TransportResult<Value> {
        // The connection lock is held for the whole round trip, so the
        // socket carries one in-flight request at a time.
        let mut guard = self.connection.lock().await;
        let mut conn = guard
            .take()
            .ok_or_else(|| TransportError::NotConnected(TransportKind::Tcp.to_string()))?;

        let id = Uuid::new_v4().to_string();
        let request = match serde_json::to_string(&TcpRequest {
            id: &id,
            pattern,
            data: &payload,
        }) {
            Ok(r) => r,
            Err(e) => {
                *guard = Some(conn);
                return Err(e.into());
            }
        };

        if let Err(e) = self.write_line(&mut conn, &request).await {
            // A failed write leaves the socket in an unknown state.
            self.mark_disconnected();
            return Err(e);
        }

        let mut line = String::new();
        loop {
            line.clear();
            let read = match conn.reader.read_line(&mut line).await {
                Ok(n) => n,
                Err(e) => {
                    self.mark_disconnected();
                    return Err(TransportError::RequestFailed(format!(
                        "tcp read failed: {}",
                        e
                    )));
                }
            };
            if read == 0 {
                self.mark_disconnected();
                return Err(TransportError::RequestFailed(
                    "tcp connection closed by peer".to_string(),
                ));
            }

            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }
            let response: TcpResponse = match serde_json::from_str(trimmed) {
                Ok(r) => r,
                Err(e) => {
                    warn!(error = %e, "discarding unparseable TCP frame");
                    continue;
                }
            };
            if response.id != id {
                debug!(got = %response.id, want = %id, "skipping TCP frame for another request");
                continue;
            }

            let result = if let Some(err) = response.err {
                Err(TransportError::RequestFailed(err))
            } else {
                Ok(response.response)
            };
            *guard = Some(conn);
            return result;
        }
    }

    async fn emit(&self, pattern: &str, payload: Value) -> TransportResult<()> {
        let mut guard = self.connection.lock().await;
        let conn = guard
            .as_mut()
            .ok_or_else(|| TransportError::NotConnected(TransportKind::Tcp.to_string()))?;

        let event = serde_json::to_string(&TcpEvent {
            pattern,
            data: &payload,
        })?;
        match self.write_line(conn, &event).await {
            Ok(()) => Ok(()),
            Err(e) => {
                *guard = None;
                self.mark_disconnected();
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tokio::net::TcpListener;

    #[tokio::test]
    async fn test_connect_failure_reports_not_connected() {
        // Port 1 is essentially never listening.
        let transport = TcpTransport::new(TcpTransportConfig {
            enabled: true,
            host: "127.0.0.1".to_string(),
            port: 1,
        });
        let result = transport.connect().await;
        assert!(result.is_err(), "Should fail to connect to a closed port");
        assert!(!transport.is_connected());
    }

    #[tokio::test]
    async fn test_send_round_trip() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();

        // Echo server: replies with the request id and a fixed body.
        tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            let (read_half, mut write_half) = stream.into_split();
            let mut reader = BufReader::new(read_half);
            let mut line = String::new();
            reader.read_line(&mut line).await.unwrap();
            let request: Value = serde_json::from_str(line.trim()).unwrap();
            let reply = json!({
                "id": request["id"],
                "response": {"echoed": request["data"]},
            });
            write_half
                .write_all(format!("{}\n", reply).as_bytes())
                .await
                .unwrap();
        });

        let transport = TcpTransport::new(TcpTransportConfig {
            enabled: true,
            host: "127.0.0.1".to_string(),
            port,
        });
        transport.connect().await.unwrap();
        assert!(transport.is_connected());

        let response = transport
            .send("math.sum", json!({"values": [1, 2, 3]}))
            .await
            .unwrap();
        assert_eq!(response["echoed"]["values"][0], 1);

        transport.close().await.unwrap();
        assert!(!transport.is_connected());
    }

    #[tokio::test]
    async fn test_send_without_connection_rejects() {
        let transport = TcpTransport::new(TcpTransportConfig::default());
        let result = transport.send("anything", json!({})).await;
        assert!(matches!(result, Err(TransportError::NotConnected(_))));
    }

    #[tokio::test]
    async fn test_emit_does_not_wait_for_reply() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();

        tokio::spawn(async move {
            // Accept and read one line, never reply.
            let (stream, _) = listener.accept().await.unwrap();
            let mut reader = BufReader::new(stream);
            let mut line = String::new();
            reader.read_line(&mut line).await.unwrap();
            assert!(line.contains("user.created"));
        });

        let transport = TcpTransport::new(TcpTransportConfig {
            enabled: true,
            host: "127.0.0.1".to_string(),
            port,
        });
        transport.connect().await.unwrap();
        transport
            .emit("user.created", json!({"id": 42}))
            .await
            .unwrap();
    }
}
