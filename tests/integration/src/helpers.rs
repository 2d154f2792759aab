//! In-process WebSocket server and client builders for realtime tests

use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use maestro_api::TokenStore;
use maestro_realtime::{RealtimeClient, RealtimeConfig, ReconnectPolicy};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::WebSocketStream;

/// How long helpers wait before declaring a test stuck
pub const WAIT: Duration = Duration::from_secs(5);

/// A WebSocket server bound to an ephemeral localhost port
///
/// Each incoming connection is accepted and handed out via [`TestServer::accept`].
pub struct TestServer {
    url: String,
    connections: mpsc::UnboundedReceiver<ServerConn>,
    _accept_task: JoinHandle<()>,
}

impl TestServer {
    /// Bind and start accepting
    pub async fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind test listener");
        let addr = listener.local_addr().expect("listener has no local addr");
        let (tx, rx) = mpsc::unbounded_channel();

        let accept_task = tokio::spawn(async move {
            while let Ok((socket, _peer)) = listener.accept().await {
                let Ok(stream) = tokio_tungstenite::accept_async(socket).await else {
                    continue;
                };
                let (sink, source) = stream.split();
                if tx.send(ServerConn { sink, source }).is_err() {
                    break;
                }
            }
        });

        Self {
            url: format!("ws://{addr}"),
            connections: rx,
            _accept_task: accept_task,
        }
    }

    /// The ws:// URL clients should dial
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Wait for the next client connection
    pub async fn accept(&mut self) -> ServerConn {
        tokio::time::timeout(WAIT, self.connections.recv())
            .await
            .expect("timed out waiting for a client connection")
            .expect("accept loop ended")
    }

    /// Wait up to `wait` for another client connection
    pub async fn try_accept(&mut self, wait: Duration) -> Option<ServerConn> {
        tokio::time::timeout(wait, self.connections.recv())
            .await
            .ok()
            .flatten()
    }
}

/// Server side of one accepted connection
pub struct ServerConn {
    sink: SplitSink<WebSocketStream<TcpStream>, Message>,
    source: SplitStream<WebSocketStream<TcpStream>>,
}

impl ServerConn {
    /// Receive the next text frame as JSON
    pub async fn recv_json(&mut self) -> Value {
        loop {
            let message = tokio::time::timeout(WAIT, self.source.next())
                .await
                .expect("timed out waiting for a frame")
                .expect("connection closed while waiting for a frame")
                .expect("transport error while waiting for a frame");

            match message {
                Message::Text(text) => {
                    return serde_json::from_str(&text).expect("client sent non-JSON text frame")
                }
                Message::Close(_) => panic!("connection closed while waiting for a frame"),
                _ => {} // ignore ping/pong
            }
        }
    }

    /// Receive a text frame as JSON within `wait`, or None
    pub async fn try_recv_json(&mut self, wait: Duration) -> Option<Value> {
        let deadline = tokio::time::Instant::now() + wait;
        loop {
            let message = tokio::time::timeout_at(deadline, self.source.next())
                .await
                .ok()??
                .ok()?;
            match message {
                Message::Text(text) => return serde_json::from_str(&text).ok(),
                Message::Close(_) => return None,
                _ => {}
            }
        }
    }

    /// Send a raw text frame to the client
    pub async fn send_text(&mut self, text: &str) {
        self.sink
            .send(Message::Text(text.to_string()))
            .await
            .expect("failed to send test frame");
    }

    /// Close the connection with an explicit close code handshake
    pub async fn send_close(&mut self, code: CloseCode) {
        let frame = CloseFrame {
            code,
            reason: "".into(),
        };
        self.sink
            .send(Message::Close(Some(frame)))
            .await
            .expect("failed to send close frame");
    }

    /// Drop the connection without a close handshake (abnormal closure)
    pub fn abort(self) {
        drop(self);
    }
}

/// Client wired for fast tests: short dial timeout, quick retries, no jitter
pub fn test_client(url: &str, max_attempts: u32) -> (RealtimeClient, Arc<TokenStore>) {
    test_client_with_heartbeat(url, max_attempts, Duration::from_secs(60))
}

/// Same as [`test_client`] but with a custom heartbeat interval
pub fn test_client_with_heartbeat(
    url: &str,
    max_attempts: u32,
    heartbeat: Duration,
) -> (RealtimeClient, Arc<TokenStore>) {
    let config = RealtimeConfig::new(url)
        .with_connect_timeout(Duration::from_millis(500))
        .with_heartbeat_interval(heartbeat)
        .with_reconnect(ReconnectPolicy {
            base_delay: Duration::from_millis(20),
            max_delay: Duration::from_millis(100),
            max_attempts,
            jitter_max: Duration::ZERO,
        });

    let tokens = TokenStore::new_shared();
    (RealtimeClient::new(config, tokens.clone()), tokens)
}
