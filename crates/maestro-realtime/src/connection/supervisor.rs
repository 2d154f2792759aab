//! Connection supervisor
//!
//! Owns one logical connection to the realtime endpoint: dialing with an
//! establishment timeout, the Disconnected/Connecting/Connected state machine,
//! reconnection with exponential backoff, and replay of pending channel
//! subscriptions after every successful connect.

use super::Heartbeat;
use crate::config::RealtimeConfig;
use crate::protocol::{Channel, ClientFrame, EventEnvelope, EventType};
use crate::registry::{ChannelSet, EventRegistry, HandlerGuard};
use futures_util::{SinkExt, StreamExt};
use maestro_api::TokenStore;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::sync::Arc;
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Lifecycle state of the one physical connection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// No socket; nothing in flight
    Disconnected,
    /// Dial in progress, establishment timeout armed
    Connecting,
    /// Socket open; heartbeat running
    Connected,
}

/// Display-only connectivity snapshot
///
/// For a status indicator, never for correctness-critical decisions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnectionStatus {
    pub is_connected: bool,
    pub reconnect_attempts: u32,
}

/// Real-time update client
///
/// One instance owns one logical connection. Cheap to clone; clones share the
/// connection, registry, and pending subscriptions. Construct it at the
/// application's composition point and hand clones to consumers.
///
/// No call on this type returns an error or panics: transient failure is
/// absorbed into logging, state transitions, and the reconnect policy.
#[derive(Clone)]
pub struct RealtimeClient {
    inner: Arc<ClientInner>,
}

struct ClientInner {
    config: RealtimeConfig,
    tokens: Arc<TokenStore>,
    registry: EventRegistry,
    channels: ChannelSet,
    state: Mutex<ConnectionState>,
    /// Cleared by manual disconnect and by policy exhaustion
    should_reconnect: AtomicBool,
    /// Failed attempts since the last successful connect
    attempts: AtomicU32,
    /// Stamps each connection instance; stale callbacks are ignored
    generation: AtomicU64,
    outbound: Mutex<Option<mpsc::Sender<ClientFrame>>>,
    heartbeat: Heartbeat,
    reconnect_task: Mutex<Option<JoinHandle<()>>>,
    reader_task: Mutex<Option<JoinHandle<()>>>,
}

impl RealtimeClient {
    /// Create a disconnected client
    ///
    /// The token store is the stored-credential accessor shared with the CRUD
    /// API client; its token (when present) is sent in an `auth` frame on
    /// every successful connect.
    #[must_use]
    pub fn new(config: RealtimeConfig, tokens: Arc<TokenStore>) -> Self {
        let heartbeat = Heartbeat::new(config.heartbeat_interval);
        Self {
            inner: Arc::new(ClientInner {
                config,
                tokens,
                registry: EventRegistry::new(),
                channels: ChannelSet::new(),
                state: Mutex::new(ConnectionState::Disconnected),
                should_reconnect: AtomicBool::new(false),
                attempts: AtomicU32::new(0),
                generation: AtomicU64::new(0),
                outbound: Mutex::new(None),
                heartbeat,
                reconnect_task: Mutex::new(None),
                reader_task: Mutex::new(None),
            }),
        }
    }

    // === Lifecycle ===

    /// Open the connection
    ///
    /// Idempotent: a no-op while already `Connecting` or `Connected`. A manual
    /// call also clears any previous policy exhaustion, so retries start from
    /// a fresh attempt count.
    pub async fn connect(&self) {
        if !self.inner.should_reconnect.load(Ordering::SeqCst) {
            // Fresh manual start after disconnect() or exhaustion.
            self.inner.attempts.store(0, Ordering::SeqCst);
        }
        if let Some(handle) = self.inner.reconnect_task.lock().take() {
            handle.abort();
        }
        self.connect_inner().await;
    }

    /// Tear the connection down and stay down
    ///
    /// Terminal until the next explicit [`connect`](Self::connect): cancels
    /// any pending reconnect, stops the heartbeat, and closes the socket with
    /// a normal-closure code.
    pub fn disconnect(&self) {
        {
            let mut state = self.inner.state.lock();
            self.inner.should_reconnect.store(false, Ordering::SeqCst);
            // Invalidate every in-flight dial and closure callback.
            self.inner.generation.fetch_add(1, Ordering::SeqCst);
            *state = ConnectionState::Disconnected;
        }

        if let Some(handle) = self.inner.reconnect_task.lock().take() {
            handle.abort();
        }
        self.inner.heartbeat.stop();
        // Dropping the last sender makes the writer task send a normal close
        // frame and shut the socket down.
        *self.inner.outbound.lock() = None;
        if let Some(handle) = self.inner.reader_task.lock().take() {
            handle.abort();
        }
        self.inner.attempts.store(0, Ordering::SeqCst);

        tracing::info!("Realtime client disconnected");
    }

    async fn connect_inner(&self) {
        let generation;
        {
            let mut state = self.inner.state.lock();
            if *state != ConnectionState::Disconnected {
                tracing::debug!(state = ?*state, "connect() ignored; connection already active");
                return;
            }
            *state = ConnectionState::Connecting;
            self.inner.should_reconnect.store(true, Ordering::SeqCst);
            generation = self.inner.generation.fetch_add(1, Ordering::SeqCst) + 1;
        }

        tracing::info!(url = %self.inner.config.url, "Opening realtime connection");

        let dial = connect_async(self.inner.config.url.as_str());
        match tokio::time::timeout(self.inner.config.connect_timeout, dial).await {
            Ok(Ok((stream, _response))) => self.on_open(generation, stream).await,
            Ok(Err(err)) => {
                tracing::warn!(error = %err, "Realtime connection failed to open");
                self.on_connect_failed(generation);
            }
            Err(_) => {
                // Dropping the dial future tears down the half-open socket.
                tracing::warn!(
                    timeout_ms = self.inner.config.connect_timeout.as_millis() as u64,
                    "Realtime connection attempt timed out"
                );
                self.on_connect_failed(generation);
            }
        }
    }

    async fn on_open(&self, generation: u64, stream: WsStream) {
        let (mut sink, mut source) = stream.split();

        {
            let mut state = self.inner.state.lock();
            let superseded = *state != ConnectionState::Connecting
                || generation != self.inner.generation.load(Ordering::SeqCst);
            if superseded {
                // disconnect() won the race while we were dialing.
                tracing::debug!("Connection superseded before open completed; dropping it");
                return;
            }
            *state = ConnectionState::Connected;
        }
        self.inner.attempts.store(0, Ordering::SeqCst);

        let (tx, mut rx) = mpsc::channel::<ClientFrame>(64);
        *self.inner.outbound.lock() = Some(tx.clone());

        // Writer task owns the sink. It ends once every sender is gone and
        // closes the socket with a normal-closure code on the way out.
        tokio::spawn(async move {
            while let Some(frame) = rx.recv().await {
                match frame.to_json() {
                    Ok(text) => {
                        if sink.send(Message::Text(text)).await.is_err() {
                            break;
                        }
                    }
                    Err(err) => {
                        tracing::warn!(error = %err, "Failed to encode outbound frame");
                    }
                }
            }
            let close = CloseFrame {
                code: CloseCode::Normal,
                reason: "client shutdown".into(),
            };
            let _ = sink.send(Message::Close(Some(close))).await;
            let _ = sink.close().await;
        });

        self.inner.heartbeat.start(tx.clone());

        // Auth, then subscription replay, strictly before the reader starts:
        // no inbound frame for this connection instance is processed ahead of
        // the re-armed channels.
        if let Some(token) = self.inner.tokens.token() {
            let _ = tx.send(ClientFrame::auth(token)).await;
        }
        for channel in self.inner.channels.snapshot() {
            tracing::debug!(channel = %channel, "Replaying channel subscription");
            let _ = tx.send(ClientFrame::subscribe(channel)).await;
        }

        tracing::info!("Realtime connection established");

        let client = self.clone();
        let reader = tokio::spawn(async move {
            let mut normal_close = false;
            while let Some(message) = source.next().await {
                match message {
                    Ok(Message::Text(text)) => client.inner.registry.dispatch_raw(&text),
                    Ok(Message::Close(frame)) => {
                        normal_close = frame
                            .as_ref()
                            .is_some_and(|f| f.code == CloseCode::Normal);
                        tracing::debug!(frame = ?frame, "Server closed realtime connection");
                        break;
                    }
                    // Ping/pong is answered by the transport; binary frames
                    // are not part of the protocol.
                    Ok(_) => {}
                    Err(err) => {
                        tracing::warn!(error = %err, "Realtime transport error");
                        break;
                    }
                }
            }
            client.on_closed(generation, normal_close);
        });
        *self.inner.reader_task.lock() = Some(reader);
    }

    fn on_connect_failed(&self, generation: u64) {
        {
            let mut state = self.inner.state.lock();
            if generation != self.inner.generation.load(Ordering::SeqCst) {
                return;
            }
            *state = ConnectionState::Disconnected;
        }
        self.maybe_schedule_reconnect();
    }

    /// Closure handling: runs when the reader for a connection instance ends.
    ///
    /// A server close carrying the normal code (1000) is as final as a manual
    /// `disconnect()`; only abnormal closures feed the reconnect policy.
    fn on_closed(&self, generation: u64, normal_close: bool) {
        if generation != self.inner.generation.load(Ordering::SeqCst) {
            return; // stale connection instance
        }

        self.inner.heartbeat.stop();
        *self.inner.outbound.lock() = None;
        {
            let mut state = self.inner.state.lock();
            if *state == ConnectionState::Disconnected {
                return; // manual disconnect already ran
            }
            *state = ConnectionState::Disconnected;
            if normal_close {
                self.inner.should_reconnect.store(false, Ordering::SeqCst);
            }
        }

        if normal_close {
            tracing::info!("Realtime connection closed by the server");
            return;
        }

        tracing::info!("Realtime connection lost");
        self.maybe_schedule_reconnect();
    }

    fn maybe_schedule_reconnect(&self) {
        if !self.inner.should_reconnect.load(Ordering::SeqCst) {
            return;
        }

        let policy = &self.inner.config.reconnect;
        let failed = self.inner.attempts.load(Ordering::SeqCst);
        if policy.is_exhausted(failed) {
            tracing::warn!(
                attempts = failed,
                "Reconnect attempts exhausted; staying down until connect() is called again"
            );
            self.inner.should_reconnect.store(false, Ordering::SeqCst);
            return;
        }

        let attempt = failed + 1;
        self.inner.attempts.store(attempt, Ordering::SeqCst);
        let delay = policy.delay_for(attempt);
        tracing::info!(
            attempt,
            delay_ms = delay.as_millis() as u64,
            "Scheduling reconnect"
        );

        let client = self.clone();
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            // Guard against racing signals: dial only if nothing else already
            // brought the connection up or started to.
            if *client.inner.state.lock() != ConnectionState::Disconnected {
                return;
            }
            client.connect_inner().await;
        });
        *self.inner.reconnect_task.lock() = Some(handle);
    }

    // === Outbound ===

    /// Send a control frame, fire-and-forget
    ///
    /// While not connected the frame is dropped with a warning and, if fully
    /// disconnected, a fresh connect attempt is kicked off instead of queuing
    /// the payload.
    pub fn send(&self, frame: ClientFrame) {
        let tx = {
            let state = self.inner.state.lock();
            if *state == ConnectionState::Connected {
                self.inner.outbound.lock().clone()
            } else {
                None
            }
        };

        match tx {
            Some(tx) => {
                if let Err(err) = tx.try_send(frame) {
                    tracing::warn!(error = %err, "Outbound frame dropped");
                }
            }
            None => {
                tracing::warn!("Send while disconnected; frame dropped");
                if *self.inner.state.lock() == ConnectionState::Disconnected {
                    let client = self.clone();
                    tokio::spawn(async move { client.connect().await });
                }
            }
        }
    }

    // === Subscriptions ===

    /// Watch an entity channel
    ///
    /// Intent is recorded immediately and survives reconnects; the subscribe
    /// frame goes out now if connected, otherwise on the next connect.
    pub fn subscribe_channel(&self, channel: Channel) {
        let newly_added = self.inner.channels.insert(channel.clone());
        if !newly_added {
            tracing::trace!(channel = %channel, "Channel already subscribed");
            return;
        }

        tracing::debug!(channel = %channel, "Channel subscription recorded");
        if self.is_connected() {
            if let Some(tx) = self.inner.outbound.lock().clone() {
                let _ = tx.try_send(ClientFrame::subscribe(channel));
            }
        }
    }

    /// Stop watching an entity channel
    ///
    /// While disconnected the recorded intent is simply dropped (nothing was
    /// sent for it yet); while connected an unsubscribe frame goes out too.
    pub fn unsubscribe_channel(&self, channel: &Channel) {
        let was_subscribed = self.inner.channels.remove(channel);
        if !was_subscribed {
            return;
        }

        tracing::debug!(channel = %channel, "Channel subscription removed");
        if self.is_connected() {
            if let Some(tx) = self.inner.outbound.lock().clone() {
                let _ = tx.try_send(ClientFrame::unsubscribe(channel.clone()));
            }
        }
    }

    /// Channels currently watched (pending or live)
    #[must_use]
    pub fn subscribed_channels(&self) -> Vec<Channel> {
        self.inner.channels.snapshot()
    }

    // === Handlers ===

    /// Register a handler for one event type
    pub fn on<F>(&self, event: EventType, handler: F) -> HandlerGuard
    where
        F: Fn(&EventEnvelope) + Send + Sync + 'static,
    {
        self.inner.registry.on(event, handler)
    }

    /// Register a wildcard handler invoked for every dispatched event
    pub fn on_any<F>(&self, handler: F) -> HandlerGuard
    where
        F: Fn(&EventEnvelope) + Send + Sync + 'static,
    {
        self.inner.registry.on_any(handler)
    }

    /// The dispatch registry backing this client
    #[must_use]
    pub fn registry(&self) -> &EventRegistry {
        &self.inner.registry
    }

    // === Status ===

    /// Current lifecycle state
    #[must_use]
    pub fn state(&self) -> ConnectionState {
        *self.inner.state.lock()
    }

    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.state() == ConnectionState::Connected
    }

    /// Display-only connectivity snapshot
    #[must_use]
    pub fn status(&self) -> ConnectionStatus {
        ConnectionStatus {
            is_connected: self.is_connected(),
            reconnect_attempts: self.inner.attempts.load(Ordering::SeqCst),
        }
    }
}

impl std::fmt::Debug for RealtimeClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RealtimeClient")
            .field("url", &self.inner.config.url)
            .field("state", &self.state())
            .field("channels", &self.inner.channels.len())
            .finish()
    }
}
