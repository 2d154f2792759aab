//! # maestro-realtime
//!
//! Real-time update client for the conservatory console. Keeps remote views in
//! sync with server-side mutations over one persistent WebSocket connection:
//! lifecycle supervision with exponential-backoff reconnection, heartbeat
//! keep-alive, and fan-out of typed inbound events to registered handlers.
//!
//! Best-effort by design: no delivery, ordering, or exactly-once guarantees.
//! The request/response API remains the system of record.

pub mod config;
pub mod connection;
pub mod protocol;
pub mod registry;

pub use config::RealtimeConfig;
pub use connection::{
    ConnectionState, ConnectionStatus, Heartbeat, RealtimeClient, ReconnectPolicy,
};
pub use protocol::{Channel, ChannelParseError, ClientFrame, EntityKind, EventEnvelope, EventType};
pub use registry::{ChannelSet, EventRegistry, HandlerGuard};
