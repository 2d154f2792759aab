//! Connection supervision
//!
//! Owns the one physical connection, its lifecycle state, the reconnection
//! policy, and the heartbeat keep-alive.

mod backoff;
mod heartbeat;
mod supervisor;

pub use backoff::ReconnectPolicy;
pub use heartbeat::Heartbeat;
pub use supervisor::{ConnectionState, ConnectionStatus, RealtimeClient};
