//! Wire protocol
//!
//! JSON text frames exchanged over the persistent connection.

mod channel;
mod event_types;
mod frames;

pub use channel::{Channel, ChannelParseError, EntityKind};
pub use event_types::EventType;
pub use frames::{ClientFrame, EventEnvelope};
