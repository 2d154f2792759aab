//! Subscription & dispatch registry
//!
//! Decouples "a frame of type T for entity E arrived" from the code that
//! cares about T or E.

mod channels;
mod dispatch;

pub use channels::ChannelSet;
pub use dispatch::{EventRegistry, HandlerGuard, HandlerId};
