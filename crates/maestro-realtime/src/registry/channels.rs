//! Pending channel subscription bookkeeping
//!
//! The set of entity channels the caller wants watched. Survives reconnects:
//! the supervisor replays every entry as a subscribe frame each time the
//! connection comes up. Entries leave only on explicit unsubscription.

use crate::protocol::Channel;
use parking_lot::RwLock;
use std::collections::HashSet;

/// Set of channels to (re)subscribe on every connect
#[derive(Debug, Default)]
pub struct ChannelSet {
    channels: RwLock<HashSet<Channel>>,
}

impl ChannelSet {
    /// Create an empty set
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record intent to watch a channel; returns false if already present
    pub fn insert(&self, channel: Channel) -> bool {
        self.channels.write().insert(channel)
    }

    /// Drop intent to watch a channel; returns false if it was not present
    pub fn remove(&self, channel: &Channel) -> bool {
        self.channels.write().remove(channel)
    }

    /// Check whether a channel is currently watched
    #[must_use]
    pub fn contains(&self, channel: &Channel) -> bool {
        self.channels.read().contains(channel)
    }

    /// Copy of the current set, for replay
    #[must_use]
    pub fn snapshot(&self) -> Vec<Channel> {
        self.channels.read().iter().cloned().collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.channels.read().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.channels.read().is_empty()
    }
}
