//! Frame formats
//!
//! Outbound control frames and the inbound event envelope.

use super::{Channel, EventType};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Outbound control frames
///
/// Everything the client ever sends: authentication, channel subscription
/// management, and heartbeats.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ClientFrame {
    Auth { token: String },
    Subscribe { channel: Channel },
    Unsubscribe { channel: Channel },
    Heartbeat { timestamp: DateTime<Utc> },
}

impl ClientFrame {
    /// Create an authentication frame
    #[must_use]
    pub fn auth(token: impl Into<String>) -> Self {
        Self::Auth {
            token: token.into(),
        }
    }

    /// Create a channel subscribe frame
    #[must_use]
    pub fn subscribe(channel: Channel) -> Self {
        Self::Subscribe { channel }
    }

    /// Create a channel unsubscribe frame
    #[must_use]
    pub fn unsubscribe(channel: Channel) -> Self {
        Self::Unsubscribe { channel }
    }

    /// Create a heartbeat frame stamped with the current time
    #[must_use]
    pub fn heartbeat() -> Self {
        Self::Heartbeat {
            timestamp: Utc::now(),
        }
    }

    /// Serialize to a JSON text frame
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// One inbound frame, parsed
///
/// Transient: handed to handlers by reference during dispatch and dropped
/// afterwards. The client keeps no message history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventEnvelope {
    /// Event type from the `type` field
    #[serde(rename = "type")]
    pub event: EventType,

    /// Opaque payload; `null` when the server sent none
    #[serde(default)]
    pub data: Value,

    /// Entity the event concerns, when scoped
    #[serde(rename = "entityId", default, skip_serializing_if = "Option::is_none")]
    pub entity_id: Option<String>,

    /// Server-side event time
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
}
