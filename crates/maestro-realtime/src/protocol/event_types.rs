//! Inbound event types
//!
//! Domain event names carried in the `type` field of inbound frames. Unknown
//! names are preserved as [`EventType::Other`] so the dispatch registry stays
//! open to server-side additions without a client release.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Inbound event types
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum EventType {
    /// A student record changed
    StudentUpdate,
    /// Attendance was marked for a lesson or rehearsal
    AttendanceUpdate,
    /// A schedule slot moved
    ScheduleUpdate,
    /// A document was added or replaced
    DocumentUpdate,
    /// Keep-alive traffic; never dispatched to handlers
    Heartbeat,
    /// Any event type this client does not know about
    Other(String),
}

impl EventType {
    /// Get the wire name of the event type
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::StudentUpdate => "student_update",
            Self::AttendanceUpdate => "attendance_update",
            Self::ScheduleUpdate => "schedule_update",
            Self::DocumentUpdate => "document_update",
            Self::Heartbeat => "heartbeat",
            Self::Other(name) => name,
        }
    }

    /// Parse a wire name; never fails, unknown names become [`Self::Other`]
    #[must_use]
    pub fn parse(name: &str) -> Self {
        match name {
            "student_update" => Self::StudentUpdate,
            "attendance_update" => Self::AttendanceUpdate,
            "schedule_update" => Self::ScheduleUpdate,
            "document_update" => Self::DocumentUpdate,
            "heartbeat" => Self::Heartbeat,
            other => Self::Other(other.to_string()),
        }
    }
}

impl From<String> for EventType {
    fn from(name: String) -> Self {
        Self::parse(&name)
    }
}

impl From<EventType> for String {
    fn from(event: EventType) -> Self {
        event.as_str().to_string()
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
