//! Entity update channels
//!
//! A channel scopes server-side delivery to one entity's updates. Wire form is
//! `"<entityKind>/<entityId>/updates"`, e.g. `"student/42/updates"`.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Entity kinds the console can watch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    Student,
    Teacher,
    Orchestra,
    Rehearsal,
    Theory,
    Document,
}

impl EntityKind {
    /// Get the wire name of the kind
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Student => "student",
            Self::Teacher => "teacher",
            Self::Orchestra => "orchestra",
            Self::Rehearsal => "rehearsal",
            Self::Theory => "theory",
            Self::Document => "document",
        }
    }
}

impl FromStr for EntityKind {
    type Err = ChannelParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "student" => Ok(Self::Student),
            "teacher" => Ok(Self::Teacher),
            "orchestra" => Ok(Self::Orchestra),
            "rehearsal" => Ok(Self::Rehearsal),
            "theory" => Ok(Self::Theory),
            "document" => Ok(Self::Document),
            other => Err(ChannelParseError::UnknownKind(other.to_string())),
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A named subscription scope for one entity's updates
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Channel {
    kind: EntityKind,
    id: String,
}

impl Channel {
    /// Create a channel for an entity
    #[must_use]
    pub fn new(kind: EntityKind, id: impl Into<String>) -> Self {
        Self {
            kind,
            id: id.into(),
        }
    }

    #[must_use]
    pub fn kind(&self) -> EntityKind {
        self.kind
    }

    #[must_use]
    pub fn entity_id(&self) -> &str {
        &self.id
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/updates", self.kind, self.id)
    }
}

impl FromStr for Channel {
    type Err = ChannelParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.split('/');
        let (kind, id, suffix) = match (parts.next(), parts.next(), parts.next(), parts.next()) {
            (Some(kind), Some(id), Some(suffix), None) => (kind, id, suffix),
            _ => return Err(ChannelParseError::BadFormat(s.to_string())),
        };

        if suffix != "updates" || id.is_empty() {
            return Err(ChannelParseError::BadFormat(s.to_string()));
        }

        Ok(Self::new(kind.parse()?, id))
    }
}

impl TryFrom<String> for Channel {
    type Error = ChannelParseError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<Channel> for String {
    fn from(channel: Channel) -> Self {
        channel.to_string()
    }
}

/// Channel name parse errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ChannelParseError {
    #[error("Unknown entity kind: {0}")]
    UnknownKind(String),

    #[error("Channel name must look like '<kind>/<id>/updates', got: {0}")]
    BadFormat(String),
}
