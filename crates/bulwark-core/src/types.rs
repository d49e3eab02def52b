//! Common types used throughout Bulwark.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Identifier of the party on whose behalf an action is requested.
///
/// Usually the top-level agent; sub-agents get their own actor id so their
/// grants never leak into the parent's ledger entries.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ActorId(pub String);

impl ActorId {
    /// Create an actor id from a name.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// The default actor for a single-agent session.
    #[must_use]
    pub fn agent() -> Self {
        Self("agent".to_string())
    }

    /// Borrow the actor name.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for ActorId {
    fn default() -> Self {
        Self::agent()
    }
}

impl fmt::Display for ActorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "actor:{}", self.0)
    }
}

/// Unique identifier for a session.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(pub Uuid);

impl SessionId {
    /// Create a new random session ID.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Create a session ID from a UUID.
    #[must_use]
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "session:{}", self.0)
    }
}

/// Timestamp wrapper for consistent handling throughout Bulwark.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Timestamp(pub DateTime<Utc>);

impl Timestamp {
    /// Get the current timestamp.
    #[must_use]
    pub fn now() -> Self {
        Self(Utc::now())
    }

    /// Create a timestamp from a `DateTime<Utc>`.
    #[must_use]
    pub fn from_datetime(dt: DateTime<Utc>) -> Self {
        Self(dt)
    }

    /// Check if this timestamp is in the past.
    #[must_use]
    pub fn is_past(&self) -> bool {
        self.0 < Utc::now()
    }

    /// Get the inner `DateTime<Utc>`.
    #[must_use]
    pub fn into_inner(self) -> DateTime<Utc> {
        self.0
    }
}

impl Default for Timestamp {
    fn default() -> Self {
        Self::now()
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.to_rfc3339())
    }
}

/// The class of a mediated action.
///
/// Grants are recorded per class, so approving reads under a directory
/// says nothing about writes there.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionClass {
    /// Reading a file or listing a directory.
    FileRead,
    /// Creating, modifying, or deleting a file.
    FileWrite,
    /// Running a process.
    CommandExec,
}

impl ActionClass {
    /// Whether this class concerns the filesystem.
    #[must_use]
    pub fn is_file(&self) -> bool {
        matches!(self, Self::FileRead | Self::FileWrite)
    }
}

impl fmt::Display for ActionClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::FileRead => write!(f, "file read"),
            Self::FileWrite => write!(f, "file write"),
            Self::CommandExec => write!(f, "command"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_actor_id_display() {
        assert_eq!(ActorId::agent().to_string(), "actor:agent");
        assert_eq!(ActorId::new("reviewer").as_str(), "reviewer");
        assert_eq!(ActorId::default(), ActorId::agent());
    }

    #[test]
    fn test_session_id_unique() {
        let a = SessionId::new();
        let b = SessionId::new();
        assert_ne!(a, b);
        assert!(a.to_string().starts_with("session:"));
    }

    #[test]
    fn test_timestamp_past() {
        let ts = Timestamp::from_datetime(Utc::now() - chrono::Duration::seconds(5));
        assert!(ts.is_past());
    }

    #[test]
    fn test_action_class_serialization() {
        let json = serde_json::to_string(&ActionClass::CommandExec).unwrap();
        assert_eq!(json, "\"command_exec\"");
        assert!(ActionClass::FileWrite.is_file());
        assert!(!ActionClass::CommandExec.is_file());
    }
}
