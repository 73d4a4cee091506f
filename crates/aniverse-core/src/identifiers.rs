//! Identifier types for reconciled entities
//!
//! Rows in the remote store carry a server-assigned [`RecordId`]. Entries the
//! client shows before the store has answered carry a [`PlaceholderId`]
//! instead. [`EntityId`] keeps the two in separate namespaces, so a
//! placeholder can never be mistaken for a canonical row no matter what the
//! server's ids look like.

use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Canonical, server-assigned identity of a stored row.
///
/// Stores hand out either integer or UUID keys; both are normalized to their
/// string form so streams can treat identity uniformly.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct RecordId(String);

impl RecordId {
    /// Create a record id from any string-like value
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrow the id as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RecordId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for RecordId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl From<u64> for RecordId {
    fn from(id: u64) -> Self {
        Self(id.to_string())
    }
}

impl From<Uuid> for RecordId {
    fn from(id: Uuid) -> Self {
        Self(id.to_string())
    }
}

impl<'de> Deserialize<'de> for RecordId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Text(String),
            Unsigned(u64),
            Signed(i64),
        }

        Ok(match Raw::deserialize(deserializer)? {
            Raw::Text(s) => Self(s),
            Raw::Unsigned(n) => Self(n.to_string()),
            Raw::Signed(n) => Self(n.to_string()),
        })
    }
}

/// Client-generated identity of an optimistic entry.
///
/// Never persisted and never shown to other clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PlaceholderId(pub Uuid);

impl PlaceholderId {
    /// Create a fresh random placeholder id
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Get the inner UUID
    pub fn uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for PlaceholderId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for PlaceholderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "pending-{}", self.0)
    }
}

impl FromStr for PlaceholderId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let raw = s.strip_prefix("pending-").unwrap_or(s);
        Uuid::parse_str(raw).map(Self)
    }
}

/// Identity of an entry in a materialized collection.
///
/// Canonical ids sort before placeholders, which only matters as the final
/// tie-break between entries with equal sort keys.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum EntityId {
    /// Server-assigned identity
    Canonical(RecordId),
    /// Optimistic placeholder awaiting confirmation
    Pending(PlaceholderId),
}

impl EntityId {
    /// Whether this entry has been confirmed by the store
    pub fn is_canonical(&self) -> bool {
        matches!(self, Self::Canonical(_))
    }

    /// Whether this entry is an unconfirmed optimistic placeholder
    pub fn is_pending(&self) -> bool {
        matches!(self, Self::Pending(_))
    }

    /// The canonical id, if confirmed
    pub fn record_id(&self) -> Option<&RecordId> {
        match self {
            Self::Canonical(id) => Some(id),
            Self::Pending(_) => None,
        }
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Canonical(id) => write!(f, "{id}"),
            Self::Pending(id) => write!(f, "{id}"),
        }
    }
}

impl From<RecordId> for EntityId {
    fn from(id: RecordId) -> Self {
        Self::Canonical(id)
    }
}

impl From<PlaceholderId> for EntityId {
    fn from(id: PlaceholderId) -> Self {
        Self::Pending(id)
    }
}
