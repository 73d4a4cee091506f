//! Change feed wire model
//!
//! The remote store pushes one [`ChangeEvent`] per committed row change on a
//! subscribed table. Rows travel as JSON objects; decoding them into domain
//! records is the job of each stream.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Kind of row change
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ChangeKind {
    /// A row was inserted
    Insert,
    /// A row was updated
    Update,
    /// A row was deleted
    Delete,
}

impl fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Insert => write!(f, "INSERT"),
            Self::Update => write!(f, "UPDATE"),
            Self::Delete => write!(f, "DELETE"),
        }
    }
}

/// A single change notification as delivered by the feed.
///
/// Some feeds omit the event type; [`ChangeEvent::kind`] infers it from which
/// row images are present.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeEvent {
    /// Declared event type, if the feed supplied one
    #[serde(rename = "eventType", default, skip_serializing_if = "Option::is_none")]
    pub event_type: Option<ChangeKind>,
    /// Row image after the change (Insert/Update)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub new: Option<Value>,
    /// Row image before the change (Update/Delete); may hold only the key
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub old: Option<Value>,
}

impl ChangeEvent {
    /// Build an insert event for a row
    pub fn insert(row: Value) -> Self {
        Self {
            event_type: Some(ChangeKind::Insert),
            new: Some(row),
            old: None,
        }
    }

    /// Build an update event for a row
    pub fn update(row: Value) -> Self {
        Self {
            event_type: Some(ChangeKind::Update),
            new: Some(row),
            old: None,
        }
    }

    /// Build a delete event from the deleted row (or just its key)
    pub fn delete(old: Value) -> Self {
        Self {
            event_type: Some(ChangeKind::Delete),
            new: None,
            old: Some(old),
        }
    }

    /// Resolved event kind.
    ///
    /// Falls back to `new` present → Insert, otherwise `old` present → Delete.
    /// Empty row images (`{}`) count as absent.
    pub fn kind(&self) -> Option<ChangeKind> {
        if let Some(kind) = self.event_type {
            return Some(kind);
        }
        if row_present(self.new.as_ref()) {
            Some(ChangeKind::Insert)
        } else if row_present(self.old.as_ref()) {
            Some(ChangeKind::Delete)
        } else {
            None
        }
    }

    /// The row image that identifies the affected row for this kind
    pub fn row(&self) -> Option<&Value> {
        match self.kind()? {
            ChangeKind::Insert | ChangeKind::Update => {
                self.new.as_ref().filter(|v| row_present(Some(*v)))
            }
            ChangeKind::Delete => self.old.as_ref().filter(|v| row_present(Some(*v))),
        }
    }
}

fn row_present(row: Option<&Value>) -> bool {
    match row {
        None | Some(Value::Null) => false,
        Some(Value::Object(map)) => !map.is_empty(),
        Some(_) => true,
    }
}

/// Server-side filter scoping a subscription to part of a table.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StreamFilter {
    /// Every row of the table
    All,
    /// Rows whose `column` equals `value` (e.g. `post_id = X`)
    Eq {
        /// Foreign key column
        column: String,
        /// Expected value, compared in string form
        value: String,
    },
}

impl StreamFilter {
    /// Filter rows by a foreign key value
    pub fn eq(column: impl Into<String>, value: impl Into<String>) -> Self {
        Self::Eq {
            column: column.into(),
            value: value.into(),
        }
    }

    /// Check whether a row belongs to this stream.
    ///
    /// Rows that do not carry the filtered column (key-only delete images)
    /// are accepted; the feed already scoped them server-side.
    pub fn matches(&self, row: &Value) -> bool {
        match self {
            Self::All => true,
            Self::Eq { column, value } => match row.get(column) {
                None | Some(Value::Null) => true,
                Some(Value::String(s)) => s == value,
                Some(other) => other.to_string() == *value,
            },
        }
    }
}

impl fmt::Display for StreamFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::All => write!(f, "*"),
            Self::Eq { column, value } => write!(f, "{column}=eq.{value}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_kind_inference() {
        let inferred_insert = ChangeEvent {
            event_type: None,
            new: Some(json!({"id": 1})),
            old: None,
        };
        assert_eq!(inferred_insert.kind(), Some(ChangeKind::Insert));

        let inferred_delete = ChangeEvent {
            event_type: None,
            new: Some(json!({})),
            old: Some(json!({"id": 1})),
        };
        assert_eq!(inferred_delete.kind(), Some(ChangeKind::Delete));

        let empty = ChangeEvent {
            event_type: None,
            new: None,
            old: None,
        };
        assert_eq!(empty.kind(), None);
    }

    #[test]
    fn test_declared_kind_wins() {
        let event = ChangeEvent::update(json!({"id": 1}));
        assert_eq!(event.kind(), Some(ChangeKind::Update));
        assert_eq!(event.row(), Some(&json!({"id": 1})));
    }

    #[test]
    fn test_wire_format() {
        let raw = json!({"eventType": "DELETE", "old": {"id": 7}});
        let event: ChangeEvent = serde_json::from_value(raw).unwrap();
        assert_eq!(event.kind(), Some(ChangeKind::Delete));
        assert_eq!(event.row(), Some(&json!({"id": 7})));
    }

    #[test]
    fn test_filter_matches() {
        let filter = StreamFilter::eq("post_id", "5");
        assert!(filter.matches(&json!({"post_id": "5"})));
        assert!(filter.matches(&json!({"post_id": 5})));
        assert!(!filter.matches(&json!({"post_id": "6"})));
        assert!(filter.matches(&json!({"id": 1})));
        assert!(StreamFilter::All.matches(&json!({"anything": true})));
        assert_eq!(filter.to_string(), "post_id=eq.5");
    }
}
