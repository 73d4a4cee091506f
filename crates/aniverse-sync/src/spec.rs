//! Per-stream parameters for the generic reconciler

use crate::SyncError;
use aniverse_core::{RecordId, StreamFilter};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::fmt::Debug;

/// Describes one entity stream: where its rows come from, how they are
/// identified, and the order they are shown in.
///
/// The reconciler is written once against this trait; each stream (posts,
/// likes, comments, messages) only supplies these parameters.
pub trait StreamSpec: Send + Sync + 'static {
    /// Decoded row type
    type Record: Clone + Debug + Serialize + DeserializeOwned + Send + Sync + 'static;

    /// Sort key. Entries iterate in ascending key order, ties broken by id.
    type Key: Ord + Clone + Debug + Send + Sync + 'static;

    /// Source table
    fn table(&self) -> &str;

    /// Subscription filter; remote rows outside it are ignored
    fn filter(&self) -> StreamFilter;

    /// Sort key of a record
    fn sort_key(&self, record: &Self::Record) -> Self::Key;

    /// Canonical id of a record
    fn record_id(&self, record: &Self::Record) -> RecordId;

    /// Key that identifies "the same logical entity" across a placeholder
    /// and its canonical row, when the stream has one (e.g. one like per
    /// user per post).
    fn correlation_key(&self, _record: &Self::Record) -> Option<String> {
        None
    }

    /// Column holding the record id in raw rows
    fn id_column(&self) -> &str {
        "id"
    }

    /// Decode a raw row
    fn decode(&self, row: &Value) -> Result<Self::Record, SyncError> {
        serde_json::from_value(row.clone()).map_err(|e| SyncError::decode(self.table(), e))
    }

    /// Extract the record id from a raw row, which may be a key-only image
    fn row_id(&self, row: &Value) -> Result<RecordId, SyncError> {
        let raw = row
            .get(self.id_column())
            .filter(|v| !v.is_null())
            .ok_or_else(|| {
                SyncError::decode(self.table(), format!("row has no '{}'", self.id_column()))
            })?;
        serde_json::from_value(raw.clone()).map_err(|e| SyncError::decode(self.table(), e))
    }

    /// Row sent to the store when creating a record optimistically.
    ///
    /// Defaults to the serialized record without its client-side id.
    fn insert_row(&self, record: &Self::Record) -> Result<Value, SyncError> {
        let mut row =
            serde_json::to_value(record).map_err(|e| SyncError::decode(self.table(), e))?;
        if let Value::Object(map) = &mut row {
            map.remove(self.id_column());
        }
        Ok(row)
    }
}
