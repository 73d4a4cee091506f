//! Per-stream adapters
//!
//! Each adapter pairs a [`StreamSpec`](aniverse_sync::StreamSpec) for one
//! table with the domain operations that write to it. The generic
//! reconciler does the merging; adapters only validate input, build the
//! optimistic record, and compute derived values from the collection.

pub mod chat;
pub mod comments;
pub mod feed;
pub mod likes;

pub use chat::{ChatMessage, ChatSpec, ChatStream, MessageDeliveryStatus};
pub use comments::{CommentsSpec, CommentsStream};
pub use feed::{FeedSpec, FeedStream};
pub use likes::{LikeToggle, LikesSpec, LikesStream};

use aniverse_sync::SyncError;
use serde::Serialize;
use serde_json::Value;

/// Row sent to the store for a new record: the serialized record without the
/// columns the store assigns.
pub(crate) fn store_assigned_stripped<R: Serialize>(
    table: &str,
    record: &R,
) -> Result<Value, SyncError> {
    let mut row = serde_json::to_value(record).map_err(|e| SyncError::decode(table, e))?;
    if let Value::Object(map) = &mut row {
        map.remove("id");
        map.remove("created_at");
    }
    Ok(row)
}
