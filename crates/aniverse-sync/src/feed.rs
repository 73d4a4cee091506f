//! Push side of the remote store

use crate::SyncError;
use aniverse_core::{ChangeEvent, StreamFilter};
use std::fmt;
use std::sync::Arc;

/// Callback receiving change events for one subscription
pub type EventSink = Arc<dyn Fn(ChangeEvent) + Send + Sync>;

/// Feed-side identifier of a subscription
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FeedHandle(pub u64);

impl fmt::Display for FeedHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "feed-{}", self.0)
    }
}

/// Realtime change feed.
///
/// Events for a subscription are delivered to its sink, on whatever task the
/// feed runs on, until `unsubscribe` returns.
pub trait ChangeFeed: Send + Sync {
    /// Start delivering changes of `table` matching `filter` to `sink`
    fn subscribe(
        &self,
        table: &str,
        filter: &StreamFilter,
        sink: EventSink,
    ) -> Result<FeedHandle, SyncError>;

    /// Stop a subscription. Must tolerate handles the feed no longer knows,
    /// e.g. after the connection dropped.
    fn unsubscribe(&self, handle: FeedHandle);
}
