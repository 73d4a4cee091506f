//! In-memory change feed that records what was subscribed

use aniverse_core::{ChangeEvent, StreamFilter};
use aniverse_sync::{ChangeFeed, EventSink, FeedHandle, SyncError};
use parking_lot::Mutex;
use std::collections::BTreeMap;

/// A call the feed received
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeedCall {
    /// `subscribe` succeeded
    Subscribe {
        /// Assigned handle
        handle: FeedHandle,
        /// Subscribed table
        table: String,
        /// Subscription filter
        filter: StreamFilter,
    },
    /// `unsubscribe` was called
    Unsubscribe {
        /// Released handle
        handle: FeedHandle,
    },
}

struct SpySubscription {
    table: String,
    filter: StreamFilter,
    sink: EventSink,
}

#[derive(Default)]
struct SpyState {
    next: u64,
    subscriptions: BTreeMap<FeedHandle, SpySubscription>,
    calls: Vec<FeedCall>,
    fail_next: Option<String>,
}

/// Change feed double.
///
/// Delivers events synchronously to every live subscription of a table whose
/// filter matches the row, the way the store scopes subscriptions server-side.
#[derive(Default)]
pub struct SpyFeed {
    state: Mutex<SpyState>,
}

impl std::fmt::Debug for SpyFeed {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.lock();
        f.debug_struct("SpyFeed")
            .field("active", &state.subscriptions.len())
            .field("calls", &state.calls)
            .finish()
    }
}

impl SpyFeed {
    /// Create an empty feed
    pub fn new() -> Self {
        Self::default()
    }

    /// Deliver `event` on `table`; returns how many subscriptions received it
    pub fn emit(&self, table: &str, event: ChangeEvent) -> usize {
        let sinks: Vec<EventSink> = {
            let state = self.state.lock();
            state
                .subscriptions
                .values()
                .filter(|sub| sub.table == table)
                .filter(|sub| event.row().map_or(true, |row| sub.filter.matches(row)))
                .map(|sub| sub.sink.clone())
                .collect()
        };
        for sink in &sinks {
            sink(event.clone());
        }
        sinks.len()
    }

    /// Number of live subscriptions
    pub fn active_count(&self) -> usize {
        self.state.lock().subscriptions.len()
    }

    /// Filters of the live subscriptions on `table`
    pub fn active_filters(&self, table: &str) -> Vec<StreamFilter> {
        self.state
            .lock()
            .subscriptions
            .values()
            .filter(|sub| sub.table == table)
            .map(|sub| sub.filter.clone())
            .collect()
    }

    /// Every call received so far
    pub fn calls(&self) -> Vec<FeedCall> {
        self.state.lock().calls.clone()
    }

    /// Sink of a subscription, kept even after it is released, to simulate
    /// an event the transport already had in flight
    pub fn sink(&self, handle: FeedHandle) -> Option<EventSink> {
        self.state
            .lock()
            .subscriptions
            .get(&handle)
            .map(|sub| sub.sink.clone())
    }

    /// Handle of the most recent subscription
    pub fn last_handle(&self) -> Option<FeedHandle> {
        self.state.lock().subscriptions.keys().next_back().copied()
    }

    /// Drop every subscription as a lost connection would
    pub fn disconnect(&self) {
        self.state.lock().subscriptions.clear();
    }

    /// Make the next `subscribe` fail
    pub fn fail_next_subscribe(&self, message: impl Into<String>) {
        self.state.lock().fail_next = Some(message.into());
    }
}

impl ChangeFeed for SpyFeed {
    fn subscribe(
        &self,
        table: &str,
        filter: &StreamFilter,
        sink: EventSink,
    ) -> Result<FeedHandle, SyncError> {
        let mut state = self.state.lock();
        if let Some(message) = state.fail_next.take() {
            return Err(SyncError::feed(message));
        }

        let handle = FeedHandle(state.next);
        state.next += 1;
        state.subscriptions.insert(
            handle,
            SpySubscription {
                table: table.to_string(),
                filter: filter.clone(),
                sink,
            },
        );
        state.calls.push(FeedCall::Subscribe {
            handle,
            table: table.to_string(),
            filter: filter.clone(),
        });
        Ok(handle)
    }

    fn unsubscribe(&self, handle: FeedHandle) {
        let mut state = self.state.lock();
        state.subscriptions.remove(&handle);
        state.calls.push(FeedCall::Unsubscribe { handle });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn test_emit_respects_table_and_filter() {
        let feed = SpyFeed::new();
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = hits.clone();
        let sink: EventSink = Arc::new(move |_: ChangeEvent| {
            counter.fetch_add(1, Ordering::Relaxed);
        });

        feed.subscribe("post_likes", &StreamFilter::eq("post_id", "1"), sink)
            .unwrap();

        assert_eq!(feed.emit("post_likes", ChangeEvent::insert(json!({"id": 1, "post_id": 1}))), 1);
        assert_eq!(feed.emit("post_likes", ChangeEvent::insert(json!({"id": 2, "post_id": 2}))), 0);
        assert_eq!(feed.emit("comments", ChangeEvent::insert(json!({"id": 3, "post_id": 1}))), 0);
        assert_eq!(hits.load(Ordering::Relaxed), 1);
    }

    #[test]
    fn test_records_calls_and_disconnect() {
        let feed = SpyFeed::new();
        let handle = feed
            .subscribe("messages", &StreamFilter::eq("chat_id", "a"), Arc::new(|_: ChangeEvent| {}))
            .unwrap();
        assert_eq!(feed.last_handle(), Some(handle));

        feed.unsubscribe(handle);
        feed.unsubscribe(handle);
        assert_eq!(feed.active_count(), 0);
        assert_eq!(feed.calls().len(), 3);

        feed.subscribe("messages", &StreamFilter::All, Arc::new(|_: ChangeEvent| {})).unwrap();
        feed.disconnect();
        assert_eq!(feed.active_count(), 0);

        feed.fail_next_subscribe("socket closed");
        let sink: EventSink = Arc::new(|_: ChangeEvent| {});
        assert!(feed.subscribe("messages", &StreamFilter::All, sink).is_err());
    }
}
