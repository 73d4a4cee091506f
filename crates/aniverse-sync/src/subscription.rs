//! # Subscription Lifecycle
//!
//! Ties feed subscriptions to the views that own them. Every subscription is
//! keyed by `(view, slot)`; acquiring a key that is already held releases the
//! old subscription first, so a view can never leak a stream it replaced.
//!
//! Each handle carries a liveness flag checked by the sink wrapper: once a
//! subscription is released, events the feed still had in flight are dropped.

use crate::{ChangeFeed, EventSink, FeedHandle, SyncError};
use aniverse_core::{ChangeEvent, StreamFilter};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

/// A held feed subscription
#[derive(Clone)]
pub struct SubscriptionHandle {
    id: u64,
    view: String,
    slot: String,
    table: String,
    filter: StreamFilter,
    alive: Arc<AtomicBool>,
}

impl SubscriptionHandle {
    /// Owning view
    pub fn view(&self) -> &str {
        &self.view
    }

    /// Slot within the view
    pub fn slot(&self) -> &str {
        &self.slot
    }

    /// Subscribed table
    pub fn table(&self) -> &str {
        &self.table
    }

    /// Subscription filter
    pub fn filter(&self) -> &StreamFilter {
        &self.filter
    }

    /// Whether events are still delivered
    pub fn is_active(&self) -> bool {
        self.alive.load(Ordering::Acquire)
    }

    fn key(&self) -> (String, String) {
        (self.view.clone(), self.slot.clone())
    }
}

impl fmt::Debug for SubscriptionHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SubscriptionHandle")
            .field("id", &self.id)
            .field("view", &self.view)
            .field("slot", &self.slot)
            .field("table", &self.table)
            .field("filter", &self.filter)
            .field("active", &self.is_active())
            .finish()
    }
}

struct ActiveSubscription {
    handle: SubscriptionHandle,
    feed_handle: FeedHandle,
}

/// Owns every feed subscription of the client
pub struct SubscriptionManager {
    feed: Arc<dyn ChangeFeed>,
    active: Mutex<HashMap<(String, String), ActiveSubscription>>,
    next_id: AtomicU64,
}

impl fmt::Debug for SubscriptionManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SubscriptionManager")
            .field("active", &self.active_count())
            .finish_non_exhaustive()
    }
}

impl SubscriptionManager {
    /// Create a manager over a feed
    pub fn new(feed: Arc<dyn ChangeFeed>) -> Self {
        Self {
            feed,
            active: Mutex::new(HashMap::new()),
            next_id: AtomicU64::new(0),
        }
    }

    /// Subscribe `sink` to `table`/`filter` on behalf of `(view, slot)`.
    ///
    /// A subscription already held under the same key is released first.
    pub fn acquire<F>(
        &self,
        view: &str,
        slot: &str,
        table: &str,
        filter: StreamFilter,
        sink: F,
    ) -> Result<SubscriptionHandle, SyncError>
    where
        F: Fn(ChangeEvent) + Send + Sync + 'static,
    {
        let key = (view.to_string(), slot.to_string());
        let previous = self.active.lock().remove(&key);
        if let Some(previous) = previous {
            self.close(previous);
        }

        let alive = Arc::new(AtomicBool::new(true));
        let handle = SubscriptionHandle {
            id: self.next_id.fetch_add(1, Ordering::Relaxed),
            view: view.to_string(),
            slot: slot.to_string(),
            table: table.to_string(),
            filter: filter.clone(),
            alive: alive.clone(),
        };

        let guarded: EventSink = {
            let table = table.to_string();
            Arc::new(move |event: ChangeEvent| {
                if alive.load(Ordering::Acquire) {
                    sink(event);
                } else {
                    tracing::debug!(table = %table, "Dropping event for released subscription");
                }
            })
        };

        let feed_handle = self.feed.subscribe(table, &filter, guarded).map_err(|e| {
            handle.alive.store(false, Ordering::Release);
            e
        })?;

        tracing::info!(
            view,
            slot,
            table,
            filter = %filter,
            feed = %feed_handle,
            "Subscription acquired"
        );
        self.active.lock().insert(
            key,
            ActiveSubscription {
                handle: handle.clone(),
                feed_handle,
            },
        );
        Ok(handle)
    }

    /// Release a subscription. Releasing twice, or after it was replaced,
    /// only clears the handle's liveness flag.
    pub fn release(&self, handle: &SubscriptionHandle) {
        handle.alive.store(false, Ordering::Release);

        let removed = {
            let mut active = self.active.lock();
            let key = handle.key();
            match active.get(&key) {
                Some(current) if current.handle.id == handle.id => active.remove(&key),
                _ => None,
            }
        };
        if let Some(subscription) = removed {
            self.close(subscription);
        }
    }

    /// Release every subscription owned by `view`
    pub fn release_view(&self, view: &str) -> usize {
        let removed: Vec<ActiveSubscription> = {
            let mut active = self.active.lock();
            let keys: Vec<(String, String)> =
                active.keys().filter(|(v, _)| v == view).cloned().collect();
            keys.iter().filter_map(|key| active.remove(key)).collect()
        };
        let count = removed.len();
        for subscription in removed {
            self.close(subscription);
        }
        count
    }

    /// Release everything
    pub fn release_all(&self) {
        let removed: Vec<ActiveSubscription> =
            self.active.lock().drain().map(|(_, s)| s).collect();
        for subscription in removed {
            self.close(subscription);
        }
    }

    /// Whether `(view, slot)` currently holds a subscription
    pub fn is_active(&self, view: &str, slot: &str) -> bool {
        self.active
            .lock()
            .contains_key(&(view.to_string(), slot.to_string()))
    }

    /// Number of held subscriptions
    pub fn active_count(&self) -> usize {
        self.active.lock().len()
    }

    fn close(&self, subscription: ActiveSubscription) {
        let ActiveSubscription {
            handle,
            feed_handle,
        } = subscription;
        handle.alive.store(false, Ordering::Release);
        self.feed.unsubscribe(feed_handle);
        tracing::info!(
            view = %handle.view,
            slot = %handle.slot,
            table = %handle.table,
            feed = %feed_handle,
            "Subscription released"
        );
    }
}

impl Drop for SubscriptionManager {
    fn drop(&mut self) {
        self.release_all();
    }
}
