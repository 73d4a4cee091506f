//! # Live Streams
//!
//! A [`LiveStream`] is one reconciled collection kept current by the feed:
//! a [`Reconciler`] behind a lock, the subscription feeding it, and a
//! [`Dynamic`] the view layer reads. Every change to the collection is
//! republished.
//!
//! Mutations go through the stream so their optimistic entry, the store call,
//! and the settlement all land in the same collection. A mutation whose
//! stream was released while the store call was in flight settles nothing.

use crate::mutation::with_timeout;
use crate::{
    MutationClient, MutationError, Reconciler, StreamEntry, StreamSpec, SubscriptionHandle,
    SubscriptionManager, SyncError, DEFAULT_TOMBSTONE_CAPACITY,
};
use aniverse_core::reactive::Dynamic;
use aniverse_core::{ChangeEvent, RecordId};
use parking_lot::Mutex;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Tuning for a live stream
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamOptions {
    /// Deleted ids remembered per stream
    pub tombstone_capacity: usize,
    /// Deadline for each store call
    pub mutation_timeout: Duration,
}

impl Default for StreamOptions {
    fn default() -> Self {
        Self {
            tombstone_capacity: DEFAULT_TOMBSTONE_CAPACITY,
            mutation_timeout: Duration::from_secs(10),
        }
    }
}

/// Reconciled collection kept live by a feed subscription
pub struct LiveStream<S: StreamSpec> {
    state: Arc<Mutex<Reconciler<S>>>,
    published: Dynamic<Vec<StreamEntry<S::Record>>>,
    handle: SubscriptionHandle,
    client: Arc<dyn MutationClient>,
    options: StreamOptions,
}

impl<S: StreamSpec> Clone for LiveStream<S> {
    fn clone(&self) -> Self {
        Self {
            state: self.state.clone(),
            published: self.published.clone(),
            handle: self.handle.clone(),
            client: self.client.clone(),
            options: self.options,
        }
    }
}

impl<S: StreamSpec> fmt::Debug for LiveStream<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LiveStream")
            .field("reconciler", &*self.state.lock())
            .field("handle", &self.handle)
            .finish_non_exhaustive()
    }
}

impl<S: StreamSpec> LiveStream<S> {
    /// Subscribe a new stream for `(view, slot)`.
    ///
    /// The collection starts empty; seed it with [`LiveStream::resync`].
    pub fn open(
        subscriptions: &SubscriptionManager,
        view: &str,
        slot: &str,
        spec: S,
        client: Arc<dyn MutationClient>,
        options: StreamOptions,
    ) -> Result<Self, SyncError> {
        let table = spec.table().to_string();
        let filter = spec.filter();
        let state = Arc::new(Mutex::new(Reconciler::with_tombstone_capacity(
            spec,
            options.tombstone_capacity,
        )));
        let published = Dynamic::new(Vec::new());

        let sink = {
            let state = state.clone();
            let published = published.clone();
            move |event: ChangeEvent| {
                let mut reconciler = state.lock();
                match reconciler.apply_remote_event(&event) {
                    Ok(true) => published.set(reconciler.entries()),
                    Ok(false) => {}
                    Err(error) => tracing::warn!(
                        table = reconciler.spec().table(),
                        %error,
                        "Dropping undecodable change event"
                    ),
                }
            }
        };
        let handle = subscriptions.acquire(view, slot, &table, filter, sink)?;

        Ok(Self {
            state,
            published,
            handle,
            client,
            options,
        })
    }

    // ============================================================================
    // Reads
    // ============================================================================

    /// Published view of the collection
    pub fn view(&self) -> Dynamic<Vec<StreamEntry<S::Record>>> {
        self.published.clone()
    }

    /// Current entries in display order
    pub fn entries(&self) -> Vec<StreamEntry<S::Record>> {
        self.published.get()
    }

    /// Current records in display order
    pub fn records(&self) -> Vec<S::Record> {
        self.state.lock().records()
    }

    /// Number of visible entries
    pub fn len(&self) -> usize {
        self.state.lock().len()
    }

    /// Whether nothing is visible
    pub fn is_empty(&self) -> bool {
        self.state.lock().is_empty()
    }

    /// Number of unconfirmed entries
    pub fn pending_count(&self) -> usize {
        self.state.lock().pending_count()
    }

    /// Run a read against the reconciler
    pub fn with<R>(&self, f: impl FnOnce(&Reconciler<S>) -> R) -> R {
        f(&self.state.lock())
    }

    /// The subscription feeding this stream
    pub fn handle(&self) -> &SubscriptionHandle {
        &self.handle
    }

    /// Whether the subscription is still held
    pub fn is_live(&self) -> bool {
        self.handle.is_active()
    }

    /// Release the subscription. In-flight mutations settle nothing afterwards.
    pub fn close(&self, subscriptions: &SubscriptionManager) {
        subscriptions.release(&self.handle);
    }

    // ============================================================================
    // Seeding
    // ============================================================================

    /// Load a point-in-time read, initially or after the feed reconnected
    pub fn resync(&self, snapshot: Vec<S::Record>) -> usize {
        self.mutate(|r| r.load_initial_snapshot(snapshot))
    }

    /// Decode raw rows and load them as a snapshot
    pub fn resync_rows(&self, rows: &[serde_json::Value]) -> Result<usize, SyncError> {
        let records = {
            let state = self.state.lock();
            rows.iter()
                .map(|row| state.spec().decode(row))
                .collect::<Result<Vec<_>, _>>()?
        };
        Ok(self.resync(records))
    }

    // ============================================================================
    // Mutations
    // ============================================================================

    /// Show `record` at once and create it in the store
    pub async fn create(&self, record: S::Record) -> Result<RecordId, SyncError> {
        let (placeholder, table, row) = {
            let mut state = self.state.lock();
            let row = state.spec().insert_row(&record)?;
            let table = state.spec().table().to_string();
            let placeholder = state.apply_local_optimistic(record);
            self.published.set(state.entries());
            (placeholder, table, row)
        };

        let timeout = self.options.mutation_timeout;
        let response = with_timeout(timeout, self.client.create(&table, row)).await;

        if !self.is_live() {
            tracing::debug!(%table, id = %placeholder, "Stream released before insert settled");
            return response.and_then(|row| {
                self.state
                    .lock()
                    .spec()
                    .row_id(&row)
                    .map_err(|e| MutationError::Decode {
                        message: e.to_string(),
                    })
            })
            .map_err(SyncError::from);
        }

        self.mutate(|state| {
            let outcome = response.and_then(|row| {
                state.spec().decode(&row).map_err(|e| MutationError::Decode {
                    message: e.to_string(),
                })
            });
            state.resolve_local_mutation(placeholder, outcome)
        })
    }

    /// Hide `id` at once and delete it in the store
    pub async fn delete(&self, id: &RecordId) -> Result<(), SyncError> {
        let (pending, table) = {
            let mut state = self.state.lock();
            let table = state.spec().table().to_string();
            let pending = state
                .apply_local_delete(id)
                .ok_or_else(|| SyncError::UnknownRecord { id: id.to_string() })?;
            self.published.set(state.entries());
            (pending, table)
        };

        let timeout = self.options.mutation_timeout;
        let response = with_timeout(timeout, self.client.delete(&table, id)).await;

        if !self.is_live() {
            tracing::debug!(%table, %id, "Stream released before delete settled");
            return response.map_err(SyncError::from);
        }

        self.mutate(|state| state.resolve_local_delete(pending, response))
    }

    /// Apply `f` under the lock and republish
    fn mutate<R>(&self, f: impl FnOnce(&mut Reconciler<S>) -> R) -> R {
        let mut state = self.state.lock();
        let result = f(&mut state);
        self.published.set(state.entries());
        result
    }
}
