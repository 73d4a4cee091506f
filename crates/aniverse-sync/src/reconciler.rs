//! # Entity Reconciler
//!
//! Merges three sources of truth for one entity stream into a single ordered
//! collection:
//!
//! - **Local optimistic changes**: entries shown under a placeholder id before
//!   the store has answered
//! - **Mutation outcomes**: the store's answer to a local change
//! - **Remote change events**: inserts, updates, and deletes pushed by the feed,
//!   including echoes of the client's own writes
//!
//! The collection always holds at most one entry per canonical id and iterates
//! in `(sort key, id)` order, whatever order those sources are interleaved in.
//!
//! ```rust
//! # use aniverse_core::{ChangeEvent, RecordId, StreamFilter};
//! # use aniverse_sync::{Reconciler, StreamSpec};
//! # use serde::{Deserialize, Serialize};
//! # #[derive(Debug, Clone, Serialize, Deserialize)]
//! # struct Row { id: RecordId, n: u32 }
//! # struct Rows;
//! # impl StreamSpec for Rows {
//! #     type Record = Row;
//! #     type Key = u32;
//! #     fn table(&self) -> &str { "rows" }
//! #     fn filter(&self) -> StreamFilter { StreamFilter::All }
//! #     fn sort_key(&self, r: &Row) -> u32 { r.n }
//! #     fn record_id(&self, r: &Row) -> RecordId { r.id.clone() }
//! # }
//! let mut rows = Reconciler::new(Rows);
//! let placeholder = rows.apply_local_optimistic(Row { id: RecordId::new(""), n: 1 });
//! assert_eq!(rows.len(), 1);
//!
//! // The feed echoes the insert before the store answers
//! rows.apply_remote_event(&ChangeEvent::insert(serde_json::json!({"id": "9", "n": 1})))?;
//! let id = rows.resolve_local_mutation(placeholder, Ok(Row { id: RecordId::new("9"), n: 1 }))?;
//! assert_eq!(id.as_str(), "9");
//! assert_eq!(rows.len(), 1);
//! # Ok::<(), aniverse_sync::SyncError>(())
//! ```

use crate::{MutationError, StreamSpec, SyncError};
use aniverse_core::{ChangeEvent, ChangeKind, EntityId, PlaceholderId, RecordId};
use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};
use std::fmt;

/// Tombstone capacity used when none is configured
pub const DEFAULT_TOMBSTONE_CAPACITY: usize = 256;

/// Handle for an optimistic delete awaiting the store's answer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PendingDeleteId(u64);

impl fmt::Display for PendingDeleteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "delete-{}", self.0)
    }
}

/// One entry of a materialized collection
#[derive(Debug, Clone, PartialEq)]
pub struct StreamEntry<R> {
    /// Placeholder or canonical identity
    pub id: EntityId,
    /// Current record value
    pub record: R,
}

impl<R> StreamEntry<R> {
    /// Whether the store has not confirmed this entry yet
    pub fn is_pending(&self) -> bool {
        self.id.is_pending()
    }
}

/// Bounded set of ids, oldest forgotten first
#[derive(Debug)]
struct RecentIds {
    order: VecDeque<RecordId>,
    ids: HashSet<RecordId>,
    capacity: usize,
}

impl RecentIds {
    fn new(capacity: usize) -> Self {
        Self {
            order: VecDeque::new(),
            ids: HashSet::new(),
            capacity: capacity.max(1),
        }
    }

    fn insert(&mut self, id: RecordId) {
        if self.ids.contains(&id) {
            return;
        }
        if self.order.len() == self.capacity {
            if let Some(oldest) = self.order.pop_front() {
                self.ids.remove(&oldest);
            }
        }
        self.ids.insert(id.clone());
        self.order.push_back(id);
    }

    fn remove(&mut self, id: &RecordId) {
        if self.ids.remove(id) {
            self.order.retain(|kept| kept != id);
        }
    }

    fn contains(&self, id: &RecordId) -> bool {
        self.ids.contains(id)
    }

    fn clear(&mut self) {
        self.order.clear();
        self.ids.clear();
    }

    fn len(&self) -> usize {
        self.order.len()
    }
}

/// Record hidden by an optimistic delete, kept for rollback
#[derive(Debug)]
struct Hidden<R> {
    record: R,
    /// A remote delete (or the row leaving the stream) arrived meanwhile
    confirmed_gone: bool,
}

/// Generic merge of optimistic, confirmed, and pushed changes for one stream
pub struct Reconciler<S: StreamSpec> {
    spec: S,
    entries: BTreeMap<(S::Key, EntityId), S::Record>,
    keys: HashMap<EntityId, S::Key>,
    /// Placeholders already replaced by a correlated feed insert
    promoted: HashMap<PlaceholderId, RecordId>,
    hidden: HashMap<RecordId, Hidden<S::Record>>,
    pending_deletes: HashMap<PendingDeleteId, RecordId>,
    next_delete: u64,
    /// Deleted ids
    tombstones: RecentIds,
    /// Visible or hidden canonical ids learned since the last snapshot
    touched: HashSet<RecordId>,
    /// Ids that left the filter since the last snapshot
    departed: RecentIds,
}

impl<S: StreamSpec> fmt::Debug for Reconciler<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Reconciler")
            .field("table", &self.spec.table())
            .field("filter", &self.spec.filter())
            .field("entries", &self.entries.len())
            .field("pending", &self.pending_count())
            .field("pending_deletes", &self.pending_deletes.len())
            .field("tombstones", &self.tombstones.len())
            .field("touched", &self.touched.len())
            .finish()
    }
}

impl<S: StreamSpec> Reconciler<S> {
    /// Create an empty reconciler
    pub fn new(spec: S) -> Self {
        Self::with_tombstone_capacity(spec, DEFAULT_TOMBSTONE_CAPACITY)
    }

    /// Create an empty reconciler remembering up to `capacity` deleted ids
    pub fn with_tombstone_capacity(spec: S, capacity: usize) -> Self {
        Self {
            spec,
            entries: BTreeMap::new(),
            keys: HashMap::new(),
            promoted: HashMap::new(),
            hidden: HashMap::new(),
            pending_deletes: HashMap::new(),
            next_delete: 0,
            tombstones: RecentIds::new(capacity),
            touched: HashSet::new(),
            departed: RecentIds::new(capacity),
        }
    }

    /// The stream parameters
    pub fn spec(&self) -> &S {
        &self.spec
    }

    // ============================================================================
    // Local changes
    // ============================================================================

    /// Show `record` immediately under a fresh placeholder id
    pub fn apply_local_optimistic(&mut self, record: S::Record) -> PlaceholderId {
        let placeholder = PlaceholderId::new();
        tracing::debug!(
            table = self.spec.table(),
            id = %placeholder,
            "Applying optimistic insert"
        );
        self.insert_entry(EntityId::Pending(placeholder), record);
        placeholder
    }

    /// Settle an optimistic insert with the store's answer.
    ///
    /// On success the placeholder is replaced by the canonical record at its
    /// sorted position. If that id is already present it is updated in place;
    /// if it was deleted meanwhile it stays deleted. On failure the
    /// placeholder is removed and the failure returned.
    ///
    /// A placeholder already promoted by a correlated feed insert is settled
    /// even if the store reported a failure, since the feed proved the row
    /// exists.
    pub fn resolve_local_mutation(
        &mut self,
        placeholder: PlaceholderId,
        outcome: Result<S::Record, MutationError>,
    ) -> Result<RecordId, SyncError> {
        if let Some(canonical) = self.promoted.remove(&placeholder) {
            return match outcome {
                Ok(record) => Ok(self.confirm(record)),
                Err(error) => {
                    tracing::debug!(
                        table = self.spec.table(),
                        id = %canonical,
                        %error,
                        "Mutation failure superseded by feed confirmation"
                    );
                    Ok(canonical)
                }
            };
        }

        if self.remove_entry(&EntityId::Pending(placeholder)).is_none() {
            return Err(SyncError::UnknownMutation {
                id: placeholder.to_string(),
            });
        }

        match outcome {
            Ok(record) => Ok(self.confirm(record)),
            Err(source) => {
                tracing::warn!(
                    table = self.spec.table(),
                    id = %placeholder,
                    error = %source,
                    "Optimistic insert rolled back"
                );
                Err(SyncError::OptimisticMutationFailed { source })
            }
        }
    }

    /// Hide a canonical record until the store confirms its deletion.
    ///
    /// Returns `None` when the record is not visible in this stream.
    pub fn apply_local_delete(&mut self, id: &RecordId) -> Option<PendingDeleteId> {
        let record = self.remove_entry(&EntityId::Canonical(id.clone()))?;
        let delete_id = PendingDeleteId(self.next_delete);
        self.next_delete += 1;

        tracing::debug!(table = self.spec.table(), %id, "Applying optimistic delete");
        self.hidden.insert(
            id.clone(),
            Hidden {
                record,
                confirmed_gone: false,
            },
        );
        self.pending_deletes.insert(delete_id, id.clone());
        Some(delete_id)
    }

    /// Settle an optimistic delete.
    ///
    /// On failure the record comes back, including any remote update that
    /// arrived while it was hidden, unless the feed already reported it gone.
    pub fn resolve_local_delete(
        &mut self,
        delete_id: PendingDeleteId,
        outcome: Result<(), MutationError>,
    ) -> Result<(), SyncError> {
        let unknown = || SyncError::UnknownMutation {
            id: delete_id.to_string(),
        };
        let id = self.pending_deletes.remove(&delete_id).ok_or_else(unknown)?;
        let hidden = self.hidden.remove(&id).ok_or_else(unknown)?;

        match outcome {
            Ok(()) => {
                self.bury(id);
                Ok(())
            }
            Err(error) if hidden.confirmed_gone => {
                self.touched.remove(&id);
                tracing::debug!(
                    table = self.spec.table(),
                    %id,
                    %error,
                    "Delete failure superseded by feed confirmation"
                );
                Ok(())
            }
            Err(source) => {
                tracing::warn!(
                    table = self.spec.table(),
                    %id,
                    error = %source,
                    "Optimistic delete rolled back"
                );
                self.insert_entry(EntityId::Canonical(id), hidden.record);
                Err(SyncError::OptimisticMutationFailed { source })
            }
        }
    }

    // ============================================================================
    // Remote changes
    // ============================================================================

    /// Apply one pushed change. Returns whether the visible collection changed.
    pub fn apply_remote_event(&mut self, event: &ChangeEvent) -> Result<bool, SyncError> {
        let (Some(kind), Some(row)) = (event.kind(), event.row()) else {
            tracing::debug!(table = self.spec.table(), "Ignoring change event without a row");
            return Ok(false);
        };
        let in_stream = self.spec.filter().matches(row);

        match kind {
            ChangeKind::Insert if in_stream => {
                let record = self.spec.decode(row)?;
                Ok(self.remote_insert(record))
            }
            ChangeKind::Update if in_stream => {
                let record = self.spec.decode(row)?;
                Ok(self.remote_update(record))
            }
            ChangeKind::Update => {
                let id = self.spec.row_id(row)?;
                Ok(self.leave_stream(id))
            }
            ChangeKind::Delete if in_stream => {
                let id = self.spec.row_id(row)?;
                Ok(self.remote_delete(id))
            }
            _ => {
                tracing::trace!(table = self.spec.table(), %kind, "Row outside stream filter");
                Ok(false)
            }
        }
    }

    /// Seed or re-seed the canonical set from a point-in-time read.
    ///
    /// Records changed by an event or a mutation outcome since the previous
    /// snapshot keep their newer version, deleted ids stay deleted, and
    /// placeholders are kept. Returns the number of snapshot records taken.
    pub fn load_initial_snapshot(
        &mut self,
        records: impl IntoIterator<Item = S::Record>,
    ) -> usize {
        let stale: HashSet<RecordId> = self
            .keys
            .keys()
            .filter_map(EntityId::record_id)
            .filter(|id| !self.touched.contains(*id))
            .cloned()
            .collect();
        for id in &stale {
            self.remove_entry(&EntityId::Canonical(id.clone()));
        }

        let mut loaded = 0;
        for record in records {
            let id = self.spec.record_id(&record);
            if self.touched.contains(&id)
                || self.tombstones.contains(&id)
                || self.departed.contains(&id)
            {
                continue;
            }
            if let Some(hidden) = self.hidden.get_mut(&id) {
                hidden.record = record;
                continue;
            }
            // Rows shown before this read cannot be the echo of a pending write
            if !stale.contains(&id) {
                self.promote_correlated(&record, &id);
            }
            self.insert_entry(EntityId::Canonical(id), record);
            loaded += 1;
        }
        self.touched.clear();
        self.departed.clear();

        tracing::debug!(
            table = self.spec.table(),
            filter = %self.spec.filter(),
            loaded,
            dropped = stale.len(),
            total = self.len(),
            "Loaded snapshot"
        );
        loaded
    }

    // ============================================================================
    // Queries
    // ============================================================================

    /// Entries in display order
    pub fn iter(&self) -> impl Iterator<Item = (&EntityId, &S::Record)> {
        self.entries.iter().map(|((_, id), record)| (id, record))
    }

    /// Records in display order
    pub fn records(&self) -> Vec<S::Record> {
        self.entries.values().cloned().collect()
    }

    /// Entries with their identities, in display order
    pub fn entries(&self) -> Vec<StreamEntry<S::Record>> {
        self.iter()
            .map(|(id, record)| StreamEntry {
                id: id.clone(),
                record: record.clone(),
            })
            .collect()
    }

    /// Number of visible entries (computed, not stored)
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing is visible
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of visible placeholders
    pub fn pending_count(&self) -> usize {
        self.keys.keys().filter(|id| id.is_pending()).count()
    }

    /// Number of optimistic deletes awaiting an answer
    pub fn pending_delete_count(&self) -> usize {
        self.pending_deletes.len()
    }

    /// Visible record by canonical id
    pub fn get(&self, id: &RecordId) -> Option<&S::Record> {
        self.get_entry(&EntityId::Canonical(id.clone()))
    }

    /// Whether an entry with this identity is visible
    pub fn contains(&self, id: &EntityId) -> bool {
        self.keys.contains_key(id)
    }

    /// Whether a remote or confirmed delete for this id is remembered
    pub fn is_tombstoned(&self, id: &RecordId) -> bool {
        self.tombstones.contains(id)
    }

    // ============================================================================
    // Internals
    // ============================================================================

    /// Remember that `id` changed since the last snapshot
    fn touch(&mut self, id: &RecordId) {
        self.departed.remove(id);
        if !self.tombstones.contains(id) {
            self.touched.insert(id.clone());
        }
    }

    /// Tombstone `id`; the tombstone alone keeps snapshots from restoring it
    fn bury(&mut self, id: RecordId) {
        self.touched.remove(&id);
        self.departed.remove(&id);
        self.tombstones.insert(id);
    }

    fn confirm(&mut self, record: S::Record) -> RecordId {
        let id = self.spec.record_id(&record);
        self.touch(&id);
        if self.upsert_canonical(record) {
            tracing::debug!(table = self.spec.table(), %id, "Optimistic insert confirmed");
        }
        id
    }

    fn remote_insert(&mut self, record: S::Record) -> bool {
        let id = self.spec.record_id(&record);
        self.touch(&id);

        if self.tombstones.contains(&id) || self.hidden.contains_key(&id) {
            return false;
        }
        if self.keys.contains_key(&EntityId::Canonical(id.clone())) {
            tracing::trace!(table = self.spec.table(), %id, "Duplicate insert ignored");
            return false;
        }

        self.promote_correlated(&record, &id);
        self.insert_entry(EntityId::Canonical(id), record);
        true
    }

    fn remote_update(&mut self, record: S::Record) -> bool {
        let id = self.spec.record_id(&record);
        let known = self.hidden.contains_key(&id)
            || self.keys.contains_key(&EntityId::Canonical(id.clone()));
        if !known {
            return self.remote_insert(record);
        }
        self.touch(&id);
        self.upsert_canonical(record)
    }

    fn remote_delete(&mut self, id: RecordId) -> bool {
        self.bury(id.clone());
        if let Some(hidden) = self.hidden.get_mut(&id) {
            hidden.confirmed_gone = true;
        }
        self.remove_entry(&EntityId::Canonical(id)).is_some()
    }

    fn leave_stream(&mut self, id: RecordId) -> bool {
        self.touched.remove(&id);
        self.departed.insert(id.clone());
        if let Some(hidden) = self.hidden.get_mut(&id) {
            hidden.confirmed_gone = true;
        }
        let removed = self.remove_entry(&EntityId::Canonical(id.clone())).is_some();
        if removed {
            tracing::debug!(table = self.spec.table(), %id, "Row left stream filter");
        }
        removed
    }

    /// Replace the pending placeholder for the same logical entity.
    ///
    /// Nothing is promoted when several placeholders share the key, since
    /// the row could be the echo of any of them.
    fn promote_correlated(&mut self, record: &S::Record, id: &RecordId) {
        let Some(key) = self.spec.correlation_key(record) else {
            return;
        };
        let mut matching = self.entries.iter().filter_map(|((_, entity), candidate)| {
            match entity {
                EntityId::Pending(placeholder)
                    if self.spec.correlation_key(candidate).as_deref() == Some(key.as_str()) =>
                {
                    Some(*placeholder)
                }
                _ => None,
            }
        });
        let placeholder = match (matching.next(), matching.next()) {
            (Some(placeholder), None) => Some(placeholder),
            (Some(_), Some(_)) => {
                tracing::trace!(table = self.spec.table(), %id, "Ambiguous echo not promoted");
                None
            }
            _ => None,
        };

        if let Some(placeholder) = placeholder {
            self.remove_entry(&EntityId::Pending(placeholder));
            self.promoted.insert(placeholder, id.clone());
            tracing::debug!(
                table = self.spec.table(),
                %id,
                placeholder = %placeholder,
                "Placeholder promoted by feed"
            );
        }
    }

    /// Insert or replace a canonical record unless deleted or hidden.
    /// Returns whether the visible collection changed.
    fn upsert_canonical(&mut self, record: S::Record) -> bool {
        let id = self.spec.record_id(&record);
        if self.tombstones.contains(&id) {
            tracing::debug!(table = self.spec.table(), %id, "Not resurrecting deleted record");
            return false;
        }
        if let Some(hidden) = self.hidden.get_mut(&id) {
            hidden.record = record;
            return false;
        }
        self.insert_entry(EntityId::Canonical(id), record);
        true
    }

    fn insert_entry(&mut self, id: EntityId, record: S::Record) {
        let key = self.spec.sort_key(&record);
        if let Some(previous) = self.keys.insert(id.clone(), key.clone()) {
            self.entries.remove(&(previous, id.clone()));
        }
        self.entries.insert((key, id), record);
    }

    fn remove_entry(&mut self, id: &EntityId) -> Option<S::Record> {
        let key = self.keys.remove(id)?;
        self.entries.remove(&(key, id.clone()))
    }

    fn get_entry(&self, id: &EntityId) -> Option<&S::Record> {
        let key = self.keys.get(id)?;
        self.entries.get(&(key.clone(), id.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aniverse_core::StreamFilter;
    use assert_matches::assert_matches;
    use serde::{Deserialize, Serialize};
    use serde_json::json;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Row {
        id: RecordId,
        owner: String,
        at: u32,
        #[serde(default)]
        body: String,
    }

    /// Rows of one owner ordered by `at`, one per (owner, body) when correlated
    struct Rows {
        owner: &'static str,
        correlate: bool,
    }

    impl StreamSpec for Rows {
        type Record = Row;
        type Key = u32;

        fn table(&self) -> &str {
            "rows"
        }

        fn filter(&self) -> StreamFilter {
            StreamFilter::eq("owner", self.owner)
        }

        fn sort_key(&self, record: &Row) -> u32 {
            record.at
        }

        fn record_id(&self, record: &Row) -> RecordId {
            record.id.clone()
        }

        fn correlation_key(&self, record: &Row) -> Option<String> {
            self.correlate.then(|| record.body.clone())
        }
    }

    fn rows() -> Reconciler<Rows> {
        Reconciler::new(Rows {
            owner: "a",
            correlate: false,
        })
    }

    fn row(id: &str, at: u32) -> Row {
        Row {
            id: RecordId::new(id),
            owner: "a".into(),
            at,
            body: String::new(),
        }
    }

    fn json_row(id: &str, at: u32) -> serde_json::Value {
        json!({"id": id, "owner": "a", "at": at})
    }

    fn ids(r: &Reconciler<Rows>) -> Vec<String> {
        r.iter().map(|(id, _)| id.to_string()).collect()
    }

    #[test]
    fn test_echo_after_resolve_is_deduplicated() {
        let mut r = rows();
        let ph = r.apply_local_optimistic(row("", 5));
        assert_eq!(r.pending_count(), 1);

        r.resolve_local_mutation(ph, Ok(row("42", 5))).unwrap();
        assert!(!r.apply_remote_event(&ChangeEvent::insert(json_row("42", 5))).unwrap());

        assert_eq!(ids(&r), vec!["42"]);
        assert_eq!(r.pending_count(), 0);
    }

    #[test]
    fn test_resolve_updates_existing_canonical_in_place() {
        let mut r = rows();
        let ph = r.apply_local_optimistic(row("", 5));
        r.apply_remote_event(&ChangeEvent::insert(json_row("42", 5))).unwrap();
        assert_eq!(r.len(), 2);

        r.resolve_local_mutation(ph, Ok(row("42", 5))).unwrap();
        assert_eq!(ids(&r), vec!["42"]);
    }

    #[test]
    fn test_failed_mutation_removes_placeholder() {
        let mut r = rows();
        r.apply_remote_event(&ChangeEvent::insert(json_row("1", 1))).unwrap();
        let ph = r.apply_local_optimistic(row("", 2));

        let result = r.resolve_local_mutation(ph, Err(MutationError::network("offline")));
        assert_matches!(
            result,
            Err(SyncError::OptimisticMutationFailed {
                source: MutationError::Network { .. }
            })
        );
        assert_eq!(ids(&r), vec!["1"]);
    }

    #[test]
    fn test_unknown_placeholder_rejected() {
        let mut r = rows();
        let result = r.resolve_local_mutation(PlaceholderId::new(), Ok(row("1", 1)));
        assert_matches!(result, Err(SyncError::UnknownMutation { .. }));
        assert!(r.is_empty());
    }

    #[test]
    fn test_delete_is_idempotent_and_not_resurrected() {
        let mut r = rows();
        r.apply_remote_event(&ChangeEvent::insert(json_row("1", 1))).unwrap();
        let ph = r.apply_local_optimistic(row("", 2));

        let delete = ChangeEvent::delete(json!({"id": "1"}));
        assert!(r.apply_remote_event(&delete).unwrap());
        assert!(!r.apply_remote_event(&delete).unwrap());
        assert!(r.is_tombstoned(&RecordId::new("1")));

        // A late mutation response naming the deleted id leaves it deleted
        r.resolve_local_mutation(ph, Ok(row("1", 2))).unwrap();
        assert!(r.is_empty());

        r.load_initial_snapshot(vec![row("1", 1)]);
        assert!(r.is_empty());
    }

    #[test]
    fn test_update_replaces_and_resorts() {
        let mut r = rows();
        r.apply_remote_event(&ChangeEvent::insert(json_row("1", 1))).unwrap();
        r.apply_remote_event(&ChangeEvent::insert(json_row("2", 2))).unwrap();

        r.apply_remote_event(&ChangeEvent::update(json_row("1", 3))).unwrap();
        assert_eq!(ids(&r), vec!["2", "1"]);
        assert_eq!(r.len(), 2);

        // Update for an unknown id is an insert
        r.apply_remote_event(&ChangeEvent::update(json_row("3", 0))).unwrap();
        assert_eq!(ids(&r), vec!["3", "2", "1"]);
    }

    #[test]
    fn test_filter_scopes_events() {
        let mut r = rows();
        let foreign = json!({"id": "9", "owner": "b", "at": 1});
        assert!(!r.apply_remote_event(&ChangeEvent::insert(foreign.clone())).unwrap());
        assert!(r.is_empty());

        r.apply_remote_event(&ChangeEvent::insert(json_row("9", 1))).unwrap();
        // Moving to another owner takes the row out of this stream
        assert!(r.apply_remote_event(&ChangeEvent::update(foreign)).unwrap());
        assert!(r.is_empty());
    }

    #[test]
    fn test_equal_keys_tie_break_by_id() {
        let mut r = rows();
        r.apply_remote_event(&ChangeEvent::insert(json_row("b", 1))).unwrap();
        r.apply_remote_event(&ChangeEvent::insert(json_row("a", 1))).unwrap();
        let ph = r.apply_local_optimistic(row("", 1));

        let order: Vec<EntityId> = r.iter().map(|(id, _)| id.clone()).collect();
        assert_eq!(
            order,
            vec![
                EntityId::Canonical(RecordId::new("a")),
                EntityId::Canonical(RecordId::new("b")),
                EntityId::Pending(ph),
            ]
        );
    }

    #[test]
    fn test_correlated_echo_promotes_placeholder() {
        let mut r = Reconciler::new(Rows {
            owner: "a",
            correlate: true,
        });
        let mut pending = row("", 7);
        pending.body = "u1".into();
        let ph = r.apply_local_optimistic(pending);

        let echo = json!({"id": "5", "owner": "a", "at": 7, "body": "u1"});
        assert!(r.apply_remote_event(&ChangeEvent::insert(echo)).unwrap());
        assert_eq!(r.len(), 1);
        assert_eq!(r.pending_count(), 0);

        // Even a failed response keeps the confirmed row
        let id = r
            .resolve_local_mutation(ph, Err(MutationError::Timeout { after_ms: 10 }))
            .unwrap();
        assert_eq!(id.as_str(), "5");
        assert_eq!(ids(&r), vec!["5"]);
    }

    #[test]
    fn test_twin_placeholders_are_not_promoted_by_one_echo() {
        let mut r = Reconciler::new(Rows {
            owner: "a",
            correlate: true,
        });
        let mut first = row("", 7);
        first.body = "ok".into();
        let mut second = row("", 8);
        second.body = "ok".into();
        let ph1 = r.apply_local_optimistic(first);
        let ph2 = r.apply_local_optimistic(second);

        let echo = json!({"id": "5", "owner": "a", "at": 8, "body": "ok"});
        assert!(r.apply_remote_event(&ChangeEvent::insert(echo)).unwrap());
        assert_eq!(r.pending_count(), 2);

        // The failed send is still reported although an identical row arrived
        assert_matches!(
            r.resolve_local_mutation(ph1, Err(MutationError::network("offline"))),
            Err(SyncError::OptimisticMutationFailed { .. })
        );
        let mut stored = row("5", 8);
        stored.body = "ok".into();
        r.resolve_local_mutation(ph2, Ok(stored)).unwrap();
        assert_eq!(ids(&r), vec!["5"]);
    }

    #[test]
    fn test_local_delete_rollback_keeps_remote_update() {
        let mut r = rows();
        r.apply_remote_event(&ChangeEvent::insert(json_row("1", 1))).unwrap();
        let pending = r.apply_local_delete(&RecordId::new("1")).unwrap();
        assert!(r.is_empty());

        // Updates while hidden land in the stash only
        let mut edited = json_row("1", 1);
        edited["body"] = json!("edited");
        assert!(!r.apply_remote_event(&ChangeEvent::update(edited)).unwrap());
        assert!(r.is_empty());

        let result = r.resolve_local_delete(pending, Err(MutationError::rejected("42501", "rls")));
        assert_matches!(result, Err(SyncError::OptimisticMutationFailed { .. }));
        assert_eq!(r.get(&RecordId::new("1")).map(|row| row.body.as_str()), Some("edited"));
    }

    #[test]
    fn test_local_delete_confirmed() {
        let mut r = rows();
        r.apply_remote_event(&ChangeEvent::insert(json_row("1", 1))).unwrap();
        let pending = r.apply_local_delete(&RecordId::new("1")).unwrap();
        assert_eq!(r.pending_delete_count(), 1);

        r.resolve_local_delete(pending, Ok(())).unwrap();
        assert!(r.is_empty());
        assert!(r.is_tombstoned(&RecordId::new("1")));

        // Echo of our own delete
        assert!(!r
            .apply_remote_event(&ChangeEvent::delete(json!({"id": "1"})))
            .unwrap());
        assert_matches!(
            r.resolve_local_delete(pending, Ok(())),
            Err(SyncError::UnknownMutation { .. })
        );
        assert!(r.apply_local_delete(&RecordId::new("missing")).is_none());
    }

    #[test]
    fn test_failed_delete_after_remote_delete_stays_gone() {
        let mut r = rows();
        r.apply_remote_event(&ChangeEvent::insert(json_row("1", 1))).unwrap();
        let pending = r.apply_local_delete(&RecordId::new("1")).unwrap();
        r.apply_remote_event(&ChangeEvent::delete(json!({"id": "1"})))
            .unwrap();

        r.resolve_local_delete(pending, Err(MutationError::network("reset")))
            .unwrap();
        assert!(r.is_empty());
    }

    #[test]
    fn test_snapshot_merges_with_events() {
        let mut r = rows();
        let ph = r.apply_local_optimistic(row("", 9));
        r.apply_remote_event(&ChangeEvent::insert(json!({
            "id": "2", "owner": "a", "at": 2, "body": "from feed"
        })))
        .unwrap();

        let mut stale = row("2", 2);
        stale.body = "from snapshot".into();
        let loaded = r.load_initial_snapshot(vec![row("1", 1), stale]);

        assert_eq!(loaded, 1);
        assert_eq!(r.len(), 3);
        assert_eq!(r.get(&RecordId::new("2")).map(|x| x.body.as_str()), Some("from feed"));
        assert!(r.contains(&EntityId::Pending(ph)));

        // A later snapshot is authoritative for rows no event touched since
        r.load_initial_snapshot(vec![row("2", 2)]);
        assert_eq!(r.len(), 2);
        assert!(r.get(&RecordId::new("1")).is_none());
        assert_eq!(
            r.get(&RecordId::new("2")).map(|x| x.body.as_str()),
            Some("")
        );
    }

    #[test]
    fn test_tombstones_are_bounded() {
        let mut r = Reconciler::with_tombstone_capacity(
            Rows {
                owner: "a",
                correlate: false,
            },
            2,
        );
        for id in ["1", "2", "3"] {
            r.apply_remote_event(&ChangeEvent::delete(json!({"id": id})))
                .unwrap();
        }
        assert!(!r.is_tombstoned(&RecordId::new("1")));
        assert!(r.is_tombstoned(&RecordId::new("2")));
        assert!(r.is_tombstoned(&RecordId::new("3")));
    }

    #[test]
    fn test_malformed_events() {
        let mut r = rows();
        let empty = ChangeEvent {
            event_type: None,
            new: None,
            old: None,
        };
        assert!(!r.apply_remote_event(&empty).unwrap());

        let bad = ChangeEvent::insert(json!({"id": "1", "owner": "a"}));
        assert_matches!(r.apply_remote_event(&bad), Err(SyncError::Decode { .. }));

        let keyless = ChangeEvent::delete(json!({"owner": "a"}));
        assert_matches!(r.apply_remote_event(&keyless), Err(SyncError::Decode { .. }));
    }

    #[test]
    fn test_churn_keeps_bookkeeping_bounded() {
        let mut r = Reconciler::with_tombstone_capacity(
            Rows {
                owner: "a",
                correlate: false,
            },
            4,
        );
        for n in 0..10_000u32 {
            let id = n.to_string();
            r.apply_remote_event(&ChangeEvent::insert(json_row(&id, n)))
                .unwrap();
            r.apply_remote_event(&ChangeEvent::delete(json!({"id": id})))
                .unwrap();
        }

        assert!(r.is_empty());
        assert_eq!(r.tombstones.len(), 4);
        assert!(r.touched.is_empty());
    }

    #[test]
    fn test_rows_leaving_filter_are_bounded_and_stay_out() {
        let mut r = Reconciler::with_tombstone_capacity(
            Rows {
                owner: "a",
                correlate: false,
            },
            4,
        );
        for n in 0..100u32 {
            let id = n.to_string();
            r.apply_remote_event(&ChangeEvent::insert(json_row(&id, n)))
                .unwrap();
            r.apply_remote_event(&ChangeEvent::update(json!({"id": id, "owner": "b", "at": n})))
                .unwrap();
        }
        assert!(r.touched.is_empty());
        assert_eq!(r.departed.len(), 4);

        // A read taken before the last move still lists the row
        r.load_initial_snapshot(vec![row("99", 99)]);
        assert!(r.is_empty());
        assert_eq!(r.departed.len(), 0);
    }

    #[test]
    fn test_snapshot_does_not_promote_with_rows_already_shown() {
        let mut r = Reconciler::new(Rows {
            owner: "a",
            correlate: true,
        });
        let mut earlier = row("1", 1);
        earlier.body = "hola".into();
        r.load_initial_snapshot(vec![earlier.clone()]);

        let mut again = row("", 2);
        again.body = "hola".into();
        let ph = r.apply_local_optimistic(again);

        r.load_initial_snapshot(vec![earlier]);
        assert!(r.contains(&EntityId::Pending(ph)));
        assert_eq!(r.len(), 2);
    }
}
