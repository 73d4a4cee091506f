//! Reconciler behavior under arbitrary causally consistent interleavings

use aniverse_core::{ChangeEvent, EntityId, PlaceholderId, RecordId, StreamFilter};
use aniverse_sync::{MutationError, Reconciler, StreamSpec};
use aniverse_testkit::strategies::{arb_interleaving, StreamOp};
use proptest::prelude::*;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::{BTreeMap, BTreeSet, HashSet};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Row {
    id: RecordId,
    at: u32,
}

struct Rows;

impl StreamSpec for Rows {
    type Record = Row;
    type Key = u32;

    fn table(&self) -> &str {
        "rows"
    }

    fn filter(&self) -> StreamFilter {
        StreamFilter::All
    }

    fn sort_key(&self, record: &Row) -> u32 {
        record.at
    }

    fn record_id(&self, record: &Row) -> RecordId {
        record.id.clone()
    }
}

struct Local {
    at: u32,
    placeholder: PlaceholderId,
    resolved: bool,
    accepted: Option<bool>,
    echoed: bool,
}

/// Store-side truth the script is checked against
#[derive(Default)]
struct Model {
    locals: Vec<Local>,
    /// `None` once deleted
    remote: BTreeMap<u8, Option<u32>>,
}

impl Model {
    fn local_id(i: usize) -> RecordId {
        RecordId::new(format!("l{i}"))
    }

    fn remote_id(id: u8) -> RecordId {
        RecordId::new(format!("r{id}"))
    }

    fn expected(&self) -> BTreeMap<RecordId, u32> {
        let locals = self
            .locals
            .iter()
            .enumerate()
            .filter(|(_, l)| l.accepted == Some(true))
            .map(|(i, l)| (Self::local_id(i), l.at));
        let remotes = self
            .remote
            .iter()
            .filter_map(|(id, at)| at.map(|at| (Self::remote_id(*id), at)));
        locals.chain(remotes).collect()
    }

    fn resolve(&mut self, rows: &mut Reconciler<Rows>, i: usize, accept: bool) {
        let local = &mut self.locals[i];
        if local.resolved {
            return;
        }
        let accept = accept || local.echoed;
        let outcome = if accept {
            Ok(Row {
                id: Self::local_id(i),
                at: local.at,
            })
        } else {
            Err(MutationError::rejected("23514", "check violation"))
        };
        let result = rows.resolve_local_mutation(local.placeholder, outcome);
        assert_eq!(result.is_ok(), accept);
        local.resolved = true;
        local.accepted = Some(accept);
    }

    fn echo(&mut self, rows: &mut Reconciler<Rows>, i: usize) {
        let local = &mut self.locals[i];
        if local.accepted == Some(false) {
            return;
        }
        local.accepted = Some(true);
        local.echoed = true;
        let row = json!({"id": Self::local_id(i), "at": local.at});
        rows.apply_remote_event(&ChangeEvent::insert(row)).unwrap();
    }

    fn apply(&mut self, rows: &mut Reconciler<Rows>, op: &StreamOp) {
        match op {
            StreamOp::LocalCreate { at } => {
                let placeholder = rows.apply_local_optimistic(Row {
                    id: RecordId::new(""),
                    at: *at,
                });
                self.locals.push(Local {
                    at: *at,
                    placeholder,
                    resolved: false,
                    accepted: None,
                    echoed: false,
                });
            }
            StreamOp::Resolve { nth, accept } if !self.locals.is_empty() => {
                self.resolve(rows, nth % self.locals.len(), *accept);
            }
            StreamOp::Echo { nth } if !self.locals.is_empty() => {
                self.echo(rows, nth % self.locals.len());
            }
            StreamOp::RemoteInsert { id, at } => match self.remote.get(id) {
                Some(None) => {}
                Some(Some(existing)) => {
                    // Duplicate delivery of the same row
                    let row = json!({"id": Self::remote_id(*id), "at": existing});
                    let changed = rows.apply_remote_event(&ChangeEvent::insert(row)).unwrap();
                    assert!(!changed);
                }
                None => {
                    let row = json!({"id": Self::remote_id(*id), "at": at});
                    rows.apply_remote_event(&ChangeEvent::insert(row)).unwrap();
                    self.remote.insert(*id, Some(*at));
                }
            },
            StreamOp::RemoteUpdate { id, at } => {
                if self.remote.get(id) != Some(&None) {
                    let row = json!({"id": Self::remote_id(*id), "at": at});
                    rows.apply_remote_event(&ChangeEvent::update(row)).unwrap();
                    self.remote.insert(*id, Some(*at));
                }
            }
            StreamOp::RemoteDelete { id } => {
                let row = json!({"id": Self::remote_id(*id)});
                rows.apply_remote_event(&ChangeEvent::delete(row)).unwrap();
                self.remote.insert(*id, None);
            }
            StreamOp::Snapshot => {
                let snapshot = self
                    .expected()
                    .into_iter()
                    .map(|(id, at)| Row { id, at })
                    .collect::<Vec<_>>();
                rows.load_initial_snapshot(snapshot);
            }
            StreamOp::Resolve { .. } | StreamOp::Echo { .. } => {}
        }
    }

    /// Answer every outstanding write and deliver every missing echo
    fn settle(&mut self, rows: &mut Reconciler<Rows>) {
        for i in 0..self.locals.len() {
            self.resolve(rows, i, true);
        }
        for i in 0..self.locals.len() {
            if self.locals[i].accepted == Some(true) && !self.locals[i].echoed {
                self.echo(rows, i);
            }
        }
    }
}

fn assert_ordered_and_unique(rows: &Reconciler<Rows>) -> Result<(), TestCaseError> {
    let positions: Vec<(u32, EntityId)> = rows
        .iter()
        .map(|(id, record)| (rows.spec().sort_key(record), id.clone()))
        .collect();
    prop_assert!(
        positions.windows(2).all(|pair| pair[0] < pair[1]),
        "out of order: {:?}",
        positions
    );

    let canonical: Vec<&RecordId> = positions.iter().filter_map(|(_, id)| id.record_id()).collect();
    let unique: HashSet<&RecordId> = canonical.iter().copied().collect();
    prop_assert_eq!(canonical.len(), unique.len());
    Ok(())
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    /// Ordering and uniqueness hold after every step
    #[test]
    fn prop_invariants_hold_at_every_step(script in arb_interleaving(40)) {
        let mut rows = Reconciler::new(Rows);
        let mut model = Model::default();
        for op in &script {
            model.apply(&mut rows, op);
            assert_ordered_and_unique(&rows)?;
        }
    }

    /// Once every write is answered and echoed the collection equals the store
    #[test]
    fn prop_settles_to_store_state(script in arb_interleaving(40)) {
        let mut rows = Reconciler::new(Rows);
        let mut model = Model::default();
        for op in &script {
            model.apply(&mut rows, op);
        }
        model.settle(&mut rows);

        prop_assert_eq!(rows.pending_count(), 0);
        assert_ordered_and_unique(&rows)?;

        let actual: BTreeMap<RecordId, u32> = rows
            .iter()
            .filter_map(|(id, row)| id.record_id().map(|id| (id.clone(), row.at)))
            .collect();
        prop_assert_eq!(actual, model.expected());
    }

    /// Delivering any event twice leaves the same collection as once
    #[test]
    fn prop_duplicate_delivery_is_idempotent(
        inserts in prop::collection::vec((0u8..6, 0u32..8), 1..12),
        deletes in prop::collection::btree_set(0u8..6, 0..4),
    ) {
        let mut events = Vec::new();
        let mut seen = BTreeSet::new();
        for (id, at) in &inserts {
            if seen.insert(*id) {
                events.push(ChangeEvent::insert(json!({"id": Model::remote_id(*id), "at": at})));
            }
        }
        for id in &deletes {
            events.push(ChangeEvent::delete(json!({"id": Model::remote_id(*id)})));
        }

        let mut once = Reconciler::new(Rows);
        let mut twice = Reconciler::new(Rows);
        for event in &events {
            once.apply_remote_event(event).unwrap();
            twice.apply_remote_event(event).unwrap();
            twice.apply_remote_event(event).unwrap();
        }
        prop_assert_eq!(once.records(), twice.records());
    }
}
