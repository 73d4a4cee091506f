//! Property test strategies
//!
//! Interleavings of local optimistic writes, store answers, and feed events
//! for one stream. The generated operations are a script; a test interprets
//! them against a reconciler and keeps the script causally consistent (no
//! echo for a write the store refused, no update after a delete).

use proptest::prelude::*;

// Re-export proptest for convenience
pub use proptest;

/// One step of a stream interleaving
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamOp {
    /// Local optimistic create sorted at `at`
    LocalCreate {
        /// Sort value
        at: u32,
    },
    /// Store answer for the `nth` local create (taken modulo the count)
    Resolve {
        /// Which local create
        nth: usize,
        /// Whether the store accepted it
        accept: bool,
    },
    /// Feed echo of the `nth` local create
    Echo {
        /// Which local create
        nth: usize,
    },
    /// Insert by another client
    RemoteInsert {
        /// Remote row id
        id: u8,
        /// Sort value
        at: u32,
    },
    /// Update by another client
    RemoteUpdate {
        /// Remote row id
        id: u8,
        /// New sort value
        at: u32,
    },
    /// Delete by another client
    RemoteDelete {
        /// Remote row id
        id: u8,
    },
    /// Point-in-time read of the store
    Snapshot,
}

/// Sort values drawn from a small range so ties are common
pub fn arb_sort_value() -> impl Strategy<Value = u32> {
    0u32..8
}

/// A single interleaving step
pub fn arb_stream_op() -> impl Strategy<Value = StreamOp> {
    prop_oneof![
        3 => arb_sort_value().prop_map(|at| StreamOp::LocalCreate { at }),
        3 => (0usize..16, prop::bool::weighted(0.8))
            .prop_map(|(nth, accept)| StreamOp::Resolve { nth, accept }),
        3 => (0usize..16).prop_map(|nth| StreamOp::Echo { nth }),
        3 => (0u8..6, arb_sort_value()).prop_map(|(id, at)| StreamOp::RemoteInsert { id, at }),
        2 => (0u8..6, arb_sort_value()).prop_map(|(id, at)| StreamOp::RemoteUpdate { id, at }),
        2 => (0u8..6).prop_map(|id| StreamOp::RemoteDelete { id }),
        1 => Just(StreamOp::Snapshot),
    ]
}

/// A script of up to `max_len` steps
pub fn arb_interleaving(max_len: usize) -> impl Strategy<Value = Vec<StreamOp>> {
    prop::collection::vec(arb_stream_op(), 0..=max_len)
}
