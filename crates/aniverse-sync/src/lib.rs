//! # AniVerse Sync
//!
//! Realtime reconciliation for the AniVerse client: one generic merge
//! algorithm applied to every entity stream.
//!
//! ## Architecture
//!
//! ```text
//! ChangeFeed ──events──▶ SubscriptionManager ──(liveness check)──▶ LiveStream
//!                                                                   │
//! MutationClient ◀──create/delete── LiveStream ──optimistic──▶ Reconciler
//!                                                                   │
//!                                                     Dynamic<Vec<StreamEntry>>
//! ```
//!
//! - [`StreamSpec`]: table, filter, sort key, identity of one stream
//! - [`Reconciler`]: ordered, duplicate-free merge of optimistic entries,
//!   mutation outcomes, and pushed events
//! - [`SubscriptionManager`]: feed subscriptions keyed by owning view
//! - [`LiveStream`]: a reconciler fed by a subscription, published for views

#![forbid(unsafe_code)]

mod error;
mod feed;
mod live;
mod mutation;
mod reconciler;
mod spec;
mod subscription;

pub use error::{MutationError, SyncError};
pub use feed::{ChangeFeed, EventSink, FeedHandle};
pub use live::{LiveStream, StreamOptions};
pub use mutation::{with_timeout, MutationClient};
pub use reconciler::{PendingDeleteId, Reconciler, StreamEntry, DEFAULT_TOMBSTONE_CAPACITY};
pub use spec::StreamSpec;
pub use subscription::{SubscriptionHandle, SubscriptionManager};
