//! AniVerse Testing Infrastructure
//!
//! Test doubles for the external collaborators of the sync layer plus
//! fixtures shared by the workspace's test suites.
//!
//! ```toml
//! [dev-dependencies]
//! aniverse-testkit = { path = "../aniverse-testkit" }
//! ```
//!
//! - [`SpyFeed`]: in-memory change feed that records subscriptions
//! - [`ScriptedMutationClient`]: store answering from a script, with a gate
//!   for interleaving feed events before the answer
//! - [`ManualClock`]: clock that moves only when told to
//! - [`factories`]: store-shaped JSON rows
//! - [`strategies`]: proptest strategies for stream interleavings

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]

pub mod factories;
pub mod feed;
pub mod logging;
pub mod mutation;
pub mod strategies;
pub mod time;

pub use factories::*;
pub use feed::{FeedCall, SpyFeed};
pub use logging::init_test_tracing;
pub use mutation::{MutationCall, MutationOp, Scripted, ScriptedMutationClient};
pub use time::{ts, ManualClock, FIXTURE_EPOCH_SECS};
