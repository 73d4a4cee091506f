//! AniVerse Core - Shared Foundation
//!
//! This crate provides the types every other AniVerse crate agrees on:
//!
//! ## Identity
//! - [`RecordId`]: server-assigned canonical identity of a stored row
//! - [`PlaceholderId`]: client-generated identity of an optimistic entry
//! - [`EntityId`]: either of the two, in disjoint namespaces
//!
//! ## Change Feed Wire Model
//! - [`ChangeEvent`], [`ChangeKind`], [`StreamFilter`]: the shape of the
//!   insert/update/delete notifications pushed by the remote store
//!
//! ## Reactive Values
//! - [`reactive::Dynamic`]: a value with poll-based change notification,
//!   used to publish materialized collections to the view layer
//!
//! ## Configuration
//! - [`config`]: load/merge/validate traits shared by application configs
//!
//! ## Errors
//! - [`CoreError`]: unified error type with a [`Result`] alias

#![forbid(unsafe_code)]

/// Change feed wire model
pub mod change;

/// Configuration traits and validation
pub mod config;

/// Unified error handling
pub mod errors;

/// Canonical and placeholder identifiers
pub mod identifiers;

/// Reactive values with change notification
pub mod reactive;

/// Clock abstraction for timestamping optimistic records
pub mod time;

pub use change::{ChangeEvent, ChangeKind, StreamFilter};
pub use errors::{CoreError, Result};
pub use identifiers::{EntityId, PlaceholderId, RecordId};
pub use time::{Clock, SystemClock};
