//! # AniVerse App - Headless Application Core
//!
//! Portable core shared by every AniVerse frontend. It owns navigation and
//! the live collections the views render, and turns user [`Intent`]s into
//! optimistic writes that reconcile against the store's change feed.
//!
//! ## Architecture
//!
//! ```text
//! Intent ──► AppCore ──► Router ──► route listeners (chat follows :chatId)
//!               │
//!               └──────► stream adapters ──► LiveStream ──► Reconciler
//!                              ▲                  │
//!                              └── ChangeFeed ────┘
//! ```
//!
//! The store is reached only through the [`ChangeFeed`](aniverse_sync::ChangeFeed)
//! and [`MutationClient`](aniverse_sync::MutationClient) traits; this crate
//! has no transport of its own.

#![forbid(unsafe_code)]

/// Application configuration
pub mod config;

/// Application core
pub mod core;

/// Categorized errors
pub mod errors;

/// User intents
pub mod intent;

/// Table rows and input limits
pub mod records;

/// Route layout and views
pub mod routes;

/// Per-stream adapters
pub mod streams;

pub use crate::config::AppConfig;
pub use crate::core::{post_view, AppCore, PostStreams};
pub use errors::{AppError, ErrorCategory, ToastLevel};
pub use intent::{Intent, IntentOutcome};
pub use records::{Comment, Like, Message, Post};
pub use routes::View;
pub use streams::{
    ChatMessage, ChatStream, CommentsStream, FeedStream, LikeToggle, LikesStream,
    MessageDeliveryStatus,
};
