//! # AniVerse Router
//!
//! In-app navigation without page reloads: an opaque path string is resolved
//! against a [`RouteTable`] to a route name plus parameters, and every
//! subscribed listener is told synchronously.
//!
//! ```text
//! navigate(path) → RouteTable::resolve → replace RouteState → notify listeners
//! ```
//!
//! An unmatched path is a no-op: state stays as it was and nobody is
//! notified.

mod pattern;
mod router;
mod table;

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub use pattern::RoutePattern;
pub use router::{Router, Unsubscribe};
pub use table::{RouteTable, RouteTableBuilder, ViewFactory};

/// Path parameters captured from dynamic segments
pub type RouteParams = BTreeMap<String, String>;

/// Current route and the parameters it was resolved with.
///
/// Always replaced as a whole, so the params delivered with a notification
/// belong to the route delivered with it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteState {
    /// Route name
    pub route: String,
    /// Captured parameters
    pub params: RouteParams,
}

impl RouteState {
    /// Create a route state
    pub fn new(route: impl Into<String>, params: RouteParams) -> Self {
        Self {
            route: route.into(),
            params,
        }
    }

    /// Route state with no parameters
    pub fn named(route: impl Into<String>) -> Self {
        Self::new(route, RouteParams::new())
    }

    /// Look up a captured parameter
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params.get(name).map(String::as_str)
    }
}

/// Route table construction errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RouterError {
    /// A route name was registered twice
    #[error("route '{name}' is already registered")]
    DuplicateRoute {
        /// Colliding route name
        name: String,
    },

    /// The same pattern was registered twice
    #[error("pattern '{pattern}' is already registered")]
    DuplicatePattern {
        /// Colliding pattern
        pattern: String,
    },

    /// Pattern syntax is not supported
    #[error("invalid route pattern '{pattern}': {reason}")]
    InvalidPattern {
        /// Offending pattern
        pattern: String,
        /// What is wrong with it
        reason: String,
    },

    /// A route name was referenced but never registered
    #[error("route '{name}' is not registered")]
    UnknownRoute {
        /// Missing route name
        name: String,
    },
}

impl From<RouterError> for aniverse_core::CoreError {
    fn from(err: RouterError) -> Self {
        match err {
            RouterError::UnknownRoute { .. } => Self::not_found(err.to_string()),
            _ => Self::config(err.to_string()),
        }
    }
}
