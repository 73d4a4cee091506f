//! # Route Table
//!
//! An immutable mapping from route names to view factories, built once at
//! startup and handed to the [`Router`](crate::Router).
//!
//! ```rust
//! use aniverse_router::RouteTable;
//!
//! let table = RouteTable::<&'static str>::builder()
//!     .register_route("home", "home", |_| "feed")?
//!     .register_route("messages", "messages", |_| "inbox")?
//!     .alias("messages", "messages/:chatId")?
//!     .build();
//!
//! let state = table.resolve("messages/42").unwrap();
//! assert_eq!(state.route, "messages");
//! assert_eq!(state.param("chatId"), Some("42"));
//! # Ok::<(), aniverse_router::RouterError>(())
//! ```

use crate::{RoutePattern, RouteParams, RouteState, RouterError};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Produces the view for a route from its parameters
pub type ViewFactory<V> = Arc<dyn Fn(&RouteParams) -> V + Send + Sync>;

#[derive(Debug, Clone)]
struct RouteEntry {
    name: String,
    pattern: RoutePattern,
}

/// Immutable route table
pub struct RouteTable<V> {
    /// Patterns in registration order
    entries: Vec<RouteEntry>,
    /// Route names in registration order
    names: Vec<String>,
    factories: HashMap<String, ViewFactory<V>>,
}

impl<V> RouteTable<V> {
    /// Start building a table
    pub fn builder() -> RouteTableBuilder<V> {
        RouteTableBuilder::new()
    }

    /// Resolve a path to a route state.
    ///
    /// Dynamic patterns are tried first in registration order, then exact
    /// patterns.
    pub fn resolve(&self, path: &str) -> Option<RouteState> {
        let dynamic = self.entries.iter().find_map(|entry| {
            entry.pattern.capture(path).map(|(param, value)| {
                let mut params = RouteParams::new();
                params.insert(param.to_string(), value.to_string());
                RouteState::new(entry.name.clone(), params)
            })
        });

        dynamic.or_else(|| {
            self.entries
                .iter()
                .find(|entry| entry.pattern.matches_exact(path))
                .map(|entry| RouteState::new(entry.name.clone(), RouteParams::new()))
        })
    }

    /// Whether a route with this name is registered
    pub fn contains(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }

    /// Registered route names, in registration order
    pub fn route_names(&self) -> &[String] {
        &self.names
    }

    /// Build the view for a route state
    pub fn view(&self, state: &RouteState) -> Option<V> {
        self.factories
            .get(&state.route)
            .map(|factory| factory(&state.params))
    }

    /// Number of registered patterns
    pub fn pattern_count(&self) -> usize {
        self.entries.len()
    }
}

impl<V> fmt::Debug for RouteTable<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RouteTable")
            .field(
                "patterns",
                &self
                    .entries
                    .iter()
                    .map(|e| format!("{} -> {}", e.pattern, e.name))
                    .collect::<Vec<_>>(),
            )
            .finish()
    }
}

/// Builder that rejects colliding registrations
pub struct RouteTableBuilder<V> {
    table: RouteTable<V>,
}

impl<V> fmt::Debug for RouteTableBuilder<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RouteTableBuilder")
            .field("table", &self.table)
            .finish()
    }
}

impl<V> RouteTableBuilder<V> {
    fn new() -> Self {
        Self {
            table: RouteTable {
                entries: Vec::new(),
                names: Vec::new(),
                factories: HashMap::new(),
            },
        }
    }

    /// Register a route with its primary pattern and view factory
    pub fn register_route<F>(
        mut self,
        name: &str,
        pattern: &str,
        factory: F,
    ) -> Result<Self, RouterError>
    where
        F: Fn(&RouteParams) -> V + Send + Sync + 'static,
    {
        if self.table.factories.contains_key(name) {
            return Err(RouterError::DuplicateRoute {
                name: name.to_string(),
            });
        }
        let pattern = self.checked_pattern(pattern)?;

        self.table.names.push(name.to_string());
        self.table
            .factories
            .insert(name.to_string(), Arc::new(factory));
        self.table.entries.push(RouteEntry {
            name: name.to_string(),
            pattern,
        });
        Ok(self)
    }

    /// Add another pattern resolving to an already registered route
    pub fn alias(mut self, name: &str, pattern: &str) -> Result<Self, RouterError> {
        if !self.table.factories.contains_key(name) {
            return Err(RouterError::UnknownRoute {
                name: name.to_string(),
            });
        }
        let pattern = self.checked_pattern(pattern)?;
        self.table.entries.push(RouteEntry {
            name: name.to_string(),
            pattern,
        });
        Ok(self)
    }

    /// Finish building
    pub fn build(self) -> RouteTable<V> {
        self.table
    }

    fn checked_pattern(&self, raw: &str) -> Result<RoutePattern, RouterError> {
        let pattern = RoutePattern::parse(raw)?;
        if self.table.entries.iter().any(|e| e.pattern == pattern) {
            return Err(RouterError::DuplicatePattern {
                pattern: raw.to_string(),
            });
        }
        Ok(pattern)
    }
}
