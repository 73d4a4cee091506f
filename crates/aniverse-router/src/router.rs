//! Navigation state and listener fan-out

use crate::{RouteParams, RouteState, RouteTable, RouterError};
use parking_lot::{Mutex, ReentrantMutex, RwLock};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

type Listener = Arc<dyn Fn(&RouteState) + Send + Sync>;

struct RouterInner {
    /// Held across a state change and its notifications
    navigation: ReentrantMutex<()>,
    /// Bumped by every successful navigation
    generation: AtomicU64,
    state: RwLock<RouteState>,
    listeners: Mutex<Vec<(u64, Listener)>>,
    next_listener: AtomicU64,
}

/// Client-side router.
///
/// Cloning is cheap; clones share state and listeners.
pub struct Router<V> {
    table: Arc<RouteTable<V>>,
    inner: Arc<RouterInner>,
}

impl<V> Clone for Router<V> {
    fn clone(&self) -> Self {
        Self {
            table: self.table.clone(),
            inner: self.inner.clone(),
        }
    }
}

impl<V> fmt::Debug for Router<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Router")
            .field("state", &*self.inner.state.read())
            .field("listeners", &self.inner.listeners.lock().len())
            .finish()
    }
}

impl<V> Router<V> {
    /// Create a router starting at `default_route` with empty params
    pub fn new(table: RouteTable<V>, default_route: &str) -> Result<Self, RouterError> {
        if !table.contains(default_route) {
            return Err(RouterError::UnknownRoute {
                name: default_route.to_string(),
            });
        }

        Ok(Self {
            table: Arc::new(table),
            inner: Arc::new(RouterInner {
                navigation: ReentrantMutex::new(()),
                generation: AtomicU64::new(0),
                state: RwLock::new(RouteState::named(default_route)),
                listeners: Mutex::new(Vec::new()),
                next_listener: AtomicU64::new(0),
            }),
        })
    }

    /// Navigate to `path`.
    ///
    /// Returns `false` and leaves state untouched when nothing matches.
    /// Listeners run synchronously, in subscription order, after the new
    /// state is visible.
    ///
    /// Navigations from different threads are serialized, so every listener
    /// sees states in the order they became current. A listener may navigate
    /// again; the remaining listeners then get only the newer state.
    pub fn navigate(&self, path: &str) -> bool {
        let Some(next) = self.table.resolve(path) else {
            tracing::warn!(
                path,
                available = ?self.table.route_names(),
                "No route matches path"
            );
            return false;
        };

        let _navigation = self.inner.navigation.lock();
        tracing::debug!(path, route = %next.route, params = ?next.params, "Navigating");
        *self.inner.state.write() = next.clone();
        let generation = self.inner.generation.fetch_add(1, Ordering::AcqRel) + 1;

        // Snapshot so listeners may subscribe or unsubscribe re-entrantly
        let listeners: Vec<Listener> = self
            .inner
            .listeners
            .lock()
            .iter()
            .map(|(_, listener)| listener.clone())
            .collect();

        for listener in listeners {
            if self.inner.generation.load(Ordering::Acquire) != generation {
                break;
            }
            listener(&next);
        }
        true
    }

    /// Register a listener for route changes
    pub fn subscribe<F>(&self, listener: F) -> Unsubscribe
    where
        F: Fn(&RouteState) + Send + Sync + 'static,
    {
        let id = self.inner.next_listener.fetch_add(1, Ordering::Relaxed);
        self.inner.listeners.lock().push((id, Arc::new(listener)));
        Unsubscribe {
            id,
            inner: Arc::downgrade(&self.inner),
        }
    }

    /// Current route name
    pub fn current_route(&self) -> String {
        self.inner.state.read().route.clone()
    }

    /// Parameters of the current route
    pub fn current_params(&self) -> RouteParams {
        self.inner.state.read().params.clone()
    }

    /// Current route state
    pub fn current(&self) -> RouteState {
        self.inner.state.read().clone()
    }

    /// Build the view for the current route
    pub fn current_view(&self) -> Option<V> {
        let state = self.current();
        self.table.view(&state)
    }

    /// The route table this router resolves against
    pub fn table(&self) -> &RouteTable<V> {
        &self.table
    }

    /// Number of registered listeners
    pub fn listener_count(&self) -> usize {
        self.inner.listeners.lock().len()
    }
}

/// Handle that removes a listener. Calling it more than once is harmless.
#[derive(Debug, Clone)]
pub struct Unsubscribe {
    id: u64,
    inner: Weak<RouterInner>,
}

impl fmt::Debug for RouterInner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RouterInner").finish_non_exhaustive()
    }
}

impl Unsubscribe {
    /// Remove the listener
    pub fn unsubscribe(&self) {
        if let Some(inner) = self.inner.upgrade() {
            inner.listeners.lock().retain(|(id, _)| *id != self.id);
        }
    }
}
