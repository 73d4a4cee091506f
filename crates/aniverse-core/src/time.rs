//! Clock abstraction
//!
//! Optimistic records need a provisional `created_at` so they sort into the
//! right place before the store assigns the canonical timestamp.

use chrono::{DateTime, Utc};

/// Source of wall-clock timestamps
pub trait Clock: Send + Sync {
    /// Current time
    fn now(&self) -> DateTime<Utc>;
}

/// Clock backed by the system time
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}
