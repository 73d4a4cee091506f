//! Deterministic clock

use aniverse_core::Clock;
use chrono::{DateTime, Duration, TimeZone, Utc};
use parking_lot::Mutex;

/// Base instant for fixtures: 2024-01-01T00:00:00Z
pub const FIXTURE_EPOCH_SECS: i64 = 1_704_067_200;

/// Fixture timestamp `secs` seconds after [`FIXTURE_EPOCH_SECS`]
pub fn ts(secs: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(FIXTURE_EPOCH_SECS + secs, 0)
        .single()
        .unwrap_or_default()
}

/// Clock that only moves when told to
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    /// Start at `start`
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(start),
        }
    }

    /// Start at fixture second `secs`
    pub fn at(secs: i64) -> Self {
        Self::new(ts(secs))
    }

    /// Move forward by `secs` seconds
    pub fn advance_secs(&self, secs: i64) {
        *self.now.lock() += Duration::seconds(secs);
    }

    /// Jump to `instant`
    pub fn set(&self, instant: DateTime<Utc>) {
        *self.now.lock() = instant;
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::at(0)
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock()
    }
}
