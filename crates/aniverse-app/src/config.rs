//! Application configuration
//!
//! Loaded as defaults → TOML file → `ANIVERSE_*` environment overrides, then
//! validated. Example file:
//!
//! ```toml
//! [router]
//! default_route = "home"
//!
//! [sync]
//! tombstone_capacity = 256
//! mutation_timeout_ms = 10000
//!
//! [realtime]
//! events_per_second = 10
//! ```

use aniverse_core::config::{parse_override, ClientConfig, ConfigValidator};
use aniverse_core::{CoreError, Result};
use aniverse_sync::StreamOptions;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Top-level application configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Navigation settings
    pub router: RouterConfig,
    /// Reconciliation settings
    pub sync: SyncConfig,
    /// Change feed settings
    pub realtime: RealtimeConfig,
}

/// Navigation settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RouterConfig {
    /// Route shown before the first navigation
    pub default_route: String,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            default_route: "home".to_string(),
        }
    }
}

/// Reconciliation settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Deleted ids remembered per stream
    pub tombstone_capacity: u32,
    /// Deadline for each store write
    pub mutation_timeout_ms: u32,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            tombstone_capacity: 256,
            mutation_timeout_ms: 10_000,
        }
    }
}

/// Change feed settings.
///
/// Validated here but not read by the core: the embedder applies them when
/// it builds the transport behind `ChangeFeed`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RealtimeConfig {
    /// Rate limit the feed connection asks the server for
    pub events_per_second: u32,
}

impl Default for RealtimeConfig {
    fn default() -> Self {
        Self {
            events_per_second: 10,
        }
    }
}

impl AppConfig {
    /// Stream tuning derived from the sync section
    pub fn stream_options(&self) -> StreamOptions {
        StreamOptions {
            tombstone_capacity: self.sync.tombstone_capacity as usize,
            mutation_timeout: Duration::from_millis(u64::from(self.sync.mutation_timeout_ms)),
        }
    }

    /// Render as TOML
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| CoreError::serialization(e.to_string()))
    }
}

impl ClientConfig for AppConfig {
    const ENV_PREFIX: &'static str = "ANIVERSE_";

    fn set_from_string(&mut self, key: &str, value: &str) -> Result<()> {
        match key {
            "router_default_route" => self.router.default_route = value.to_string(),
            "sync_tombstone_capacity" => {
                self.sync.tombstone_capacity = parse_override(key, value)?;
            }
            "sync_mutation_timeout_ms" => {
                self.sync.mutation_timeout_ms = parse_override(key, value)?;
            }
            "realtime_events_per_second" => {
                self.realtime.events_per_second = parse_override(key, value)?;
            }
            _ => {
                return Err(CoreError::config(format!(
                    "Unknown configuration key: {key}"
                )))
            }
        }
        Ok(())
    }

    fn validate(&self) -> Result<()> {
        let mut root = ConfigValidator::new();

        let mut router = root.for_field("router");
        router.non_empty("default_route", &self.router.default_route);
        root.merge(router);

        let mut sync = root.for_field("sync");
        sync.range("tombstone_capacity", self.sync.tombstone_capacity, Some(1), None)
            .range("mutation_timeout_ms", self.sync.mutation_timeout_ms, Some(1), Some(120_000));
        root.merge(sync);

        let mut realtime = root.for_field("realtime");
        realtime.range("events_per_second", self.realtime.events_per_second, Some(1), Some(1000));
        root.merge(realtime);

        Ok(root.result()?)
    }
}
