//! Core configuration traits

use crate::{CoreError, Result};
use serde::de::DeserializeOwned;
use std::path::Path;

/// Trait implemented by every loadable configuration type.
///
/// Load order is defaults → file → environment, followed by validation.
pub trait ClientConfig: Clone + Default + DeserializeOwned + Send + Sync + 'static {
    /// Prefix for environment overrides (e.g. `ANIVERSE_`)
    const ENV_PREFIX: &'static str;

    /// Get default configuration values
    fn defaults() -> Self {
        Self::default()
    }

    /// Parse a configuration from TOML text
    fn from_toml_str(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Load configuration from a TOML file
    fn load_from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            CoreError::config(format!("Failed to read {}: {e}", path.display()))
        })?;
        Self::from_toml_str(&content)
    }

    /// Apply a single override; `key` is the lowercased variable name with
    /// the prefix stripped (e.g. `sync_mutation_timeout_ms`).
    fn set_from_string(&mut self, key: &str, value: &str) -> Result<()>;

    /// Merge overrides from the process environment
    fn merge_with_env(&mut self) -> Result<()> {
        self.merge_with_vars(std::env::vars())
    }

    /// Merge overrides from an explicit set of variables
    fn merge_with_vars(&mut self, vars: impl IntoIterator<Item = (String, String)>) -> Result<()> {
        for (key, value) in vars {
            if let Some(stripped) = key.strip_prefix(Self::ENV_PREFIX) {
                self.set_from_string(&stripped.to_lowercase(), &value)?;
            }
        }
        Ok(())
    }

    /// Validate the configuration
    fn validate(&self) -> Result<()>;

    /// Defaults, then the optional file, then the environment, then validation
    fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::load_from_file(path)?,
            None => Self::defaults(),
        };
        config.merge_with_env()?;
        config.validate()?;
        Ok(config)
    }
}

/// Parse an override value, naming the key on failure
pub fn parse_override<T>(key: &str, value: &str) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    value
        .parse()
        .map_err(|e| CoreError::config(format!("Invalid value for {key}: {e}")))
}
