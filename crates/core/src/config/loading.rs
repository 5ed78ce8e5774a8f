//! Configuration loading from files and environment variables

use crate::error::{Error, Result};
use config::{Config as ConfigLib, ConfigBuilder as LibConfigBuilder, Environment, File};
use std::path::Path;

use super::defaults::*;
use super::Config;

/// Helper to set a config default with consistent error mapping
fn set_config_default<T: Into<config::Value>>(
    builder: LibConfigBuilder<config::builder::DefaultState>,
    key: &str,
    value: T,
) -> Result<LibConfigBuilder<config::builder::DefaultState>> {
    builder
        .set_default(key, value)
        .map_err(|e| Error::config(format!("Failed to set {key} default: {e}")))
}

impl Config {
    /// Loads configuration from a TOML file with environment variable overrides
    ///
    /// The file is optional; a missing file yields defaults plus environment.
    /// Environment variables are prefixed with `POLLWATCH_` and use double
    /// underscores for nested values, for example
    /// `POLLWATCH_WATCHER__POLL_INTERVAL_MS=250`. Ignore patterns given through
    /// the environment are comma separated.
    pub fn from_file(path: &Path) -> Result<Self> {
        Self::from_sources(Some(path))
    }

    /// Load configuration, optionally from a file
    ///
    /// Precedence (lowest to highest):
    /// 1. Hardcoded defaults
    /// 2. Config file (when given and present)
    /// 3. Environment variables (POLLWATCH_*)
    pub fn load(config_path: Option<&Path>) -> Result<Self> {
        Self::from_sources(config_path)
    }

    fn from_sources(path: Option<&Path>) -> Result<Self> {
        let builder = ConfigLib::builder();

        // config crate doesn't apply serde defaults for missing sections
        let builder = set_config_default(
            builder,
            "watcher.poll_interval_ms",
            default_poll_interval_ms() as i64,
        )?;
        let builder = set_config_default(
            builder,
            "watcher.ignore_initial_adds",
            default_ignore_initial_adds(),
        )?;
        let mut builder = set_config_default(
            builder,
            "watcher.ignore_patterns",
            default_ignore_patterns(),
        )?;

        if let Some(path) = path.filter(|p| p.exists()) {
            builder = builder.add_source(File::from(path));
        }

        builder = builder.add_source(
            Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("_")
                .separator("__")
                .list_separator(",")
                .with_list_parse_key("watcher.ignore_patterns")
                .try_parsing(true),
        );

        let config = builder
            .build()
            .map_err(|e| Error::config(format!("Failed to build config: {e}")))?;

        config
            .try_deserialize()
            .map_err(|e| Error::config(format!("Failed to deserialize config: {e}")))
    }

    /// Creates a config from a TOML string (useful for testing)
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| Error::config(format!("Failed to parse TOML: {e}")))
    }

    /// Saves the configuration to a TOML file
    pub fn save(&self, path: &Path) -> Result<()> {
        let toml_string = toml::to_string_pretty(self)
            .map_err(|e| Error::config(format!("Failed to serialize config: {e}")))?;

        std::fs::write(path, toml_string)
            .map_err(|e| Error::config(format!("Failed to write config file: {e}")))?;

        Ok(())
    }
}
