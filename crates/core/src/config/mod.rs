//! Configuration module for pollwatch
//!
//! Watcher options can be built in code through [`WatcherConfig::builder`] or
//! loaded from a TOML file layered under `POLLWATCH_*` environment variables.

mod defaults;
mod loading;

#[cfg(test)]
mod tests;

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use defaults::*;

/// Main configuration structure for pollwatch
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Watcher configuration
    #[serde(default)]
    pub watcher: WatcherConfig,
}

/// Configuration for a single polling watcher
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WatcherConfig {
    /// Suppress `add` events for files found by the first `collect`
    #[serde(default = "default_ignore_initial_adds")]
    pub ignore_initial_adds: bool,

    /// Ignore rules: `re:<regex>`, `glob:<pattern>`, or a literal substring
    #[serde(default = "default_ignore_patterns")]
    pub ignore_patterns: Vec<String>,

    /// Delay between polling ticks in milliseconds (default: 100ms)
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
}

impl Default for WatcherConfig {
    fn default() -> Self {
        Self {
            ignore_initial_adds: default_ignore_initial_adds(),
            ignore_patterns: default_ignore_patterns(),
            poll_interval_ms: default_poll_interval_ms(),
        }
    }
}

impl WatcherConfig {
    /// Create a configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Create configuration from builder
    pub fn builder() -> WatcherConfigBuilder {
        WatcherConfigBuilder::default()
    }

    /// Get the poll interval
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Validates the watcher section
    pub fn validate(&self) -> Result<()> {
        if self.poll_interval_ms == 0 {
            return Err(Error::config(
                "watcher.poll_interval_ms must be greater than 0".to_string(),
            ));
        }

        if let Some(idx) = self.ignore_patterns.iter().position(|p| p.is_empty()) {
            return Err(Error::config(format!(
                "watcher.ignore_patterns[{idx}] must not be empty"
            )));
        }

        Ok(())
    }
}

/// Builder for WatcherConfig
#[derive(Debug, Default)]
pub struct WatcherConfigBuilder {
    config: WatcherConfig,
}

impl WatcherConfigBuilder {
    /// Suppress `add` events during the first collect
    pub fn ignore_initial_adds(mut self, ignore: bool) -> Self {
        self.config.ignore_initial_adds = ignore;
        self
    }

    /// Replace the ignore patterns
    pub fn ignore_patterns(mut self, patterns: Vec<String>) -> Self {
        self.config.ignore_patterns = patterns;
        self
    }

    /// Add an ignore pattern
    pub fn add_ignore_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.config.ignore_patterns.push(pattern.into());
        self
    }

    /// Set the poll interval in milliseconds
    pub fn poll_interval_ms(mut self, ms: u64) -> Self {
        self.config.poll_interval_ms = ms;
        self
    }

    /// Build the configuration
    pub fn build(self) -> WatcherConfig {
        self.config
    }
}

impl Config {
    /// Validates the configuration
    pub fn validate(&self) -> Result<()> {
        self.watcher.validate()
    }
}
