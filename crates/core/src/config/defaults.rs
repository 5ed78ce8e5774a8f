//! Default values and functions for configuration

/// Delay between polling ticks, matching the historic fixed interval
pub(crate) const DEFAULT_POLL_INTERVAL_MS: u64 = 100;

/// Prefix for environment variable overrides
pub(crate) const ENV_PREFIX: &str = "POLLWATCH";

pub(crate) fn default_poll_interval_ms() -> u64 {
    DEFAULT_POLL_INTERVAL_MS
}

pub(crate) fn default_ignore_initial_adds() -> bool {
    false
}

pub(crate) fn default_ignore_patterns() -> Vec<String> {
    Vec::new()
}
