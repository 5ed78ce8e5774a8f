//! Core types for pollwatch
//!
//! This crate provides the foundations shared by the watcher and the CLI:
//!
//! - **Error handling**: the unified [`Error`] type and [`Result`] alias
//! - **Configuration**: watcher options and layered file/env loading

pub mod config;
pub mod error;

// Re-export main types for convenience
pub use config::{Config, WatcherConfig, WatcherConfigBuilder};
pub use error::{Error, Result, ResultExt};

/// Version of the core library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::config::{Config, WatcherConfig};
    pub use crate::error::{Error, Result, ResultExt};
}
