#![cfg_attr(not(test), deny(clippy::unwrap_used))]
#![cfg_attr(not(test), deny(clippy::expect_used))]

//! Polling change detection for directory trees
//!
//! This crate watches a directory tree without any OS notification API:
//! - Recursive snapshots of path → file metadata
//! - `add`/`change` classification by diffing against the previous snapshot
//! - A per-directory listing cache keyed on directory mtime
//! - A polling loop that never runs two scans at once
//!
//! # Example
//!
//! ```no_run
//! use pollwatch_watcher::{PollingWatcher, WatcherConfig};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = WatcherConfig::builder()
//!     .ignore_initial_adds(true)
//!     .add_ignore_pattern("node_modules")
//!     .build();
//! let watcher = PollingWatcher::new("/path/to/project", config)?;
//!
//! watcher.on_change(|updated, _previous| println!("changed: {:?}", updated.path));
//! watcher.collect().await?;
//! watcher.watch()?;
//! # Ok(())
//! # }
//! ```

// Private implementation modules
mod events;
mod fs;
mod ignore;
mod listing;
mod snapshot;
mod traverser;
mod watcher;

// Public exports - minimal API surface
pub use events::{EventBus, EventKind, WatchEvent};
pub use fs::{DirChild, FileSystem, PathKind, PathMetadata, TokioFileSystem};
pub use ignore::{IgnoreRule, IgnoreSet};
pub use listing::{Listing, ListingCache};
pub use pollwatch_core::config::WatcherConfig;
pub use pollwatch_core::error::{Error, Result};
pub use snapshot::{epoch_millis, Entry, EntryType, Observation, Snapshot};
pub use traverser::{EventSink, ScanStats, Traverser};
pub use watcher::{PollingWatcher, PollingWatcherBuilder, WatcherState};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::events::{EventKind, WatchEvent};
    pub use crate::snapshot::Entry;
    pub use crate::watcher::PollingWatcher;
    pub use pollwatch_core::config::WatcherConfig;
}
