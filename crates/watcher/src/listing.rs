//! Directory listing cache
//!
//! Re-reading every directory on every poll is the expensive part of a scan.
//! The cache keeps the last child listing per directory and only re-reads a
//! directory when its own modification time moves. Entries are never evicted.

use crate::fs::{DirChild, FileSystem};
use dashmap::DashMap;
use pollwatch_core::error::{Error, Result};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;
use tracing::{debug, trace};

/// Cached listing for one path
#[derive(Debug, Clone)]
pub struct Listing {
    /// Immediate children; empty for plain files
    pub children: Arc<Vec<DirChild>>,
    /// Whether the listed path is a directory
    pub is_dir: bool,
    /// Size of the path when it was last read
    pub size: u64,
    /// Modification time of the path when it was last read
    pub modified: SystemTime,
}

/// Per-watcher cache of directory listings keyed by absolute path
#[derive(Debug, Default)]
pub struct ListingCache {
    records: DashMap<PathBuf, Listing>,
}

impl ListingCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// List the children of `path`, reusing the cached listing when the
    /// path's kind and modification time are both unchanged
    pub async fn list(&self, fs: &dyn FileSystem, path: &Path) -> Result<Listing> {
        let metadata = fs
            .metadata(path)
            .await
            .map_err(|e| Error::metadata(path, e))?;

        // Clone out so no map guard is held across the read below
        let cached = self.records.get(path).map(|r| r.value().clone());
        if let Some(listing) = cached {
            if listing.is_dir == metadata.is_dir() && listing.modified == metadata.modified {
                trace!("Listing cache hit for {:?}", path);
                return Ok(listing);
            }
            debug!("{:?} modified, refreshing listing", path);
        }

        let children = if metadata.is_dir() {
            fs.read_dir(path)
                .await
                .map_err(|e| Error::listing(path, e))?
        } else {
            Vec::new()
        };

        let listing = Listing {
            children: Arc::new(children),
            is_dir: metadata.is_dir(),
            size: metadata.size,
            modified: metadata.modified,
        };
        self.records.insert(path.to_path_buf(), listing.clone());

        Ok(listing)
    }

    /// Number of cached records
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Check whether a listing for `path` has been cached
    pub fn contains(&self, path: &Path) -> bool {
        self.records.contains_key(path)
    }
}
