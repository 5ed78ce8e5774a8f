//! Recursive scan of a directory tree
//!
//! The traverser walks the tree one sibling at a time, diffs every file it
//! finds against the snapshot it was handed, and reports `add`/`change`
//! events through a caller-supplied sink. Failures on individual entries are
//! reported as [`WatchEvent::Error`] and never stop the walk.

use crate::events::WatchEvent;
use crate::fs::{FileSystem, PathMetadata};
use crate::ignore::IgnoreSet;
use crate::listing::ListingCache;
use crate::snapshot::{Entry, Observation, Snapshot};
use futures::future::BoxFuture;
use pollwatch_core::error::{Error, Result};
use std::path::Path;
use std::sync::Arc;
use tracing::trace;

/// Receives events produced during a walk
pub type EventSink<'s> = dyn FnMut(WatchEvent) + Send + 's;

/// Counters for one walk
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScanStats {
    /// Directories listed
    pub directories: usize,
    /// Files diffed against the snapshot
    pub files: usize,
    pub added: usize,
    pub changed: usize,
    /// Children pruned by ignore rules
    pub ignored: usize,
    /// Entries skipped because of a non-fatal error
    pub errors: usize,
}

/// One configured walk over a tree
pub struct Traverser<'a> {
    fs: &'a dyn FileSystem,
    listings: &'a ListingCache,
    ignore: &'a IgnoreSet,
    suppress_adds: bool,
}

impl<'a> Traverser<'a> {
    pub fn new(fs: &'a dyn FileSystem, listings: &'a ListingCache, ignore: &'a IgnoreSet) -> Self {
        Self {
            fs,
            listings,
            ignore,
            suppress_adds: false,
        }
    }

    /// Record new files without emitting `add` for them
    pub fn suppress_adds(mut self, suppress: bool) -> Self {
        self.suppress_adds = suppress;
        self
    }

    /// Walk `root`, updating `snapshot` in place
    ///
    /// A root that is a plain file is diffed on its own. Errors listing the
    /// root itself are returned; everything below the root is non-fatal.
    pub async fn walk(
        &self,
        root: &Path,
        snapshot: &mut Snapshot,
        sink: &mut EventSink<'_>,
    ) -> Result<ScanStats> {
        let mut stats = ScanStats::default();
        let listing = self.listings.list(self.fs, root).await?;

        if listing.is_dir {
            stats.directories += 1;
            self.walk_children(root, &listing.children, snapshot, sink, &mut stats)
                .await;
        } else {
            let metadata = self
                .fs
                .metadata(root)
                .await
                .map_err(|e| Error::metadata(root, e))?;
            if metadata.is_file() {
                let name = root
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_else(|| root.to_string_lossy().into_owned());
                self.observe_file(root, name, &metadata, snapshot, sink, &mut stats);
            } else {
                trace!("Root {:?} is neither a file nor a directory", root);
            }
        }

        Ok(stats)
    }

    fn walk_dir<'b>(
        &'b self,
        dir: &'b Path,
        snapshot: &'b mut Snapshot,
        sink: &'b mut EventSink<'_>,
        stats: &'b mut ScanStats,
    ) -> BoxFuture<'b, ()> {
        Box::pin(async move {
            let listing = match self.listings.list(self.fs, dir).await {
                Ok(listing) => listing,
                Err(err) => {
                    stats.errors += 1;
                    sink(WatchEvent::Error(Arc::new(err)));
                    return;
                }
            };
            stats.directories += 1;
            self.walk_children(dir, &listing.children, snapshot, sink, stats)
                .await;
        })
    }

    async fn walk_children(
        &self,
        dir: &Path,
        children: &[crate::fs::DirChild],
        snapshot: &mut Snapshot,
        sink: &mut EventSink<'_>,
        stats: &mut ScanStats,
    ) {
        for child in children {
            let Some(name) = child.name.to_str().filter(|n| !n.is_empty()) else {
                trace!("Skipping unreadable name {:?} in {:?}", child.name, dir);
                continue;
            };

            if self.ignore.should_ignore(name, dir) {
                stats.ignored += 1;
                continue;
            }

            let path = dir.join(name);
            let metadata = match self.fs.metadata(&path).await {
                Ok(metadata) => metadata,
                Err(e) => {
                    stats.errors += 1;
                    sink(WatchEvent::Error(Arc::new(Error::metadata(&path, e))));
                    continue;
                }
            };

            if metadata.is_dir() {
                // Symlinked directories are not descended to avoid cycles
                if child.is_dir {
                    self.walk_dir(&path, snapshot, sink, stats).await;
                } else {
                    trace!("Not following directory symlink {:?}", path);
                }
            } else if metadata.is_file() {
                self.observe_file(&path, name, &metadata, snapshot, sink, stats);
            }
        }
    }

    fn observe_file(
        &self,
        path: &Path,
        name: impl Into<String>,
        metadata: &PathMetadata,
        snapshot: &mut Snapshot,
        sink: &mut EventSink<'_>,
        stats: &mut ScanStats,
    ) {
        stats.files += 1;
        match snapshot.observe(Entry::file(path, name, metadata)) {
            Observation::New(entry) => {
                stats.added += 1;
                if !self.suppress_adds {
                    sink(WatchEvent::Add(entry));
                }
            }
            Observation::Changed { updated, previous } => {
                stats.changed += 1;
                sink(WatchEvent::Change { updated, previous });
            }
            Observation::Unchanged => {}
        }
    }
}
