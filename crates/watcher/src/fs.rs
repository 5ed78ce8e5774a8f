//! Filesystem adapter
//!
//! The scan engine never touches the filesystem directly. Everything goes
//! through [`FileSystem`], so a native recursive iterator or an in-memory
//! tree can stand in for the default tokio-backed implementation.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::ffi::OsString;
use std::io;
use std::path::Path;
use std::time::SystemTime;

/// Classification of a path as reported by [`FileSystem::metadata`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PathKind {
    File,
    Directory,
    /// Sockets, FIFOs, devices and anything else that is neither
    Other,
}

/// Metadata for a single path
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathMetadata {
    /// Last modification time
    pub modified: SystemTime,
    /// Creation time, or `modified` when the platform does not report one
    pub created: SystemTime,
    /// Size in bytes
    pub size: u64,
    /// File, directory or other
    pub kind: PathKind,
}

impl PathMetadata {
    pub fn is_dir(&self) -> bool {
        self.kind == PathKind::Directory
    }

    pub fn is_file(&self) -> bool {
        self.kind == PathKind::File
    }
}

/// One immediate child of a directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirChild {
    /// Base name as returned by the platform, possibly not valid UTF-8
    pub name: OsString,
    /// Whether the child is a real directory (symlinks are not followed)
    pub is_dir: bool,
}

impl DirChild {
    pub fn new(name: impl Into<OsString>, is_dir: bool) -> Self {
        Self {
            name: name.into(),
            is_dir,
        }
    }
}

/// Filesystem primitives required by the scan engine
#[async_trait]
pub trait FileSystem: Send + Sync + 'static {
    /// Check whether a path exists
    async fn exists(&self, path: &Path) -> bool;

    /// List the immediate children of a directory, ordered by name
    async fn read_dir(&self, path: &Path) -> io::Result<Vec<DirChild>>;

    /// Fetch metadata for a path, following symlinks
    async fn metadata(&self, path: &Path) -> io::Result<PathMetadata>;
}

/// [`FileSystem`] backed by `tokio::fs`
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioFileSystem;

#[async_trait]
impl FileSystem for TokioFileSystem {
    async fn exists(&self, path: &Path) -> bool {
        tokio::fs::try_exists(path).await.unwrap_or(false)
    }

    async fn read_dir(&self, path: &Path) -> io::Result<Vec<DirChild>> {
        let mut entries = tokio::fs::read_dir(path).await?;
        let mut children = Vec::new();

        while let Some(entry) = entries.next_entry().await? {
            let is_dir = entry.file_type().await?.is_dir();
            children.push(DirChild::new(entry.file_name(), is_dir));
        }

        children.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(children)
    }

    async fn metadata(&self, path: &Path) -> io::Result<PathMetadata> {
        let metadata = tokio::fs::metadata(path).await?;
        let modified = metadata.modified()?;
        let created = metadata.created().unwrap_or(modified);
        let kind = if metadata.is_dir() {
            PathKind::Directory
        } else if metadata.is_file() {
            PathKind::File
        } else {
            PathKind::Other
        };

        Ok(PathMetadata {
            modified,
            created,
            size: metadata.len(),
            kind,
        })
    }
}

/// In-memory filesystem for unit tests
#[cfg(test)]
pub(crate) mod memory {
    use super::*;
    use std::collections::{BTreeMap, HashSet};
    use std::path::PathBuf;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;

    /// Epoch-relative timestamp helper
    pub(crate) fn at(ms: u64) -> SystemTime {
        SystemTime::UNIX_EPOCH + Duration::from_millis(ms)
    }

    #[derive(Debug, Clone)]
    struct Node {
        kind: PathKind,
        modified: SystemTime,
        size: u64,
    }

    #[derive(Debug, Default)]
    pub(crate) struct MemoryFileSystem {
        nodes: Mutex<BTreeMap<PathBuf, Node>>,
        failing: Mutex<HashSet<PathBuf>>,
        failing_reads: Mutex<HashSet<PathBuf>>,
        read_dir_calls: AtomicUsize,
    }

    impl MemoryFileSystem {
        pub(crate) fn new() -> Self {
            Self::default()
        }

        pub(crate) fn add_dir(&self, path: impl Into<PathBuf>, modified_ms: u64) {
            self.insert(path.into(), PathKind::Directory, modified_ms);
        }

        pub(crate) fn add_file(&self, path: impl Into<PathBuf>, modified_ms: u64) {
            self.insert(path.into(), PathKind::File, modified_ms);
        }

        /// Set a new modification time on an existing path
        pub(crate) fn touch(&self, path: impl AsRef<Path>, modified_ms: u64) {
            let mut nodes = self.nodes.lock().unwrap();
            if let Some(node) = nodes.get_mut(path.as_ref()) {
                node.modified = at(modified_ms);
            }
        }

        /// Make every metadata call for `path` fail with `PermissionDenied`
        pub(crate) fn fail_metadata(&self, path: impl Into<PathBuf>) {
            self.failing.lock().unwrap().insert(path.into());
        }

        /// Make every read_dir call for `path` fail with `PermissionDenied`
        pub(crate) fn fail_read_dir(&self, path: impl Into<PathBuf>) {
            self.failing_reads.lock().unwrap().insert(path.into());
        }

        pub(crate) fn read_dir_calls(&self) -> usize {
            self.read_dir_calls.load(Ordering::SeqCst)
        }

        fn insert(&self, path: PathBuf, kind: PathKind, modified_ms: u64) {
            self.nodes.lock().unwrap().insert(
                path,
                Node {
                    kind,
                    modified: at(modified_ms),
                    size: 0,
                },
            );
        }
    }

    #[async_trait]
    impl FileSystem for MemoryFileSystem {
        async fn exists(&self, path: &Path) -> bool {
            self.nodes.lock().unwrap().contains_key(path)
        }

        async fn read_dir(&self, path: &Path) -> io::Result<Vec<DirChild>> {
            self.read_dir_calls.fetch_add(1, Ordering::SeqCst);
            if self.failing_reads.lock().unwrap().contains(path) {
                return Err(io::Error::from(io::ErrorKind::PermissionDenied));
            }
            let nodes = self.nodes.lock().unwrap();
            match nodes.get(path) {
                Some(node) if node.kind == PathKind::Directory => {}
                Some(_) => return Err(io::Error::other("not a directory")),
                None => return Err(io::Error::from(io::ErrorKind::NotFound)),
            }

            Ok(nodes
                .iter()
                .filter(|(p, _)| p.parent() == Some(path))
                .filter_map(|(p, node)| {
                    p.file_name()
                        .map(|name| DirChild::new(name, node.kind == PathKind::Directory))
                })
                .collect())
        }

        async fn metadata(&self, path: &Path) -> io::Result<PathMetadata> {
            if self.failing.lock().unwrap().contains(path) {
                return Err(io::Error::from(io::ErrorKind::PermissionDenied));
            }
            let nodes = self.nodes.lock().unwrap();
            let node = nodes
                .get(path)
                .ok_or_else(|| io::Error::from(io::ErrorKind::NotFound))?;
            Ok(PathMetadata {
                modified: node.modified,
                created: node.modified,
                size: node.size,
                kind: node.kind,
            })
        }
    }
}
