use std::path::{Path, PathBuf};
use thiserror::Error;

/// Result type for pollwatch operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for pollwatch operations
#[derive(Error, Debug)]
pub enum Error {
    /// I/O related errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// A path did not exist when it was accessed
    #[error("path not found: {}", path.display())]
    PathNotFound { path: PathBuf },

    /// Reading metadata for a discovered path failed
    #[error("failed to read metadata for {}: {source}", path.display())]
    Metadata {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Reading the children of a directory failed
    #[error("failed to list directory {}: {source}", path.display())]
    Listing {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// `watch` was called before a successful `collect`
    #[error("watch requested before initial collect")]
    NotReady,

    /// An ignore rule could not be compiled
    #[error("Invalid ignore rule: {0}")]
    InvalidIgnoreRule(String),

    /// Generic error with context
    #[error("{context}: {source}")]
    WithContext {
        context: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Any other error
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl Error {
    /// Creates a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Creates a path-not-found error
    pub fn path_not_found(path: impl AsRef<Path>) -> Self {
        Self::PathNotFound {
            path: path.as_ref().to_path_buf(),
        }
    }

    /// Creates a metadata error, folding `NotFound` into [`Error::PathNotFound`]
    pub fn metadata(path: impl AsRef<Path>, source: std::io::Error) -> Self {
        let path = path.as_ref().to_path_buf();
        if source.kind() == std::io::ErrorKind::NotFound {
            return Self::PathNotFound { path };
        }
        Self::Metadata { path, source }
    }

    /// Creates a directory listing error
    pub fn listing(path: impl AsRef<Path>, source: std::io::Error) -> Self {
        let path = path.as_ref().to_path_buf();
        if source.kind() == std::io::ErrorKind::NotFound {
            return Self::PathNotFound { path };
        }
        Self::Listing { path, source }
    }

    /// Creates an invalid ignore rule error
    pub fn invalid_ignore_rule(msg: impl Into<String>) -> Self {
        Self::InvalidIgnoreRule(msg.into())
    }

    /// Adds context to any error
    pub fn with_context<E>(context: impl Into<String>, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::WithContext {
            context: context.into(),
            source: Box::new(source),
        }
    }

    /// Whether the error should abort the calling operation
    ///
    /// A missing watch root, `watch` before `collect`, and configuration
    /// problems are fatal. Metadata and listing failures only ever skip the
    /// entry they concern.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, Self::Metadata { .. } | Self::Listing { .. })
    }

    /// The path this error is about, if any
    pub fn path(&self) -> Option<&Path> {
        match self {
            Self::PathNotFound { path }
            | Self::Metadata { path, .. }
            | Self::Listing { path, .. } => Some(path),
            _ => None,
        }
    }
}

/// Extension trait for adding context to Results
pub trait ResultExt<T> {
    /// Add context to an error
    fn context(self, context: impl Into<String>) -> Result<T>;
}

impl<T, E> ResultExt<T> for std::result::Result<T, E>
where
    E: std::error::Error + Send + Sync + 'static,
{
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| Error::with_context(context, e))
    }
}
