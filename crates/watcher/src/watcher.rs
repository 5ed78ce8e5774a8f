//! Polling watcher
//!
//! Owns the snapshot, ignore rules, listing cache and event bus for one
//! watch root, and drives a scan per poll tick. At most one scan is in
//! flight at a time; a tick that finds a scan still running is skipped,
//! not queued.

use crate::{
    events::{EventBus, EventKind, WatchEvent},
    fs::{FileSystem, TokioFileSystem},
    ignore::{IgnoreRule, IgnoreSet},
    listing::ListingCache,
    snapshot::{Entry, Snapshot},
    traverser::{ScanStats, Traverser},
};
use pollwatch_core::config::WatcherConfig;
use pollwatch_core::error::{Error, Result};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::{mpsc, MutexGuard};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Lifecycle state derived from the watcher's flags
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatcherState {
    /// `collect` has not completed
    Uninitialized,
    /// The first `collect` is running
    Collecting,
    /// Ready with no scan in flight
    Idle,
    /// Ready with a scan in flight
    Busy,
    /// `stop` was called; an in-flight scan may still finish
    Stopped,
}

struct Inner {
    root: PathBuf,
    config: WatcherConfig,
    fs: Arc<dyn FileSystem>,
    ignore: IgnoreSet,
    listings: ListingCache,
    snapshot: tokio::sync::Mutex<Snapshot>,
    bus: EventBus,
    ready: AtomicBool,
    busy: AtomicBool,
    stopped: AtomicBool,
    scans: AtomicU64,
    /// Cancels the currently armed poll timer
    timer: Mutex<Option<CancellationToken>>,
}

/// Polling snapshot watcher for one directory tree
///
/// Cloning is cheap; clones share the same state.
#[derive(Clone)]
pub struct PollingWatcher {
    inner: Arc<Inner>,
}

impl std::fmt::Debug for PollingWatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PollingWatcher")
            .field("root", &self.inner.root)
            .field("state", &self.state())
            .field("ignore", &self.inner.ignore)
            .finish()
    }
}

impl PollingWatcher {
    /// Create a watcher over the local filesystem
    pub fn new(root: impl Into<PathBuf>, config: WatcherConfig) -> Result<Self> {
        Self::builder(root).config(config).build()
    }

    /// Create with builder pattern
    pub fn builder(root: impl Into<PathBuf>) -> PollingWatcherBuilder {
        PollingWatcherBuilder {
            root: root.into(),
            config: WatcherConfig::default(),
            rules: Vec::new(),
            fs: None,
        }
    }

    pub fn root(&self) -> &Path {
        &self.inner.root
    }

    pub fn config(&self) -> &WatcherConfig {
        &self.inner.config
    }

    pub fn is_ready(&self) -> bool {
        self.inner.ready.load(Ordering::SeqCst)
    }

    pub fn is_busy(&self) -> bool {
        self.inner.busy.load(Ordering::SeqCst)
    }

    pub fn is_stopped(&self) -> bool {
        self.inner.stopped.load(Ordering::SeqCst)
    }

    pub fn state(&self) -> WatcherState {
        match (self.is_stopped(), self.is_ready(), self.is_busy()) {
            (true, _, _) => WatcherState::Stopped,
            (false, true, true) => WatcherState::Busy,
            (false, true, false) => WatcherState::Idle,
            (false, false, true) => WatcherState::Collecting,
            (false, false, false) => WatcherState::Uninitialized,
        }
    }

    /// Number of scans that ran to completion
    pub fn scans_completed(&self) -> u64 {
        self.inner.scans.load(Ordering::SeqCst)
    }

    /// Number of directory listings held in the cache
    pub fn cached_listings(&self) -> usize {
        self.inner.listings.len()
    }

    /// The live snapshot
    ///
    /// Scans wait for the guard, so hold it only briefly.
    pub async fn files(&self) -> MutexGuard<'_, Snapshot> {
        self.inner.snapshot.lock().await
    }

    /// A copy of the current snapshot
    pub async fn snapshot(&self) -> Snapshot {
        self.inner.snapshot.lock().await.clone()
    }

    /// Register a handler for one event kind
    pub fn on<F>(&self, kind: EventKind, handler: F) -> &Self
    where
        F: Fn(&WatchEvent) + Send + Sync + 'static,
    {
        self.inner.bus.subscribe(kind, handler);
        self
    }

    pub fn on_ready<F>(&self, handler: F) -> &Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.inner.bus.on_ready(handler);
        self
    }

    /// Subscribing turns fatal errors into events instead of `Err` returns
    pub fn on_error<F>(&self, handler: F) -> &Self
    where
        F: Fn(&Error) + Send + Sync + 'static,
    {
        self.inner.bus.on_error(handler);
        self
    }

    pub fn on_add<F>(&self, handler: F) -> &Self
    where
        F: Fn(&Entry) + Send + Sync + 'static,
    {
        self.inner.bus.on_add(handler);
        self
    }

    /// Handler receives `(updated, previous)`
    pub fn on_change<F>(&self, handler: F) -> &Self
    where
        F: Fn(&Entry, &Entry) + Send + Sync + 'static,
    {
        self.inner.bus.on_change(handler);
        self
    }

    /// Receive every event on a channel; counts as an error subscriber
    pub fn events(&self) -> mpsc::UnboundedReceiver<WatchEvent> {
        self.inner.bus.channel()
    }

    /// Run the initial scan, then mark the watcher ready and emit `ready`
    ///
    /// A missing root is fatal when nobody listens for errors. With an error
    /// subscriber the failure is emitted and the watcher still becomes ready
    /// with whatever the snapshot holds.
    pub async fn collect(&self) -> Result<()> {
        info!("Collecting snapshot of {:?}", self.inner.root);
        // A scan spawned by `watch` may own the flag; leave it to that scan
        let owns_busy = self
            .inner
            .busy
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok();

        let result = match self.scan(self.inner.config.ignore_initial_adds).await {
            Ok(stats) => {
                info!(
                    "Collected {} files from {:?} ({} directories, {} skipped)",
                    stats.files, self.inner.root, stats.directories, stats.errors
                );
                Ok(())
            }
            Err(err) => self.emit_or_fail(err),
        };

        if result.is_ok() {
            self.inner.ready.store(true, Ordering::SeqCst);
        }
        if owns_busy {
            self.inner.busy.store(false, Ordering::SeqCst);
        }
        result?;

        self.inner.bus.emit(WatchEvent::Ready);
        Ok(())
    }

    /// Start polling
    ///
    /// Must run inside a tokio runtime. Calling again resets the interval
    /// rather than stacking a second timer.
    pub fn watch(&self) -> Result<()> {
        if !self.is_ready() {
            return self.emit_or_fail(Error::NotReady);
        }

        let interval = self.inner.config.poll_interval();
        let token = CancellationToken::new();
        let previous = self
            .inner
            .timer
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .replace(token.clone());
        match previous {
            Some(previous) => previous.cancel(),
            None => info!("Watching {:?} every {:?}", self.inner.root, interval),
        }

        if self
            .inner
            .busy
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
        {
            let this = self.clone();
            tokio::spawn(async move {
                // Live watching always reports adds
                if let Err(err) = this.scan(false).await {
                    if let Err(err) = this.emit_or_fail(err) {
                        error!("Scan of {:?} failed: {}", this.inner.root, err);
                    }
                }
                this.inner.busy.store(false, Ordering::SeqCst);
            });
        } else {
            debug!("Previous scan still running, skipping tick");
        }

        if self.is_stopped() {
            info!("Watcher for {:?} stopped", self.inner.root);
            return Ok(());
        }

        let this = self.clone();
        tokio::spawn(async move {
            tokio::select! {
                _ = token.cancelled() => {}
                _ = tokio::time::sleep(interval) => {
                    if let Err(err) = this.watch() {
                        error!("Poll tick for {:?} failed: {}", this.inner.root, err);
                    }
                }
            }
        });

        Ok(())
    }

    /// Request polling to cease after the current tick
    ///
    /// An in-flight scan and an already armed timer are left to run.
    pub fn stop(&self) {
        self.inner.stopped.store(true, Ordering::SeqCst);
        debug!("Stop requested for {:?}", self.inner.root);
    }

    /// Write one line per entry, ordered by path
    pub async fn print_to(&self, out: &mut impl Write) -> Result<()> {
        let snapshot = self.inner.snapshot.lock().await;
        for entry in snapshot.sorted_entries() {
            writeln!(out, "{entry:?}")?;
        }
        Ok(())
    }

    /// Debug dump of all entries to stdout
    pub async fn print(&self) -> Result<()> {
        let mut buf = Vec::new();
        self.print_to(&mut buf).await?;
        std::io::stdout().write_all(&buf)?;
        Ok(())
    }

    async fn scan(&self, suppress_adds: bool) -> Result<ScanStats> {
        let inner = &self.inner;
        if !inner.fs.exists(&inner.root).await {
            return Err(Error::path_not_found(&inner.root));
        }

        let mut snapshot = inner.snapshot.lock().await;
        let bus = &inner.bus;
        let mut sink = |event: WatchEvent| match event {
            WatchEvent::Error(err) if !bus.has_subscribers(EventKind::Error) => {
                warn!("Skipping entry: {}", err);
            }
            event => bus.emit(event),
        };

        let stats = Traverser::new(inner.fs.as_ref(), &inner.listings, &inner.ignore)
            .suppress_adds(suppress_adds)
            .walk(&inner.root, &mut snapshot, &mut sink)
            .await?;

        inner.scans.fetch_add(1, Ordering::SeqCst);
        debug!(
            "Scan of {:?}: {} files, {} added, {} changed",
            inner.root, stats.files, stats.added, stats.changed
        );
        Ok(stats)
    }

    /// Emit `err` when an error handler exists; otherwise fatal errors are
    /// handed back and the rest are logged
    fn emit_or_fail(&self, err: Error) -> Result<()> {
        if self.inner.bus.has_subscribers(EventKind::Error) {
            self.inner.bus.emit(WatchEvent::Error(Arc::new(err)));
            Ok(())
        } else if err.is_fatal() {
            Err(err)
        } else {
            warn!("Scan of {:?} incomplete: {}", self.inner.root, err);
            Ok(())
        }
    }
}

/// Builder for [`PollingWatcher`]
pub struct PollingWatcherBuilder {
    root: PathBuf,
    config: WatcherConfig,
    rules: Vec<IgnoreRule>,
    fs: Option<Arc<dyn FileSystem>>,
}

impl PollingWatcherBuilder {
    /// Set the watcher configuration
    pub fn config(mut self, config: WatcherConfig) -> Self {
        self.config = config;
        self
    }

    /// Add an already compiled ignore rule on top of the configured patterns
    pub fn ignore_rule(mut self, rule: IgnoreRule) -> Self {
        self.rules.push(rule);
        self
    }

    /// Use a custom filesystem adapter
    pub fn file_system(mut self, fs: Arc<dyn FileSystem>) -> Self {
        self.fs = Some(fs);
        self
    }

    /// Build the watcher, rejecting an invalid configuration
    pub fn build(self) -> Result<PollingWatcher> {
        self.config.validate()?;
        let mut ignore = IgnoreSet::from_patterns(&self.config.ignore_patterns)?;
        for rule in self.rules {
            ignore.push(rule);
        }

        Ok(PollingWatcher {
            inner: Arc::new(Inner {
                root: self.root,
                config: self.config,
                fs: self.fs.unwrap_or_else(|| Arc::new(TokioFileSystem)),
                ignore,
                listings: ListingCache::new(),
                snapshot: tokio::sync::Mutex::new(Snapshot::new()),
                bus: EventBus::new(),
                ready: AtomicBool::new(false),
                busy: AtomicBool::new(false),
                stopped: AtomicBool::new(false),
                scans: AtomicU64::new(0),
                timer: Mutex::new(None),
            }),
        })
    }
}
