//! pollwatch CLI - polling change detection for directory trees
//!
//! This binary provides the command-line interface for the pollwatch watcher.

#![cfg_attr(not(test), deny(clippy::unwrap_used))]
#![cfg_attr(not(test), deny(clippy::expect_used))]

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use pollwatch_core::config::{Config, WatcherConfig};
use pollwatch_watcher::{Entry, PollingWatcher, WatchEvent};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

#[derive(Parser)]
#[command(name = "pollwatch")]
#[command(about = "Snapshot a directory tree and report added and changed files")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file path
    #[arg(short, long, value_name = "FILE", global = true)]
    config: Option<PathBuf>,

    /// Verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Scan once and print every file found
    Collect {
        /// Directory (or file) to scan
        root: PathBuf,

        /// Ignore rule: `re:<regex>`, `glob:<pattern>` or a substring
        #[arg(short, long = "ignore", value_name = "RULE")]
        ignore: Vec<String>,

        /// Print entries as JSON lines
        #[arg(long)]
        json: bool,
    },
    /// Scan, then keep polling and print events until interrupted
    Watch {
        /// Directory (or file) to watch
        root: PathBuf,

        /// Ignore rule: `re:<regex>`, `glob:<pattern>` or a substring
        #[arg(short, long = "ignore", value_name = "RULE")]
        ignore: Vec<String>,

        /// Poll interval in milliseconds
        #[arg(long, value_name = "MS")]
        interval_ms: Option<u64>,

        /// Do not report files found by the initial scan
        #[arg(long)]
        ignore_initial_adds: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose);

    let config = Config::load(cli.config.as_deref()).context("Failed to load configuration")?;
    config.validate()?;

    match cli.command {
        Commands::Collect { root, ignore, json } => {
            let watcher_config = merge_config(config.watcher, ignore, None, false);
            collect(&root, watcher_config, json).await
        }
        Commands::Watch {
            root,
            ignore,
            interval_ms,
            ignore_initial_adds,
        } => {
            let watcher_config =
                merge_config(config.watcher, ignore, interval_ms, ignore_initial_adds);
            watch(&root, watcher_config).await
        }
    }
}

/// Initialize logging system
fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Layer command-line flags over the loaded watcher section
fn merge_config(
    base: WatcherConfig,
    ignore: Vec<String>,
    interval_ms: Option<u64>,
    ignore_initial_adds: bool,
) -> WatcherConfig {
    let mut builder = WatcherConfig::builder()
        .ignore_patterns(base.ignore_patterns)
        .poll_interval_ms(interval_ms.unwrap_or(base.poll_interval_ms))
        .ignore_initial_adds(base.ignore_initial_adds || ignore_initial_adds);
    for rule in ignore {
        builder = builder.add_ignore_pattern(rule);
    }
    builder.build()
}

async fn collect(root: &Path, config: WatcherConfig, json: bool) -> Result<()> {
    let watcher = PollingWatcher::new(root, config)?;
    watcher.collect().await?;

    if json {
        let snapshot = watcher.files().await;
        for entry in snapshot.sorted_entries() {
            println!("{}", serde_json::to_string(entry)?);
        }
    } else {
        watcher.print().await?;
    }
    Ok(())
}

async fn watch(root: &Path, config: WatcherConfig) -> Result<()> {
    let watcher = PollingWatcher::new(root, config)?;
    let mut events = watcher.events();

    watcher.collect().await?;
    watcher.watch()?;
    info!("Watching {} (Ctrl-C to stop)", root.display());

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("Interrupted, stopping watcher");
                watcher.stop();
                break;
            }
            event = events.recv() => match event {
                Some(event) => print_event(&event),
                None => break,
            },
        }
    }

    Ok(())
}

fn print_event(event: &WatchEvent) {
    match event {
        WatchEvent::Ready => info!("Initial scan complete"),
        WatchEvent::Error(err) => warn!("{err}"),
        WatchEvent::Add(entry) => println!("add     {}", describe(entry)),
        WatchEvent::Change { updated, .. } => println!("change  {}", describe(updated)),
    }
}

fn describe(entry: &Entry) -> String {
    format!("{} (modified {})", entry.path.display(), entry.modified)
}
