//! upstream-watch daemon.
//!
//! Watches configured backend groups and continuously publishes the set of
//! destinations that can serve traffic for each, preferring the group's
//! virtual address once it has been verified end to end.
//!
//! # Architecture Overview
//!
//! ```text
//!                   ┌──────────────────────────────────────────────────┐
//!                   │                 UPSTREAM-WATCH                    │
//!                   │                                                   │
//!   config file ────┼─▶ ┌──────────┐   apply/diff   ┌──────────────┐   │
//!   (+ hot reload)  │   │ topology │───────────────▶│ WatchManager │   │
//!                   │   │ snapshot │  membership    │  (registry)  │   │
//!                   │   └────┬─────┘    events      └──────┬───────┘   │
//!                   │        │ vip lookups                 │ snapshot  │
//!                   │        │                             ▼           │
//!                   │        │                      ┌──────────────┐   │
//!                   │        └─────────────────────▶│ GroupWatcher │──┼──▶ probes
//!                   │                               │  (per group) │   │   (HTTP/1, HTTP/2)
//!                   │                               └──────┬───────┘   │
//!                   │                                      │           │
//!   consumers ◀─────┼───── aggregated DestsUpdate stream ◀─┘           │
//!                   │                                                   │
//!                   │  ┌─────────────────────────────────────────────┐ │
//!                   │  │ Cross-Cutting: config · observability ·     │ │
//!                   │  │               lifecycle (signals, drain)    │ │
//!                   │  └─────────────────────────────────────────────┘ │
//!                   └──────────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tokio_util::sync::CancellationToken;

use upstream_watch::config::load_config;
use upstream_watch::health::manager::WatchManager;
use upstream_watch::lifecycle::signals;
use upstream_watch::observability::{logging, metrics};
use upstream_watch::probe::http::HttpProber;
use upstream_watch::topology::file::{drive_reloads, TopologyFileWatcher};
use upstream_watch::topology::memory::InMemoryTopology;

#[derive(Parser)]
#[command(name = "upstream-watch")]
#[command(about = "Healthy-destination discovery daemon for backend groups")]
struct Cli {
    /// Path to the watch configuration file.
    #[arg(short, long, default_value = "upstream-watch.toml")]
    config: PathBuf,

    /// Validate the configuration and exit.
    #[arg(long)]
    check: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config = load_config(&cli.config)?;
    if cli.check {
        println!("{}: OK", cli.config.display());
        return Ok(());
    }

    logging::init(&config.observability);

    tracing::info!("upstream-watch v0.1.0 starting");
    tracing::info!(
        config = %cli.config.display(),
        groups = config.groups.len(),
        probe_interval_ms = config.watch.probe_interval_ms,
        probe_timeout_ms = config.watch.probe_timeout_ms,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        if let Ok(addr) = config.observability.metrics_address.parse() {
            metrics::init_metrics(addr);
        } else {
            tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            );
        }
    }

    let topology = Arc::new(InMemoryTopology::from_config(&config.groups));
    let prober = Arc::new(HttpProber::new());
    let shutdown = CancellationToken::new();

    let (manager, mut updates) =
        WatchManager::new(topology.clone(), prober, config.watch, shutdown.clone());

    // Seed the manager with the configured membership.
    for record in topology.endpoint_records() {
        manager.endpoints_updated(record).await;
    }

    // Hot reload: file changes become membership events.
    let (file_watcher, reloads) = TopologyFileWatcher::new(&cli.config);
    let _watcher_guard = file_watcher.run()?;
    tokio::spawn(drive_reloads(
        reloads,
        topology,
        manager.clone(),
        shutdown.clone(),
    ));

    // Surface every update as a structured log line until the stream closes.
    let consumer = tokio::spawn(async move {
        while let Some(update) = updates.recv().await {
            tracing::info!(
                group = %update.group,
                vip = update.vip.as_deref().unwrap_or("-"),
                dests = update.dests.len(),
                "healthy destinations changed"
            );
        }
        tracing::info!("Update stream closed");
    });

    signals::shutdown_signal().await;
    shutdown.cancel();

    // The stream closes only once every watcher has drained.
    consumer.await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
