//! Topology hot reload from disk.
//!
//! Watches the configuration file for changes, re-parses it and turns the
//! membership diff into events for the watch manager. A file that fails to
//! parse or validate is rejected and the current view stays in effect.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use notify::{Config, Event, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::config::loader::load_config;
use crate::config::schema::WatchConfig;
use crate::health::manager::WatchManager;
use crate::topology::memory::InMemoryTopology;
use crate::topology::types::TopologyEvent;

/// Watches the configuration file and emits freshly parsed configs.
pub struct TopologyFileWatcher {
    path: PathBuf,
    reload_tx: mpsc::UnboundedSender<WatchConfig>,
}

impl TopologyFileWatcher {
    /// Create a watcher plus the receiver reloaded configs arrive on.
    pub fn new(path: &Path) -> (Self, mpsc::UnboundedReceiver<WatchConfig>) {
        let (reload_tx, reload_rx) = mpsc::unbounded_channel();
        (
            Self {
                path: path.to_path_buf(),
                reload_tx,
            },
            reload_rx,
        )
    }

    /// Start watching the file.
    ///
    /// The returned watcher must be kept alive; dropping it stops the watch.
    pub fn run(self) -> Result<RecommendedWatcher, notify::Error> {
        let tx = self.reload_tx;
        let path = self.path.clone();

        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| match res {
                Ok(event) => {
                    if event.kind.is_modify() || event.kind.is_create() {
                        tracing::info!("Topology file change detected, reloading...");
                        match load_config(&path) {
                            Ok(config) => {
                                let _ = tx.send(config);
                            }
                            Err(e) => {
                                tracing::error!(
                                    "Failed to reload topology: {}. Keeping current view.",
                                    e
                                );
                            }
                        }
                    }
                }
                Err(e) => tracing::error!("Topology watch error: {:?}", e),
            },
            Config::default().with_poll_interval(Duration::from_secs(2)),
        )?;

        watcher.watch(&self.path, RecursiveMode::NonRecursive)?;

        tracing::info!(path = ?self.path, "Topology file watcher started");
        Ok(watcher)
    }
}

/// Apply reloaded configs to the store and feed the diff to the manager.
///
/// Runs until `shutdown` fires or the reload channel closes.
pub async fn drive_reloads(
    mut reloads: mpsc::UnboundedReceiver<WatchConfig>,
    topology: Arc<InMemoryTopology>,
    manager: WatchManager,
    shutdown: CancellationToken,
) {
    loop {
        let config = tokio::select! {
            _ = shutdown.cancelled() => return,
            config = reloads.recv() => match config {
                Some(config) => config,
                None => return,
            },
        };

        let events = topology.apply(&config.groups);
        tracing::info!(events = events.len(), "Applying reloaded topology");
        for event in events {
            match event {
                TopologyEvent::EndpointsUpdated(record) => manager.endpoints_updated(record).await,
                TopologyEvent::EndpointsDeleted(group) => manager.endpoints_deleted(&group).await,
            }
        }
    }
}
