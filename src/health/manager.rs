//! Watch manager.
//!
//! # Responsibilities
//! - Own the group → watcher registry
//! - Lazily create a watcher the first time a group's membership is seen
//! - Route destination snapshots to the right watcher, tear watchers down
//!   on membership deletion
//! - Fan every watcher's updates into one stream and close that stream
//!   only after shutdown has fired and all watchers have drained
//!
//! # Design Decisions
//! - Creation happens under the registry lock, so concurrent events for a
//!   new group cannot race two watchers into existence.
//! - The manager's own update sender doubles as the lifecycle flag: once
//!   shutdown takes it, no watcher can be created anymore, and dropping it
//!   after the last watcher finishes is exactly what closes the stream.

use std::collections::HashMap;
use std::sync::Arc;

use thiserror::Error;
use tokio::sync::{mpsc, watch, Mutex};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::config::schema::WatchSettings;
use crate::health::update::DestsUpdate;
use crate::health::watcher::GroupWatcher;
use crate::observability::metrics;
use crate::probe::types::Prober;
use crate::topology::store::{TopologyError, TopologyStore};
use crate::topology::translate::dests_for_protocol;
use crate::topology::types::{DestSet, EndpointRecord, GroupId, Protocol};

/// Why a membership event could not be routed to a watcher.
#[derive(Debug, Error)]
enum RouteError {
    #[error("manager is shutting down")]
    ShuttingDown,
    #[error(transparent)]
    Topology(#[from] TopologyError),
}

/// What the manager keeps per live watcher.
struct WatcherHandle {
    protocol: Protocol,
    dests_tx: watch::Sender<Option<DestSet>>,
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

/// Registry plus the manager's copy of the update sender.
///
/// `update_tx` is `None` once shutdown has begun.
struct Registry {
    watchers: HashMap<GroupId, WatcherHandle>,
    update_tx: Option<mpsc::Sender<DestsUpdate>>,
}

struct ManagerInner {
    topology: Arc<dyn TopologyStore>,
    prober: Arc<dyn Prober>,
    settings: WatchSettings,
    shutdown: CancellationToken,
    registry: Mutex<Registry>,
}

/// Creates, multiplexes and tears down one watcher per tracked group.
///
/// Cheap to clone; all clones share the same registry.
#[derive(Clone)]
pub struct WatchManager {
    inner: Arc<ManagerInner>,
}

impl WatchManager {
    /// Create a manager and the stream its watchers publish to.
    ///
    /// The stream closes exactly once: after `shutdown` has fired and every
    /// watcher task has finished, so consumers can treat `recv() == None`
    /// as "fully drained".
    pub fn new(
        topology: Arc<dyn TopologyStore>,
        prober: Arc<dyn Prober>,
        settings: WatchSettings,
        shutdown: CancellationToken,
    ) -> (Self, mpsc::Receiver<DestsUpdate>) {
        // Channel capacity must be non-zero.
        let (update_tx, update_rx) = mpsc::channel(settings.update_buffer.max(1));
        let inner = Arc::new(ManagerInner {
            topology,
            prober,
            settings,
            shutdown,
            registry: Mutex::new(Registry {
                watchers: HashMap::new(),
                update_tx: Some(update_tx),
            }),
        });

        tokio::spawn(drain_on_shutdown(inner.clone()));

        (Self { inner }, update_rx)
    }

    /// Handle a membership add or change for a group.
    ///
    /// Creates the group's watcher on first sight, translating the record
    /// into the watcher's protocol-specific destination snapshot. Events
    /// arriving after shutdown has begun are dropped.
    pub async fn endpoints_updated(&self, record: EndpointRecord) {
        if self.inner.shutdown.is_cancelled() {
            return;
        }

        let (protocol, dests_tx) = match self.watcher_for(&record.group).await {
            Ok(entry) => entry,
            Err(RouteError::ShuttingDown) => return,
            Err(RouteError::Topology(err)) => {
                tracing::error!(group = %record.group, error = %err, "failed to create group watcher; dropping event");
                return;
            }
        };

        let dests = dests_for_protocol(&record, protocol);
        tracing::debug!(group = %record.group, dests = dests.len(), "forwarding destination snapshot");
        dests_tx.send_if_modified(|current| {
            if current.as_ref() == Some(&dests) {
                false
            } else {
                *current = Some(dests);
                true
            }
        });
    }

    /// Handle a membership delete: cancel the group's watcher and forget it.
    ///
    /// Idempotent. A later event for the same group starts a fresh watcher
    /// with empty probing state.
    pub async fn endpoints_deleted(&self, group: &GroupId) {
        if self.inner.shutdown.is_cancelled() {
            return;
        }

        let mut registry = self.inner.registry.lock().await;
        if let Some(handle) = registry.watchers.remove(group) {
            tracing::debug!(group = %group, "removing group watcher");
            handle.cancel.cancel();
            metrics::set_active_watchers(registry.watchers.len());
        }
        // The watcher task finishes on its own; its update sender drops with it.
    }

    /// Number of live watchers.
    pub async fn watcher_count(&self) -> usize {
        self.inner.registry.lock().await.watchers.len()
    }

    /// Look up the group's watcher, creating it on first sight.
    async fn watcher_for(
        &self,
        group: &GroupId,
    ) -> Result<(Protocol, watch::Sender<Option<DestSet>>), RouteError> {
        let mut registry = self.inner.registry.lock().await;

        if let Some(handle) = registry.watchers.get(group) {
            return Ok((handle.protocol, handle.dests_tx.clone()));
        }

        let update_tx = match &registry.update_tx {
            Some(update_tx) => update_tx.clone(),
            None => return Err(RouteError::ShuttingDown),
        };

        let protocol = self.inner.topology.group_protocol(group).await?;
        let (dests_tx, dests_rx) = watch::channel(None);
        let cancel = self.inner.shutdown.child_token();
        let watcher = GroupWatcher::new(
            group.clone(),
            protocol,
            self.inner.topology.clone(),
            self.inner.prober.clone(),
            &self.inner.settings,
            cancel.clone(),
            dests_rx,
            update_tx,
        );
        let task = tokio::spawn(watcher.run());

        tracing::info!(group = %group, protocol = %protocol, "started group watcher");
        registry.watchers.insert(
            group.clone(),
            WatcherHandle {
                protocol,
                dests_tx: dests_tx.clone(),
                cancel,
                task,
            },
        );
        metrics::set_active_watchers(registry.watchers.len());

        Ok((protocol, dests_tx))
    }
}

/// Close the update stream only after shutdown has fired and every
/// registered watcher has drained.
async fn drain_on_shutdown(inner: Arc<ManagerInner>) {
    inner.shutdown.cancelled().await;
    tracing::info!("shutdown signalled; draining group watchers");

    // Holding the lock here also parks event handlers that slipped past
    // the cancellation check until draining is done.
    let mut registry = inner.registry.lock().await;
    let update_tx = registry.update_tx.take();

    for (group, handle) in registry.watchers.drain() {
        // The parent token has already cancelled every child.
        if handle.task.await.is_err() {
            tracing::error!(group = %group, "group watcher task panicked");
        }
    }
    metrics::set_active_watchers(0);

    // Every watcher's sender is gone; dropping ours closes the stream.
    drop(update_tx);
    tracing::info!("watch manager stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::probe::types::ProbeError;
    use crate::topology::memory::{GroupState, InMemoryTopology};
    use crate::topology::types::{EndpointSubset, NamedPort, VipService};

    use std::collections::HashSet;
    use std::sync::Mutex as StdMutex;
    use std::time::Duration;

    use async_trait::async_trait;
    use axum::http::StatusCode;
    use futures_util::future;
    use tokio::time;

    /// Prober that records targets and answers from a scripted healthy set.
    struct ScriptedProber {
        healthy: HashSet<String>,
        probed: StdMutex<Vec<String>>,
    }

    impl ScriptedProber {
        fn new(healthy: &[&str]) -> Arc<Self> {
            Arc::new(Self {
                healthy: healthy.iter().map(|t| t.to_string()).collect(),
                probed: StdMutex::new(Vec::new()),
            })
        }

        fn probes_of(&self, target: &str) -> usize {
            self.probed
                .lock()
                .unwrap()
                .iter()
                .filter(|t| t.as_str() == target)
                .count()
        }
    }

    #[async_trait]
    impl Prober for ScriptedProber {
        async fn probe(&self, target: &str, _protocol: Protocol) -> Result<(), ProbeError> {
            self.probed.lock().unwrap().push(target.to_string());
            if self.healthy.contains(target) {
                Ok(())
            } else {
                Err(ProbeError::UnexpectedStatus(StatusCode::SERVICE_UNAVAILABLE))
            }
        }
    }

    fn group(name: &str) -> GroupId {
        GroupId::new("default", name)
    }

    fn topology_with(names: &[&str]) -> Arc<InMemoryTopology> {
        let topology = InMemoryTopology::new();
        for name in names {
            topology.upsert_group(
                group(name),
                GroupState {
                    protocol: Protocol::Http1,
                    vip_services: vec![VipService {
                        name: format!("{}-vip", name),
                        addr: "10.96.0.9".to_string(),
                        ports: vec![NamedPort::new("http", 80)],
                    }],
                    subsets: Vec::new(),
                },
            );
        }
        Arc::new(topology)
    }

    fn record(name: &str, addresses: &[&str]) -> EndpointRecord {
        EndpointRecord {
            group: group(name),
            subsets: vec![EndpointSubset {
                addresses: addresses.iter().map(|a| a.to_string()).collect(),
                ports: vec![NamedPort::new("http", 8080)],
            }],
        }
    }

    fn settings() -> WatchSettings {
        WatchSettings {
            probe_interval_ms: 20,
            probe_timeout_ms: 100,
            update_buffer: 16,
        }
    }

    async fn next_update(updates: &mut mpsc::Receiver<DestsUpdate>) -> DestsUpdate {
        time::timeout(Duration::from_secs(2), updates.recv())
            .await
            .expect("timed out waiting for update")
            .expect("update stream closed")
    }

    #[tokio::test]
    async fn test_first_event_creates_watcher_and_emits() {
        let prober = ScriptedProber::new(&["10.96.0.9:80"]);
        let (manager, mut updates) = WatchManager::new(
            topology_with(&["checkout"]),
            prober,
            settings(),
            CancellationToken::new(),
        );

        manager.endpoints_updated(record("checkout", &["10.0.0.1"])).await;

        assert_eq!(manager.watcher_count().await, 1);
        let update = next_update(&mut updates).await;
        assert_eq!(update.group, group("checkout"));
        assert_eq!(update.vip.as_deref(), Some("10.96.0.9:80"));
        assert!(update.dests.contains("10.0.0.1:8080"));
    }

    #[tokio::test]
    async fn test_event_for_unknown_group_is_dropped() {
        let prober = ScriptedProber::new(&[]);
        let (manager, mut updates) = WatchManager::new(
            topology_with(&[]),
            prober,
            settings(),
            CancellationToken::new(),
        );

        manager.endpoints_updated(record("ghost", &["10.0.0.1"])).await;

        assert_eq!(manager.watcher_count().await, 0);
        time::sleep(Duration::from_millis(50)).await;
        assert!(updates.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_concurrent_events_create_one_watcher() {
        let prober = ScriptedProber::new(&["10.96.0.9:80"]);
        let (manager, _updates) = WatchManager::new(
            topology_with(&["checkout"]),
            prober,
            settings(),
            CancellationToken::new(),
        );

        let events = (0..8).map(|_| manager.endpoints_updated(record("checkout", &["10.0.0.1"])));
        future::join_all(events).await;

        assert_eq!(manager.watcher_count().await, 1);
    }

    #[tokio::test]
    async fn test_snapshot_updates_reach_existing_watcher() {
        let prober = ScriptedProber::new(&["10.0.0.1:8080", "10.0.0.2:8080"]);
        let (manager, mut updates) = WatchManager::new(
            topology_with(&["checkout"]),
            prober,
            settings(),
            CancellationToken::new(),
        );

        manager.endpoints_updated(record("checkout", &["10.0.0.1"])).await;
        let first = next_update(&mut updates).await;
        assert_eq!(first.dests.len(), 1);

        manager
            .endpoints_updated(record("checkout", &["10.0.0.1", "10.0.0.2"]))
            .await;
        let second = next_update(&mut updates).await;
        assert_eq!(second.dests.len(), 2);
        assert_eq!(manager.watcher_count().await, 1);
    }

    #[tokio::test]
    async fn test_delete_then_recreate_starts_fresh() {
        let prober = ScriptedProber::new(&["10.0.0.1:8080"]);
        let (manager, mut updates) = WatchManager::new(
            topology_with(&["checkout"]),
            prober.clone(),
            settings(),
            CancellationToken::new(),
        );

        manager.endpoints_updated(record("checkout", &["10.0.0.1"])).await;
        let first = next_update(&mut updates).await;
        assert_eq!(first.vip, None);
        assert_eq!(prober.probes_of("10.0.0.1:8080"), 1);

        manager.endpoints_deleted(&group("checkout")).await;
        assert_eq!(manager.watcher_count().await, 0);

        // Same membership again: a fresh watcher with no remembered health,
        // so the destination is probed a second time.
        manager.endpoints_updated(record("checkout", &["10.0.0.1"])).await;
        let second = next_update(&mut updates).await;
        assert_eq!(second.dests, first.dests);
        assert_eq!(prober.probes_of("10.0.0.1:8080"), 2);
    }

    #[tokio::test]
    async fn test_events_after_shutdown_are_ignored() {
        let prober = ScriptedProber::new(&[]);
        let shutdown = CancellationToken::new();
        let (manager, _updates) = WatchManager::new(
            topology_with(&["checkout"]),
            prober,
            settings(),
            shutdown.clone(),
        );

        shutdown.cancel();
        time::sleep(Duration::from_millis(20)).await;

        manager.endpoints_updated(record("checkout", &["10.0.0.1"])).await;
        manager.endpoints_deleted(&group("checkout")).await;
        assert_eq!(manager.watcher_count().await, 0);
    }

    #[tokio::test]
    async fn test_stream_closes_only_after_watchers_drain() {
        let prober = ScriptedProber::new(&["10.96.0.9:80"]);
        let shutdown = CancellationToken::new();
        let (manager, mut updates) = WatchManager::new(
            topology_with(&["checkout", "search"]),
            prober,
            settings(),
            shutdown.clone(),
        );

        manager.endpoints_updated(record("checkout", &["10.0.0.1"])).await;
        manager.endpoints_updated(record("search", &["10.0.0.2"])).await;
        next_update(&mut updates).await;
        next_update(&mut updates).await;
        assert_eq!(manager.watcher_count().await, 2);

        shutdown.cancel();

        // None from recv() means every watcher has already drained.
        let closed = time::timeout(Duration::from_secs(2), async {
            while updates.recv().await.is_some() {}
        })
        .await;
        assert!(closed.is_ok(), "update stream did not close after drain");
        assert_eq!(manager.watcher_count().await, 0);
    }
}
