//! Per-group health watcher.
//!
//! # Responsibilities
//! - Own one group's probing state (`healthy_dests`, `vip_healthy`)
//! - React to destination snapshots and to retry ticks
//! - Probe the vip first and trust it once verified; fall back to probing
//!   individual destinations while the vip is not ready
//! - Emit `DestsUpdate`s without ever blocking through shutdown
//!
//! All state lives inside the watcher task. The manager talks to it only
//! through the snapshot channel and the cancellation token, so there is no
//! shared health state to lock.

use std::sync::Arc;
use std::time::Duration;

use futures_util::future;
use tokio::sync::{mpsc, watch};
use tokio::time::{self, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::config::schema::WatchSettings;
use crate::health::update::DestsUpdate;
use crate::observability::metrics;
use crate::probe::types::Prober;
use crate::topology::store::{TopologyError, TopologyStore};
use crate::topology::translate::join_host_port;
use crate::topology::types::{DestSet, GroupId, Protocol};

/// Watches one group: probes its destinations and reports the healthy set.
pub(crate) struct GroupWatcher {
    group: GroupId,
    protocol: Protocol,
    topology: Arc<dyn TopologyStore>,
    prober: Arc<dyn Prober>,
    cancel: CancellationToken,
    dests_rx: watch::Receiver<Option<DestSet>>,
    update_tx: mpsc::Sender<DestsUpdate>,
    probe_interval: Duration,
    probe_timeout: Duration,

    /// Destinations that have passed a probe and are still present.
    healthy_dests: DestSet,
    /// Whether the vip has been verified. Sticky until scale to zero.
    vip_healthy: bool,
}

impl GroupWatcher {
    pub(crate) fn new(
        group: GroupId,
        protocol: Protocol,
        topology: Arc<dyn TopologyStore>,
        prober: Arc<dyn Prober>,
        settings: &WatchSettings,
        cancel: CancellationToken,
        dests_rx: watch::Receiver<Option<DestSet>>,
        update_tx: mpsc::Sender<DestsUpdate>,
    ) -> Self {
        Self {
            group,
            protocol,
            topology,
            prober,
            cancel,
            dests_rx,
            update_tx,
            probe_interval: settings.probe_interval(),
            probe_timeout: settings.probe_timeout(),
            healthy_dests: DestSet::new(),
            vip_healthy: false,
        }
    }

    /// Drive the watcher until cancellation or until the manager drops the
    /// snapshot channel.
    pub(crate) async fn run(mut self) {
        tracing::debug!(group = %self.group, protocol = %self.protocol, "group watcher running");

        let mut ticker = time::interval(self.probe_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        let mut dests = DestSet::new();
        loop {
            // Retry on a timer only while there is something to verify.
            let tick_armed = !dests.is_empty() && !self.vip_healthy;

            tokio::select! {
                _ = self.cancel.cancelled() => {
                    tracing::debug!(group = %self.group, "group watcher stopping");
                    return;
                }
                changed = self.dests_rx.changed() => match changed {
                    Ok(()) => {
                        dests = self.dests_rx.borrow_and_update().clone().unwrap_or_default();
                    }
                    // Manager dropped the snapshot sender; nothing left to watch.
                    Err(_) => return,
                },
                _ = ticker.tick(), if tick_armed => {}
            }

            self.check_dests(&dests).await;
        }
    }

    /// One probe cycle against the latest snapshot.
    async fn check_dests(&mut self, dests: &DestSet) {
        if dests.is_empty() {
            // Scaled to zero. The vip no longer fronts anything, so it must
            // be re-verified when the group comes back.
            self.vip_healthy = false;
            tracing::debug!(group = %self.group, "no destinations; reporting group unreachable");
            self.send_update(None, DestSet::new()).await;
            return;
        }

        // Resolved on every cycle: the vip service can be replaced at any
        // time and its address changes with it.
        let vip = match self.resolve_vip().await {
            Ok(vip) => vip,
            Err(err) => {
                tracing::error!(group = %self.group, error = %err, "failed to resolve vip destination");
                return;
            }
        };

        if self.vip_healthy {
            tracing::debug!(group = %self.group, vip = %vip, dests = dests.len(), "vip already verified");
            self.send_update(Some(vip), dests.clone()).await;
            return;
        }

        if self.probe_vip(&vip).await {
            tracing::debug!(group = %self.group, vip = %vip, dests = dests.len(), "vip verified healthy");
            self.vip_healthy = true;
            // The vip supersedes per-destination tracking from here on.
            self.healthy_dests.clear();
            self.send_update(Some(vip), dests.clone()).await;
            return;
        }

        let (healthy, noop) = self.probe_dests(dests).await;
        tracing::debug!(group = %self.group, healthy = healthy.len(), noop, "destination sweep finished");
        if !noop {
            self.healthy_dests = healthy.clone();
            self.send_update(None, healthy).await;
        }
    }

    /// The vip destination for this cycle.
    async fn resolve_vip(&self) -> Result<String, TopologyError> {
        let svc = self.topology.vip_service(&self.group).await?;
        let port = match svc.port_for(self.protocol) {
            Some(port) => port,
            None => {
                return Err(TopologyError::VipPortMissing {
                    group: self.group.clone(),
                    protocol: self.protocol,
                })
            }
        };
        Ok(join_host_port(&svc.addr, port))
    }

    async fn probe_vip(&self, vip: &str) -> bool {
        let healthy = match time::timeout(self.probe_timeout, self.prober.probe(vip, self.protocol))
            .await
        {
            Ok(Ok(())) => true,
            Ok(Err(err)) => {
                tracing::debug!(group = %self.group, vip = %vip, error = %err, "vip probe failed");
                false
            }
            Err(_) => {
                tracing::debug!(group = %self.group, vip = %vip, "vip probe timed out");
                false
            }
        };
        metrics::record_probe("vip", healthy);
        healthy
    }

    /// Probe the destinations not already known healthy.
    ///
    /// Returns the surviving healthy set and whether the sweep was a no-op
    /// (nothing to report). Destinations already in `healthy_dests` are
    /// trusted without re-probing; newly seen ones are probed in parallel
    /// under one shared deadline. A sweep in which no new destination
    /// passes is a no-op even if some disappeared, matching the "only
    /// successes update state" rule.
    async fn probe_dests(&self, dests: &DestSet) -> (DestSet, bool) {
        // Nothing changed since the last sweep.
        if self.healthy_dests == *dests {
            return (self.healthy_dests.clone(), true);
        }

        let mut healthy: DestSet = dests.intersection(&self.healthy_dests).cloned().collect();
        let to_probe: Vec<&str> = dests
            .difference(&self.healthy_dests)
            .map(String::as_str)
            .collect();

        // The set only shrank; report the survivors without probing.
        if to_probe.is_empty() {
            return (healthy, false);
        }

        let deadline = Instant::now() + self.probe_timeout;
        let probes = to_probe.into_iter().map(|dest| async move {
            match time::timeout_at(deadline, self.prober.probe(dest, self.protocol)).await {
                Ok(Ok(())) => (dest, true),
                Ok(Err(err)) => {
                    tracing::debug!(group = %self.group, dest = %dest, error = %err, "destination probe failed");
                    (dest, false)
                }
                Err(_) => {
                    tracing::debug!(group = %self.group, dest = %dest, "destination probe timed out");
                    (dest, false)
                }
            }
        });

        let mut any_passed = false;
        for (dest, passed) in future::join_all(probes).await {
            metrics::record_probe("dest", passed);
            if passed {
                healthy.insert(dest.to_string());
                any_passed = true;
            }
        }

        (healthy, !any_passed)
    }

    /// Emit one update, racing the send against cancellation so a full
    /// stream can never wedge shutdown.
    async fn send_update(&self, vip: Option<String>, dests: DestSet) {
        if self.cancel.is_cancelled() {
            return;
        }
        let update = DestsUpdate {
            group: self.group.clone(),
            vip,
            dests,
        };
        tokio::select! {
            _ = self.cancel.cancelled() => {}
            sent = self.update_tx.send(update) => match sent {
                Ok(()) => metrics::record_update(),
                // Consumer went away; shutdown follows shortly.
                Err(_) => tracing::debug!(group = %self.group, "update stream closed; dropping update"),
            },
        }
    }
}
