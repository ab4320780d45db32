//! Metrics collection and exposition.
//!
//! # Responsibilities
//! - Define watch metrics (probes, emitted updates, live watchers)
//! - Expose a Prometheus-compatible metrics endpoint
//!
//! # Metrics
//! - `upstream_watch_probes_total` (counter): probes by target kind and result
//! - `upstream_watch_updates_total` (counter): destination updates emitted
//! - `upstream_watch_watchers` (gauge): group watchers currently running
//!
//! # Design Decisions
//! - Low-overhead metric updates (atomic operations)
//! - Per-group labels are deliberately avoided: group churn would make the
//!   series set unbounded

use std::net::SocketAddr;

use metrics::{counter, describe_counter, describe_gauge, gauge};
use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus exporter and register metric descriptions.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => tracing::error!(error = %e, "Failed to install metrics exporter"),
    }

    describe_counter!(
        "upstream_watch_probes_total",
        "Probes performed, by target kind (vip/dest) and result"
    );
    describe_counter!(
        "upstream_watch_updates_total",
        "Destination updates emitted to consumers"
    );
    describe_gauge!(
        "upstream_watch_watchers",
        "Group watchers currently running"
    );
}

/// Record one probe outcome.
pub fn record_probe(kind: &'static str, healthy: bool) {
    let result = if healthy { "ok" } else { "fail" };
    counter!("upstream_watch_probes_total", "kind" => kind, "result" => result).increment(1);
}

/// Record one emitted destination update.
pub fn record_update() {
    counter!("upstream_watch_updates_total").increment(1);
}

/// Track the number of live group watchers.
pub fn set_active_watchers(count: usize) {
    gauge!("upstream_watch_watchers").set(count as f64);
}
