//! Configuration schema definitions.
//!
//! The complete configuration for the watch daemon. All types derive Serde
//! traits for deserialization from config files, with defaults that work
//! for local development.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::topology::types::{NamedPort, Protocol};

/// Root configuration for the watch daemon.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct WatchConfig {
    /// Probe timing and update stream sizing.
    pub watch: WatchSettings,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    /// Tracked backend groups.
    pub groups: Vec<GroupConfig>,
}

/// Probe timing and update stream sizing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct WatchSettings {
    /// Interval between vip retry ticks in milliseconds.
    pub probe_interval_ms: u64,

    /// Shared deadline for the probes of one cycle in milliseconds.
    pub probe_timeout_ms: u64,

    /// Capacity of the aggregated update stream.
    pub update_buffer: usize,
}

impl WatchSettings {
    pub fn probe_interval(&self) -> Duration {
        Duration::from_millis(self.probe_interval_ms)
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_millis(self.probe_timeout_ms)
    }
}

impl Default for WatchSettings {
    fn default() -> Self {
        Self {
            probe_interval_ms: 200,
            probe_timeout_ms: 300,
            update_buffer: 16,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log filter (tracing EnvFilter syntax); `RUST_LOG` overrides it.
    pub log_level: String,

    /// Enable the Prometheus metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "upstream_watch=info".to_string(),
            metrics_enabled: true,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

/// One tracked backend group.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GroupConfig {
    /// Namespace half of the group identity.
    pub namespace: String,

    /// Name half of the group identity.
    pub name: String,

    /// Declared wire protocol.
    #[serde(default)]
    pub protocol: Protocol,

    /// Assigned virtual address fronting the group. Empty while unassigned.
    #[serde(default)]
    pub vip: String,

    /// Ports declared on the vip service.
    #[serde(default = "default_vip_ports")]
    pub vip_ports: Vec<PortConfig>,

    /// Endpoint subsets currently backing the group.
    #[serde(default)]
    pub endpoints: Vec<EndpointConfig>,
}

/// A named port.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct PortConfig {
    pub name: String,
    pub port: u16,
}

impl From<&PortConfig> for NamedPort {
    fn from(port: &PortConfig) -> Self {
        NamedPort::new(port.name.clone(), port.port)
    }
}

/// One endpoint subset: ready addresses sharing a port list.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EndpointConfig {
    /// Ready backend addresses (host only; ports are declared separately).
    pub addresses: Vec<String>,

    /// Ports the addresses serve on.
    #[serde(default = "default_endpoint_ports")]
    pub ports: Vec<PortConfig>,
}

fn default_vip_ports() -> Vec<PortConfig> {
    vec![PortConfig {
        name: "http".to_string(),
        port: 80,
    }]
}

fn default_endpoint_ports() -> Vec<PortConfig> {
    vec![PortConfig {
        name: "http".to_string(),
        port: 8080,
    }]
}
