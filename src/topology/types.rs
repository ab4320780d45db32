//! Core topology types.
//!
//! Shared vocabulary for the whole crate: group identities, wire protocols,
//! destination sets and the raw membership records delivered by the
//! topology source.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Set of L4 destination addresses ("host:port"), deduplicated, with
/// deterministic iteration order.
pub type DestSet = BTreeSet<String>;

/// Identity of a tracked backend group.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GroupId {
    pub namespace: String,
    pub name: String,
}

impl GroupId {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
        }
    }
}

impl fmt::Display for GroupId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.namespace, self.name)
    }
}

/// Wire protocol a group serves.
///
/// Selects both the named port used during membership translation and the
/// transport the prober speaks. Looked up once when a group's watcher is
/// created; a live group is assumed not to change protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Protocol {
    #[default]
    Http1,
    Http2,
}

impl Protocol {
    /// Name of the service/endpoint port carrying this protocol.
    pub fn port_name(self) -> &'static str {
        match self {
            Protocol::Http1 => "http",
            Protocol::Http2 => "http2",
        }
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Protocol::Http1 => write!(f, "http1"),
            Protocol::Http2 => write!(f, "http2"),
        }
    }
}

/// A named port on a service or endpoint subset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamedPort {
    pub name: String,
    pub port: u16,
}

impl NamedPort {
    pub fn new(name: impl Into<String>, port: u16) -> Self {
        Self {
            name: name.into(),
            port,
        }
    }
}

/// A private service object fronting a group with one virtual address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VipService {
    /// Object name; tells multiple matches for the same group apart.
    pub name: String,
    /// Assigned virtual address. Empty until assignment completes.
    pub addr: String,
    /// Declared ports, matched by protocol port name.
    pub ports: Vec<NamedPort>,
}

impl VipService {
    /// Port declared for the given protocol, if any.
    pub fn port_for(&self, protocol: Protocol) -> Option<u16> {
        let name = protocol.port_name();
        self.ports.iter().find(|p| p.name == name).map(|p| p.port)
    }
}

/// Raw endpoint-membership record for one group.
///
/// The topology source delivers these pre-filtered: only records belonging
/// to a group's vip-bearing private service arrive here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndpointRecord {
    pub group: GroupId,
    pub subsets: Vec<EndpointSubset>,
}

/// One subset of ready addresses sharing a port list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndpointSubset {
    /// Ready addresses (host only; ports come from `ports`).
    pub addresses: Vec<String>,
    pub ports: Vec<NamedPort>,
}

/// Membership-change notification from the topology source.
///
/// Delivery is ordered per group and eventually consistent; deletes carry
/// only the group identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TopologyEvent {
    EndpointsUpdated(EndpointRecord),
    EndpointsDeleted(GroupId),
}
