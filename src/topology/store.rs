//! Topology source boundary.
//!
//! The watch subsystem never talks to the cluster API directly; it reads a
//! local snapshot through this trait. Keeping the boundary narrow is what
//! lets the tests drive watchers with a purely in-memory store.

use async_trait::async_trait;
use thiserror::Error;

use crate::topology::types::{GroupId, Protocol, VipService};

/// Errors surfaced by topology lookups.
///
/// All of them are recoverable: a failed lookup during watcher creation
/// drops that event (a later one retries), and a failed vip resolution
/// aborts a single probe cycle.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TopologyError {
    /// No declarative record exists for the group.
    #[error("group {0} not found")]
    GroupNotFound(GroupId),

    /// No private service fronts the group.
    #[error("no vip service found for group {0}")]
    VipServiceNotFound(GroupId),

    /// More than one private service matches the group.
    #[error("multiple vip services match group {0}")]
    VipServiceAmbiguous(GroupId),

    /// The matching private service has no assigned virtual address yet.
    #[error("vip service for group {0} has no assigned address")]
    VipAddressUnassigned(GroupId),

    /// The matching private service declares no port for the group's protocol.
    #[error("vip service for group {group} has no {} port", .protocol.port_name())]
    VipPortMissing { group: GroupId, protocol: Protocol },
}

/// Read access to the topology source's current view of the world.
///
/// Implementations serve from a local snapshot; lookups happen on the
/// watcher hot path and must not block on the network.
#[async_trait]
pub trait TopologyStore: Send + Sync {
    /// Declared wire protocol for a group.
    async fn group_protocol(&self, group: &GroupId) -> Result<Protocol, TopologyError>;

    /// The uniquely matching private service carrying the group's vip.
    ///
    /// Fails distinctly for "none found", "multiple matches" and "address
    /// not assigned yet" so callers can log the actual problem.
    async fn vip_service(&self, group: &GroupId) -> Result<VipService, TopologyError>;
}
