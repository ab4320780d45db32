//! Health update records emitted to consumers.

use crate::topology::types::{DestSet, GroupId};

/// Where traffic for a group can currently be sent.
///
/// The primary output of the watch subsystem. When `vip` is set, the
/// group's virtual address has been verified healthy and consumers should
/// route through it; `dests` still carries the full destination set for
/// visibility. When `vip` is `None`, `dests` holds exactly the destinations
/// that passed probing. Both empty means the group is unreachable right
/// now, typically scaled to zero.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DestsUpdate {
    pub group: GroupId,
    pub vip: Option<String>,
    pub dests: DestSet,
}
