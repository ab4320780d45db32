//! In-memory topology store.
//!
//! Holds an atomic snapshot of every tracked group: declared protocol, the
//! private services fronting it and its current endpoint subsets. The
//! daemon builds the snapshot from configuration and swaps it wholesale on
//! hot reload; the diff between old and new snapshots becomes the stream of
//! membership events fed to the watch manager.
//!
//! # Design Decisions
//! - Snapshot swaps are lock-free reads for watchers (arc-swap); only the
//!   reload driver writes, so writers never contend.
//! - Vip- or protocol-only changes produce no membership event: watchers
//!   re-resolve the vip on every probe cycle anyway, and a live group is
//!   assumed not to change protocol.

use std::collections::BTreeMap;
use std::sync::Arc;

use arc_swap::ArcSwap;
use async_trait::async_trait;

use crate::config::schema::GroupConfig;
use crate::topology::store::{TopologyError, TopologyStore};
use crate::topology::types::{
    EndpointRecord, EndpointSubset, GroupId, NamedPort, Protocol, TopologyEvent, VipService,
};

/// Everything the store tracks for one group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupState {
    pub protocol: Protocol,
    /// Matching private services; zero, one or several, like a label query.
    pub vip_services: Vec<VipService>,
    pub subsets: Vec<EndpointSubset>,
}

/// Atomic snapshot store over per-group topology state.
#[derive(Debug, Default)]
pub struct InMemoryTopology {
    state: ArcSwap<BTreeMap<GroupId, GroupState>>,
}

impl InMemoryTopology {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the initial snapshot from configuration.
    pub fn from_config(groups: &[GroupConfig]) -> Self {
        let topology = Self::new();
        topology.state.store(Arc::new(groups_to_state(groups)));
        topology
    }

    /// Replace the snapshot and report the membership diff.
    ///
    /// Updated records are emitted for new groups and groups whose subsets
    /// changed; deletions for groups that disappeared. Single writer: only
    /// the reload driver calls this.
    pub fn apply(&self, groups: &[GroupConfig]) -> Vec<TopologyEvent> {
        let next = groups_to_state(groups);
        let prev = self.state.load_full();

        let mut events = Vec::new();
        for (group, state) in &next {
            let changed = match prev.get(group) {
                Some(old) => old.subsets != state.subsets,
                None => true,
            };
            if changed {
                events.push(TopologyEvent::EndpointsUpdated(EndpointRecord {
                    group: group.clone(),
                    subsets: state.subsets.clone(),
                }));
            }
        }
        for group in prev.keys() {
            if !next.contains_key(group) {
                events.push(TopologyEvent::EndpointsDeleted(group.clone()));
            }
        }

        self.state.store(Arc::new(next));
        events
    }

    /// Current membership records, for seeding a fresh manager.
    pub fn endpoint_records(&self) -> Vec<EndpointRecord> {
        self.state
            .load()
            .iter()
            .map(|(group, state)| EndpointRecord {
                group: group.clone(),
                subsets: state.subsets.clone(),
            })
            .collect()
    }

    /// Insert or replace one group's state directly.
    pub fn upsert_group(&self, group: GroupId, state: GroupState) {
        let mut next = self.state.load_full().as_ref().clone();
        next.insert(group, state);
        self.state.store(Arc::new(next));
    }

    /// Remove one group's state entirely.
    pub fn remove_group(&self, group: &GroupId) {
        let mut next = self.state.load_full().as_ref().clone();
        next.remove(group);
        self.state.store(Arc::new(next));
    }
}

#[async_trait]
impl TopologyStore for InMemoryTopology {
    async fn group_protocol(&self, group: &GroupId) -> Result<Protocol, TopologyError> {
        self.state
            .load()
            .get(group)
            .map(|state| state.protocol)
            .ok_or_else(|| TopologyError::GroupNotFound(group.clone()))
    }

    async fn vip_service(&self, group: &GroupId) -> Result<VipService, TopologyError> {
        let state = self.state.load();
        let services = state
            .get(group)
            .map(|state| state.vip_services.as_slice())
            .unwrap_or(&[]);

        match services {
            [] => Err(TopologyError::VipServiceNotFound(group.clone())),
            [svc] if svc.addr.is_empty() => {
                Err(TopologyError::VipAddressUnassigned(group.clone()))
            }
            [svc] => Ok(svc.clone()),
            _ => Err(TopologyError::VipServiceAmbiguous(group.clone())),
        }
    }
}

fn groups_to_state(groups: &[GroupConfig]) -> BTreeMap<GroupId, GroupState> {
    let mut state = BTreeMap::new();
    for group in groups {
        let id = GroupId::new(group.namespace.clone(), group.name.clone());
        let vip = VipService {
            name: format!("{}-vip", group.name),
            addr: group.vip.clone(),
            ports: group.vip_ports.iter().map(NamedPort::from).collect(),
        };
        let subsets = group
            .endpoints
            .iter()
            .map(|endpoint| EndpointSubset {
                addresses: endpoint.addresses.clone(),
                ports: endpoint.ports.iter().map(NamedPort::from).collect(),
            })
            .collect();
        state.insert(
            id,
            GroupState {
                protocol: group.protocol,
                vip_services: vec![vip],
                subsets,
            },
        );
    }
    state
}
