//! Membership translation.
//!
//! Pure helpers that turn a raw endpoint-membership record into the set of
//! L4 destinations serving a given wire protocol.

use crate::topology::types::{DestSet, EndpointRecord, Protocol};

/// Destinations in `record` reachable over `protocol`'s named port.
///
/// Subsets that do not declare a matching port contribute nothing. The
/// result is deduplicated across subsets.
pub fn dests_for_protocol(record: &EndpointRecord, protocol: Protocol) -> DestSet {
    let port_name = protocol.port_name();
    let mut dests = DestSet::new();

    for subset in &record.subsets {
        let port = match subset.ports.iter().find(|p| p.name == port_name) {
            Some(port) => port.port,
            None => continue,
        };
        for addr in &subset.addresses {
            dests.insert(join_host_port(addr, port));
        }
    }

    dests
}

/// Join a host and port into a dialable address, bracketing IPv6 hosts.
pub fn join_host_port(host: &str, port: u16) -> String {
    if host.contains(':') {
        format!("[{}]:{}", host, port)
    } else {
        format!("{}:{}", host, port)
    }
}
