//! Topology subsystem.
//!
//! Everything the watch layer knows about the outside world: which backend
//! groups exist, the private services fronting them and their raw endpoint
//! membership. Membership records are translated into protocol-specific
//! destination sets here; probing them is the health subsystem's job.
//!
//! # Data Flow
//!
//! ```text
//! config file ──> InMemoryTopology ──apply()──> TopologyEvent stream
//!                      │                              │
//!                 TopologyStore                 WatchManager
//!                 (vip lookups)              (watcher per group)
//! ```

pub mod file;
pub mod memory;
pub mod store;
pub mod translate;
pub mod types;

pub use memory::InMemoryTopology;
pub use store::{TopologyError, TopologyStore};
pub use types::{DestSet, EndpointRecord, GroupId, Protocol, TopologyEvent};
