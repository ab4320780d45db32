//! Healthy-destination discovery for routed backend groups.
//!
//! Watches each configured group's endpoint membership, verifies readiness
//! with application-level probes and continuously publishes where traffic
//! can be sent: the group's virtual address once it has been verified, or
//! the individually probed destinations until then.

pub mod config;
pub mod health;
pub mod lifecycle;
pub mod observability;
pub mod probe;
pub mod topology;

pub use config::schema::WatchConfig;
pub use health::manager::WatchManager;
pub use health::update::DestsUpdate;
pub use probe::http::HttpProber;
pub use topology::memory::InMemoryTopology;
