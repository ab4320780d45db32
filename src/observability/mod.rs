//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → logging.rs (structured log events)
//!     → metrics.rs (counters, gauges)
//!
//! Consumers:
//!     → Log aggregation (stdout, file, remote)
//!     → Metrics endpoint (Prometheus scrape)
//! ```
//!
//! # Design Decisions
//! - Probe failures log at debug: while a group starts up they are the
//!   normal case, not an incident
//! - Resolution failures log at error: they mean a misconfigured group
//! - Metrics are cheap (atomic increments)

pub mod logging;
pub mod metrics;
