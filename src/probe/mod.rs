//! Probing subsystem.
//!
//! Application-level readiness checks against individual destinations. The
//! `Prober` trait is the seam the health layer depends on; `HttpProber` is
//! the production implementation and the tests substitute scripted ones.

pub mod http;
pub mod types;

pub use http::HttpProber;
pub use types::{ProbeError, Prober, AGENT_TOKEN, PROBE_HEADER, PROBE_USER_AGENT};
