//! Probe contract and error definitions.

use async_trait::async_trait;
use axum::http::StatusCode;
use thiserror::Error;

use crate::topology::types::Protocol;

/// Header marking probe traffic so serving agents answer it themselves
/// instead of forwarding it to user code.
pub const PROBE_HEADER: &str = "x-upstream-probe";

/// Token sent in the probe header and echoed back verbatim by a ready agent.
pub const AGENT_TOKEN: &str = "edge-agent";

/// User agent identifying this prober.
pub const PROBE_USER_AGENT: &str = "upstream-watch-probe";

/// Errors from a single probe attempt. Every one of them means "not healthy
/// yet", never "stop probing".
#[derive(Debug, Error)]
pub enum ProbeError {
    /// Building the probe request failed.
    #[error("invalid probe request: {0}")]
    Request(#[from] axum::http::Error),

    /// Connection-level failure: refused, reset, unreachable.
    #[error("probe transport error: {0}")]
    Transport(#[from] hyper_util::client::legacy::Error),

    /// The target answered with the wrong status code.
    #[error("unexpected probe status {0}")]
    UnexpectedStatus(StatusCode),

    /// Reading the response body failed or exceeded the size cap.
    #[error("failed to read probe body: {0}")]
    Body(#[source] axum::Error),

    /// Something answered, but it was not a ready serving agent.
    #[error("unexpected probe body")]
    UnexpectedBody,
}

/// One application-level readiness check against one destination.
///
/// Implementations do not time out on their own; callers wrap each probe in
/// a cycle-scoped deadline.
#[async_trait]
pub trait Prober: Send + Sync {
    /// Probe `target` ("host:port") using `protocol`'s transport semantics.
    async fn probe(&self, target: &str, protocol: Protocol) -> Result<(), ProbeError>;
}
