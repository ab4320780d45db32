//! HTTP prober.
//!
//! Sends the readiness fingerprint over HTTP/1.1 or HTTP/2 with prior
//! knowledge, depending on the group's declared protocol. A destination
//! counts as healthy only when a ready serving agent answered: status 200
//! and the agent token echoed back as the body.

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::client::legacy::Client;
use hyper_util::rt::TokioExecutor;

use crate::probe::types::{ProbeError, Prober, AGENT_TOKEN, PROBE_HEADER, PROBE_USER_AGENT};
use crate::topology::types::Protocol;

/// Anything larger than this is not an agent token echo.
const MAX_PROBE_BODY_BYTES: usize = 1024;

/// Probes destinations over plaintext HTTP.
///
/// Keeps one pooled client per transport so probe connections are reused
/// across cycles.
#[derive(Clone)]
pub struct HttpProber {
    h1: Client<HttpConnector, Body>,
    h2: Client<HttpConnector, Body>,
}

impl HttpProber {
    pub fn new() -> Self {
        let h1 = Client::builder(TokioExecutor::new()).build(HttpConnector::new());
        let h2 = Client::builder(TokioExecutor::new())
            .http2_only(true)
            .build(HttpConnector::new());
        Self { h1, h2 }
    }

    fn client(&self, protocol: Protocol) -> &Client<HttpConnector, Body> {
        match protocol {
            Protocol::Http1 => &self.h1,
            Protocol::Http2 => &self.h2,
        }
    }
}

impl Default for HttpProber {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Prober for HttpProber {
    async fn probe(&self, target: &str, protocol: Protocol) -> Result<(), ProbeError> {
        let request = Request::builder()
            .method("GET")
            .uri(format!("http://{}/", target))
            .header(PROBE_HEADER, AGENT_TOKEN)
            .header("user-agent", PROBE_USER_AGENT)
            .body(Body::empty())?;

        let response = self.client(protocol).request(request).await?;

        let status = response.status();
        if status != StatusCode::OK {
            return Err(ProbeError::UnexpectedStatus(status));
        }

        let body = axum::body::to_bytes(Body::new(response.into_body()), MAX_PROBE_BODY_BYTES)
            .await
            .map_err(ProbeError::Body)?;
        if body.as_ref() != AGENT_TOKEN.as_bytes() {
            return Err(ProbeError::UnexpectedBody);
        }

        Ok(())
    }
}
