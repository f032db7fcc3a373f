//! Blocking HTTP transport.

use crate::config::ClientConfig;
use crate::error::{ClientError, ClientResult};
use crate::transport::{Method, Request, Response, Transport};
use std::time::Duration;
use tracing::debug;

/// Longest wait honoured from a `Retry-After` header.
const MAX_RETRY_AFTER: Duration = Duration::from_secs(300);

/// A [`Transport`] backed by a `ureq` agent.
///
/// HTTP error statuses are returned as responses, not errors, so the
/// resilient client can classify them.
pub struct UreqTransport {
    agent: ureq::Agent,
}

impl UreqTransport {
    /// Creates a transport with the timeouts of `config`.
    pub fn new(config: &ClientConfig) -> Self {
        let agent: ureq::Agent = ureq::Agent::config_builder()
            .timeout_connect(Some(config.connect_timeout))
            .timeout_global(Some(config.total_timeout))
            .http_status_as_error(false)
            .build()
            .into();
        Self { agent }
    }

    fn dispatch(&self, request: &Request) -> Result<ureq::http::Response<ureq::Body>, ureq::Error> {
        let url = request.url.as_str();
        match request.method {
            Method::Get => with_headers(self.agent.get(url), request).call(),
            Method::Delete => with_headers(self.agent.delete(url), request).call(),
            Method::Post => send_body(with_headers(self.agent.post(url), request), request),
            Method::Patch => send_body(with_headers(self.agent.patch(url), request), request),
        }
    }
}

fn with_headers<B>(mut builder: ureq::RequestBuilder<B>, request: &Request) -> ureq::RequestBuilder<B> {
    for (name, value) in &request.headers {
        builder = builder.header(name.as_str(), value.as_str());
    }
    builder
}

fn send_body(
    builder: ureq::RequestBuilder<ureq::typestate::WithBody>,
    request: &Request,
) -> Result<ureq::http::Response<ureq::Body>, ureq::Error> {
    match &request.body {
        Some(body) => builder.send(body.as_str()),
        None => builder.send_empty(),
    }
}

impl std::fmt::Debug for UreqTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UreqTransport").finish_non_exhaustive()
    }
}

impl Transport for UreqTransport {
    fn send(&self, request: &Request) -> ClientResult<Response> {
        debug!(method = %request.method, url = %request.url, "sending request");

        let mut response = self.dispatch(request).map_err(classify)?;
        let status = response.status().as_u16();
        let retry_after = response
            .headers()
            .get("retry-after")
            .and_then(|value| value.to_str().ok())
            .and_then(parse_retry_after);
        let body = response.body_mut().read_to_string().map_err(classify)?;

        Ok(Response {
            status,
            body,
            retry_after,
        })
    }
}

/// Maps a `ureq` failure onto a transport error.
fn classify(err: ureq::Error) -> ClientError {
    match err {
        ureq::Error::Timeout(which) => ClientError::timeout(format!("timed out ({which})")),
        ureq::Error::Io(io) if io.kind() == std::io::ErrorKind::TimedOut => {
            ClientError::timeout(io.to_string())
        }
        ureq::Error::Io(io) => ClientError::io(io.to_string()),
        ureq::Error::HostNotFound => ClientError::connect("host not found"),
        ureq::Error::ConnectionFailed => ClientError::connect("connection failed"),
        ureq::Error::StatusCode(status) => {
            ClientError::protocol(Some(status), format!("HTTP status {status}"))
        }
        other => ClientError::io(other.to_string()),
    }
}

/// Parses a `Retry-After` value given in seconds.
///
/// HTTP-date values are ignored; the regular backoff applies instead.
pub fn parse_retry_after(value: &str) -> Option<Duration> {
    let secs: f64 = value.trim().parse().ok()?;
    if !secs.is_finite() || secs < 0.0 {
        return None;
    }
    Some(Duration::from_secs_f64(secs.min(MAX_RETRY_AFTER.as_secs_f64())))
}
