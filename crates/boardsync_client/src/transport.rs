//! Transport layer abstraction.

use crate::error::{ClientError, ClientResult};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::fmt;
use std::time::Duration;

/// HTTP method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    /// GET.
    Get,
    /// POST.
    Post,
    /// PATCH.
    Patch,
    /// DELETE.
    Delete,
}

impl Method {
    /// Returns the method name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Patch => "PATCH",
            Method::Delete => "DELETE",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Headers whose values must not appear in logs.
const SENSITIVE_HEADERS: &[&str] = &["authorization", "cookie", "x-api-key"];

/// A request to send.
#[derive(Clone, PartialEq, Eq)]
pub struct Request {
    /// HTTP method.
    pub method: Method,
    /// Absolute URL.
    pub url: String,
    /// Header name/value pairs.
    pub headers: Vec<(String, String)>,
    /// JSON body.
    pub body: Option<String>,
}

impl Request {
    /// Creates a request with no headers or body.
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            headers: Vec::new(),
            body: None,
        }
    }

    /// Creates a GET request.
    pub fn get(url: impl Into<String>) -> Self {
        Self::new(Method::Get, url)
    }

    /// Adds a header.
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Sets a JSON body.
    pub fn with_json(mut self, body: &serde_json::Value) -> ClientResult<Self> {
        self.body = Some(serde_json::to_string(body)?);
        Ok(self)
    }

    /// Returns the first value of a header, matched case-insensitively.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

impl fmt::Debug for Request {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let headers: Vec<(&str, &str)> = self
            .headers
            .iter()
            .map(|(name, value)| {
                let redacted = SENSITIVE_HEADERS
                    .iter()
                    .any(|s| name.eq_ignore_ascii_case(s));
                (name.as_str(), if redacted { "***" } else { value.as_str() })
            })
            .collect();
        f.debug_struct("Request")
            .field("method", &self.method)
            .field("url", &self.url)
            .field("headers", &headers)
            .field("body_len", &self.body.as_ref().map(String::len))
            .finish()
    }
}

/// A raw response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    /// HTTP status.
    pub status: u16,
    /// Response body.
    pub body: String,
    /// Parsed `Retry-After` header.
    pub retry_after: Option<Duration>,
}

impl Response {
    /// Creates a response.
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
            retry_after: None,
        }
    }

    /// Creates a 200 response with a JSON body.
    pub fn json(body: &serde_json::Value) -> Self {
        Self::new(200, body.to_string())
    }

    /// Sets the retry-after hint.
    pub fn with_retry_after(mut self, wait: Duration) -> Self {
        self.retry_after = Some(wait);
        self
    }

    /// Returns true for 2xx statuses.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Sends one request and returns the raw response.
///
/// A transport performs exactly one attempt. It reports connection failures
/// and timeouts as [`ClientError::Transport`] and returns every HTTP status,
/// including errors, as a [`Response`].
pub trait Transport: Send + Sync {
    /// Sends a request.
    fn send(&self, request: &Request) -> ClientResult<Response>;
}

impl<T: Transport + ?Sized> Transport for std::sync::Arc<T> {
    fn send(&self, request: &Request) -> ClientResult<Response> {
        (**self).send(request)
    }
}

impl<T: Transport + ?Sized> Transport for &T {
    fn send(&self, request: &Request) -> ClientResult<Response> {
        (**self).send(request)
    }
}

/// A scripted transport for testing.
///
/// Results are returned in the order they were pushed. Once the script runs
/// out, the fallback result is returned if set, otherwise a protocol error.
#[derive(Debug, Default)]
pub struct MockTransport {
    script: Mutex<VecDeque<ClientResult<Response>>>,
    fallback: Mutex<Option<ClientResult<Response>>>,
    requests: Mutex<Vec<Request>>,
}

impl MockTransport {
    /// Creates a mock transport with an empty script.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues a result.
    pub fn push(&self, result: ClientResult<Response>) -> &Self {
        self.script.lock().push_back(result);
        self
    }

    /// Queues a successful JSON response.
    pub fn push_json(&self, body: serde_json::Value) -> &Self {
        self.push(Ok(Response::json(&body)))
    }

    /// Sets the result returned once the script is empty.
    pub fn set_fallback(&self, result: ClientResult<Response>) {
        *self.fallback.lock() = Some(result);
    }

    /// Returns every request sent so far.
    pub fn requests(&self) -> Vec<Request> {
        self.requests.lock().clone()
    }

    /// Returns the number of requests sent so far.
    pub fn request_count(&self) -> usize {
        self.requests.lock().len()
    }

    /// Returns the number of scripted results not yet consumed.
    pub fn remaining(&self) -> usize {
        self.script.lock().len()
    }
}

impl Transport for MockTransport {
    fn send(&self, request: &Request) -> ClientResult<Response> {
        self.requests.lock().push(request.clone());
        if let Some(result) = self.script.lock().pop_front() {
            return result;
        }
        self.fallback
            .lock()
            .clone()
            .unwrap_or_else(|| Err(ClientError::protocol(None, "no mock response scripted")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn debug_redacts_credentials() {
        let request = Request::get("https://api.example/v1/users/me")
            .with_header("Authorization", "Bearer secret_xyz")
            .with_header("Notion-Version", "2022-06-28");
        let debug = format!("{request:?}");
        assert!(!debug.contains("secret_xyz"));
        assert!(debug.contains("2022-06-28"));
        assert_eq!(request.header("authorization"), Some("Bearer secret_xyz"));
    }

    #[test]
    fn json_body_keeps_unicode() {
        let request = Request::new(Method::Post, "https://api.example")
            .with_json(&serde_json::json!({ "title": "台北 ⚠️ \"quoted\"" }))
            .unwrap();
        let body = request.body.unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&body).unwrap();
        assert_eq!(parsed["title"], "台北 ⚠️ \"quoted\"");
    }

    #[test]
    fn mock_replays_script_then_fallback() {
        let transport = MockTransport::new();
        transport
            .push(Err(ClientError::timeout("slow")))
            .push_json(serde_json::json!({ "ok": true }));
        transport.set_fallback(Ok(Response::new(503, "down")));

        let request = Request::get("https://api.example");
        assert!(transport.send(&request).unwrap_err().is_timeout());
        assert_eq!(transport.send(&request).unwrap().status, 200);
        assert_eq!(transport.send(&request).unwrap().status, 503);
        assert_eq!(transport.request_count(), 3);
        assert_eq!(transport.remaining(), 0);
    }

    #[test]
    fn empty_mock_is_a_protocol_error() {
        let transport = MockTransport::new();
        let err = transport.send(&Request::get("https://api.example")).unwrap_err();
        assert!(matches!(err, ClientError::Protocol { status: None, .. }));
    }
}
