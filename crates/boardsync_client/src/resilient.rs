//! Retry, timeout and response validation over a [`Transport`].

use crate::config::{ClientConfig, RetryConfig};
use crate::error::{ClientError, ClientResult};
use crate::transport::{Request, Response, Transport};
use parking_lot::{Mutex, RwLock};
use serde::Deserialize;
use serde_json::Value;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Selects the retry policy for a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestKind {
    /// Idempotent read.
    Read,
    /// Destination write.
    Write,
}

/// Lifecycle of a single logical request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestState {
    /// Not yet sent.
    Pending,
    /// An attempt is in flight.
    Sent,
    /// Waiting before the next attempt.
    Retrying,
    /// An attempt succeeded.
    Succeeded,
    /// A permanent error ended the request without retrying.
    Rejected,
    /// Every attempt failed.
    Exhausted,
}

impl RequestState {
    /// Returns true if the request is finished.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            RequestState::Succeeded | RequestState::Rejected | RequestState::Exhausted
        )
    }

    /// Returns true if `next` may follow this state.
    pub fn can_transition_to(&self, next: RequestState) -> bool {
        use RequestState::*;
        matches!(
            (self, next),
            (Pending, Sent)
                | (Sent, Succeeded)
                | (Sent, Retrying)
                | (Sent, Rejected)
                | (Sent, Exhausted)
                | (Retrying, Sent)
        )
    }
}

/// Cumulative request statistics.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClientStats {
    /// Logical requests executed.
    pub requests: u64,
    /// Attempts sent, including retries.
    pub attempts: u64,
    /// Retries after a failed attempt.
    pub retries: u64,
    /// Requests that succeeded.
    pub succeeded: u64,
    /// Requests ended by a permanent error.
    pub rejected: u64,
    /// Requests that ran out of attempts.
    pub exhausted: u64,
    /// Attempts that timed out.
    pub timeouts: u64,
}

#[derive(Deserialize)]
struct ErrorPayload {
    object: String,
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

/// A client that retries failed requests with exponential backoff and turns
/// raw responses into JSON values or classified errors.
pub struct ResilientClient<T: Transport> {
    transport: T,
    config: ClientConfig,
    headers: Vec<(String, String)>,
    stats: RwLock<ClientStats>,
    last_trace: Mutex<Vec<RequestState>>,
}

impl<T: Transport> ResilientClient<T> {
    /// Creates a client over a transport.
    pub fn new(transport: T, config: ClientConfig) -> Self {
        Self {
            transport,
            config,
            headers: Vec::new(),
            stats: RwLock::new(ClientStats::default()),
            last_trace: Mutex::new(Vec::new()),
        }
    }

    /// Adds a header sent with every request.
    pub fn with_default_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Returns the configuration.
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Returns the underlying transport.
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Returns a snapshot of the statistics.
    pub fn stats(&self) -> ClientStats {
        self.stats.read().clone()
    }

    /// Returns the states the most recent request went through.
    pub fn last_trace(&self) -> Vec<RequestState> {
        self.last_trace.lock().clone()
    }

    fn policy(&self, kind: RequestKind) -> &RetryConfig {
        match kind {
            RequestKind::Read => &self.config.read_retry,
            RequestKind::Write => &self.config.write_retry,
        }
    }

    fn transition(&self, trace: &mut Vec<RequestState>, next: RequestState) {
        if let Some(current) = trace.last() {
            debug_assert!(
                current.can_transition_to(next),
                "invalid request transition {current:?} -> {next:?}"
            );
        }
        trace.push(next);
    }

    /// Executes a request, retrying per the policy for `kind`.
    ///
    /// Returns the parsed JSON body of the first successful attempt. A
    /// permanent remote error is returned as-is after one attempt; running
    /// out of attempts returns [`ClientError::Exhausted`] wrapping the last
    /// failure.
    pub fn execute(&self, request: &Request, kind: RequestKind) -> ClientResult<Value> {
        let policy = self.policy(kind).clone();
        let request = self.prepare(request);
        let started = Instant::now();
        let mut trace = vec![RequestState::Pending];
        let mut last_error: Option<ClientError> = None;

        self.stats.write().requests += 1;

        for attempt in 0..policy.max_attempts {
            if attempt > 0 {
                self.transition(&mut trace, RequestState::Retrying);
                let wait = next_wait(&policy, attempt, last_error.as_ref());
                warn!(
                    method = %request.method,
                    url = %request.url,
                    attempt,
                    wait_ms = u64::try_from(wait.as_millis()).unwrap_or(u64::MAX),
                    error = %last_error.as_ref().map(ToString::to_string).unwrap_or_default(),
                    "request failed, retrying"
                );
                std::thread::sleep(wait);
                self.stats.write().retries += 1;
            }

            self.transition(&mut trace, RequestState::Sent);
            self.stats.write().attempts += 1;

            match self.attempt(&request) {
                Ok(value) => {
                    self.transition(&mut trace, RequestState::Succeeded);
                    self.stats.write().succeeded += 1;
                    debug!(
                        method = %request.method,
                        url = %request.url,
                        attempts = attempt + 1,
                        elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
                        "request succeeded"
                    );
                    *self.last_trace.lock() = trace;
                    return Ok(value);
                }
                Err(err) => {
                    if err.is_timeout() {
                        self.stats.write().timeouts += 1;
                    }
                    if !err.is_retryable() {
                        self.transition(&mut trace, RequestState::Rejected);
                        self.stats.write().rejected += 1;
                        warn!(
                            method = %request.method,
                            url = %request.url,
                            error = %err,
                            "request rejected"
                        );
                        *self.last_trace.lock() = trace;
                        return Err(err);
                    }
                    last_error = Some(err);
                }
            }
        }

        self.transition(&mut trace, RequestState::Exhausted);
        self.stats.write().exhausted += 1;
        *self.last_trace.lock() = trace;

        let last = last_error
            .unwrap_or_else(|| ClientError::protocol(None, "no attempts were made"));
        warn!(
            method = %request.method,
            url = %request.url,
            attempts = policy.max_attempts,
            error = %last,
            "request exhausted retries"
        );
        Err(ClientError::Exhausted {
            attempts: policy.max_attempts,
            last: Box::new(last),
        })
    }

    fn prepare(&self, request: &Request) -> Request {
        let mut prepared = request.clone();
        for (name, value) in &self.headers {
            if prepared.header(name).is_none() {
                prepared.headers.push((name.clone(), value.clone()));
            }
        }
        prepared
    }

    fn attempt(&self, request: &Request) -> ClientResult<Value> {
        let response = self.transport.send(request)?;
        validate(response)
    }
}

impl<T: Transport> std::fmt::Debug for ResilientClient<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResilientClient")
            .field("config", &self.config)
            .field("stats", &*self.stats.read())
            .finish_non_exhaustive()
    }
}

/// Wait before `attempt`, stretched by a server hint and capped.
fn next_wait(policy: &RetryConfig, attempt: u32, last: Option<&ClientError>) -> Duration {
    let backoff = policy.delay_for_attempt(attempt);
    match last.and_then(ClientError::retry_after) {
        Some(hint) => backoff.max(hint.min(policy.cap)),
        None => backoff,
    }
}

/// Turns a raw response into a JSON value or a classified error.
fn validate(response: Response) -> ClientResult<Value> {
    let parsed: Result<Value, _> = if response.body.trim().is_empty() {
        Ok(Value::Null)
    } else {
        serde_json::from_str(&response.body)
    };

    if let Ok(value) = &parsed {
        if let Ok(payload) = ErrorPayload::deserialize(value) {
            if payload.object == "error" {
                return Err(ClientError::Remote {
                    status: response.status,
                    code: payload.code,
                    message: payload.message.unwrap_or_default(),
                    retry_after: response.retry_after,
                });
            }
        }
    }

    if !response.is_success() {
        return Err(ClientError::protocol(
            Some(response.status),
            format!("unexpected HTTP status {}", response.status),
        ));
    }

    parsed.map_err(|err| {
        ClientError::protocol(Some(response.status), format!("malformed payload: {err}"))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::{Method, MockTransport};
    use serde_json::json;

    fn fast(max_attempts: u32) -> RetryConfig {
        RetryConfig::new(max_attempts)
            .with_unit(Duration::from_millis(1))
            .with_jitter(0.0)
    }

    fn client(transport: MockTransport) -> ResilientClient<MockTransport> {
        let config = ClientConfig::new()
            .with_read_retry(fast(5))
            .with_write_retry(fast(3));
        ResilientClient::new(transport, config)
    }

    fn error_body(code: &str) -> String {
        json!({ "object": "error", "status": 400, "code": code, "message": "bad" }).to_string()
    }

    #[test]
    fn success_returns_json() {
        let transport = MockTransport::new();
        transport.push_json(json!({ "id": "page-1" }));
        let client = client(transport);

        let value = client.execute(&Request::get("https://api.test"), RequestKind::Read).unwrap();
        assert_eq!(value["id"], "page-1");
        assert_eq!(
            client.last_trace(),
            vec![RequestState::Pending, RequestState::Sent, RequestState::Succeeded]
        );
    }

    #[test]
    fn retries_timeout_then_succeeds() {
        let transport = MockTransport::new();
        transport
            .push(Err(ClientError::timeout("t1")))
            .push(Err(ClientError::timeout("t2")))
            .push_json(json!({ "ok": true }));
        let client = client(transport);

        let started = Instant::now();
        let value = client.execute(&Request::get("https://api.test"), RequestKind::Read).unwrap();
        assert_eq!(value["ok"], true);
        assert!(started.elapsed() >= fast(5).base_delay(1) + fast(5).base_delay(2));

        let stats = client.stats();
        assert_eq!(stats.attempts, 3);
        assert_eq!(stats.retries, 2);
        assert_eq!(stats.timeouts, 2);
    }

    #[test]
    fn permanent_remote_error_is_not_retried() {
        let transport = MockTransport::new();
        transport.push(Ok(Response::new(400, error_body("validation_error"))));
        let client = client(transport);

        let err = client
            .execute(&Request::new(Method::Post, "https://api.test"), RequestKind::Write)
            .unwrap_err();
        assert_eq!(err.remote_code(), Some("validation_error"));
        assert_eq!(client.transport().request_count(), 1);
        assert_eq!(client.last_trace().last(), Some(&RequestState::Rejected));
    }

    #[test]
    fn retryable_remote_error_is_retried() {
        let transport = MockTransport::new();
        transport
            .push(Ok(Response::new(429, error_body("rate_limited"))))
            .push_json(json!({}));
        let client = client(transport);

        client.execute(&Request::get("https://api.test"), RequestKind::Read).unwrap();
        assert_eq!(client.transport().request_count(), 2);
    }

    #[test]
    fn writes_use_the_write_budget() {
        let transport = MockTransport::new();
        transport.set_fallback(Ok(Response::new(502, "<html>bad gateway</html>")));
        let client = client(transport);

        let err = client
            .execute(&Request::new(Method::Patch, "https://api.test"), RequestKind::Write)
            .unwrap_err();
        match err {
            ClientError::Exhausted { attempts, last } => {
                assert_eq!(attempts, 3);
                assert!(matches!(*last, ClientError::Protocol { status: Some(502), .. }));
            }
            other => panic!("expected exhaustion, got {other:?}"),
        }
    }

    #[test]
    fn malformed_success_body_is_a_protocol_error() {
        let err = validate(Response::new(200, "{not json")).unwrap_err();
        assert!(matches!(err, ClientError::Protocol { status: Some(200), .. }));
        assert_eq!(validate(Response::new(200, "")).unwrap(), Value::Null);
    }

    #[test]
    fn error_payload_on_success_status_is_remote() {
        let err = validate(Response::new(200, error_body("conflict_error"))).unwrap_err();
        assert!(matches!(err, ClientError::Remote { status: 200, .. }));
        assert!(err.is_retryable());
    }

    #[test]
    fn retry_after_stretches_wait() {
        let policy = fast(5);
        let hint = ClientError::Remote {
            status: 429,
            code: Some("rate_limited".into()),
            message: String::new(),
            retry_after: Some(Duration::from_millis(40)),
        };
        assert_eq!(next_wait(&policy, 1, Some(&hint)), Duration::from_millis(40));
        assert_eq!(next_wait(&policy, 1, None), Duration::from_millis(2));

        let capped = policy.clone().with_cap(Duration::from_millis(10));
        assert_eq!(next_wait(&capped, 1, Some(&hint)), Duration::from_millis(10));
    }

    #[test]
    fn default_headers_do_not_override_request_headers() {
        let transport = MockTransport::new();
        transport.push_json(json!({}));
        let client = client(transport)
            .with_default_header("Notion-Version", "2022-06-28")
            .with_default_header("Content-Type", "application/json");

        let request = Request::get("https://api.test").with_header("Content-Type", "text/plain");
        client.execute(&request, RequestKind::Read).unwrap();

        let sent = &client.transport().requests()[0];
        assert_eq!(sent.header("notion-version"), Some("2022-06-28"));
        assert_eq!(sent.header("content-type"), Some("text/plain"));
    }

    #[test]
    fn state_transitions() {
        assert!(RequestState::Pending.can_transition_to(RequestState::Sent));
        assert!(RequestState::Retrying.can_transition_to(RequestState::Sent));
        assert!(!RequestState::Pending.can_transition_to(RequestState::Succeeded));
        assert!(!RequestState::Succeeded.can_transition_to(RequestState::Sent));
        assert!(RequestState::Exhausted.is_terminal());
    }
}
