//! Retry behaviour of the resilient client over a scripted transport.

use boardsync_client::{
    ClientConfig, ClientError, Method, MockTransport, Request, RequestKind, RequestState,
    ResilientClient, Response, RetryConfig,
};
use serde_json::json;
use std::time::{Duration, Instant};

fn policy(max_attempts: u32) -> RetryConfig {
    RetryConfig::new(max_attempts)
        .with_unit(Duration::from_millis(1))
        .with_jitter(0.0)
}

fn client(transport: MockTransport) -> ResilientClient<MockTransport> {
    ResilientClient::new(
        transport,
        ClientConfig::new()
            .with_read_retry(policy(5))
            .with_write_retry(policy(3)),
    )
}

#[test]
fn timeouts_then_success_waits_out_the_backoff() {
    let transport = MockTransport::new();
    transport
        .push(Err(ClientError::timeout("attempt 1")))
        .push(Err(ClientError::timeout("attempt 2")))
        .push_json(json!({ "object": "page", "id": "p1" }));
    let client = client(transport);

    let started = Instant::now();
    let value = client
        .execute(&Request::new(Method::Post, "https://api.test/pages"), RequestKind::Read)
        .unwrap();
    let elapsed = started.elapsed();

    assert_eq!(value["id"], "p1");
    assert_eq!(client.transport().request_count(), 3);
    let expected = policy(5).base_delay(1) + policy(5).base_delay(2);
    assert!(elapsed >= expected, "{elapsed:?} < {expected:?}");
    assert_eq!(
        client.last_trace(),
        vec![
            RequestState::Pending,
            RequestState::Sent,
            RequestState::Retrying,
            RequestState::Sent,
            RequestState::Retrying,
            RequestState::Sent,
            RequestState::Succeeded,
        ]
    );
}

#[test]
fn persistent_server_errors_exhaust_the_read_budget() {
    let transport = MockTransport::new();
    transport.set_fallback(Ok(Response::new(500, "Internal Server Error")));
    let client = client(transport);

    let err = client
        .execute(&Request::get("https://api.test/databases/db"), RequestKind::Read)
        .unwrap_err();

    assert_eq!(client.transport().request_count(), 5);
    match &err {
        ClientError::Exhausted { attempts, last } => {
            assert_eq!(*attempts, 5);
            assert!(matches!(**last, ClientError::Protocol { status: Some(500), .. }));
        }
        other => panic!("expected exhaustion, got {other:?}"),
    }
    assert!(!err.is_retryable());

    let stats = client.stats();
    assert_eq!(stats.requests, 1);
    assert_eq!(stats.attempts, 5);
    assert_eq!(stats.retries, 4);
    assert_eq!(stats.exhausted, 1);
    assert_eq!(client.last_trace().last(), Some(&RequestState::Exhausted));
}

#[test]
fn unknown_remote_codes_are_retried_to_the_cap() {
    let transport = MockTransport::new();
    transport.set_fallback(Ok(Response::new(
        409,
        json!({ "object": "error", "status": 409, "code": "something_new", "message": "?" }).to_string(),
    )));
    let client = client(transport);

    let err = client
        .execute(&Request::new(Method::Patch, "https://api.test/pages/p1"), RequestKind::Write)
        .unwrap_err();
    assert_eq!(client.transport().request_count(), 3);
    assert_eq!(err.remote_code(), Some("something_new"));
}

#[test]
fn stats_accumulate_across_requests() {
    let transport = MockTransport::new();
    transport
        .push_json(json!({}))
        .push(Err(ClientError::connect("refused")))
        .push_json(json!({}));
    let client = client(transport);

    let request = Request::get("https://api.test/users/me");
    client.execute(&request, RequestKind::Read).unwrap();
    client.execute(&request, RequestKind::Read).unwrap();

    let stats = client.stats();
    assert_eq!(stats.requests, 2);
    assert_eq!(stats.succeeded, 2);
    assert_eq!(stats.attempts, 3);
    assert_eq!(stats.retries, 1);
}
