//! Integration tests for probe execution and retries against a live server

mod fixture;

use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use uptime::{
    EndpointSpec, FailureDescriptor, FailureKind, HistoryStore, HttpMethod, HttpProbe,
    ProbeContext, ProbeExecutor, ProbeHandler,
};

fn handler(capacity: usize) -> Arc<ProbeHandler> {
    let store = HistoryStore::open_in_memory(capacity).unwrap();
    Arc::new(ProbeHandler::new(Arc::new(HttpProbe::new().unwrap()), store))
}

fn spec(url: String) -> EndpointSpec {
    EndpointSpec::new(url)
        .with_timeout(Duration::from_secs(1))
        .with_retries(1, Duration::from_millis(100))
}

#[tokio::test]
async fn test_successful_probe_is_recorded() {
    let server = fixture::spawn().await;
    let handler = handler(10);
    let spec = spec(server.url("/success"));

    let outcome = handler.handle(&spec, &CancellationToken::new()).await;

    assert!(outcome.is_success());
    assert_eq!(outcome.status, 200);
    assert!(outcome.failure.is_none());

    let history = handler.store().read(&spec.url).unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].status, 200);
    assert_eq!(history[0].expected_status, 200);
}

#[tokio::test]
async fn test_timeout_with_one_retry_is_timeout_exhausted() {
    let server = fixture::spawn().await;
    let handler = handler(10);
    let spec = spec(server.url("/slow"));

    let start = Instant::now();
    let outcome = handler.handle(&spec, &CancellationToken::new()).await;
    let elapsed = start.elapsed();

    assert_eq!(outcome.status, 0);
    assert_eq!(outcome.failure_kind(), Some(FailureKind::TimeoutExhausted));
    // Bounded by the probe timeout, not by the 2s handler
    assert!(elapsed < Duration::from_millis(1800), "took {:?}", elapsed);
    assert_eq!(handler.store().read(&spec.url).unwrap().len(), 1);
}

#[tokio::test]
async fn test_timeout_is_independent_of_attempt_count() {
    let server = fixture::spawn().await;
    let handler = handler(10);
    let spec = EndpointSpec::new(server.url("/slow"))
        .with_timeout(Duration::from_millis(500))
        .with_retries(50, Duration::from_millis(10));

    let start = Instant::now();
    let outcome = handler.handle(&spec, &CancellationToken::new()).await;

    assert!(!outcome.is_success());
    assert!(start.elapsed() < Duration::from_millis(1500));
}

#[tokio::test]
async fn test_history_cap_keeps_latest_outcomes() {
    let server = fixture::spawn().await;
    let handler = handler(3);
    let spec = spec(server.url("/success"));

    let mut outcomes = Vec::new();
    for _ in 0..5 {
        outcomes.push(handler.handle(&spec, &CancellationToken::new()).await);
    }

    let history = handler.store().read(&spec.url).unwrap();
    assert_eq!(history.len(), 3);

    let stored: Vec<_> = history.iter().map(|o| o.started_at).collect();
    let expected: Vec<_> = outcomes[2..].iter().map(|o| o.started_at).collect();
    assert_eq!(stored, expected);
}

#[tokio::test]
async fn test_missing_content_is_content_mismatch() {
    let server = fixture::spawn().await;
    let handler = handler(10);
    let spec = spec(server.url("/success")).with_expected_content("expected text");

    let outcome = handler.handle(&spec, &CancellationToken::new()).await;

    assert_eq!(outcome.status, 200);
    assert_eq!(
        outcome.failure,
        Some(FailureDescriptor::ContentMismatch {
            expected: "expected text".to_string()
        })
    );
}

#[tokio::test]
async fn test_present_content_succeeds() {
    let server = fixture::spawn().await;
    let handler = handler(10);
    let spec = spec(server.url("/content")).with_expected_content("expected text");

    let outcome = handler.handle(&spec, &CancellationToken::new()).await;

    assert!(outcome.is_success());
}

#[tokio::test]
async fn test_error_status_fails_even_when_expected() {
    let server = fixture::spawn().await;
    let handler = handler(10);
    let spec = EndpointSpec::new(server.url("/error"))
        .with_timeout(Duration::from_secs(1))
        .with_expected_status(500)
        .with_retries(2, Duration::from_millis(50));

    let outcome = handler.handle(&spec, &CancellationToken::new()).await;

    assert_eq!(outcome.status, 500);
    assert_eq!(outcome.failure_kind(), Some(FailureKind::StatusMismatch));
    assert_eq!(outcome.error_message(), "received error status code: 500");
}

#[tokio::test]
async fn test_status_check_takes_priority_over_content() {
    let server = fixture::spawn().await;
    let handler = handler(10);
    let spec = spec(server.url("/created")).with_expected_content("anything");

    let outcome = handler.handle(&spec, &CancellationToken::new()).await;

    assert_eq!(outcome.status, 201);
    assert_eq!(
        outcome.failure,
        Some(FailureDescriptor::StatusMismatch { got: 201, want: 200 })
    );
}

#[tokio::test]
async fn test_flaky_endpoint_recovers_within_retries() {
    let server = fixture::spawn().await;
    let handler = handler(10);
    let spec = EndpointSpec::new(server.url("/flaky"))
        .with_timeout(Duration::from_secs(2))
        .with_retries(3, Duration::from_millis(20));

    let outcome = handler.handle(&spec, &CancellationToken::new()).await;

    assert!(outcome.is_success());
    assert_eq!(server.flaky_calls(), 3);
    assert_eq!(handler.store().read(&spec.url).unwrap().len(), 1);
}

#[tokio::test]
async fn test_post_method_and_normalization() {
    let server = fixture::spawn().await;
    let probe = HttpProbe::new().unwrap();
    let ctx = ProbeContext::new(Duration::from_secs(1), &CancellationToken::new());

    let post = EndpointSpec::new(server.url("/submit")).with_method(HttpMethod::Post);
    assert!(probe.execute(&post, &ctx).await.is_success());

    // Unknown methods fall back to GET, which /submit rejects
    let unknown = EndpointSpec::new(server.url("/submit"))
        .with_method(HttpMethod::parse_lossy("DELETE"));
    let outcome = probe.execute(&unknown, &ctx).await;
    assert_eq!(outcome.status, 405);
    assert_eq!(outcome.failure_kind(), Some(FailureKind::StatusMismatch));
}

#[tokio::test]
async fn test_distinct_urls_probe_in_parallel() {
    let server = fixture::spawn().await;
    let handler = handler(10);

    let start = Instant::now();
    let tasks: Vec<_> = (0..8)
        .map(|i| {
            let handler = handler.clone();
            let spec = spec(format!("{}?id={}", server.url("/delay"), i));
            tokio::spawn(async move { handler.handle(&spec, &CancellationToken::new()).await })
        })
        .collect();

    for task in tasks {
        assert!(task.await.unwrap().is_success());
    }

    // Sequential execution would take 2.4s
    assert!(start.elapsed() < Duration::from_millis(1500));
    assert_eq!(handler.store().list_keys().unwrap().len(), 8);
}

#[tokio::test]
async fn test_concurrent_handles_for_same_url_lose_nothing() {
    let server = fixture::spawn().await;
    let handler = handler(48);
    let url = server.url("/success");

    let tasks: Vec<_> = (0..12)
        .map(|_| {
            let handler = handler.clone();
            let spec = spec(url.clone());
            tokio::spawn(async move { handler.handle(&spec, &CancellationToken::new()).await })
        })
        .collect();

    for task in tasks {
        task.await.unwrap();
    }

    assert_eq!(handler.store().read(&url).unwrap().len(), 12);
}
