//! Integration tests for the resilient HTTP executor against a wiremock server

use core::time::Duration;
use repo_metrics_lib::facts::rate_limit_gate::RateLimitGate;
use repo_metrics_lib::facts::resilient_http::{Executor, RetryPolicy};
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn executor(max_attempts: u32) -> Executor {
    executor_with_token(max_attempts, CancellationToken::new())
}

fn executor_with_token(max_attempts: u32, cancel: CancellationToken) -> Executor {
    let policy = RetryPolicy {
        max_attempts,
        retry_delay: Duration::from_millis(10),
        ..RetryPolicy::default()
    };

    Executor::new(reqwest::Client::new(), policy, RateLimitGate::new(), cancel)
}

#[tokio::test]
async fn test_server_error_is_retried_until_success() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/repos/owner/game"))
        .respond_with(ResponseTemplate::new(500))
        .up_to_n_times(1)
        .with_priority(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/repos/owner/game"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({ "stargazers_count": 3 })))
        .mount(&server)
        .await;

    let executor = executor(5);
    let outcome = executor.execute(&format!("{}/repos/owner/game", server.uri()), &[]).await.unwrap();

    assert!(outcome.is_success());
    assert_eq!(outcome.body["stargazers_count"], 3);
    assert_eq!(executor.request_count(), 2);
}

#[tokio::test]
async fn test_not_found_is_not_retried() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404).set_body_json(serde_json::json!({ "message": "Not Found" })))
        .expect(1)
        .mount(&server)
        .await;

    let executor = executor(5);
    let outcome = executor.execute(&format!("{}/repos/owner/missing", server.uri()), &[]).await.unwrap();

    assert_eq!(outcome.status.as_u16(), 404);
    assert_eq!(outcome.body["message"], "Not Found");
    assert_eq!(executor.request_count(), 1);
}

#[tokio::test]
async fn test_unprocessable_is_not_retried() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(422))
        .expect(1)
        .mount(&server)
        .await;

    let executor = executor(5);
    let outcome = executor.execute(&format!("{}/search/issues", server.uri()), &[]).await.unwrap();

    assert_eq!(outcome.status.as_u16(), 422);
}

#[tokio::test]
async fn test_persistent_failure_returns_last_response() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(503))
        .expect(3)
        .mount(&server)
        .await;

    let executor = executor(3);
    let outcome = executor.execute(&format!("{}/repos/owner/game", server.uri()), &[]).await.unwrap();

    assert_eq!(outcome.status.as_u16(), 503);
    assert!(!outcome.is_success());
    assert_eq!(executor.request_count(), 3);
}

#[tokio::test]
async fn test_exhausted_rate_limit_waits_for_reset() {
    let server = MockServer::start().await;
    let reset = chrono::Utc::now().timestamp() + 5;

    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(403)
                .insert_header("x-ratelimit-remaining", "0")
                .insert_header("x-ratelimit-reset", reset.to_string().as_str()),
        )
        .up_to_n_times(1)
        .with_priority(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([])))
        .mount(&server)
        .await;

    let executor = executor(5);
    let start = Instant::now();
    let outcome = executor.execute(&format!("{}/repos/owner/game/commits", server.uri()), &[]).await.unwrap();

    assert!(outcome.is_success());
    assert!(start.elapsed() >= Duration::from_secs(5));
    assert_eq!(executor.request_count(), 2);
}

#[tokio::test]
async fn test_query_parameters_are_sent() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(wiremock::matchers::query_param("per_page", "1"))
        .and(wiremock::matchers::query_param("q", "repo:owner/game type:issue"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({ "total_count": 4 })))
        .expect(1)
        .mount(&server)
        .await;

    let executor = executor(1);
    let query = [("q", "repo:owner/game type:issue".to_string()), ("per_page", "1".to_string())];
    let outcome = executor.execute(&format!("{}/search/issues", server.uri()), &query).await.unwrap();

    assert_eq!(outcome.body["total_count"], 4);
}

#[tokio::test]
async fn test_connection_failure_is_an_error() {
    let executor = executor(2);

    // Nothing listens on port 1
    let _ = executor.execute("http://127.0.0.1:1/repos/owner/game", &[]).await.unwrap_err();
    assert_eq!(executor.request_count(), 2);
}

#[tokio::test]
async fn test_cancellation_interrupts_request() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(30)))
        .mount(&server)
        .await;

    let cancel = CancellationToken::new();
    let executor = executor_with_token(5, cancel.clone());

    let canceller = tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        cancel.cancel();
    });

    let start = Instant::now();
    let _ = executor.execute(&format!("{}/repos/owner/game", server.uri()), &[]).await.unwrap_err();

    assert!(start.elapsed() < Duration::from_secs(10));
    canceller.await.unwrap();
}

#[tokio::test]
async fn test_cancelled_token_sends_nothing() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let cancel = CancellationToken::new();
    cancel.cancel();

    let executor = executor_with_token(5, cancel);
    let _ = executor.execute(&format!("{}/repos/owner/game", server.uri()), &[]).await.unwrap_err();
}
