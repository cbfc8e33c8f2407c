//! REST Integration Tests
//!
//! Runs the REST client over real HTTP against a wiremock server.
//!
//! Run with: cargo test -p integration-tests --test rest_tests

use std::time::{Duration, Instant};

use chat_core::Snowflake;
use chat_rest::RestClient;
use integration_tests::test_config;
use serde_json::json;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn rest_client(server: &MockServer) -> RestClient {
    RestClient::new(&test_config(&server.uri())).unwrap()
}

// ============================================================================
// Rate Limit Tests
// ============================================================================

#[tokio::test]
async fn test_exhausted_bucket_delays_next_call() {
    let server = MockServer::start().await;
    let now = chrono::Utc::now();
    Mock::given(method("GET"))
        .and(path("/channels/10"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"id": "10", "name": "general"}))
                .insert_header("x-ratelimit-limit", "5")
                .insert_header("x-ratelimit-remaining", "0")
                .insert_header("x-ratelimit-reset", (now.timestamp() + 2).to_string())
                .insert_header("date", now.to_rfc2822()),
        )
        .mount(&server)
        .await;
    let rest = rest_client(&server).await;

    let channel = rest.get_channel(Snowflake::new(10)).await.unwrap();
    assert_eq!(channel["name"], "general");

    let started = Instant::now();
    rest.get_channel(Snowflake::new(10)).await.unwrap();
    let waited = started.elapsed();
    assert!(waited >= Duration::from_millis(1800), "waited only {waited:?}");
    assert!(waited < Duration::from_secs(5), "waited {waited:?}");
}

#[tokio::test]
async fn test_global_limit_gates_other_routes() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/channels/20"))
        .respond_with(ResponseTemplate::new(429).set_body_json(json!({
            "message": "You are being rate limited.",
            "retry_after": 1000,
            "global": true
        })))
        .up_to_n_times(1)
        .with_priority(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/channels/20"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "20"})))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/guilds/30"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "30"})))
        .mount(&server)
        .await;
    let rest = rest_client(&server).await;

    let started = Instant::now();
    let limited = {
        let rest = rest.clone();
        tokio::spawn(async move { rest.get_channel(Snowflake::new(20)).await })
    };
    while server.received_requests().await.unwrap_or_default().is_empty() {
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    tokio::time::sleep(Duration::from_millis(100)).await;

    let guild = rest.get_guild(Snowflake::new(30)).await.unwrap();
    assert_eq!(guild["id"], "30");
    assert!(started.elapsed() >= Duration::from_millis(900));

    let channel = limited.await.unwrap().unwrap();
    assert_eq!(channel["id"], "20");
}

// ============================================================================
// Error Surface Tests
// ============================================================================

#[tokio::test]
async fn test_client_error_carries_structure() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/channels/40/messages"))
        .and(header("authorization", "Bot test-token"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "code": 50035,
            "message": "Invalid Form Body",
            "errors": {
                "content": {
                    "_errors": [{"code": "BASE_TYPE_MAX_LENGTH", "message": "Must be 2000 or fewer in length."}]
                }
            }
        })))
        .expect(1)
        .mount(&server)
        .await;
    let rest = rest_client(&server).await;

    let err = rest
        .create_message(Snowflake::new(40), "x".repeat(2001))
        .await
        .unwrap_err();

    assert_eq!(err.status().map(|s| s.as_u16()), Some(400));
    assert_eq!(err.code(), Some(50035));
    assert_eq!(err.message(), Some("Invalid Form Body"));
    assert_eq!(
        err.field_errors().unwrap()["content"],
        vec!["Must be 2000 or fewer in length.".to_string()]
    );
    assert!(err.retries().is_none());
    assert!(!err.is_retryable());
}

#[tokio::test]
async fn test_server_errors_exhaust_retry_budget() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/guilds/50"))
        .respond_with(ResponseTemplate::new(502).set_body_json(json!({"message": "Bad Gateway"})))
        .expect(3)
        .mount(&server)
        .await;
    let mut config = test_config(&server.uri());
    config.rest.retry_backoff_min_ms = 10;
    config.rest.retry_backoff_max_ms = 20;
    let rest = RestClient::new(&config).unwrap();

    let err = rest.get_guild(Snowflake::new(50)).await.unwrap_err();
    assert_eq!(err.status().map(|s| s.as_u16()), Some(502));
    assert_eq!(err.retries(), Some(2));
}
