//! Gateway Integration Tests
//!
//! Every test runs a real client against an in-process fake gateway and a
//! mocked REST API. No external services are needed.
//!
//! Run with: cargo test -p integration-tests --test gateway_tests

use std::sync::Arc;
use std::time::Duration;

use chat_client::{Client, ClientError};
use chat_common::UnknownEventPolicy;
use chat_core::{Activity, Presence, Snowflake, Status};
use chat_gateway::{ConnectionState, DispatchError, Event, GatewayError, GatewayMessage, OpCode};
use integration_tests::{
    eventually, message_payload, mock_api, ready_payload, test_config, FakeGateway, RunningClient,
    TEST_APP, TEST_TOKEN,
};
use tokio::sync::mpsc;

// ============================================================================
// Handshake Tests
// ============================================================================

#[tokio::test]
async fn test_identify_ready_and_handler() {
    let gateway = FakeGateway::bind().await.unwrap();
    let api = mock_api(&gateway).await;
    let client = Arc::new(Client::connect(test_config(&api.uri())).await.unwrap());

    let (tx, mut rx) = mpsc::unbounded_channel();
    client.on("message", move |event| {
        let tx = tx.clone();
        async move {
            let content = event.raw().and_then(|raw| raw["content"].as_str().map(String::from));
            tx.send((event.name().to_string(), event.id(), content))?;
            Ok(())
        }
    });
    let running = RunningClient::run(client);

    let mut peer = gateway.accept().await.unwrap();
    peer.hello(45_000).await.unwrap();

    let identify = peer.recv_op(OpCode::Identify).await.unwrap();
    assert_eq!(identify.d["token"], TEST_TOKEN);
    assert_eq!(identify.d["properties"]["browser"], TEST_APP);
    assert_eq!(identify.d["shard"], serde_json::json!([0, 1]));
    assert_eq!(identify.d["large_threshold"], 50);
    assert_eq!(identify.d["presence"]["status"], "online");

    peer.dispatch("READY", 1, ready_payload("session-a")).await.unwrap();
    peer.dispatch("MESSAGE_CREATE", 2, message_payload(175_928_847_299_117_063, 7, "hello"))
        .await
        .unwrap();

    let (name, id, content) = tokio::time::timeout(Duration::from_secs(5), rx.recv())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(name, "message_create");
    assert_eq!(id, Some(Snowflake::new(175_928_847_299_117_063)));
    assert_eq!(content.as_deref(), Some("hello"));

    let connection = running.client.connection();
    assert_eq!(connection.state(), ConnectionState::Active);
    assert_eq!(connection.session().session_id().as_deref(), Some("session-a"));
    assert_eq!(connection.session().sequence(), 2);
    assert!(running
        .client
        .cache()
        .resolve(Snowflake::new(175_928_847_299_117_063))
        .is_some());

    running.client.shutdown();
    assert_eq!(peer.expect_close().await.unwrap(), 1000);
    assert!(running.finished().await.unwrap().is_ok());
}

#[tokio::test]
async fn test_first_heartbeat_follows_hello() {
    let gateway = FakeGateway::bind().await.unwrap();
    let api = mock_api(&gateway).await;
    let running = RunningClient::start(test_config(&api.uri())).await.unwrap();

    let mut peer = gateway.accept().await.unwrap();
    peer.hello(45_000).await.unwrap();

    let identify = peer.recv().await.unwrap();
    assert_eq!(identify.op, OpCode::Identify);
    let heartbeat = peer.recv().await.unwrap();
    assert_eq!(heartbeat.op, OpCode::Heartbeat);
    assert!(heartbeat.d.is_null());

    peer.dispatch("READY", 5, ready_payload("session-b")).await.unwrap();
    peer.send(&GatewayMessage {
        op: OpCode::Heartbeat,
        d: serde_json::Value::Null,
        s: None,
        t: None,
    })
    .await
    .unwrap();
    let requested = peer.recv_op(OpCode::Heartbeat).await.unwrap();
    assert_eq!(requested.d, 5);

    running.client.shutdown();
    assert!(running.finished().await.unwrap().is_ok());
}

#[tokio::test]
async fn test_identify_sent_before_hello() {
    let gateway = FakeGateway::bind().await.unwrap();
    let api = mock_api(&gateway).await;
    let running = RunningClient::start(test_config(&api.uri())).await.unwrap();

    let mut peer = gateway.accept().await.unwrap();
    let identify = peer.recv().await.unwrap();
    assert_eq!(identify.op, OpCode::Identify);
    assert_eq!(identify.d["token"], TEST_TOKEN);

    peer.hello(45_000).await.unwrap();
    let heartbeat = peer.recv().await.unwrap();
    assert_eq!(heartbeat.op, OpCode::Heartbeat);

    peer.dispatch("READY", 1, ready_payload("session-early")).await.unwrap();
    let client = Arc::clone(&running.client);
    eventually(|| client.connection().state() == ConnectionState::Active).await.unwrap();

    running.client.shutdown();
    assert_eq!(peer.expect_close().await.unwrap(), 1000);
    assert!(running.finished().await.unwrap().is_ok());
}

// ============================================================================
// Resume and Reconnect Tests
// ============================================================================

#[tokio::test]
async fn test_resume_after_going_away() {
    let gateway = FakeGateway::bind().await.unwrap();
    let api = mock_api(&gateway).await;
    let running = RunningClient::start(test_config(&api.uri())).await.unwrap();

    let mut peer = gateway.accept().await.unwrap();
    peer.hello(45_000).await.unwrap();
    peer.recv_op(OpCode::Identify).await.unwrap();
    peer.dispatch("READY", 1, ready_payload("session-c")).await.unwrap();
    peer.dispatch("MESSAGE_CREATE", 2, message_payload(1, 7, "before")).await.unwrap();
    peer.dispatch("TYPING_START", 3, serde_json::json!({"channel_id": "7", "user_id": "9"}))
        .await
        .unwrap();
    let client = Arc::clone(&running.client);
    eventually(|| client.connection().session().sequence() == 3).await.unwrap();
    peer.close(1001, "going away").await.unwrap();

    let mut peer = gateway.accept().await.unwrap();
    peer.hello(45_000).await.unwrap();
    let resume = peer.recv_op(OpCode::Resume).await.unwrap();
    assert_eq!(resume.d["token"], TEST_TOKEN);
    assert_eq!(resume.d["session_id"], "session-c");
    assert_eq!(resume.d["seq"], 3);

    peer.dispatch("RESUMED", 4, serde_json::json!({"_trace": ["gateway-test-1"]}))
        .await
        .unwrap();
    eventually(|| client.connection().state() == ConnectionState::Active).await.unwrap();
    assert_eq!(client.connection().reconnect_count(), 1);

    running.client.shutdown();
    assert!(running.finished().await.unwrap().is_ok());
}

#[tokio::test]
async fn test_zombied_connection_reidentifies() {
    let gateway = FakeGateway::bind().await.unwrap();
    let api = mock_api(&gateway).await;
    let running = RunningClient::start(test_config(&api.uri())).await.unwrap();

    let mut peer = gateway.accept().await.unwrap();
    peer.hello(200).await.unwrap();
    peer.recv_op(OpCode::Identify).await.unwrap();
    peer.dispatch("READY", 1, ready_payload("session-d")).await.unwrap();

    // Heartbeats are never acknowledged
    assert_eq!(peer.expect_close().await.unwrap(), 4000);

    let mut peer = gateway.accept().await.unwrap();
    peer.hello(45_000).await.unwrap();
    let handshake = peer.recv().await.unwrap();
    assert_eq!(handshake.op, OpCode::Identify);

    running.client.shutdown();
    assert!(running.finished().await.unwrap().is_ok());
}

#[tokio::test]
async fn test_acknowledged_heartbeats_keep_connection_open() {
    let gateway = FakeGateway::bind().await.unwrap();
    let api = mock_api(&gateway).await;
    let running = RunningClient::start(test_config(&api.uri())).await.unwrap();

    let mut peer = gateway.accept().await.unwrap();
    peer.hello(100).await.unwrap();
    peer.recv_op(OpCode::Identify).await.unwrap();
    for _ in 0..5 {
        peer.recv_op(OpCode::Heartbeat).await.unwrap();
        peer.heartbeat_ack().await.unwrap();
    }

    let connection = running.client.connection();
    assert!(connection.latency().is_some());
    assert_ne!(connection.state(), ConnectionState::Reconnecting);

    running.client.shutdown();
    assert_eq!(peer.expect_close().await.unwrap(), 1000);
    assert!(running.finished().await.unwrap().is_ok());
}

#[tokio::test]
async fn test_invalid_session_clears_and_reidentifies() {
    let gateway = FakeGateway::bind().await.unwrap();
    let api = mock_api(&gateway).await;
    let running = RunningClient::start(test_config(&api.uri())).await.unwrap();

    let mut peer = gateway.accept().await.unwrap();
    peer.hello(45_000).await.unwrap();
    peer.recv_op(OpCode::Identify).await.unwrap();
    peer.dispatch("READY", 1, ready_payload("session-e")).await.unwrap();
    peer.send(&GatewayMessage::invalid_session(false)).await.unwrap();
    assert_eq!(peer.expect_close().await.unwrap(), 4900);

    let mut peer = gateway.accept().await.unwrap();
    peer.hello(45_000).await.unwrap();
    peer.recv_op(OpCode::Identify).await.unwrap();
    assert!(running.client.connection().session().session_id().is_none());

    running.client.shutdown();
    assert!(running.finished().await.unwrap().is_ok());
}

#[tokio::test]
async fn test_reconnect_request_clears_session() {
    let gateway = FakeGateway::bind().await.unwrap();
    let api = mock_api(&gateway).await;
    let running = RunningClient::start(test_config(&api.uri())).await.unwrap();
    let client = Arc::clone(&running.client);

    let mut peer = gateway.accept().await.unwrap();
    peer.hello(45_000).await.unwrap();
    peer.recv_op(OpCode::Identify).await.unwrap();
    peer.dispatch("READY", 1, ready_payload("session-r")).await.unwrap();
    eventually(|| client.connection().session().sequence() == 1).await.unwrap();
    peer.close(1001, "going away").await.unwrap();

    let mut peer = gateway.accept().await.unwrap();
    peer.hello(45_000).await.unwrap();
    peer.recv_op(OpCode::Resume).await.unwrap();
    assert_eq!(client.connection().reconnect_count(), 1);
    peer.send(&GatewayMessage::reconnect()).await.unwrap();
    assert_eq!(peer.expect_close().await.unwrap(), 4900);

    // The request reset the budget before the close counted against it
    let mut peer = gateway.accept().await.unwrap();
    assert_eq!(client.connection().reconnect_count(), 1);
    assert!(client.connection().session().session_id().is_none());
    peer.hello(45_000).await.unwrap();
    peer.recv_op(OpCode::Identify).await.unwrap();

    peer.dispatch("READY", 1, ready_payload("session-r2")).await.unwrap();
    eventually(|| client.connection().state() == ConnectionState::Active).await.unwrap();
    assert_eq!(client.connection().reconnect_count(), 0);

    running.client.shutdown();
    assert!(running.finished().await.unwrap().is_ok());
}

#[tokio::test]
async fn test_resumable_invalid_session_resumes() {
    let gateway = FakeGateway::bind().await.unwrap();
    let api = mock_api(&gateway).await;
    let running = RunningClient::start(test_config(&api.uri())).await.unwrap();
    let client = Arc::clone(&running.client);

    let mut peer = gateway.accept().await.unwrap();
    peer.hello(45_000).await.unwrap();
    peer.recv_op(OpCode::Identify).await.unwrap();
    peer.dispatch("READY", 1, ready_payload("session-i")).await.unwrap();
    peer.dispatch("TYPING_START", 2, serde_json::json!({"channel_id": "7", "user_id": "9"}))
        .await
        .unwrap();
    eventually(|| client.connection().session().sequence() == 2).await.unwrap();
    peer.close(1001, "going away").await.unwrap();

    let mut peer = gateway.accept().await.unwrap();
    peer.hello(45_000).await.unwrap();
    peer.recv_op(OpCode::Resume).await.unwrap();
    assert_eq!(client.connection().reconnect_count(), 1);
    peer.send(&GatewayMessage::invalid_session(true)).await.unwrap();
    assert_eq!(peer.expect_close().await.unwrap(), 4900);

    let mut peer = gateway.accept().await.unwrap();
    assert_eq!(client.connection().reconnect_count(), 1);
    peer.hello(45_000).await.unwrap();
    let resume = peer.recv_op(OpCode::Resume).await.unwrap();
    assert_eq!(resume.d["session_id"], "session-i");
    assert_eq!(resume.d["seq"], 2);
    assert_eq!(
        client.connection().session().session_id().as_deref(),
        Some("session-i")
    );

    running.client.shutdown();
    assert!(running.finished().await.unwrap().is_ok());
}

#[tokio::test]
async fn test_reconnect_budget_exhausted() {
    let gateway = FakeGateway::bind().await.unwrap();
    let api = mock_api(&gateway).await;
    let mut config = test_config(&api.uri());
    config.gateway.max_reconnects = 1;
    let running = RunningClient::start(config).await.unwrap();

    for _ in 0..2 {
        let peer = gateway.accept().await.unwrap();
        peer.close(1001, "going away").await.unwrap();
    }

    match running.finished().await.unwrap() {
        Err(ClientError::Gateway(GatewayError::ReconnectsExhausted { max })) => assert_eq!(max, 1),
        other => panic!("expected ReconnectsExhausted, got {other:?}"),
    }
}

// ============================================================================
// Fatal Outcomes
// ============================================================================

#[tokio::test]
async fn test_authentication_failure_is_fatal() {
    let gateway = FakeGateway::bind().await.unwrap();
    let api = mock_api(&gateway).await;
    let running = RunningClient::start(test_config(&api.uri())).await.unwrap();

    let mut peer = gateway.accept().await.unwrap();
    peer.hello(45_000).await.unwrap();
    peer.recv_op(OpCode::Identify).await.unwrap();
    peer.close(4004, "Authentication failed.").await.unwrap();

    match running.finished().await.unwrap() {
        Err(ClientError::Gateway(GatewayError::FatalClose { code, .. })) => assert_eq!(code, 4004),
        other => panic!("expected FatalClose, got {other:?}"),
    }
}

#[tokio::test]
async fn test_unknown_event_under_strict_policy() {
    let gateway = FakeGateway::bind().await.unwrap();
    let api = mock_api(&gateway).await;
    let mut config = test_config(&api.uri());
    config.gateway.unknown_event_policy = UnknownEventPolicy::Strict;
    let running = RunningClient::start(config).await.unwrap();

    let mut peer = gateway.accept().await.unwrap();
    peer.hello(45_000).await.unwrap();
    peer.recv_op(OpCode::Identify).await.unwrap();
    peer.dispatch("READY", 1, ready_payload("session-f")).await.unwrap();
    peer.dispatch("SOME_FUTURE_EVENT", 2, serde_json::json!({})).await.unwrap();

    match running.finished().await.unwrap() {
        Err(ClientError::Gateway(GatewayError::Dispatch(DispatchError::UnknownEvent(name)))) => {
            assert_eq!(name, "some_future_event");
        }
        other => panic!("expected UnknownEvent, got {other:?}"),
    }
}

#[tokio::test]
async fn test_malformed_dispatch_is_dropped() {
    let gateway = FakeGateway::bind().await.unwrap();
    let api = mock_api(&gateway).await;
    let client = Arc::new(Client::connect(test_config(&api.uri())).await.unwrap());
    let (tx, mut rx) = mpsc::unbounded_channel();
    client.on("message_create", move |event| {
        let tx = tx.clone();
        async move {
            tx.send(event.id())?;
            Ok(())
        }
    });
    let running = RunningClient::run(client);

    let mut peer = gateway.accept().await.unwrap();
    peer.hello(45_000).await.unwrap();
    peer.recv_op(OpCode::Identify).await.unwrap();
    peer.dispatch("READY", 1, ready_payload("session-g")).await.unwrap();
    peer.dispatch("MESSAGE_CREATE", 2, serde_json::json!("not an object")).await.unwrap();
    peer.dispatch("MESSAGE_CREATE", 3, message_payload(11, 7, "after")).await.unwrap();

    let id = tokio::time::timeout(Duration::from_secs(5), rx.recv()).await.unwrap().unwrap();
    assert_eq!(id, Some(Snowflake::new(11)));
    assert_eq!(running.client.connection().session().sequence(), 3);

    running.client.shutdown();
    assert!(running.finished().await.unwrap().is_ok());
}

// ============================================================================
// Presence Tests
// ============================================================================

#[tokio::test]
async fn test_presence_update_after_ready() {
    let gateway = FakeGateway::bind().await.unwrap();
    let api = mock_api(&gateway).await;
    let client = Arc::new(Client::connect(test_config(&api.uri())).await.unwrap());
    let (tx, mut rx) = mpsc::unbounded_channel();
    client.once("connect", move |event| {
        let tx = tx.clone();
        async move {
            if let Event::Ready(ready) = event.as_ref() {
                tx.send(ready.session_id.clone())?;
            }
            Ok(())
        }
    });
    let running = RunningClient::run(client);

    let mut peer = gateway.accept().await.unwrap();
    peer.hello(45_000).await.unwrap();
    peer.recv_op(OpCode::Identify).await.unwrap();
    peer.dispatch("READY", 1, ready_payload("session-h")).await.unwrap();
    let session = tokio::time::timeout(Duration::from_secs(5), rx.recv()).await.unwrap().unwrap();
    assert_eq!(session, "session-h");

    let presence = Presence::new(Status::Idle, Some(Activity::playing("integration tests")));
    running.client.update_presence(presence).await.unwrap();

    let update = peer.recv_op(OpCode::PresenceUpdate).await.unwrap();
    assert_eq!(update.d["status"], "idle");
    assert_eq!(update.d["game"]["name"], "integration tests");

    let invalid = Presence::new(
        Status::Online,
        Some(Activity {
            url: None,
            ..Activity::streaming("stream", "https://example.com")
        }),
    );
    assert!(running.client.update_presence(invalid).await.is_err());

    running.client.shutdown();
    assert!(running.finished().await.unwrap().is_ok());
}
