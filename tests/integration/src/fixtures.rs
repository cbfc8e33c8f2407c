//! Test fixtures and payload builders
//!
//! Provides the configuration and dispatch payloads shared by the tests.

use chat_common::ClientConfig;
use serde_json::{json, Value};

/// Token every fixture client authenticates with
pub const TEST_TOKEN: &str = "test-token";

/// Application name reported in IDENTIFY
pub const TEST_APP: &str = "integration-client";

/// Configuration pointed at a mocked REST API.
///
/// Reconnects happen after one second, the outbound limiter is loose
/// enough to never delay a test, and transport compression is off so the
/// fake gateway can speak plain JSON text.
pub fn test_config(api_base: &str) -> ClientConfig {
    let mut config = ClientConfig::new(TEST_TOKEN);
    config.app.name = TEST_APP.to_string();
    config.rest.base_url = api_base.to_string();
    config.rest.max_retries = 2;
    config.gateway.compress = false;
    config.gateway.reconnect_base_delay_secs = 0;
    config.gateway.send_limit = 120;
    config.gateway.send_limit_period_secs = 1;
    config
}

/// Body of `GET /gateway/bot`
pub fn gateway_bot_body(gateway_url: &str) -> Value {
    json!({
        "url": gateway_url,
        "shards": 1,
        "session_start_limit": {
            "total": 1000,
            "remaining": 1000,
            "reset_after": 0,
            "max_concurrency": 1
        }
    })
}

/// Data of a READY dispatch
pub fn ready_payload(session_id: &str) -> Value {
    json!({
        "v": 6,
        "session_id": session_id,
        "user": {"id": "80351110224678912", "username": "bot", "discriminator": "0001"},
        "guilds": [{"id": "41771983423143937", "unavailable": true}],
        "shard": [0, 1],
        "_trace": ["gateway-test-1"]
    })
}

/// Data of a MESSAGE_CREATE dispatch
pub fn message_payload(id: u64, channel_id: u64, content: &str) -> Value {
    json!({
        "id": id.to_string(),
        "channel_id": channel_id.to_string(),
        "content": content,
        "author": {"id": "53908232506183680", "username": "someone"}
    })
}
