//! Control frame payloads

use chat_core::{Presence, ShardInfo};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Payload for op 10 (Hello)
///
/// Sent by the server immediately after connection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HelloPayload {
    /// Heartbeat interval in milliseconds
    pub heartbeat_interval: u64,
    #[serde(default, rename = "_trace", skip_serializing_if = "Vec::is_empty")]
    pub trace: Vec<String>,
}

impl HelloPayload {
    /// Create a Hello payload with the given interval
    #[must_use]
    pub fn with_interval(heartbeat_interval: u64) -> Self {
        Self {
            heartbeat_interval,
            trace: Vec::new(),
        }
    }
}

/// Payload for op 2 (Identify)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentifyPayload {
    pub token: String,
    pub properties: IdentifyProperties,
    /// Per-payload compression of dispatches
    pub compress: bool,
    /// Member count above which a guild is considered large (50..=250)
    pub large_threshold: u16,
    pub shard: ShardInfo,
    pub presence: Presence,
}

/// Client connection properties
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentifyProperties {
    pub os: String,
    pub browser: String,
    pub device: String,
}

impl IdentifyProperties {
    /// Properties describing this process
    #[must_use]
    pub fn for_client(name: &str) -> Self {
        Self {
            os: std::env::consts::OS.to_string(),
            browser: name.to_string(),
            device: name.to_string(),
        }
    }
}

/// Payload for op 6 (Resume)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResumePayload {
    pub token: String,
    pub session_id: String,
    /// Last received sequence number
    pub seq: u64,
}

/// Payload for op 3 (Presence Update)
pub type PresenceUpdatePayload = Presence;

/// Data of the READY dispatch
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ReadyPayload {
    #[serde(rename = "v", default)]
    pub version: u8,
    pub session_id: String,
    #[serde(default)]
    pub user: Value,
    #[serde(default)]
    pub guilds: Vec<Value>,
    #[serde(default)]
    pub shard: Option<ShardInfo>,
    #[serde(default, rename = "_trace")]
    pub trace: Vec<String>,
}
