//! Gateway message format
//!
//! Every frame in either direction is `{op, d, s, t}`.

use super::{HelloPayload, IdentifyPayload, OpCode, PresenceUpdatePayload, ResumePayload};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One gateway frame
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GatewayMessage {
    /// Operation code
    pub op: OpCode,

    /// Event data payload
    #[serde(default)]
    pub d: Value,

    /// Sequence number (only for op=0 Dispatch)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub s: Option<u64>,

    /// Event name (only for op=0 Dispatch)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub t: Option<String>,
}

impl GatewayMessage {
    fn control(op: OpCode, d: Value) -> Self {
        Self {
            op,
            d,
            s: None,
            t: None,
        }
    }

    // === Client Messages ===

    /// Identify frame (op=2)
    pub fn identify(payload: &IdentifyPayload) -> Result<Self, serde_json::Error> {
        Ok(Self::control(OpCode::Identify, serde_json::to_value(payload)?))
    }

    /// Resume frame (op=6)
    pub fn resume(payload: &ResumePayload) -> Result<Self, serde_json::Error> {
        Ok(Self::control(OpCode::Resume, serde_json::to_value(payload)?))
    }

    /// Heartbeat frame (op=1) carrying the last sequence, or null before any dispatch
    #[must_use]
    pub fn heartbeat(last_sequence: Option<u64>) -> Self {
        Self::control(OpCode::Heartbeat, last_sequence.map_or(Value::Null, Value::from))
    }

    /// Presence update frame (op=3)
    pub fn presence_update(payload: &PresenceUpdatePayload) -> Result<Self, serde_json::Error> {
        Ok(Self::control(OpCode::PresenceUpdate, serde_json::to_value(payload)?))
    }

    // === Server Messages ===

    /// Dispatch frame (op=0)
    #[must_use]
    pub fn dispatch(event_name: impl Into<String>, sequence: u64, data: Value) -> Self {
        Self {
            op: OpCode::Dispatch,
            d: data,
            s: Some(sequence),
            t: Some(event_name.into()),
        }
    }

    /// Hello frame (op=10)
    #[must_use]
    pub fn hello(heartbeat_interval_ms: u64) -> Self {
        let payload = HelloPayload::with_interval(heartbeat_interval_ms);
        Self::control(
            OpCode::Hello,
            serde_json::json!({ "heartbeat_interval": payload.heartbeat_interval }),
        )
    }

    /// Heartbeat ACK frame (op=11)
    #[must_use]
    pub fn heartbeat_ack() -> Self {
        Self::control(OpCode::HeartbeatAck, Value::Null)
    }

    /// Reconnect frame (op=7)
    #[must_use]
    pub fn reconnect() -> Self {
        Self::control(OpCode::Reconnect, Value::Null)
    }

    /// Invalid session frame (op=9); `resumable` goes in `d`
    #[must_use]
    pub fn invalid_session(resumable: bool) -> Self {
        Self::control(OpCode::InvalidSession, Value::Bool(resumable))
    }

    // === Parsing ===

    /// Parse the Hello payload (op=10)
    pub fn as_hello(&self) -> Option<HelloPayload> {
        if self.op != OpCode::Hello {
            return None;
        }
        serde_json::from_value(self.d.clone()).ok()
    }

    /// Whether an INVALID_SESSION frame allows resuming
    #[must_use]
    pub fn is_resumable(&self) -> bool {
        self.op == OpCode::InvalidSession && self.d.as_bool() == Some(true)
    }

    /// Convert into the generic structured form used by the wire codecs
    pub fn to_value(&self) -> Result<Value, serde_json::Error> {
        serde_json::to_value(self)
    }

    /// Build from the generic structured form
    pub fn from_value(value: Value) -> Result<Self, serde_json::Error> {
        serde_json::from_value(value)
    }
}

impl std::fmt::Display for GatewayMessage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match (&self.t, self.s) {
            (Some(t), Some(s)) => write!(f, "GatewayMessage(op={}, t={t}, s={s})", self.op),
            (Some(t), None) => write!(f, "GatewayMessage(op={}, t={t})", self.op),
            _ => write!(f, "GatewayMessage(op={})", self.op),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_dispatch_frame() {
        let msg = GatewayMessage::from_value(json!({
            "op": 0, "d": {"id": "1"}, "s": 42, "t": "MESSAGE_CREATE"
        }))
        .unwrap();

        assert_eq!(msg.op, OpCode::Dispatch);
        assert_eq!(msg.s, Some(42));
        assert_eq!(msg.t.as_deref(), Some("MESSAGE_CREATE"));
    }

    #[test]
    fn test_parse_control_frame_with_nulls() {
        let msg = GatewayMessage::from_value(json!({"op": 11, "d": null, "s": null, "t": null}))
            .unwrap();
        assert_eq!(msg, GatewayMessage::heartbeat_ack());
    }

    #[test]
    fn test_hello() {
        let msg = GatewayMessage::hello(45_000);
        assert_eq!(msg.as_hello().unwrap().heartbeat_interval, 45_000);
        assert!(GatewayMessage::heartbeat_ack().as_hello().is_none());
    }

    #[test]
    fn test_heartbeat_payload() {
        assert_eq!(
            GatewayMessage::heartbeat(Some(7)).to_value().unwrap(),
            json!({"op": 1, "d": 7})
        );
        assert_eq!(
            GatewayMessage::heartbeat(None).to_value().unwrap(),
            json!({"op": 1, "d": null})
        );
    }

    #[test]
    fn test_invalid_session_resumable() {
        assert!(GatewayMessage::invalid_session(true).is_resumable());
        assert!(!GatewayMessage::invalid_session(false).is_resumable());
        let missing = GatewayMessage::from_value(json!({"op": 9})).unwrap();
        assert!(!missing.is_resumable());
    }

    #[test]
    fn test_unknown_opcode_rejected() {
        assert!(GatewayMessage::from_value(json!({"op": 42, "d": null})).is_err());
    }

    #[test]
    fn test_message_display() {
        let dispatch = GatewayMessage::dispatch("MESSAGE_CREATE", 5, json!({}));
        let display = dispatch.to_string();
        assert!(display.contains("MESSAGE_CREATE"));
        assert!(display.contains("s=5"));
    }
}
