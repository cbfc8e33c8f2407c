//! Gateway connection parameters returned by the REST API

use serde::{Deserialize, Serialize};

use crate::error::DomainError;

/// Response of `GET /gateway`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GatewayInfo {
    pub url: String,
}

/// Response of `GET /gateway/bot`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GatewayBot {
    pub url: String,
    /// Recommended shard count
    pub shards: u32,
    pub session_start_limit: SessionStartLimit,
}

/// Server-declared ceiling on new sessions in a rolling window
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionStartLimit {
    pub total: u32,
    pub remaining: u32,
    /// Milliseconds until `remaining` resets to `total`
    pub reset_after: u64,
    #[serde(default = "default_max_concurrency")]
    pub max_concurrency: u32,
}

fn default_max_concurrency() -> u32 {
    1
}

impl SessionStartLimit {
    /// Whether a new session may start right now
    #[inline]
    pub fn can_start(&self) -> bool {
        self.remaining > 0
    }

    /// Time until the window resets
    pub fn reset_duration(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.reset_after)
    }
}

/// Shard identity, serialized as `[id, count]`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "[u32; 2]", try_from = "[u32; 2]")]
pub struct ShardInfo {
    pub id: u32,
    pub count: u32,
}

impl ShardInfo {
    /// Create a validated shard identity
    pub fn new(id: u32, count: u32) -> Result<Self, DomainError> {
        if count == 0 || id >= count {
            return Err(DomainError::InvalidShard { id, count });
        }
        Ok(Self { id, count })
    }
}

impl Default for ShardInfo {
    fn default() -> Self {
        Self { id: 0, count: 1 }
    }
}

impl From<ShardInfo> for [u32; 2] {
    fn from(shard: ShardInfo) -> Self {
        [shard.id, shard.count]
    }
}

impl TryFrom<[u32; 2]> for ShardInfo {
    type Error = DomainError;

    fn try_from([id, count]: [u32; 2]) -> Result<Self, Self::Error> {
        Self::new(id, count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_gateway_bot_deserialize() {
        let bot: GatewayBot = serde_json::from_value(json!({
            "url": "wss://gateway.example",
            "shards": 2,
            "session_start_limit": {"total": 1000, "remaining": 999, "reset_after": 14_400_000}
        }))
        .unwrap();

        assert_eq!(bot.shards, 2);
        assert_eq!(bot.session_start_limit.remaining, 999);
        assert_eq!(bot.session_start_limit.max_concurrency, 1);
        assert!(bot.session_start_limit.can_start());
    }

    #[test]
    fn test_shard_serializes_as_pair() {
        let shard = ShardInfo::new(1, 4).unwrap();
        assert_eq!(serde_json::to_value(shard).unwrap(), json!([1, 4]));
    }

    #[test]
    fn test_invalid_shard() {
        assert_eq!(
            ShardInfo::new(4, 4),
            Err(DomainError::InvalidShard { id: 4, count: 4 })
        );
        assert!(ShardInfo::new(0, 0).is_err());
        assert!(serde_json::from_value::<ShardInfo>(json!([3, 2])).is_err());
    }

    #[test]
    fn test_exhausted_limit() {
        let limit = SessionStartLimit {
            total: 1000,
            remaining: 0,
            reset_after: 5000,
            max_concurrency: 1,
        };
        assert!(!limit.can_start());
        assert_eq!(limit.reset_duration().as_secs(), 5);
    }
}
