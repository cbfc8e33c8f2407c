//! WebSocket close codes

use serde::{Deserialize, Serialize};

/// Gateway close codes sent by the server
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u16)]
pub enum CloseCode {
    /// Unknown error; also used locally for a zombied connection
    UnknownError = 4000,
    UnknownOpcode = 4001,
    DecodeError = 4002,
    NotAuthenticated = 4003,
    AuthenticationFailed = 4004,
    AlreadyAuthenticated = 4005,
    InvalidSequence = 4007,
    RateLimited = 4008,
    SessionTimeout = 4009,
    InvalidShard = 4010,
    ShardingRequired = 4011,
    InvalidApiVersion = 4012,
    InvalidIntents = 4013,
    DisallowedIntents = 4014,
}

impl CloseCode {
    /// Normal closure, used for user shutdown
    pub const NORMAL: u16 = 1000;
    /// Close frame carried no status code
    pub const NO_STATUS: u16 = 1005;
    /// Socket dropped without a close frame
    pub const ABNORMAL: u16 = 1006;
    /// Local close after RECONNECT or INVALID_SESSION; keeps the session
    pub const RECONNECT_REQUESTED: u16 = 4900;
    /// Codes in this range invalidate the session
    pub const SESSION_CLEARING: std::ops::RangeInclusive<u16> = 4000..=4011;

    /// Create a `CloseCode` from a raw u16 value
    #[must_use]
    pub fn from_u16(value: u16) -> Option<Self> {
        match value {
            4000 => Some(Self::UnknownError),
            4001 => Some(Self::UnknownOpcode),
            4002 => Some(Self::DecodeError),
            4003 => Some(Self::NotAuthenticated),
            4004 => Some(Self::AuthenticationFailed),
            4005 => Some(Self::AlreadyAuthenticated),
            4007 => Some(Self::InvalidSequence),
            4008 => Some(Self::RateLimited),
            4009 => Some(Self::SessionTimeout),
            4010 => Some(Self::InvalidShard),
            4011 => Some(Self::ShardingRequired),
            4012 => Some(Self::InvalidApiVersion),
            4013 => Some(Self::InvalidIntents),
            4014 => Some(Self::DisallowedIntents),
            _ => None,
        }
    }

    /// Get the raw u16 value
    #[must_use]
    pub const fn as_u16(self) -> u16 {
        self as u16
    }

    /// Reconnecting cannot fix these
    #[must_use]
    pub const fn is_fatal(self) -> bool {
        matches!(
            self,
            Self::AuthenticationFailed
                | Self::InvalidShard
                | Self::ShardingRequired
                | Self::InvalidApiVersion
                | Self::InvalidIntents
                | Self::DisallowedIntents
        )
    }

    /// Whether a raw close code terminates instead of reconnecting
    #[must_use]
    pub fn is_fatal_code(code: u16) -> bool {
        Self::from_u16(code).is_some_and(Self::is_fatal)
    }

    /// Whether a raw close code invalidates the session
    #[must_use]
    pub fn clears_session(code: u16) -> bool {
        Self::SESSION_CLEARING.contains(&code)
    }

    /// Get the description for this close code
    #[must_use]
    pub const fn description(self) -> &'static str {
        match self {
            Self::UnknownError => "Unknown error occurred",
            Self::UnknownOpcode => "Invalid opcode sent",
            Self::DecodeError => "Invalid payload encoding",
            Self::NotAuthenticated => "Not authenticated",
            Self::AuthenticationFailed => "Authentication failed",
            Self::AlreadyAuthenticated => "Already authenticated",
            Self::InvalidSequence => "Invalid sequence number",
            Self::RateLimited => "Rate limited",
            Self::SessionTimeout => "Session timeout",
            Self::InvalidShard => "Invalid shard configuration",
            Self::ShardingRequired => "Sharding required",
            Self::InvalidApiVersion => "Invalid API version",
            Self::InvalidIntents => "Invalid intents",
            Self::DisallowedIntents => "Disallowed intents",
        }
    }
}

impl std::fmt::Display for CloseCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.description(), self.as_u16())
    }
}

impl From<CloseCode> for u16 {
    fn from(code: CloseCode) -> Self {
        code.as_u16()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_close_code_from_u16() {
        assert_eq!(CloseCode::from_u16(4000), Some(CloseCode::UnknownError));
        assert_eq!(CloseCode::from_u16(4014), Some(CloseCode::DisallowedIntents));
        assert_eq!(CloseCode::from_u16(1000), None);
        assert_eq!(CloseCode::from_u16(4006), None);
    }

    #[test]
    fn test_fatal_codes() {
        for code in [4004, 4010, 4011, 4012, 4013, 4014] {
            assert!(CloseCode::is_fatal_code(code), "{code} should be fatal");
        }
        for code in [1000, 1001, 4000, 4007, 4009, CloseCode::RECONNECT_REQUESTED] {
            assert!(!CloseCode::is_fatal_code(code), "{code} should not be fatal");
        }
    }

    #[test]
    fn test_session_clearing_range() {
        assert!(CloseCode::clears_session(4000));
        assert!(CloseCode::clears_session(4009));
        assert!(CloseCode::clears_session(4011));
        assert!(!CloseCode::clears_session(1001));
        assert!(!CloseCode::clears_session(4012));
        assert!(!CloseCode::clears_session(CloseCode::RECONNECT_REQUESTED));
    }

    #[test]
    fn test_close_code_display() {
        let display = CloseCode::AuthenticationFailed.to_string();
        assert!(display.contains("4004"));
        assert!(display.contains("Authentication"));
    }
}
