//! Gateway error types

use chat_core::DomainError;
use chat_rest::RestError;
use std::time::Duration;

/// Result alias for gateway operations
pub type GatewayResult<T> = Result<T, GatewayError>;

/// Failures that end a connection or the whole client
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] Box<tokio_tungstenite::tungstenite::Error>),

    #[error("Invalid gateway URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("REST error: {0}")]
    Rest(#[from] RestError),

    #[error("Codec error: {0}")]
    Codec(#[from] CodecError),

    #[error(transparent)]
    Dispatch(#[from] DispatchError),

    #[error("Invalid presence: {0}")]
    InvalidPresence(#[from] DomainError),

    /// No session may be started within the allowed wait
    #[error("Connecting failed: session start limit exhausted, resets in {reset_after:?}")]
    ConnectingFailed { reset_after: Duration },

    #[error("Total amount of allowed reconnects ({max}) was exceeded")]
    ReconnectsExhausted { max: u32 },

    /// The server closed with a code that reconnecting cannot fix
    #[error("Gateway closed with fatal code {code}: {reason}")]
    FatalClose { code: u16, reason: String },

    #[error("Outbound channel closed")]
    ChannelClosed,
}

impl From<tokio_tungstenite::tungstenite::Error> for GatewayError {
    fn from(err: tokio_tungstenite::tungstenite::Error) -> Self {
        Self::WebSocket(Box::new(err))
    }
}

impl GatewayError {
    /// Whether the owner should treat this as terminal
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::ConnectingFailed { .. }
                | Self::ReconnectsExhausted { .. }
                | Self::FatalClose { .. }
                | Self::Dispatch(DispatchError::UnknownEvent(_))
        )
    }
}

/// Wire format failures; the offending frame is dropped
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("ETF error: {0}")]
    Etf(String),

    #[error("Unexpected end of ETF data")]
    UnexpectedEof,

    #[error("Unknown ETF tag {0}")]
    UnknownTag(u8),

    #[error("Inflate error: {0}")]
    Inflate(String),
}

impl From<flate2::DecompressError> for CodecError {
    fn from(err: flate2::DecompressError) -> Self {
        Self::Inflate(err.to_string())
    }
}

/// Dispatch routing failures
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    /// No decoder registered for this event name
    #[error("Unknown event: {0}")]
    UnknownEvent(String),

    #[error("Malformed {event} payload: {reason}")]
    Malformed { event: String, reason: String },
}

/// A dispatch payload that does not fit its decoder
#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum DecodeError {
    #[error("expected an object, got {0}")]
    NotAnObject(&'static str),

    #[error("invalid field {field}: {reason}")]
    InvalidField { field: &'static str, reason: String },
}

/// Session bookkeeping failures
#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum SessionError {
    /// A session id is present but its sequence was reset
    #[error("Session {session_id} has no sequence to resume from")]
    StaleSession { session_id: String },
}
