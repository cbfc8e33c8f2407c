//! Domain errors - error types for the domain layer

use thiserror::Error;

/// Domain layer errors
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DomainError {
    // =========================================================================
    // Presence Errors
    // =========================================================================
    #[error("Streaming activities require a url")]
    StreamingWithoutUrl,

    #[error("Unknown status: {0}")]
    UnknownStatus(String),

    // =========================================================================
    // Gateway Parameter Errors
    // =========================================================================
    #[error("Invalid shard {id} of {count}")]
    InvalidShard { id: u32, count: u32 },

    #[error("Validation error: {0}")]
    ValidationError(String),
}

impl DomainError {
    /// Get the error code string
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::StreamingWithoutUrl => "STREAMING_WITHOUT_URL",
            Self::UnknownStatus(_) => "UNKNOWN_STATUS",
            Self::InvalidShard { .. } => "INVALID_SHARD",
            Self::ValidationError(_) => "VALIDATION_ERROR",
        }
    }

    /// Check if this is a validation error
    #[must_use]
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Self::StreamingWithoutUrl | Self::UnknownStatus(_) | Self::ValidationError(_)
        )
    }
}
