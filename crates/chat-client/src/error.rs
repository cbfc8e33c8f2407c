//! Client error type

use chat_common::ConfigError;
use chat_core::DomainError;
use chat_gateway::GatewayError;
use chat_rest::RestError;

pub type ClientResult<T> = Result<T, ClientError>;

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("REST error: {0}")]
    Rest(#[from] RestError),

    #[error("Gateway error: {0}")]
    Gateway(#[from] GatewayError),

    #[error("Invalid shard: {0}")]
    InvalidShard(#[from] DomainError),
}

impl ClientError {
    /// Whether the error ended the gateway connection for good
    pub fn is_fatal(&self) -> bool {
        match self {
            Self::Gateway(e) => e.is_fatal(),
            Self::Config(_) | Self::InvalidShard(_) => true,
            Self::Rest(_) => false,
        }
    }
}
