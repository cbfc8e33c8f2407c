//! # chat-core
//!
//! Domain layer containing the value objects shared by the REST and gateway layers.
//! This crate has zero dependencies on infrastructure (HTTP, WebSocket, runtime).

pub mod entities;
pub mod error;
pub mod value_objects;

// Re-export commonly used types at crate root
pub use entities::{
    Activity, ActivityType, GatewayBot, GatewayInfo, Presence, SessionStartLimit, ShardInfo,
    Status,
};
pub use error::DomainError;
pub use value_objects::{Snowflake, SnowflakeParseError};
