//! Entities exchanged with the gateway and REST API

mod gateway;
mod presence;

pub use gateway::{GatewayBot, GatewayInfo, SessionStartLimit, ShardInfo};
pub use presence::{Activity, ActivityType, Presence, Status};
