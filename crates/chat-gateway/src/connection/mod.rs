//! Connection lifecycle
//!
//! Session state, heartbeating, send limiting and the reconnecting gateway
//! connection built from them.

mod endpoint;
mod gateway;
mod heartbeat;
mod limiter;
mod session;
mod shutdown;
mod start_limit;
mod state;
mod writer;

pub use endpoint::{gateway_url, ZLIB_STREAM};
pub use gateway::{ConnectionParts, ConnectionSettings, GatewayConnection};
pub use heartbeat::HeartbeatMonitor;
pub use limiter::{SendGate, SendLimiter};
pub use session::Session;
pub use shutdown::ShutdownSignal;
pub use start_limit::{SessionLimitSource, SessionStartGovernor, SessionStartPermit};
pub use state::ConnectionState;
pub use writer::CloseRequest;
