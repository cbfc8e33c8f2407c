//! # chat-gateway
//!
//! Gateway client: wire codecs, the session lifecycle (identify, resume,
//! heartbeat, reconnect) and dispatch of decoded events to handlers.

pub mod codec;
pub mod connection;
pub mod dispatch;
pub mod error;
pub mod events;
pub mod protocol;

// Re-export commonly used types at crate root
pub use codec::{Codec, InboundDecoder};
pub use connection::{
    gateway_url, CloseRequest, ConnectionParts, ConnectionSettings, ConnectionState,
    GatewayConnection, HeartbeatMonitor, Session, SessionLimitSource, SessionStartGovernor,
    SessionStartPermit, SendGate, SendLimiter, ShutdownSignal,
};
pub use dispatch::{
    CacheSink, DispatchRouter, Dispatcher, EntityCache, EventScheduler, Handler, ListenerId,
};
pub use error::{CodecError, DecodeError, DispatchError, GatewayError, GatewayResult, SessionError};
pub use events::{Decoder, Event, Model, Ready};
pub use protocol::{CloseCode, GatewayMessage, OpCode};
