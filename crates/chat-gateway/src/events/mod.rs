//! Gateway events
//!
//! Decoded forms of dispatch payloads and the table mapping event names to
//! their decoders.

mod decoders;
mod event;
mod model;

pub use decoders::{builtin_decoders, DecodeFn, Decoder};
pub use event::{Event, Ready};
pub use model::Model;
