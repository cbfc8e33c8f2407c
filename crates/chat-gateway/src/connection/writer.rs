//! Socket writer task
//!
//! The writer owns the sink half of the socket. Everything else talks to it
//! through an mpsc channel, so frames leave in the order they were queued.

use std::sync::Arc;

use futures_util::{Sink, SinkExt};
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode as WsCloseCode;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::{self, Message};

use super::limiter::{SendGate, SendLimiter};
use crate::codec::Codec;
use crate::protocol::GatewayMessage;

/// Request to close the socket with a code the closure handler will act on
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CloseRequest {
    pub code: u16,
    pub reason: String,
}

impl CloseRequest {
    pub fn new(code: u16, reason: impl Into<String>) -> Self {
        Self {
            code,
            reason: reason.into(),
        }
    }
}

/// Work item for the writer
#[derive(Debug)]
pub(crate) enum Outbound {
    Frame {
        message: GatewayMessage,
        gate: SendGate,
    },
    /// Sent immediately, bypassing every limiter; ends the writer
    Close(CloseRequest),
}

impl Outbound {
    pub(crate) fn heartbeat(message: GatewayMessage) -> Self {
        Self::Frame {
            message,
            gate: SendGate::Local,
        }
    }

    pub(crate) fn control(message: GatewayMessage) -> Self {
        Self::Frame {
            message,
            gate: SendGate::Global,
        }
    }
}

pub(crate) async fn run_writer<S>(
    mut sink: S,
    mut outbound: mpsc::Receiver<Outbound>,
    codec: Codec,
    limiter: Arc<SendLimiter>,
) where
    S: Sink<Message, Error = tungstenite::Error> + Unpin,
{
    while let Some(item) = outbound.recv().await {
        match item {
            Outbound::Frame { message, gate } => {
                limiter.ready(gate).await;
                let encoded = match codec.encode(&message) {
                    Ok(encoded) => encoded,
                    Err(e) => {
                        tracing::warn!(op = %message.op, error = %e, "Failed to encode frame");
                        continue;
                    }
                };
                tracing::trace!(op = %message.op, "Sending frame");
                if let Err(e) = sink.send(encoded).await {
                    tracing::warn!(error = %e, "Failed to write frame");
                    break;
                }
            }
            Outbound::Close(request) => {
                tracing::debug!(code = request.code, reason = %request.reason, "Sending close frame");
                let frame = CloseFrame {
                    code: WsCloseCode::from(request.code),
                    reason: request.reason.into(),
                };
                if let Err(e) = sink.send(Message::Close(Some(frame))).await {
                    tracing::debug!(error = %e, "Failed to write close frame");
                }
                break;
            }
        }
    }

    let _ = sink.close().await;
}
