//! Connection lifecycle states

use std::sync::atomic::{AtomicU8, Ordering};

/// Where a gateway connection is in its lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ConnectionState {
    /// Opening the WebSocket
    Connecting,
    /// Waiting for HELLO and READY/RESUMED
    Handshaking,
    /// Session established, dispatches flowing
    Active,
    /// Tearing down the current socket
    Closing,
    /// Sleeping before the next attempt
    Reconnecting,
    /// Shut down or failed permanently
    Terminated,
}

impl ConnectionState {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => Self::Connecting,
            1 => Self::Handshaking,
            2 => Self::Active,
            3 => Self::Closing,
            4 => Self::Reconnecting,
            _ => Self::Terminated,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Connecting => "connecting",
            Self::Handshaking => "handshaking",
            Self::Active => "active",
            Self::Closing => "closing",
            Self::Reconnecting => "reconnecting",
            Self::Terminated => "terminated",
        }
    }
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lock-free cell holding a [`ConnectionState`]
#[derive(Debug)]
pub(crate) struct StateCell(AtomicU8);

impl StateCell {
    pub(crate) fn new(state: ConnectionState) -> Self {
        Self(AtomicU8::new(state as u8))
    }

    pub(crate) fn get(&self) -> ConnectionState {
        ConnectionState::from_u8(self.0.load(Ordering::Acquire))
    }

    /// Store a new state and return the previous one
    pub(crate) fn set(&self, state: ConnectionState) -> ConnectionState {
        let previous = ConnectionState::from_u8(self.0.swap(state as u8, Ordering::AcqRel));
        if previous != state {
            tracing::debug!(from = %previous, to = %state, "Connection state changed");
        }
        previous
    }
}
