//! User-initiated shutdown

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio_util::sync::{CancellationToken, WaitForCancellationFuture};

/// Cloneable shutdown switch.
///
/// Flipping it stops the heartbeat loop, closes the socket with 1000 and
/// suppresses every further reconnect, including one already sleeping.
#[derive(Debug, Clone, Default)]
pub struct ShutdownSignal {
    shutting_down: Arc<AtomicBool>,
    token: CancellationToken,
}

impl ShutdownSignal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn trigger(&self) {
        if !self.shutting_down.swap(true, Ordering::AcqRel) {
            tracing::info!("Shutdown requested");
        }
        self.token.cancel();
    }

    pub fn is_shutdown(&self) -> bool {
        self.shutting_down.load(Ordering::Acquire)
    }

    /// Resolves once [`trigger`](Self::trigger) has been called
    pub fn cancelled(&self) -> WaitForCancellationFuture<'_> {
        self.token.cancelled()
    }

    /// Token cancelled by shutdown or by the owner of the child
    pub fn child_token(&self) -> CancellationToken {
        self.token.child_token()
    }
}
