//! Session start governor
//!
//! The server only allows so many fresh IDENTIFYs per rolling window. The
//! governor keeps a local view of that budget, spends from it optimistically,
//! and reconciles with an authoritative read before every attempt.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chat_core::SessionStartLimit;
use chat_rest::{RestClient, RestError};
use tokio::sync::{Mutex, OwnedMutexGuard};
use tokio::time::{sleep, Instant};

use crate::error::{GatewayError, GatewayResult};

/// Authoritative source of the session start budget
#[async_trait]
pub trait SessionLimitSource: Send + Sync {
    async fn session_start_limit(&self) -> Result<SessionStartLimit, RestError>;
}

#[async_trait]
impl SessionLimitSource for RestClient {
    async fn session_start_limit(&self) -> Result<SessionStartLimit, RestError> {
        Ok(self.get_gateway_bot().await?.session_start_limit)
    }
}

#[derive(Debug)]
struct LimitState {
    limit: SessionStartLimit,
    /// When `limit.reset_after` was last measured
    observed_at: Instant,
}

impl LimitState {
    fn until_reset(&self, now: Instant) -> Duration {
        self.limit
            .reset_duration()
            .saturating_sub(now.saturating_duration_since(self.observed_at))
    }

    fn reconcile(&mut self, limit: SessionStartLimit, now: Instant) {
        if limit.remaining != self.limit.remaining {
            tracing::debug!(
                local = self.limit.remaining,
                server = limit.remaining,
                "Reconciled session start budget"
            );
        }
        self.limit = limit;
        self.observed_at = now;
    }

    fn refill(&mut self, now: Instant) {
        self.limit.remaining = self.limit.total;
        self.observed_at = now;
    }
}

/// Serializes fresh session starts against the server's budget
pub struct SessionStartGovernor {
    state: Arc<Mutex<LimitState>>,
    source: Arc<dyn SessionLimitSource>,
    timeout: Duration,
}

/// Held while one connection attempt identifies; drop it once IDENTIFY is queued
#[derive(Debug)]
pub struct SessionStartPermit {
    _guard: OwnedMutexGuard<LimitState>,
}

impl SessionStartGovernor {
    /// `timeout` bounds how long [`acquire`](Self::acquire) may block on an empty budget
    pub fn new(
        initial: SessionStartLimit,
        source: Arc<dyn SessionLimitSource>,
        timeout: Duration,
    ) -> Self {
        Self {
            state: Arc::new(Mutex::new(LimitState {
                limit: initial,
                observed_at: Instant::now(),
            })),
            source,
            timeout,
        }
    }

    /// Budget as currently believed locally
    pub async fn remaining(&self) -> u32 {
        self.state.lock().await.limit.remaining
    }

    /// Wait for a session start slot.
    ///
    /// Only one caller holds a permit at a time. Fails with
    /// [`GatewayError::ConnectingFailed`] when the budget is empty and the
    /// window resets later than the configured timeout.
    pub async fn acquire(&self) -> GatewayResult<SessionStartPermit> {
        let mut state = Arc::clone(&self.state).lock_owned().await;

        match self.source.session_start_limit().await {
            Ok(limit) => state.reconcile(limit, Instant::now()),
            Err(e) => tracing::warn!(error = %e, "Failed to refresh session start limit, using local view"),
        }

        if state.limit.remaining == 0 {
            let wait = state.until_reset(Instant::now());
            if wait > self.timeout {
                tracing::error!(
                    reset_after_ms = wait.as_millis() as u64,
                    timeout_secs = self.timeout.as_secs(),
                    "Session start limit exhausted"
                );
                return Err(GatewayError::ConnectingFailed { reset_after: wait });
            }

            tracing::info!(
                wait_ms = wait.as_millis() as u64,
                "Session start limit exhausted, waiting for reset"
            );
            sleep(wait).await;
            state.refill(Instant::now());
        }

        state.limit.remaining = state.limit.remaining.saturating_sub(1);
        tracing::debug!(remaining = state.limit.remaining, total = state.limit.total, "Session start slot taken");

        Ok(SessionStartPermit { _guard: state })
    }
}

impl std::fmt::Debug for SessionStartGovernor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionStartGovernor")
            .field("timeout", &self.timeout)
            .finish()
    }
}
