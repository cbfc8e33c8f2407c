//! Account-wide rate-limit gate

use std::time::Duration;

use parking_lot::Mutex;
use tokio::time::{sleep_until, Instant};

/// Shared gate closed while a global rate limit is in effect.
///
/// The gate reopens by itself once the deadline passes. Closing it again
/// while closed extends the deadline, never shortens it.
#[derive(Debug, Default)]
pub struct GlobalGate {
    deadline: Mutex<Option<Instant>>,
}

impl GlobalGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Close the gate for `duration`
    pub fn close_for(&self, duration: Duration) {
        let until = Instant::now() + duration;
        let mut deadline = self.deadline.lock();
        if deadline.is_none_or(|current| current < until) {
            *deadline = Some(until);
        }
        tracing::warn!(retry_after_ms = duration.as_millis() as u64, "Global rate limit hit");
    }

    /// Whether calls may proceed right now
    pub fn is_open(&self) -> bool {
        self.remaining().is_none()
    }

    /// Time until the gate reopens
    pub fn remaining(&self) -> Option<Duration> {
        let now = Instant::now();
        let deadline = *self.deadline.lock();
        deadline.filter(|d| *d > now).map(|d| d - now)
    }

    /// Wait until the gate is open
    pub async fn wait(&self) {
        loop {
            let deadline = *self.deadline.lock();
            match deadline {
                Some(until) if until > Instant::now() => {
                    tracing::debug!("Waiting for global rate limit to clear");
                    sleep_until(until).await;
                }
                _ => return,
            }
        }
    }
}
