//! Heartbeat watchdog
//!
//! A heartbeat is only sent once the previous one was acknowledged. A beat
//! falling due while the ACK is still outstanding means the connection is
//! zombied and must be closed.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio::time::{sleep, Instant};
use tokio_util::sync::CancellationToken;

use super::session::Session;
use super::writer::{CloseRequest, Outbound};
use crate::protocol::{CloseCode, GatewayMessage};

/// Liveness state for one physical connection
#[derive(Debug)]
pub struct HeartbeatMonitor {
    interval: Duration,
    acked: AtomicBool,
    last_sent: Mutex<Option<Instant>>,
    latency: Mutex<Option<Duration>>,
}

impl HeartbeatMonitor {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            acked: AtomicBool::new(true),
            last_sent: Mutex::new(None),
            latency: Mutex::new(None),
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Claim the next beat.
    ///
    /// Returns `false` if the previous beat was never acknowledged.
    pub fn begin_beat(&self, now: Instant) -> bool {
        if !self.acked.swap(false, Ordering::AcqRel) {
            return false;
        }
        *self.last_sent.lock() = Some(now);
        true
    }

    /// Record a HEARTBEAT_ACK and return the round trip time
    pub fn ack(&self, now: Instant) -> Option<Duration> {
        self.acked.store(true, Ordering::Release);
        let rtt = self.last_sent.lock().map(|sent| now.saturating_duration_since(sent));
        if rtt.is_some() {
            *self.latency.lock() = rtt;
        }
        rtt
    }

    pub fn is_acked(&self) -> bool {
        self.acked.load(Ordering::Acquire)
    }

    /// Round trip of the most recently acknowledged beat
    pub fn latency(&self) -> Option<Duration> {
        *self.latency.lock()
    }

    pub fn last_sent(&self) -> Option<Instant> {
        *self.last_sent.lock()
    }
}

/// Beat until cancelled, the writer goes away, or an ACK goes missing
pub(crate) async fn run_heartbeat(
    monitor: Arc<HeartbeatMonitor>,
    session: Arc<Session>,
    outbound: mpsc::Sender<Outbound>,
    close: mpsc::Sender<CloseRequest>,
    cancel: CancellationToken,
) {
    loop {
        if !monitor.begin_beat(Instant::now()) {
            tracing::warn!(
                interval_ms = monitor.interval().as_millis() as u64,
                "No heartbeat ACK received, connection zombied"
            );
            let _ = close
                .send(CloseRequest::new(CloseCode::UnknownError.as_u16(), "zombied connection"))
                .await;
            return;
        }

        let seq = session.last_sequence();
        tracing::trace!(seq = ?seq, "Sending heartbeat");
        if outbound.send(Outbound::heartbeat(GatewayMessage::heartbeat(seq))).await.is_err() {
            return;
        }

        tokio::select! {
            () = cancel.cancelled() => return,
            () = sleep(monitor.interval()) => {}
        }
    }
}
