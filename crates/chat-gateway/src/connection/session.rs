//! Session bookkeeping
//!
//! Tracks the server-assigned session id and the last dispatch sequence so a
//! dropped connection can resume instead of identifying again.

use std::sync::atomic::{AtomicU64, Ordering};

use chat_core::ShardInfo;
use parking_lot::RwLock;

use crate::error::SessionError;

/// One logical gateway session, shared by the read and heartbeat loops
#[derive(Debug)]
pub struct Session {
    session_id: RwLock<Option<String>>,
    /// Last dispatch sequence, 0 until the first dispatch
    sequence: AtomicU64,
    shard: ShardInfo,
}

impl Session {
    pub fn new(shard: ShardInfo) -> Self {
        Self {
            session_id: RwLock::new(None),
            sequence: AtomicU64::new(0),
            shard,
        }
    }

    pub fn shard(&self) -> ShardInfo {
        self.shard
    }

    pub fn session_id(&self) -> Option<String> {
        self.session_id.read().clone()
    }

    pub fn sequence(&self) -> u64 {
        self.sequence.load(Ordering::Acquire)
    }

    /// Sequence for heartbeat payloads, `None` before any dispatch
    pub fn last_sequence(&self) -> Option<u64> {
        Some(self.sequence()).filter(|seq| *seq > 0)
    }

    /// Record an inbound sequence number; lower values never win.
    ///
    /// Returns the tracked sequence after the update.
    pub fn observe(&self, seq: u64) -> u64 {
        self.sequence.fetch_max(seq, Ordering::AcqRel).max(seq)
    }

    /// Adopt the id assigned by READY
    pub fn establish(&self, session_id: impl Into<String>) {
        let session_id = session_id.into();
        tracing::debug!(session_id = %session_id, shard = self.shard.id, "Session established");
        *self.session_id.write() = Some(session_id);
    }

    /// Whether the next handshake should be a resume
    pub fn is_resumable(&self) -> bool {
        self.session_id.read().is_some() && self.sequence() > 0
    }

    /// Id and sequence to resume with, or `None` when a fresh identify is needed
    pub fn resume_target(&self) -> Result<Option<(String, u64)>, SessionError> {
        let guard = self.session_id.read();
        let Some(session_id) = guard.as_ref() else {
            return Ok(None);
        };

        match self.sequence() {
            0 => Err(SessionError::StaleSession {
                session_id: session_id.clone(),
            }),
            seq => Ok(Some((session_id.clone(), seq))),
        }
    }

    /// Forget the session; the next handshake identifies
    pub fn clear(&self) {
        let previous = self.session_id.write().take();
        self.sequence.store(0, Ordering::Release);
        if let Some(session_id) = previous {
            tracing::debug!(session_id = %session_id, "Session cleared");
        }
    }
}
