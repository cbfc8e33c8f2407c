//! Bucket registry and response bookkeeping

use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use reqwest::header::HeaderMap;
use reqwest::StatusCode;
use serde_json::Value;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tokio::time::Instant;

use super::{Bucket, BucketKey, GlobalGate, RateLimitHeaders};

/// Exclusive access to one bucket for the duration of a request
pub type BucketGuard = OwnedMutexGuard<Bucket>;

/// What a response tells us about the next call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateLimitOutcome {
    /// Budget left, nothing to wait for
    Clear,
    /// The call succeeded but used the last slot; the next call waits
    Exhausted { reset_after: Duration },
    /// The server rejected the call with 429
    RateLimited { retry_after: Duration, global: bool },
}

/// Tracks every bucket seen so far plus the global gate
#[derive(Debug, Default)]
pub struct RateLimiter {
    buckets: DashMap<BucketKey, Arc<Mutex<Bucket>>>,
    global: Arc<GlobalGate>,
}

impl RateLimiter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Share an existing global gate
    pub fn with_global_gate(global: Arc<GlobalGate>) -> Self {
        Self {
            buckets: DashMap::new(),
            global,
        }
    }

    pub fn global_gate(&self) -> &Arc<GlobalGate> {
        &self.global
    }

    /// Lock the bucket and wait until a call may be dispatched.
    ///
    /// The returned guard serializes calls to the same bucket; hold it until the
    /// response has been recorded.
    pub async fn acquire(&self, key: &BucketKey) -> BucketGuard {
        let bucket = Arc::clone(&self.buckets.entry(key.clone()).or_default());
        let mut guard = bucket.lock_owned().await;

        if let Some(delay) = guard.cooldown(Instant::now()) {
            tracing::debug!(
                bucket = %key,
                delay_ms = delay.as_millis() as u64,
                "Bucket exhausted, waiting for reset"
            );
            tokio::time::sleep(delay).await;
        }
        guard.refill_if_elapsed(Instant::now());

        self.global.wait().await;
        guard
    }

    /// Feed a response into the bucket it was sent through
    pub fn record(
        &self,
        key: &BucketKey,
        bucket: &mut Bucket,
        status: StatusCode,
        headers: &HeaderMap,
        body: Option<&Value>,
    ) -> RateLimitOutcome {
        let meta = RateLimitHeaders::from_headers(headers);
        let now = Instant::now();

        if status == StatusCode::TOO_MANY_REQUESTS {
            let retry_after = meta
                .retry_after_with_body(body)
                .or_else(|| meta.reset_after())
                .unwrap_or(Duration::from_secs(1));
            let global = meta.is_global_with_body(body);

            bucket.is_global = global;
            if global {
                self.global.close_for(retry_after);
            } else {
                bucket.update(0, retry_after, now);
            }
            tracing::warn!(
                bucket = %key,
                global,
                retry_after_ms = retry_after.as_millis() as u64,
                "Rate limited"
            );
            return RateLimitOutcome::RateLimited {
                retry_after,
                global,
            };
        }

        let (Some(remaining), Some(reset_after)) = (meta.remaining, meta.reset_after()) else {
            return RateLimitOutcome::Clear;
        };
        bucket.update(remaining, reset_after, now);
        bucket.is_global = false;

        if remaining == 0 {
            tracing::debug!(
                bucket = %key,
                reset_after_ms = reset_after.as_millis() as u64,
                "Bucket exhausted by this call"
            );
            RateLimitOutcome::Exhausted { reset_after }
        } else {
            RateLimitOutcome::Clear
        }
    }

    /// Snapshot of a bucket's state
    pub async fn bucket(&self, key: &BucketKey) -> Option<Bucket> {
        let bucket = self.buckets.get(key).map(|b| Arc::clone(&b))?;
        let snapshot = bucket.lock().await.clone();
        Some(snapshot)
    }

    pub fn bucket_count(&self) -> usize {
        self.buckets.len()
    }
}
