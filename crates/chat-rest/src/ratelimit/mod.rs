//! Per-route rate limiting
//!
//! Buckets track the remaining budget of one (method, route) pair as reported
//! by the server. A 429 flagged as global closes the [`GlobalGate`], which
//! holds back every bucket until the outage's cooldown elapses.

mod bucket;
mod global;
mod headers;
mod limiter;

pub use bucket::{Bucket, BucketKey};
pub use global::GlobalGate;
pub use headers::RateLimitHeaders;
pub use limiter::{BucketGuard, RateLimitOutcome, RateLimiter};
