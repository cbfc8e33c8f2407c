//! Rate-limit buckets

use std::fmt;
use std::time::Duration;

use reqwest::Method;
use tokio::time::Instant;

/// Identity of a bucket: method plus the route with major parameters filled in
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BucketKey {
    method: Method,
    path: String,
}

impl BucketKey {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
        }
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn path(&self) -> &str {
        &self.path
    }
}

impl fmt::Display for BucketKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.method, self.path)
    }
}

/// Budget state of one bucket
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Bucket {
    /// Calls left in the current window; `None` until the server reports it
    pub remaining: Option<u32>,
    /// Time left in the window when it was last observed
    pub reset_after: Duration,
    /// When the window refills
    pub reset_at: Option<Instant>,
    /// Whether the last limit applied account-wide
    pub is_global: bool,
}

impl Bucket {
    /// How long the next call must wait, if the budget is exhausted
    pub fn cooldown(&self, now: Instant) -> Option<Duration> {
        if self.remaining != Some(0) {
            return None;
        }
        self.reset_at
            .filter(|reset_at| *reset_at > now)
            .map(|reset_at| reset_at - now)
    }

    /// Record the server's view of this bucket
    pub fn update(&mut self, remaining: u32, reset_after: Duration, now: Instant) {
        self.remaining = Some(remaining);
        self.reset_after = reset_after;
        self.reset_at = Some(now + reset_after);
    }

    /// Forget the exhausted window once it has passed
    pub fn refill_if_elapsed(&mut self, now: Instant) {
        if self.reset_at.is_some_and(|reset_at| reset_at <= now) {
            self.remaining = None;
            self.reset_at = None;
            self.is_global = false;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_cooldown_while_budget_left() {
        let now = Instant::now();
        let mut bucket = Bucket::default();
        assert_eq!(bucket.cooldown(now), None);

        bucket.update(3, Duration::from_secs(2), now);
        assert_eq!(bucket.cooldown(now), None);
    }

    #[test]
    fn test_cooldown_when_exhausted() {
        let now = Instant::now();
        let mut bucket = Bucket::default();
        bucket.update(0, Duration::from_secs(2), now);

        assert_eq!(bucket.cooldown(now), Some(Duration::from_secs(2)));
        assert_eq!(
            bucket.cooldown(now + Duration::from_millis(500)),
            Some(Duration::from_millis(1500))
        );
        assert_eq!(bucket.cooldown(now + Duration::from_secs(3)), None);
    }

    #[test]
    fn test_refill_after_window() {
        let now = Instant::now();
        let mut bucket = Bucket::default();
        bucket.update(0, Duration::from_secs(1), now);

        bucket.refill_if_elapsed(now);
        assert_eq!(bucket.remaining, Some(0));

        bucket.refill_if_elapsed(now + Duration::from_secs(1));
        assert_eq!(bucket.remaining, None);
    }

    #[test]
    fn test_key_display() {
        let key = BucketKey::new(Method::DELETE, "/channels/1/messages/{message}");
        assert_eq!(key.to_string(), "DELETE /channels/1/messages/{message}");
    }
}
