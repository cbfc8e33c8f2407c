//! Rate-limit response metadata

use std::time::Duration;

use chrono::{DateTime, Utc};
use reqwest::header::{HeaderMap, DATE, RETRY_AFTER};
use serde_json::Value;

/// Extra time added to every computed reset
const RESET_PADDING_MS: i64 = 200;

pub const REMAINING_HEADER: &str = "x-ratelimit-remaining";
pub const RESET_HEADER: &str = "x-ratelimit-reset";
pub const GLOBAL_HEADER: &str = "x-ratelimit-global";

/// Rate-limit fields of one response
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RateLimitHeaders {
    pub remaining: Option<u32>,
    /// Epoch seconds at which the bucket refills (server clock)
    pub reset: Option<f64>,
    /// Server's `Date` header
    pub date: Option<DateTime<Utc>>,
    pub global: bool,
    /// `Retry-After` header
    pub retry_after: Option<Duration>,
}

impl RateLimitHeaders {
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let text = |name: &str| headers.get(name).and_then(|v| v.to_str().ok());

        Self {
            remaining: text(REMAINING_HEADER).and_then(|v| v.trim().parse().ok()),
            reset: text(RESET_HEADER).and_then(|v| v.trim().parse().ok()),
            date: headers
                .get(DATE)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| DateTime::parse_from_rfc2822(v).ok())
                .map(|d| d.with_timezone(&Utc)),
            global: text(GLOBAL_HEADER).is_some_and(|v| v.eq_ignore_ascii_case("true")),
            retry_after: headers
                .get(RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.trim().parse::<f64>().ok())
                .filter(|secs| secs.is_finite() && *secs >= 0.0)
                .map(Duration::from_secs_f64),
        }
    }

    /// Time until the bucket refills, measured on the server clock.
    ///
    /// Falls back to the local clock only when the response has no `Date`.
    pub fn reset_after(&self) -> Option<Duration> {
        let reset = self.reset?;
        let date = self.date.unwrap_or_else(Utc::now);
        let millis = (reset * 1000.0) as i64 - date.timestamp_millis() + RESET_PADDING_MS;
        Some(Duration::from_millis(millis.max(0) as u64))
    }

    /// Cooldown announced by a 429: body `retry_after` (ms) wins over the header
    pub fn retry_after_with_body(&self, body: Option<&Value>) -> Option<Duration> {
        body.and_then(|b| b.get("retry_after"))
            .and_then(Value::as_f64)
            .filter(|ms| ms.is_finite() && *ms >= 0.0)
            .map(|ms| Duration::from_secs_f64(ms / 1000.0))
            .or(self.retry_after)
    }

    /// Whether a 429 applies account-wide
    pub fn is_global_with_body(&self, body: Option<&Value>) -> bool {
        self.global
            || body
                .and_then(|b| b.get("global"))
                .and_then(Value::as_bool)
                .unwrap_or(false)
    }
}
