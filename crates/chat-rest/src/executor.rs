//! One logical REST call: rate limiting, dispatch, classification, retries

use std::sync::Arc;
use std::time::Duration;

use rand::Rng;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::StatusCode;
use serde_json::Value;

use chat_common::ClientConfig;

use crate::error::{RequestFailure, RestResult, TransportError};
use crate::ratelimit::{RateLimitOutcome, RateLimiter};
use crate::routes::{encode_component, Route};
use crate::transport::{HttpRequest, HttpResponse, HttpTransport};

const AUDIT_LOG_REASON: &str = "x-audit-log-reason";

/// Parsed response body
#[derive(Debug, Clone, PartialEq)]
pub enum ResponseBody {
    Json(Value),
    Raw(Vec<u8>),
}

impl ResponseBody {
    /// Parse according to the response content type
    pub fn parse(response: &HttpResponse) -> Self {
        let is_json = response
            .headers
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|ct| ct.starts_with("application/json"));

        if is_json {
            if let Ok(value) = serde_json::from_slice(&response.body) {
                return Self::Json(value);
            }
        }
        Self::Raw(response.body.clone())
    }

    pub fn as_json(&self) -> Option<&Value> {
        match self {
            Self::Json(value) => Some(value),
            Self::Raw(_) => None,
        }
    }

    /// JSON value of the body; empty and non-JSON bodies become `null`
    pub fn into_json(self) -> Value {
        match self {
            Self::Json(value) => value,
            Self::Raw(_) => Value::Null,
        }
    }
}

/// Per-call options
#[derive(Debug, Clone, Default)]
pub struct RequestOptions {
    pub body: Option<Value>,
    pub query: Vec<(String, String)>,
    pub headers: HeaderMap,
    /// Audit log reason
    pub reason: Option<String>,
}

impl RequestOptions {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn json(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    #[must_use]
    pub fn query(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.query.push((key.into(), value.to_string()));
        self
    }

    #[must_use]
    pub fn reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    #[must_use]
    pub fn header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }
}

/// Executes REST calls against a transport with per-bucket rate limiting
pub struct HttpExecutor {
    transport: Arc<dyn HttpTransport>,
    limiter: Arc<RateLimiter>,
    base_url: String,
    authorization: Option<HeaderValue>,
    max_retries: u32,
    backoff_ms: (u64, u64),
}

impl HttpExecutor {
    pub fn new(
        transport: Arc<dyn HttpTransport>,
        limiter: Arc<RateLimiter>,
        base_url: impl Into<String>,
    ) -> Self {
        Self {
            transport,
            limiter,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            authorization: None,
            max_retries: 5,
            backoff_ms: (100, 5000),
        }
    }

    /// Build an executor using the REST and auth sections of the config
    pub fn from_config(
        config: &ClientConfig,
        transport: Arc<dyn HttpTransport>,
        limiter: Arc<RateLimiter>,
    ) -> Self {
        let mut executor = Self::new(transport, limiter, config.rest.base_url.clone())
            .with_max_retries(config.rest.max_retries)
            .with_backoff(
                Duration::from_millis(config.rest.retry_backoff_min_ms),
                Duration::from_millis(config.rest.retry_backoff_max_ms),
            );
        match HeaderValue::from_str(&config.auth.authorization()) {
            Ok(mut value) => {
                value.set_sensitive(true);
                executor.authorization = Some(value);
            }
            Err(_) => tracing::warn!("Token contains characters not allowed in a header"),
        }
        executor
    }

    #[must_use]
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    #[must_use]
    pub fn with_backoff(mut self, min: Duration, max: Duration) -> Self {
        let min = min.as_millis() as u64;
        self.backoff_ms = (min, (max.as_millis() as u64).max(min));
        self
    }

    pub fn limiter(&self) -> &Arc<RateLimiter> {
        &self.limiter
    }

    /// Perform one logical call.
    ///
    /// 2xx returns the parsed body. 4xx other than 429 fails immediately.
    /// 429 and 5xx are retried after the server's cooldown (or a random backoff)
    /// until `max_retries` is exceeded. Transport failures are not retried.
    pub async fn execute(
        &self,
        route: &Route,
        params: &[(&str, &str)],
        options: RequestOptions,
    ) -> RestResult<ResponseBody> {
        let compiled = route.compile(params)?;
        let request = self.build_request(&compiled.method, &compiled.path, options)?;
        let bucket_key = compiled.bucket;
        let mut retries: u32 = 0;

        loop {
            let mut bucket = self.limiter.acquire(&bucket_key).await;

            tracing::trace!(bucket = %bucket_key, attempt = retries + 1, "Sending request");
            let response = self.transport.send(request.clone()).await?;
            let body = ResponseBody::parse(&response);
            let outcome = self.limiter.record(
                &bucket_key,
                &mut bucket,
                response.status,
                &response.headers,
                body.as_json(),
            );
            drop(bucket);

            let status = response.status;
            if status.is_success() {
                tracing::debug!(bucket = %bucket_key, status = status.as_u16(), "Request succeeded");
                return Ok(body);
            }

            if status.is_client_error() && status != StatusCode::TOO_MANY_REQUESTS {
                tracing::debug!(bucket = %bucket_key, status = status.as_u16(), "Request rejected");
                return Err(RequestFailure::new(status, bucket_key, body).into());
            }

            retries += 1;
            if retries > self.max_retries {
                tracing::warn!(
                    bucket = %bucket_key,
                    status = status.as_u16(),
                    retries = self.max_retries,
                    "Retry budget exhausted"
                );
                return Err(RequestFailure::new(status, bucket_key, body)
                    .with_retries(self.max_retries)
                    .into());
            }

            match outcome {
                // The cooldown is enforced by the next acquire
                RateLimitOutcome::RateLimited { retry_after, .. } => {
                    tracing::warn!(
                        bucket = %bucket_key,
                        attempt = retries,
                        retry_after_ms = retry_after.as_millis() as u64,
                        "Rate limited, retrying"
                    );
                }
                RateLimitOutcome::Exhausted { .. } | RateLimitOutcome::Clear => {
                    let backoff = self.backoff();
                    tracing::warn!(
                        bucket = %bucket_key,
                        status = status.as_u16(),
                        attempt = retries,
                        backoff_ms = backoff.as_millis() as u64,
                        "Server error, retrying"
                    );
                    tokio::time::sleep(backoff).await;
                }
            }
        }
    }

    fn build_request(
        &self,
        method: &reqwest::Method,
        path: &str,
        options: RequestOptions,
    ) -> Result<HttpRequest, TransportError> {
        let mut url = url::Url::parse(&format!("{}{path}", self.base_url))?;
        if !options.query.is_empty() {
            url.query_pairs_mut().extend_pairs(&options.query);
        }

        let mut headers = options.headers;
        if let Some(auth) = &self.authorization {
            headers.insert(AUTHORIZATION, auth.clone());
        }
        if let Some(reason) = options.reason {
            if let Ok(value) = HeaderValue::from_str(&encode_component(&reason)) {
                headers.insert(AUDIT_LOG_REASON, value);
            }
        }

        Ok(HttpRequest {
            method: method.clone(),
            url: url.into(),
            headers,
            body: options.body,
        })
    }

    fn backoff(&self) -> Duration {
        let (min, max) = self.backoff_ms;
        Duration::from_millis(rand::thread_rng().gen_range(min..=max))
    }
}
