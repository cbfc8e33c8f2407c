//! REST error types

use std::collections::BTreeMap;
use std::fmt;

use reqwest::StatusCode;
use serde_json::Value;

use crate::executor::ResponseBody;
use crate::ratelimit::BucketKey;

/// Result alias for REST calls
pub type RestResult<T> = Result<T, RestError>;

/// Errors raised by the REST layer
#[derive(Debug, thiserror::Error)]
pub enum RestError {
    /// The API answered with a non-success status
    #[error("{0}")]
    RequestFailed(Box<RequestFailure>),

    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("Missing route parameter: {0}")]
    MissingParameter(String),

    #[error("Failed to decode response: {0}")]
    Decode(#[from] serde_json::Error),
}

impl RestError {
    /// HTTP status of a failed request
    pub fn status(&self) -> Option<StatusCode> {
        self.failure().map(|f| f.status)
    }

    /// Service-defined error code from the response body
    pub fn code(&self) -> Option<i64> {
        self.failure().and_then(|f| f.code)
    }

    /// Human readable message from the response body
    pub fn message(&self) -> Option<&str> {
        self.failure().map(|f| f.message.as_str())
    }

    /// Field path to validation messages
    pub fn field_errors(&self) -> Option<&BTreeMap<String, Vec<String>>> {
        self.failure().map(|f| &f.field_errors)
    }

    /// Number of retries spent before giving up
    pub fn retries(&self) -> Option<u32> {
        self.failure().and_then(|f| f.retries)
    }

    /// Whether the failure was transient (429 or 5xx)
    pub fn is_retryable(&self) -> bool {
        self.status()
            .is_some_and(|s| s == StatusCode::TOO_MANY_REQUESTS || s.is_server_error())
    }

    pub fn failure(&self) -> Option<&RequestFailure> {
        match self {
            Self::RequestFailed(failure) => Some(failure),
            _ => None,
        }
    }
}

/// Everything known about a failed request
#[derive(Debug, Clone)]
pub struct RequestFailure {
    pub status: StatusCode,
    pub bucket: BucketKey,
    pub code: Option<i64>,
    pub message: String,
    pub field_errors: BTreeMap<String, Vec<String>>,
    /// Set when the retry budget ran out
    pub retries: Option<u32>,
    pub body: ResponseBody,
}

impl RequestFailure {
    /// Build a failure from the response status and parsed body
    pub fn new(status: StatusCode, bucket: BucketKey, body: ResponseBody) -> Self {
        let (code, message, field_errors) = match &body {
            ResponseBody::Json(value) => (
                value.get("code").and_then(Value::as_i64),
                value
                    .get("message")
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string(),
                value.get("errors").map(flatten_field_errors).unwrap_or_default(),
            ),
            ResponseBody::Raw(bytes) => (
                None,
                String::from_utf8_lossy(bytes).into_owned(),
                BTreeMap::new(),
            ),
        };

        Self {
            status,
            bucket,
            code,
            message,
            field_errors,
            retries: None,
            body,
        }
    }

    #[must_use]
    pub fn with_retries(mut self, retries: u32) -> Self {
        self.retries = Some(retries);
        self
    }
}

impl fmt::Display for RequestFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Request to {} failed with code {} (HTTP {}): {}",
            self.bucket,
            self.code.unwrap_or(0),
            self.status.as_u16(),
            self.message
        )?;
        if let Some(retries) = self.retries {
            write!(f, " after {retries} retries")?;
        }
        for (field, errors) in &self.field_errors {
            write!(f, "\n{field}: {}", errors.join(", "))?;
        }
        Ok(())
    }
}

impl From<RequestFailure> for RestError {
    fn from(failure: RequestFailure) -> Self {
        Self::RequestFailed(Box::new(failure))
    }
}

/// Flatten the nested `errors` object of an error body into `path -> messages`.
///
/// Handles both `{"field": {"_errors": [{"message": ..}]}}` and `{"field": ["message"]}`.
fn flatten_field_errors(errors: &Value) -> BTreeMap<String, Vec<String>> {
    fn walk(path: &str, value: &Value, out: &mut BTreeMap<String, Vec<String>>) {
        match value {
            Value::Object(map) => {
                for (key, child) in map {
                    if key == "_errors" {
                        walk(path, child, out);
                    } else if path.is_empty() {
                        walk(key, child, out);
                    } else {
                        walk(&format!("{path}.{key}"), child, out);
                    }
                }
            }
            Value::Array(items) => {
                for item in items {
                    let message = match item {
                        Value::String(s) => s.clone(),
                        Value::Object(obj) => match obj.get("message").and_then(Value::as_str) {
                            Some(m) => m.to_string(),
                            None => {
                                walk(path, item, out);
                                continue;
                            }
                        },
                        other => other.to_string(),
                    };
                    out.entry(path.to_string()).or_default().push(message);
                }
            }
            Value::String(s) => out.entry(path.to_string()).or_default().push(s.clone()),
            _ => {}
        }
    }

    let mut out = BTreeMap::new();
    walk("", errors, &mut out);
    out
}

/// Failure below the HTTP layer (connect, timeout, body read)
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("Transport closed: {0}")]
    Closed(String),
}
