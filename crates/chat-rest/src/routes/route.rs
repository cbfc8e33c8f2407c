//! Route templates.
//!
//! A route is an HTTP method plus a path template such as
//! `/channels/{channel}/messages/{message}`. Compiling a route with its
//! parameters yields the request path and the bucket key used for rate limiting.

use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use reqwest::Method;

use crate::error::{RestError, RestResult};
use crate::ratelimit::BucketKey;

/// Parameters that get their own rate-limit bucket per value
pub const MAJOR_PARAMETERS: &[&str] = &["channel", "guild", "webhook"];

/// Everything but RFC 3986 unreserved characters
const COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

/// Percent-encode `value` for a path segment or header; spaces become `%20`
pub(crate) fn encode_component(value: &str) -> String {
    utf8_percent_encode(value, COMPONENT).to_string()
}

/// HTTP method and path template
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Route {
    pub method: Method,
    pub template: &'static str,
}

/// Route with all parameters substituted
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledRoute {
    pub method: Method,
    pub path: String,
    pub bucket: BucketKey,
}

impl Route {
    pub const fn new(method: Method, template: &'static str) -> Self {
        Self { method, template }
    }

    /// Substitute `params` into the template.
    ///
    /// Every placeholder must have a value. Only major parameters are
    /// substituted into the bucket key; the rest stay templated so that all
    /// resources under one channel or guild share a bucket.
    pub fn compile(&self, params: &[(&str, &str)]) -> RestResult<CompiledRoute> {
        let mut path = String::with_capacity(self.template.len() + 16);
        let mut bucket = String::with_capacity(self.template.len() + 16);
        let mut rest = self.template;

        while let Some(start) = rest.find('{') {
            let Some(len) = rest[start..].find('}') else {
                break;
            };
            let name = &rest[start + 1..start + len];
            path.push_str(&rest[..start]);
            bucket.push_str(&rest[..start]);

            let value = params
                .iter()
                .find(|(key, _)| *key == name)
                .map(|(_, value)| *value)
                .ok_or_else(|| RestError::MissingParameter(name.to_string()))?;
            let encoded = encode_component(value);

            path.push_str(&encoded);
            if MAJOR_PARAMETERS.contains(&name) {
                bucket.push_str(&encoded);
            } else {
                bucket.push_str(&rest[start..=start + len]);
            }
            rest = &rest[start + len + 1..];
        }
        path.push_str(rest);
        bucket.push_str(rest);

        Ok(CompiledRoute {
            method: self.method.clone(),
            path,
            bucket: BucketKey::new(self.method.clone(), bucket),
        })
    }
}
