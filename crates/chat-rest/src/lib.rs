//! # chat-rest
//!
//! Rate-limited REST access to the chat API.
//!
//! ## Layers
//!
//! - **Routes**: method + path templates, compiled into a request path and a bucket key
//! - **Rate limiting**: per-bucket budgets learned from response headers, plus a global gate
//! - **Transport**: the [`HttpTransport`] seam, backed by `reqwest` in production
//! - **Executor**: one logical call with bounded retries on 429 and 5xx responses
//! - **Client**: typed endpoints on top of the executor
//!
//! ## Example
//!
//! ```ignore
//! use chat_common::ClientConfig;
//! use chat_rest::RestClient;
//!
//! let config = ClientConfig::from_env()?;
//! let rest = RestClient::new(&config)?;
//! let gateway = rest.get_gateway_bot().await?;
//! ```

pub mod client;
pub mod error;
pub mod executor;
pub mod ratelimit;
pub mod routes;
pub mod transport;

pub use client::RestClient;
pub use error::{RequestFailure, RestError, RestResult, TransportError};
pub use executor::{HttpExecutor, RequestOptions, ResponseBody};
pub use ratelimit::{Bucket, BucketKey, GlobalGate, RateLimitHeaders, RateLimitOutcome, RateLimiter};
pub use routes::{CompiledRoute, Route};
pub use transport::{HttpRequest, HttpResponse, HttpTransport, ReqwestTransport};
