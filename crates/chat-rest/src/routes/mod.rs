//! API routes and their rate-limit buckets

mod endpoints;
mod route;

pub use endpoints::*;
pub use route::{CompiledRoute, Route, MAJOR_PARAMETERS};
pub(crate) use route::encode_component;
