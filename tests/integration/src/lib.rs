//! Integration test utilities for the chat client
//!
//! This crate provides an in-process fake gateway and a mocked REST API so
//! the client can be exercised end to end without network access.

pub mod fixtures;
pub mod helpers;

pub use fixtures::*;
pub use helpers::*;
