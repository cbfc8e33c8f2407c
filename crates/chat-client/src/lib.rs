//! # chat-client
//!
//! The owning client: resolves connection parameters over REST, then runs a
//! gateway connection whose dispatches reach the registered handlers.
//!
//! ## Example
//!
//! ```ignore
//! use chat_client::Client;
//! use chat_common::ClientConfig;
//!
//! let client = Client::connect(ClientConfig::from_env()?).await?;
//! client.on("message", |event| async move {
//!     tracing::info!(id = ?event.id(), "Message received");
//!     Ok(())
//! });
//! client.run().await?;
//! ```

pub mod aliases;
pub mod client;
pub mod error;

pub use aliases::default_aliases;
pub use client::{Client, ClientBuilder};
pub use error::{ClientError, ClientResult};
