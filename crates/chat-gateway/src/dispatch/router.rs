//! Event name routing

use std::collections::HashMap;

use chat_common::UnknownEventPolicy;
use chat_rest::RestClient;
use serde_json::Value;

use crate::error::DispatchError;
use crate::events::{builtin_decoders, Decoder, Event};

/// Lower-cased form every event name is matched under
pub fn normalize(name: &str) -> String {
    name.to_ascii_lowercase()
}

/// Maps event names to decoders.
///
/// Built once at startup and shared read-only afterwards.
pub struct DispatchRouter {
    decoders: HashMap<String, Decoder>,
    policy: UnknownEventPolicy,
    rest: RestClient,
}

impl DispatchRouter {
    /// Router with every built-in decoder registered
    pub fn new(rest: RestClient, policy: UnknownEventPolicy) -> Self {
        Self {
            decoders: builtin_decoders(),
            policy,
            rest,
        }
    }

    /// Router with no decoders at all
    pub fn empty(rest: RestClient, policy: UnknownEventPolicy) -> Self {
        Self {
            decoders: HashMap::new(),
            policy,
            rest,
        }
    }

    /// Add or replace the decoder for `name`
    pub fn register(&mut self, name: &str, decoder: Decoder) -> Option<Decoder> {
        self.decoders.insert(normalize(name), decoder)
    }

    pub fn policy(&self) -> UnknownEventPolicy {
        self.policy
    }

    pub fn contains(&self, name: &str) -> bool {
        self.decoders.contains_key(&normalize(name))
    }

    /// Strict lookup, failing for names without a decoder
    pub fn lookup(&self, name: &str) -> Result<&Decoder, DispatchError> {
        self.decoders
            .get(&normalize(name))
            .ok_or_else(|| DispatchError::UnknownEvent(normalize(name)))
    }

    /// Decode a dispatch, applying the unknown event policy.
    ///
    /// `Ok(None)` means the dispatch was deliberately dropped.
    pub fn route(&self, name: &str, data: Value) -> Result<Option<Event>, DispatchError> {
        let name = normalize(name);
        let decoder = match self.lookup(&name) {
            Ok(decoder) => decoder,
            Err(err) => {
                return match self.policy {
                    UnknownEventPolicy::Strict => Err(err),
                    UnknownEventPolicy::PassThrough => {
                        tracing::debug!(event = %name, "No decoder registered, passing through");
                        Ok(Some(Event::Raw { name, data }))
                    }
                    UnknownEventPolicy::Ignore => {
                        tracing::debug!(event = %name, "No decoder registered, ignoring");
                        Ok(None)
                    }
                };
            }
        };

        decoder
            .decode(&name, data, &self.rest)
            .map(Some)
            .map_err(|e| DispatchError::Malformed {
                event: name,
                reason: e.to_string(),
            })
    }
}

impl std::fmt::Debug for DispatchRouter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DispatchRouter")
            .field("decoders", &self.decoders.len())
            .field("policy", &self.policy)
            .finish()
    }
}
