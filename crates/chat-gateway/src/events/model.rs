//! Shared representation of decoded entities
//!
//! Every modeled event wraps the raw payload together with the REST handle,
//! so handlers can read fields directly or follow ids with a fetch.

use chat_core::Snowflake;
use chat_rest::{RestClient, RestResult};
use serde_json::Value;

use crate::error::DecodeError;

/// Raw entity payload plus the id it is keyed by
#[derive(Clone)]
pub struct Model {
    id: Option<Snowflake>,
    raw: Value,
    rest: RestClient,
}

impl Model {
    /// Wrap `raw`, reading the entity id from a dotted path such as `user.id`
    pub fn decode(raw: Value, id_path: &str, rest: &RestClient) -> Result<Self, DecodeError> {
        if !raw.is_object() {
            return Err(DecodeError::NotAnObject(json_type(&raw)));
        }
        let id = lookup(&raw, id_path).and_then(Snowflake::from_value);
        Ok(Self {
            id,
            raw,
            rest: rest.clone(),
        })
    }

    pub fn id(&self) -> Option<Snowflake> {
        self.id
    }

    pub fn raw(&self) -> &Value {
        &self.raw
    }

    pub fn into_raw(self) -> Value {
        self.raw
    }

    pub fn rest(&self) -> &RestClient {
        &self.rest
    }

    /// Field at a dotted path
    pub fn get(&self, path: &str) -> Option<&Value> {
        lookup(&self.raw, path)
    }

    pub fn str(&self, path: &str) -> Option<&str> {
        self.get(path).and_then(Value::as_str)
    }

    pub fn snowflake(&self, path: &str) -> Option<Snowflake> {
        self.get(path).and_then(Snowflake::from_value)
    }

    pub fn channel_id(&self) -> Option<Snowflake> {
        self.snowflake("channel_id")
    }

    pub fn guild_id(&self) -> Option<Snowflake> {
        self.snowflake("guild_id")
    }

    /// Fetch the channel this payload refers to; `None` if it carries no `channel_id`
    pub async fn fetch_channel(&self) -> RestResult<Option<Value>> {
        match self.channel_id() {
            Some(channel_id) => self.rest.get_channel(channel_id).await.map(Some),
            None => Ok(None),
        }
    }

    /// Fetch the guild this payload refers to; `None` if it carries no `guild_id`
    pub async fn fetch_guild(&self) -> RestResult<Option<Value>> {
        match self.guild_id() {
            Some(guild_id) => self.rest.get_guild(guild_id).await.map(Some),
            None => Ok(None),
        }
    }
}

impl std::fmt::Debug for Model {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Model")
            .field("id", &self.id)
            .field("raw", &self.raw)
            .finish()
    }
}

fn lookup<'a>(value: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.').try_fold(value, |current, key| current.get(key))
}

pub(crate) fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
