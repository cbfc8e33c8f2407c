//! Decoder table
//!
//! Maps normalized event names to the function that turns their payload
//! into an [`Event`].

use std::collections::HashMap;

use chat_rest::RestClient;
use serde_json::Value;

use super::event::{Event, Ready};
use super::model::Model;
use crate::error::DecodeError;

/// Decode function taking the raw payload and the REST handle
pub type DecodeFn = fn(Value, &RestClient) -> Result<Event, DecodeError>;

/// How one event name is decoded
#[derive(Clone, Copy)]
pub enum Decoder {
    /// Wrap the payload in a [`Model`] keyed by the id at `id_path`
    Model {
        id_path: &'static str,
        wrap: fn(Model) -> Event,
    },
    /// Arbitrary decode function
    Custom(DecodeFn),
    /// Deliver the payload unchanged as [`Event::Raw`]
    PassThrough,
}

impl Decoder {
    pub const fn model(id_path: &'static str, wrap: fn(Model) -> Event) -> Self {
        Self::Model { id_path, wrap }
    }

    pub fn decode(&self, name: &str, data: Value, rest: &RestClient) -> Result<Event, DecodeError> {
        match self {
            Self::Model { id_path, wrap } => Model::decode(data, id_path, rest).map(wrap),
            Self::Custom(decode) => decode(data, rest),
            Self::PassThrough => Ok(Event::Raw {
                name: name.to_string(),
                data,
            }),
        }
    }
}

impl std::fmt::Debug for Decoder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Model { id_path, .. } => f.debug_struct("Model").field("id_path", id_path).finish(),
            Self::Custom(_) => f.write_str("Custom"),
            Self::PassThrough => f.write_str("PassThrough"),
        }
    }
}

fn ready(data: Value, rest: &RestClient) -> Result<Event, DecodeError> {
    Ready::decode(data, rest).map(Event::Ready)
}

fn resumed(data: Value, _rest: &RestClient) -> Result<Event, DecodeError> {
    Ok(Event::Resumed(data))
}

/// Decoders for every event the client models
pub fn builtin_decoders() -> HashMap<String, Decoder> {
    let table: [(&str, Decoder); 29] = [
        ("ready", Decoder::Custom(ready)),
        ("resumed", Decoder::Custom(resumed)),
        ("channel_create", Decoder::model("id", Event::ChannelCreate)),
        ("channel_update", Decoder::model("id", Event::ChannelUpdate)),
        ("channel_delete", Decoder::model("id", Event::ChannelDelete)),
        ("channel_pins_update", Decoder::model("channel_id", Event::ChannelPinsUpdate)),
        ("guild_create", Decoder::model("id", Event::GuildCreate)),
        ("guild_update", Decoder::model("id", Event::GuildUpdate)),
        ("guild_ban_add", Decoder::model("user.id", Event::GuildBanAdd)),
        ("guild_ban_remove", Decoder::model("user.id", Event::GuildBanRemove)),
        ("guild_member_add", Decoder::model("user.id", Event::GuildMemberAdd)),
        ("guild_member_update", Decoder::model("user.id", Event::GuildMemberUpdate)),
        ("guild_member_remove", Decoder::model("user.id", Event::GuildMemberRemove)),
        ("guild_member_chunk", Decoder::PassThrough),
        ("guild_role_create", Decoder::model("role.id", Event::GuildRoleCreate)),
        ("guild_role_update", Decoder::model("role.id", Event::GuildRoleUpdate)),
        ("guild_role_delete", Decoder::model("role_id", Event::GuildRoleDelete)),
        ("message_create", Decoder::model("id", Event::MessageCreate)),
        ("message_update", Decoder::model("id", Event::MessageUpdate)),
        ("message_delete", Decoder::model("id", Event::MessageDelete)),
        ("message_reaction_add", Decoder::model("message_id", Event::MessageReactionAdd)),
        ("message_reaction_remove", Decoder::model("message_id", Event::MessageReactionRemove)),
        ("message_reaction_remove_all", Decoder::model("message_id", Event::MessageReactionRemoveAll)),
        ("presence_update", Decoder::model("user.id", Event::PresenceUpdate)),
        ("presences_replace", Decoder::PassThrough),
        ("typing_start", Decoder::model("user_id", Event::TypingStart)),
        ("voice_state_update", Decoder::model("user_id", Event::VoiceStateUpdate)),
        ("webhooks_update", Decoder::model("channel_id", Event::WebhooksUpdate)),
        ("user_update", Decoder::PassThrough),
    ];

    table
        .into_iter()
        .map(|(name, decoder)| (name.to_string(), decoder))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chat_common::ClientConfig;
    use chat_core::Snowflake;
    use serde_json::json;

    fn rest() -> RestClient {
        RestClient::new(&ClientConfig::new("token")).unwrap()
    }

    #[test]
    fn test_model_decoder_keys_by_path() {
        let decoders = builtin_decoders();
        let event = decoders["guild_member_add"]
            .decode("guild_member_add", json!({"guild_id": "1", "user": {"id": "2"}}), &rest())
            .unwrap();

        assert!(matches!(event, Event::GuildMemberAdd(_)));
        assert_eq!(event.id(), Some(Snowflake::new(2)));
    }

    #[test]
    fn test_pass_through_keeps_payload() {
        let event = Decoder::PassThrough
            .decode("presences_replace", json!([{"user": {"id": "1"}}]), &rest())
            .unwrap();
        match event {
            Event::Raw { name, data } => {
                assert_eq!(name, "presences_replace");
                assert_eq!(data[0]["user"]["id"], "1");
            }
            other => panic!("expected raw event, got {other:?}"),
        }
    }

    #[test]
    fn test_model_decoder_rejects_non_object() {
        let err = builtin_decoders()["message_create"]
            .decode("message_create", json!("oops"), &rest())
            .unwrap_err();
        assert_eq!(err, DecodeError::NotAnObject("string"));
    }

    #[test]
    fn test_table_names_are_normalized() {
        for name in builtin_decoders().keys() {
            assert_eq!(name, &name.to_ascii_lowercase());
        }
    }
}
