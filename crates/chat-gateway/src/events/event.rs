//! Decoded dispatch events

use chat_core::{ShardInfo, Snowflake};
use chat_rest::RestClient;
use serde_json::Value;

use super::model::Model;
use crate::error::DecodeError;
use crate::protocol::ReadyPayload;

/// Contents of the READY dispatch
#[derive(Debug, Clone)]
pub struct Ready {
    pub version: u8,
    pub session_id: String,
    /// The current user
    pub user: Model,
    /// Guilds, usually unavailable stubs at this point
    pub guilds: Vec<Value>,
    pub shard: Option<ShardInfo>,
    pub trace: Vec<String>,
}

impl Ready {
    pub fn decode(raw: Value, rest: &RestClient) -> Result<Self, DecodeError> {
        let payload: ReadyPayload =
            serde_json::from_value(raw).map_err(|e| DecodeError::InvalidField {
                field: "ready",
                reason: e.to_string(),
            })?;

        Ok(Self {
            version: payload.version,
            session_id: payload.session_id,
            user: Model::decode(payload.user, "id", rest)?,
            guilds: payload.guilds,
            shard: payload.shard,
            trace: payload.trace,
        })
    }
}

/// One variant per event kind the client understands
#[derive(Debug, Clone)]
pub enum Event {
    Ready(Ready),
    Resumed(Value),

    ChannelCreate(Model),
    ChannelUpdate(Model),
    ChannelDelete(Model),
    ChannelPinsUpdate(Model),

    GuildCreate(Model),
    GuildUpdate(Model),
    GuildBanAdd(Model),
    GuildBanRemove(Model),
    GuildMemberAdd(Model),
    GuildMemberUpdate(Model),
    GuildMemberRemove(Model),
    GuildRoleCreate(Model),
    GuildRoleUpdate(Model),
    GuildRoleDelete(Model),

    MessageCreate(Model),
    MessageUpdate(Model),
    MessageDelete(Model),
    MessageReactionAdd(Model),
    MessageReactionRemove(Model),
    MessageReactionRemoveAll(Model),

    PresenceUpdate(Model),
    TypingStart(Model),
    VoiceStateUpdate(Model),
    WebhooksUpdate(Model),

    /// Payload delivered as received
    Raw { name: String, data: Value },
}

impl Event {
    /// Normalized event name this value is delivered under
    pub fn name(&self) -> &str {
        match self {
            Self::Ready(_) => "ready",
            Self::Resumed(_) => "resumed",
            Self::ChannelCreate(_) => "channel_create",
            Self::ChannelUpdate(_) => "channel_update",
            Self::ChannelDelete(_) => "channel_delete",
            Self::ChannelPinsUpdate(_) => "channel_pins_update",
            Self::GuildCreate(_) => "guild_create",
            Self::GuildUpdate(_) => "guild_update",
            Self::GuildBanAdd(_) => "guild_ban_add",
            Self::GuildBanRemove(_) => "guild_ban_remove",
            Self::GuildMemberAdd(_) => "guild_member_add",
            Self::GuildMemberUpdate(_) => "guild_member_update",
            Self::GuildMemberRemove(_) => "guild_member_remove",
            Self::GuildRoleCreate(_) => "guild_role_create",
            Self::GuildRoleUpdate(_) => "guild_role_update",
            Self::GuildRoleDelete(_) => "guild_role_delete",
            Self::MessageCreate(_) => "message_create",
            Self::MessageUpdate(_) => "message_update",
            Self::MessageDelete(_) => "message_delete",
            Self::MessageReactionAdd(_) => "message_reaction_add",
            Self::MessageReactionRemove(_) => "message_reaction_remove",
            Self::MessageReactionRemoveAll(_) => "message_reaction_remove_all",
            Self::PresenceUpdate(_) => "presence_update",
            Self::TypingStart(_) => "typing_start",
            Self::VoiceStateUpdate(_) => "voice_state_update",
            Self::WebhooksUpdate(_) => "webhooks_update",
            Self::Raw { name, .. } => name,
        }
    }

    /// The wrapped entity, for modeled events
    pub fn model(&self) -> Option<&Model> {
        match self {
            Self::Ready(ready) => Some(&ready.user),
            Self::Resumed(_) | Self::Raw { .. } => None,
            Self::ChannelCreate(m)
            | Self::ChannelUpdate(m)
            | Self::ChannelDelete(m)
            | Self::ChannelPinsUpdate(m)
            | Self::GuildCreate(m)
            | Self::GuildUpdate(m)
            | Self::GuildBanAdd(m)
            | Self::GuildBanRemove(m)
            | Self::GuildMemberAdd(m)
            | Self::GuildMemberUpdate(m)
            | Self::GuildMemberRemove(m)
            | Self::GuildRoleCreate(m)
            | Self::GuildRoleUpdate(m)
            | Self::GuildRoleDelete(m)
            | Self::MessageCreate(m)
            | Self::MessageUpdate(m)
            | Self::MessageDelete(m)
            | Self::MessageReactionAdd(m)
            | Self::MessageReactionRemove(m)
            | Self::MessageReactionRemoveAll(m)
            | Self::PresenceUpdate(m)
            | Self::TypingStart(m)
            | Self::VoiceStateUpdate(m)
            | Self::WebhooksUpdate(m) => Some(m),
        }
    }

    /// Id of the wrapped entity
    pub fn id(&self) -> Option<Snowflake> {
        self.model().and_then(Model::id)
    }

    /// Raw payload as received
    pub fn raw(&self) -> Option<&Value> {
        match self {
            Self::Resumed(data) | Self::Raw { data, .. } => Some(data),
            Self::Ready(_) => None,
            other => other.model().map(Model::raw),
        }
    }
}
