//! Typed REST endpoints

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde_json::{json, Value};

use chat_common::ClientConfig;
use chat_core::{GatewayBot, GatewayInfo, Snowflake};

use crate::error::RestResult;
use crate::executor::{HttpExecutor, RequestOptions};
use crate::ratelimit::{GlobalGate, RateLimiter};
use crate::routes::{self, Route};
use crate::transport::{HttpTransport, ReqwestTransport};

/// Cheaply cloneable handle to the REST API
#[derive(Clone)]
pub struct RestClient {
    executor: Arc<HttpExecutor>,
}

impl RestClient {
    /// Build a client backed by `reqwest`
    pub fn new(config: &ClientConfig) -> RestResult<Self> {
        let transport = ReqwestTransport::new(&user_agent(config), config.rest.timeout())?;
        Ok(Self::with_transport(config, Arc::new(transport)))
    }

    /// Build a client over any transport
    pub fn with_transport(config: &ClientConfig, transport: Arc<dyn HttpTransport>) -> Self {
        let limiter = Arc::new(RateLimiter::new());
        Self::from_executor(HttpExecutor::from_config(config, transport, limiter))
    }

    pub fn from_executor(executor: HttpExecutor) -> Self {
        Self {
            executor: Arc::new(executor),
        }
    }

    pub fn executor(&self) -> &HttpExecutor {
        &self.executor
    }

    /// Gate shared with the gateway's outbound control frames
    pub fn global_gate(&self) -> Arc<GlobalGate> {
        Arc::clone(self.executor.limiter().global_gate())
    }

    /// Call any route and return the JSON body (`null` when empty)
    pub async fn request(
        &self,
        route: &Route,
        params: &[(&str, &str)],
        options: RequestOptions,
    ) -> RestResult<Value> {
        Ok(self.executor.execute(route, params, options).await?.into_json())
    }

    async fn request_typed<T: DeserializeOwned>(
        &self,
        route: &Route,
        params: &[(&str, &str)],
        options: RequestOptions,
    ) -> RestResult<T> {
        let value = self.request(route, params, options).await?;
        Ok(serde_json::from_value(value)?)
    }

    // =========================================================================
    // Gateway
    // =========================================================================

    pub async fn get_gateway(&self) -> RestResult<GatewayInfo> {
        self.request_typed(&routes::GET_GATEWAY, &[], RequestOptions::new())
            .await
    }

    /// Gateway URL, recommended shard count and session start limit
    pub async fn get_gateway_bot(&self) -> RestResult<GatewayBot> {
        self.request_typed(&routes::GET_GATEWAY_BOT, &[], RequestOptions::new())
            .await
    }

    // =========================================================================
    // Channels and messages
    // =========================================================================

    pub async fn get_channel(&self, channel_id: Snowflake) -> RestResult<Value> {
        let channel = channel_id.to_string();
        self.request(&routes::GET_CHANNEL, &[("channel", &channel)], RequestOptions::new())
            .await
    }

    pub async fn get_channel_messages(
        &self,
        channel_id: Snowflake,
        limit: Option<u8>,
    ) -> RestResult<Value> {
        let channel = channel_id.to_string();
        let mut options = RequestOptions::new();
        if let Some(limit) = limit {
            options = options.query("limit", limit.clamp(1, 100));
        }
        self.request(&routes::GET_CHANNEL_MESSAGES, &[("channel", &channel)], options)
            .await
    }

    pub async fn get_message(&self, channel_id: Snowflake, message_id: Snowflake) -> RestResult<Value> {
        let (channel, message) = (channel_id.to_string(), message_id.to_string());
        self.request(
            &routes::GET_CHANNEL_MESSAGE,
            &[("channel", &channel), ("message", &message)],
            RequestOptions::new(),
        )
        .await
    }

    pub async fn create_message(
        &self,
        channel_id: Snowflake,
        content: impl Into<String>,
    ) -> RestResult<Value> {
        self.create_message_with(channel_id, json!({ "content": content.into() }))
            .await
    }

    /// Send a message with a full payload (embeds, tts, nonce)
    pub async fn create_message_with(&self, channel_id: Snowflake, payload: Value) -> RestResult<Value> {
        let channel = channel_id.to_string();
        self.request(
            &routes::CREATE_MESSAGE,
            &[("channel", &channel)],
            RequestOptions::new().json(payload),
        )
        .await
    }

    pub async fn edit_message(
        &self,
        channel_id: Snowflake,
        message_id: Snowflake,
        content: impl Into<String>,
    ) -> RestResult<Value> {
        let (channel, message) = (channel_id.to_string(), message_id.to_string());
        self.request(
            &routes::EDIT_MESSAGE,
            &[("channel", &channel), ("message", &message)],
            RequestOptions::new().json(json!({ "content": content.into() })),
        )
        .await
    }

    pub async fn delete_message(
        &self,
        channel_id: Snowflake,
        message_id: Snowflake,
        reason: Option<&str>,
    ) -> RestResult<()> {
        let (channel, message) = (channel_id.to_string(), message_id.to_string());
        let mut options = RequestOptions::new();
        if let Some(reason) = reason {
            options = options.reason(reason);
        }
        self.request(
            &routes::DELETE_MESSAGE,
            &[("channel", &channel), ("message", &message)],
            options,
        )
        .await?;
        Ok(())
    }

    pub async fn create_reaction(
        &self,
        channel_id: Snowflake,
        message_id: Snowflake,
        emoji: &str,
    ) -> RestResult<()> {
        let (channel, message) = (channel_id.to_string(), message_id.to_string());
        self.request(
            &routes::CREATE_REACTION,
            &[("channel", &channel), ("message", &message), ("emoji", emoji)],
            RequestOptions::new(),
        )
        .await?;
        Ok(())
    }

    pub async fn trigger_typing(&self, channel_id: Snowflake) -> RestResult<()> {
        let channel = channel_id.to_string();
        self.request(
            &routes::TRIGGER_TYPING_INDICATOR,
            &[("channel", &channel)],
            RequestOptions::new(),
        )
        .await?;
        Ok(())
    }

    pub async fn get_pinned_messages(&self, channel_id: Snowflake) -> RestResult<Value> {
        let channel = channel_id.to_string();
        self.request(&routes::GET_PINNED_MESSAGES, &[("channel", &channel)], RequestOptions::new())
            .await
    }

    // =========================================================================
    // Guilds
    // =========================================================================

    pub async fn get_guild(&self, guild_id: Snowflake) -> RestResult<Value> {
        let guild = guild_id.to_string();
        self.request(&routes::GET_GUILD, &[("guild", &guild)], RequestOptions::new())
            .await
    }

    pub async fn get_guild_channels(&self, guild_id: Snowflake) -> RestResult<Value> {
        let guild = guild_id.to_string();
        self.request(&routes::GET_GUILD_CHANNELS, &[("guild", &guild)], RequestOptions::new())
            .await
    }

    pub async fn get_guild_member(&self, guild_id: Snowflake, user_id: Snowflake) -> RestResult<Value> {
        let (guild, user) = (guild_id.to_string(), user_id.to_string());
        self.request(
            &routes::GET_GUILD_MEMBER,
            &[("guild", &guild), ("user", &user)],
            RequestOptions::new(),
        )
        .await
    }

    pub async fn get_guild_roles(&self, guild_id: Snowflake) -> RestResult<Value> {
        let guild = guild_id.to_string();
        self.request(&routes::GET_GUILD_ROLES, &[("guild", &guild)], RequestOptions::new())
            .await
    }

    // =========================================================================
    // Users
    // =========================================================================

    pub async fn get_current_user(&self) -> RestResult<Value> {
        self.request(&routes::GET_CURRENT_USER, &[], RequestOptions::new())
            .await
    }

    pub async fn get_user(&self, user_id: Snowflake) -> RestResult<Value> {
        let user = user_id.to_string();
        self.request(&routes::GET_USER, &[("user", &user)], RequestOptions::new())
            .await
    }

    pub async fn create_dm(&self, recipient_id: Snowflake) -> RestResult<Value> {
        self.request(
            &routes::CREATE_DM,
            &[],
            RequestOptions::new().json(json!({ "recipient_id": recipient_id })),
        )
        .await
    }
}

impl std::fmt::Debug for RestClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RestClient").finish_non_exhaustive()
    }
}

fn user_agent(config: &ClientConfig) -> String {
    format!(
        "{} (chat-client, v{})",
        config.app.name,
        env!("CARGO_PKG_VERSION")
    )
}
