//! Client composition root
//!
//! Builds the REST client, asks the API where and how to connect, then wires
//! the gateway connection, dispatch router, handler scheduler and entity
//! cache together. Everything is built once here and shared read-only.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chat_common::{ClientConfig, GatewayConfig};
use chat_core::{Presence, ShardInfo};
use chat_gateway::{
    gateway_url, ConnectionParts, ConnectionSettings, Decoder, DispatchRouter, Dispatcher,
    EntityCache, Event, EventScheduler, GatewayConnection, GatewayError, ListenerId,
    SendLimiter, SessionStartGovernor, ShutdownSignal,
};
use chat_rest::{HttpTransport, RestClient};

use crate::aliases::default_aliases;
use crate::error::ClientResult;

/// Configures a [`Client`] before it connects
pub struct ClientBuilder {
    config: ClientConfig,
    transport: Option<Arc<dyn HttpTransport>>,
    aliases: HashMap<String, String>,
    decoders: Vec<(String, Decoder)>,
}

impl ClientBuilder {
    pub fn new(config: ClientConfig) -> Self {
        Self {
            config,
            transport: None,
            aliases: default_aliases(),
            decoders: Vec::new(),
        }
    }

    /// Send REST requests through `transport` instead of `reqwest`
    pub fn transport(mut self, transport: Arc<dyn HttpTransport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Let handlers register under `alias` for `event`
    pub fn alias(mut self, alias: impl Into<String>, event: impl Into<String>) -> Self {
        self.aliases.insert(alias.into(), event.into());
        self
    }

    /// Add or replace the decoder for one event name
    pub fn decoder(mut self, event: impl Into<String>, decoder: Decoder) -> Self {
        self.decoders.push((event.into(), decoder));
        self
    }

    /// Fetch connection parameters and assemble the client
    pub async fn build(self) -> ClientResult<Client> {
        let Self {
            config,
            transport,
            aliases,
            decoders,
        } = self;

        let rest = match transport {
            Some(transport) => RestClient::with_transport(&config, transport),
            None => RestClient::new(&config)?,
        };

        let bot = rest.get_gateway_bot().await?;
        let shard = resolve_shard(&config.gateway, bot.shards)?;
        let url = gateway_url(&bot.url, &config.gateway).map_err(GatewayError::from)?;
        tracing::info!(
            url = %url,
            shard = ?shard,
            recommended_shards = bot.shards,
            session_starts_remaining = bot.session_start_limit.remaining,
            "Gateway parameters resolved"
        );

        let governor = Arc::new(SessionStartGovernor::new(
            bot.session_start_limit,
            Arc::new(rest.clone()),
            config.gateway.session_start_timeout(),
        ));
        let limiter = Arc::new(SendLimiter::from_config(&config.gateway, rest.global_gate()));

        let mut router = DispatchRouter::new(rest.clone(), config.gateway.unknown_event_policy);
        for (event, decoder) in decoders {
            router.register(&event, decoder);
        }
        let scheduler = Arc::new(EventScheduler::new(aliases));
        let cache = Arc::new(EntityCache::new(config.cache.capacity));
        let dispatcher =
            Dispatcher::new(Arc::new(router), Arc::clone(&scheduler)).with_sink(cache.clone());

        let connection = Arc::new(GatewayConnection::new(ConnectionParts {
            settings: ConnectionSettings {
                token: config.auth.token.clone(),
                client_name: config.app.name.clone(),
                gateway: config.gateway.clone(),
                shard,
            },
            url,
            governor,
            limiter,
            dispatcher,
            shutdown: ShutdownSignal::new(),
        }));

        Ok(Client {
            config,
            rest,
            scheduler,
            cache,
            connection,
        })
    }
}

/// Shard from configuration, falling back to the server's recommendation
fn resolve_shard(gateway: &GatewayConfig, recommended: u32) -> ClientResult<ShardInfo> {
    let count = gateway.shard_count.unwrap_or_else(|| recommended.max(1));
    Ok(ShardInfo::new(gateway.shard_id, count)?)
}

/// A connected client: REST access, one gateway connection and its handlers
pub struct Client {
    config: ClientConfig,
    rest: RestClient,
    scheduler: Arc<EventScheduler>,
    cache: Arc<EntityCache>,
    connection: Arc<GatewayConnection>,
}

impl Client {
    pub fn builder(config: ClientConfig) -> ClientBuilder {
        ClientBuilder::new(config)
    }

    /// Build a client with the default aliases and decoders
    pub async fn connect(config: ClientConfig) -> ClientResult<Self> {
        ClientBuilder::new(config).build().await
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn rest(&self) -> &RestClient {
        &self.rest
    }

    pub fn cache(&self) -> &Arc<EntityCache> {
        &self.cache
    }

    pub fn scheduler(&self) -> &Arc<EventScheduler> {
        &self.scheduler
    }

    pub fn connection(&self) -> &Arc<GatewayConnection> {
        &self.connection
    }

    pub fn on<F, Fut>(&self, event: &str, handler: F) -> ListenerId
    where
        F: Fn(Arc<Event>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        self.scheduler.on(event, handler)
    }

    pub fn once<F, Fut>(&self, event: &str, handler: F) -> ListenerId
    where
        F: Fn(Arc<Event>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        self.scheduler.once(event, handler)
    }

    pub fn remove_listener(&self, id: ListenerId) -> bool {
        self.scheduler.remove(id)
    }

    pub async fn wait_for(&self, event: &str, timeout: Duration) -> Option<Arc<Event>> {
        self.scheduler.wait_for(event, timeout).await
    }

    pub async fn update_presence(&self, presence: Presence) -> ClientResult<()> {
        Ok(self.connection.update_presence(presence).await?)
    }

    /// Handle that stops [`run`](Self::run) from another task
    pub fn shutdown_signal(&self) -> ShutdownSignal {
        self.connection.shutdown_signal().clone()
    }

    pub fn shutdown(&self) {
        self.connection.shutdown();
    }

    /// Drive the gateway until shutdown or a fatal error, then wait for
    /// running handlers to finish.
    pub async fn run(&self) -> ClientResult<()> {
        let result = self.connection.run().await;
        self.scheduler.shutdown().await;
        Ok(result?)
    }
}

impl std::fmt::Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("app", &self.config.app.name)
            .field("connection", &self.connection)
            .field("cache", &self.cache)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ClientError;

    #[test]
    fn test_shard_count_defaults_to_recommendation() {
        let config = ClientConfig::new("token");
        let shard = resolve_shard(&config.gateway, 4).unwrap();
        assert_eq!((shard.id, shard.count), (0, 4));

        let shard = resolve_shard(&config.gateway, 0).unwrap();
        assert_eq!(shard.count, 1);
    }

    #[test]
    fn test_configured_shard_wins() {
        let mut config = ClientConfig::new("token");
        config.gateway.shard_id = 2;
        config.gateway.shard_count = Some(3);
        let shard = resolve_shard(&config.gateway, 10).unwrap();
        assert_eq!((shard.id, shard.count), (2, 3));

        config.gateway.shard_id = 3;
        assert!(matches!(
            resolve_shard(&config.gateway, 10),
            Err(ClientError::InvalidShard(_))
        ));
    }
}
