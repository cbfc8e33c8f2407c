//! Client configuration structs
//!
//! Loads configuration from environment variables (and a `.env` file when present).

use chat_core::Status;
use serde::Deserialize;
use std::{env, fmt, str::FromStr, time::Duration};

/// Main client configuration
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub app: AppSettings,
    pub auth: AuthConfig,
    pub rest: RestConfig,
    pub gateway: GatewayConfig,
    pub cache: CacheConfig,
}

/// General application settings
#[derive(Debug, Clone)]
pub struct AppSettings {
    pub name: String,
    pub env: Environment,
}

/// Environment type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Development,
    Staging,
    Production,
}

impl Environment {
    #[must_use]
    pub fn is_production(&self) -> bool {
        matches!(self, Self::Production)
    }

    #[must_use]
    pub fn is_development(&self) -> bool {
        matches!(self, Self::Development)
    }
}

impl FromStr for Environment {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "production" => Ok(Self::Production),
            "staging" => Ok(Self::Staging),
            "development" => Ok(Self::Development),
            _ => Err(()),
        }
    }
}

/// Credentials sent with every REST request and the gateway handshake
#[derive(Clone)]
pub struct AuthConfig {
    pub token: String,
    pub token_type: String,
}

impl AuthConfig {
    /// Value of the `Authorization` header
    #[must_use]
    pub fn authorization(&self) -> String {
        if self.token_type.is_empty() {
            self.token.clone()
        } else {
            format!("{} {}", self.token_type, self.token)
        }
    }
}

impl fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthConfig")
            .field("token", &"<redacted>")
            .field("token_type", &self.token_type)
            .finish()
    }
}

/// REST layer configuration
#[derive(Debug, Clone)]
pub struct RestConfig {
    pub base_url: String,
    pub max_retries: u32,
    pub retry_backoff_min_ms: u64,
    pub retry_backoff_max_ms: u64,
    pub timeout_secs: u64,
}

impl RestConfig {
    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Wire format negotiated with the gateway
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum WireEncoding {
    #[default]
    Json,
    Etf,
}

impl WireEncoding {
    /// Value of the `encoding` query parameter
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::Etf => "etf",
        }
    }
}

impl FromStr for WireEncoding {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "etf" => Ok(Self::Etf),
            _ => Err(()),
        }
    }
}

/// What to do with a dispatch whose event name has no registered decoder
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum UnknownEventPolicy {
    /// Fail the connection with an unknown event error
    Strict,
    /// Deliver the raw payload
    #[default]
    PassThrough,
    /// Drop the dispatch
    Ignore,
}

impl FromStr for UnknownEventPolicy {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "strict" => Ok(Self::Strict),
            "pass_through" | "passthrough" => Ok(Self::PassThrough),
            "ignore" => Ok(Self::Ignore),
            _ => Err(()),
        }
    }
}

/// Gateway connection configuration
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub version: u8,
    pub encoding: WireEncoding,
    pub compress: bool,
    pub large_threshold: u16,
    pub max_reconnects: u32,
    pub reconnect_base_delay_secs: u64,
    pub send_limit: u32,
    pub send_limit_period_secs: u64,
    pub session_start_timeout_secs: u64,
    pub unknown_event_policy: UnknownEventPolicy,
    pub shard_id: u32,
    /// Taken from the server's recommendation when unset
    pub shard_count: Option<u32>,
    pub status: Status,
}

impl GatewayConfig {
    pub const MIN_LARGE_THRESHOLD: u16 = 50;
    pub const MAX_LARGE_THRESHOLD: u16 = 250;

    #[must_use]
    pub fn session_start_timeout(&self) -> Duration {
        Duration::from_secs(self.session_start_timeout_secs)
    }

    #[must_use]
    pub fn send_limit_period(&self) -> Duration {
        Duration::from_secs(self.send_limit_period_secs)
    }
}

/// Entity cache configuration
#[derive(Debug, Clone)]
pub struct CacheConfig {
    pub capacity: usize,
}

// Default value functions
fn default_app_name() -> String {
    "chat-client".to_string()
}

fn default_token_type() -> String {
    "Bot".to_string()
}

fn default_base_url() -> String {
    "https://discordapp.com/api/v6".to_string()
}

fn default_max_retries() -> u32 {
    5
}

fn default_retry_backoff_min_ms() -> u64 {
    100
}

fn default_retry_backoff_max_ms() -> u64 {
    5000
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_gateway_version() -> u8 {
    6
}

fn default_large_threshold() -> u16 {
    50
}

fn default_max_reconnects() -> u32 {
    5
}

fn default_reconnect_base_delay_secs() -> u64 {
    10
}

fn default_send_limit() -> u32 {
    2
}

fn default_send_limit_period_secs() -> u64 {
    1
}

fn default_session_start_timeout_secs() -> u64 {
    60
}

fn default_cache_capacity() -> usize {
    5000
}

impl ClientConfig {
    /// Build a configuration with every default and the given token
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            app: AppSettings {
                name: default_app_name(),
                env: Environment::default(),
            },
            auth: AuthConfig {
                token: token.into(),
                token_type: default_token_type(),
            },
            rest: RestConfig {
                base_url: default_base_url(),
                max_retries: default_max_retries(),
                retry_backoff_min_ms: default_retry_backoff_min_ms(),
                retry_backoff_max_ms: default_retry_backoff_max_ms(),
                timeout_secs: default_timeout_secs(),
            },
            gateway: GatewayConfig {
                version: default_gateway_version(),
                encoding: WireEncoding::default(),
                compress: true,
                large_threshold: default_large_threshold(),
                max_reconnects: default_max_reconnects(),
                reconnect_base_delay_secs: default_reconnect_base_delay_secs(),
                send_limit: default_send_limit(),
                send_limit_period_secs: default_send_limit_period_secs(),
                session_start_timeout_secs: default_session_start_timeout_secs(),
                unknown_event_policy: UnknownEventPolicy::default(),
                shard_id: 0,
                shard_count: None,
                status: Status::Online,
            },
            cache: CacheConfig {
                capacity: default_cache_capacity(),
            },
        }
    }

    /// Load configuration from environment variables
    ///
    /// # Errors
    /// Returns an error if `BOT_TOKEN` is missing or a variable cannot be parsed
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Load configuration through an arbitrary variable lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let vars = Vars(lookup);
        let token = vars
            .get("BOT_TOKEN")
            .filter(|t| !t.trim().is_empty())
            .ok_or(ConfigError::MissingVar("BOT_TOKEN"))?;

        let mut config = Self::new(token);

        config.app.name = vars.get("APP_NAME").unwrap_or_else(default_app_name);
        config.app.env = vars.parse("APP_ENV", Environment::default())?;
        config.auth.token_type = vars.get("TOKEN_TYPE").unwrap_or_else(default_token_type);

        config.rest.base_url = vars
            .get("API_BASE_URL")
            .map(|url| url.trim_end_matches('/').to_string())
            .unwrap_or_else(default_base_url);
        config.rest.max_retries = vars.parse("REST_MAX_RETRIES", default_max_retries())?;
        config.rest.retry_backoff_min_ms =
            vars.parse("REST_RETRY_BACKOFF_MIN_MS", default_retry_backoff_min_ms())?;
        config.rest.retry_backoff_max_ms =
            vars.parse("REST_RETRY_BACKOFF_MAX_MS", default_retry_backoff_max_ms())?;
        if config.rest.retry_backoff_max_ms < config.rest.retry_backoff_min_ms {
            return Err(ConfigError::InvalidValue(
                "REST_RETRY_BACKOFF_MAX_MS",
                config.rest.retry_backoff_max_ms.to_string(),
            ));
        }
        config.rest.timeout_secs = vars.parse("REST_TIMEOUT_SECS", default_timeout_secs())?;

        let gateway = &mut config.gateway;
        gateway.version = vars.parse("GATEWAY_VERSION", default_gateway_version())?;
        gateway.encoding = vars.parse("GATEWAY_ENCODING", WireEncoding::default())?;
        gateway.compress = vars.parse("GATEWAY_COMPRESS", true)?;
        gateway.large_threshold = vars
            .parse("GATEWAY_LARGE_THRESHOLD", default_large_threshold())?
            .clamp(
                GatewayConfig::MIN_LARGE_THRESHOLD,
                GatewayConfig::MAX_LARGE_THRESHOLD,
            );
        gateway.max_reconnects = vars.parse("GATEWAY_MAX_RECONNECTS", default_max_reconnects())?;
        gateway.reconnect_base_delay_secs = vars.parse(
            "GATEWAY_RECONNECT_BASE_DELAY_SECS",
            default_reconnect_base_delay_secs(),
        )?;
        gateway.send_limit = vars.parse("GATEWAY_SEND_LIMIT", default_send_limit())?;
        if gateway.send_limit == 0 {
            return Err(ConfigError::InvalidValue("GATEWAY_SEND_LIMIT", "0".to_string()));
        }
        gateway.send_limit_period_secs = vars.parse(
            "GATEWAY_SEND_LIMIT_PERIOD_SECS",
            default_send_limit_period_secs(),
        )?;
        if gateway.send_limit_period_secs == 0 {
            return Err(ConfigError::InvalidValue(
                "GATEWAY_SEND_LIMIT_PERIOD_SECS",
                "0".to_string(),
            ));
        }
        gateway.session_start_timeout_secs = vars.parse(
            "GATEWAY_SESSION_START_TIMEOUT_SECS",
            default_session_start_timeout_secs(),
        )?;
        gateway.unknown_event_policy =
            vars.parse("GATEWAY_UNKNOWN_EVENT_POLICY", UnknownEventPolicy::default())?;
        gateway.status = match vars.get("PRESENCE_STATUS") {
            Some(raw) => raw
                .parse()
                .map_err(|_| ConfigError::InvalidValue("PRESENCE_STATUS", raw))?,
            None => Status::Online,
        };
        gateway.shard_id = vars.parse("SHARD_ID", 0)?;
        gateway.shard_count = vars.parse_opt("SHARD_COUNT")?;
        if let Some(count) = gateway.shard_count {
            if gateway.shard_id >= count {
                return Err(ConfigError::InvalidValue(
                    "SHARD_ID",
                    gateway.shard_id.to_string(),
                ));
            }
        }

        config.cache.capacity = vars.parse("CACHE_CAPACITY", default_cache_capacity())?;

        Ok(config)
    }
}

/// Typed access over a variable lookup
struct Vars<F>(F);

impl<F> Vars<F>
where
    F: Fn(&str) -> Option<String>,
{
    fn get(&self, name: &str) -> Option<String> {
        (self.0)(name).map(|v| v.trim().to_string())
    }

    fn parse<T: FromStr>(&self, name: &'static str, default: T) -> Result<T, ConfigError> {
        Ok(self.parse_opt(name)?.unwrap_or(default))
    }

    fn parse_opt<T: FromStr>(&self, name: &'static str) -> Result<Option<T>, ConfigError> {
        match self.get(name) {
            None => Ok(None),
            Some(raw) => raw
                .parse()
                .map(Some)
                .map_err(|_| ConfigError::InvalidValue(name, raw)),
        }
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingVar(&'static str),

    #[error("Invalid value for {0}: {1}")]
    InvalidValue(&'static str, String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(pairs: &[(&str, &str)]) -> Result<ClientConfig, ConfigError> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        ClientConfig::from_lookup(|name| vars.get(name).cloned())
    }

    #[test]
    fn test_environment_is_production() {
        assert!(!Environment::Development.is_production());
        assert!(!Environment::Staging.is_production());
        assert!(Environment::Production.is_production());
    }

    #[test]
    fn test_missing_token() {
        assert_eq!(load(&[]).unwrap_err(), ConfigError::MissingVar("BOT_TOKEN"));
        assert_eq!(
            load(&[("BOT_TOKEN", "  ")]).unwrap_err(),
            ConfigError::MissingVar("BOT_TOKEN")
        );
    }

    #[test]
    fn test_default_values() {
        let config = load(&[("BOT_TOKEN", "abc")]).unwrap();
        assert_eq!(config.app.name, "chat-client");
        assert_eq!(config.auth.authorization(), "Bot abc");
        assert_eq!(config.rest.base_url, "https://discordapp.com/api/v6");
        assert_eq!(config.rest.max_retries, 5);
        assert_eq!(config.gateway.version, 6);
        assert_eq!(config.gateway.encoding, WireEncoding::Json);
        assert!(config.gateway.compress);
        assert_eq!(config.gateway.large_threshold, 50);
        assert_eq!(config.gateway.send_limit, 2);
        assert_eq!(config.gateway.send_limit_period(), Duration::from_secs(1));
        assert_eq!(
            config.gateway.unknown_event_policy,
            UnknownEventPolicy::PassThrough
        );
        assert_eq!(config.gateway.shard_count, None);
        assert_eq!(config.cache.capacity, 5000);
    }

    #[test]
    fn test_overrides() {
        let config = load(&[
            ("BOT_TOKEN", "abc"),
            ("TOKEN_TYPE", ""),
            ("API_BASE_URL", "http://localhost:9000/api/"),
            ("GATEWAY_ENCODING", "ETF"),
            ("GATEWAY_COMPRESS", "false"),
            ("GATEWAY_UNKNOWN_EVENT_POLICY", "strict"),
            ("SHARD_ID", "1"),
            ("SHARD_COUNT", "2"),
            ("PRESENCE_STATUS", "idle"),
        ])
        .unwrap();
        assert_eq!(config.auth.authorization(), "abc");
        assert_eq!(config.rest.base_url, "http://localhost:9000/api");
        assert_eq!(config.gateway.encoding, WireEncoding::Etf);
        assert!(!config.gateway.compress);
        assert_eq!(config.gateway.unknown_event_policy, UnknownEventPolicy::Strict);
        assert_eq!(config.gateway.shard_count, Some(2));
        assert_eq!(config.gateway.status, Status::Idle);
    }

    #[test]
    fn test_large_threshold_is_clamped() {
        let low = load(&[("BOT_TOKEN", "a"), ("GATEWAY_LARGE_THRESHOLD", "10")]).unwrap();
        assert_eq!(low.gateway.large_threshold, 50);
        let high = load(&[("BOT_TOKEN", "a"), ("GATEWAY_LARGE_THRESHOLD", "900")]).unwrap();
        assert_eq!(high.gateway.large_threshold, 250);
    }

    #[test]
    fn test_invalid_values() {
        assert_eq!(
            load(&[("BOT_TOKEN", "a"), ("GATEWAY_ENCODING", "xml")]).unwrap_err(),
            ConfigError::InvalidValue("GATEWAY_ENCODING", "xml".to_string())
        );
        assert_eq!(
            load(&[("BOT_TOKEN", "a"), ("REST_MAX_RETRIES", "many")]).unwrap_err(),
            ConfigError::InvalidValue("REST_MAX_RETRIES", "many".to_string())
        );
        assert!(load(&[("BOT_TOKEN", "a"), ("SHARD_ID", "2"), ("SHARD_COUNT", "2")]).is_err());
        assert!(load(&[("BOT_TOKEN", "a"), ("GATEWAY_SEND_LIMIT", "0")]).is_err());
    }

    #[test]
    fn test_token_is_redacted() {
        let config = ClientConfig::new("super-secret");
        let debug = format!("{:?}", config.auth);
        assert!(!debug.contains("super-secret"));
    }
}
