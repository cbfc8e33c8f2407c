//! Presence - the status and activity a client announces to the gateway

use serde::{Deserialize, Serialize};

use crate::error::DomainError;

/// Online status shown to other users
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    #[default]
    Online,
    Idle,
    Dnd,
    Invisible,
    Offline,
}

impl Status {
    /// Wire name of the status
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Online => "online",
            Self::Idle => "idle",
            Self::Dnd => "dnd",
            Self::Invisible => "invisible",
            Self::Offline => "offline",
        }
    }
}

impl std::str::FromStr for Status {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "online" => Ok(Self::Online),
            "idle" => Ok(Self::Idle),
            "dnd" | "do_not_disturb" => Ok(Self::Dnd),
            "invisible" => Ok(Self::Invisible),
            "offline" => Ok(Self::Offline),
            other => Err(DomainError::UnknownStatus(other.to_string())),
        }
    }
}

/// Activity kind, serialized as its integer code
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum ActivityType {
    #[default]
    Playing = 0,
    Streaming = 1,
    Listening = 2,
    Watching = 3,
}

impl From<ActivityType> for u8 {
    fn from(kind: ActivityType) -> Self {
        kind as u8
    }
}

impl TryFrom<u8> for ActivityType {
    type Error = DomainError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::Playing),
            1 => Ok(Self::Streaming),
            2 => Ok(Self::Listening),
            3 => Ok(Self::Watching),
            other => Err(DomainError::ValidationError(format!(
                "unknown activity type {other}"
            ))),
        }
    }
}

/// A game or stream shown under the user's name
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Activity {
    pub name: String,
    #[serde(rename = "type", default)]
    pub kind: ActivityType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

impl Activity {
    /// Create a "Playing ..." activity
    pub fn playing(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: ActivityType::Playing,
            url: None,
        }
    }

    /// Create a streaming activity; the url is mandatory for streams
    pub fn streaming(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: ActivityType::Streaming,
            url: Some(url.into()),
        }
    }

    /// Validate the activity
    pub fn validate(&self) -> Result<(), DomainError> {
        if self.name.trim().is_empty() {
            return Err(DomainError::ValidationError(
                "activity name must not be empty".to_string(),
            ));
        }
        if self.kind == ActivityType::Streaming && self.url.as_deref().is_none_or(str::is_empty) {
            return Err(DomainError::StreamingWithoutUrl);
        }
        Ok(())
    }
}

/// Presence payload carried by Identify and presence update frames
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Presence {
    /// Unix time in milliseconds since the client went idle
    pub since: Option<i64>,
    pub game: Option<Activity>,
    pub status: Status,
    pub afk: bool,
}

impl Default for Presence {
    fn default() -> Self {
        Self {
            since: None,
            game: None,
            status: Status::Online,
            afk: false,
        }
    }
}

impl Presence {
    /// Create a presence with the given status and activity
    pub fn new(status: Status, game: Option<Activity>) -> Self {
        Self {
            status,
            game,
            ..Self::default()
        }
    }

    /// Mark the presence as away since `since_ms`
    pub fn afk_since(mut self, since_ms: i64) -> Self {
        self.afk = true;
        self.since = Some(since_ms);
        self
    }

    /// Validate the presence before sending it
    pub fn validate(&self) -> Result<(), DomainError> {
        if let Some(game) = &self.game {
            game.validate()?;
        }
        Ok(())
    }
}
