//! Common types used throughout the lobby bot

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for lobbies
pub type LobbyId = Uuid;

/// Stable platform identifier of a chat user
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub String);

impl std::fmt::Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for UserId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

/// A chat user taking part in the lobby
///
/// Two participants are the same person when their platform ids match; the
/// display name is presentation only and may collide.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Participant {
    pub id: UserId,
    pub name: String,
    /// Platform mention token supplied by the chat adapter, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mention: Option<String>,
}

impl Participant {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: UserId(id.into()),
            name: name.into(),
            mention: None,
        }
    }

    /// Token that pings this participant when posted to a channel
    pub fn mention(&self) -> String {
        match &self.mention {
            Some(token) => token.clone(),
            None => format!("<@{}>", self.id),
        }
    }
}

impl PartialEq for Participant {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Participant {}

impl std::hash::Hash for Participant {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl std::fmt::Display for Participant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name)
    }
}

/// Kind of channel a message came from or goes to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChannelKind {
    Text,
    Direct,
}

/// Reference to a chat channel
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChannelRef {
    pub id: String,
    pub name: String,
    pub kind: ChannelKind,
}

impl ChannelRef {
    pub fn text(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            kind: ChannelKind::Text,
        }
    }

    /// Direct-message channel addressed to a single user
    pub fn direct(user: &Participant) -> Self {
        Self {
            id: user.id.0.clone(),
            name: user.name.clone(),
            kind: ChannelKind::Direct,
        }
    }

    pub fn is_direct(&self) -> bool {
        self.kind == ChannelKind::Direct
    }
}

/// Raw chat message as forwarded by the platform adapter
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InboundMessage {
    pub message_id: String,
    pub content: String,
    pub author: Participant,
    pub channel: ChannelRef,
    pub timestamp: DateTime<Utc>,
}

/// A chat message that passed filtering and is ready for dispatch
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommandEvent {
    pub command: String,
    pub requester: Participant,
    pub origin_channel: ChannelRef,
    /// Message to attach acknowledgement reactions to
    pub message_id: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl CommandEvent {
    /// Create an event stamped with the current time and no message id
    pub fn new(
        command: impl Into<String>,
        requester: Participant,
        origin_channel: ChannelRef,
    ) -> Self {
        Self {
            command: command.into(),
            requester,
            origin_channel,
            message_id: None,
            timestamp: Utc::now(),
        }
    }
}

/// Text message to post on the chat platform
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub channel: ChannelRef,
    pub text: String,
    /// Ephemeral notifications may be removed by the platform after a while
    pub ephemeral: bool,
    /// Advisory deletion delay for ephemeral notifications
    pub delete_after_seconds: Option<u64>,
}

/// Emoji reaction attached to the message that triggered an action
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reaction {
    pub channel: ChannelRef,
    pub message_id: Option<String>,
    pub emoji: String,
}

/// Anything the bot decides to send back to the platform
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Outbound {
    Notify(Notification),
    React(Reaction),
}

impl Outbound {
    /// Text of a notification, `None` for reactions
    pub fn text(&self) -> Option<&str> {
        match self {
            Outbound::Notify(notification) => Some(&notification.text),
            Outbound::React(_) => None,
        }
    }

    pub fn is_reaction(&self) -> bool {
        matches!(self, Outbound::React(_))
    }

    /// Short label used for logging and metrics
    pub fn kind(&self) -> &'static str {
        match self {
            Outbound::Notify(_) => "notification",
            Outbound::React(_) => "reaction",
        }
    }
}
