//! Decides which chat messages reach the lobby coordinator

use crate::config::LobbySettings;
use crate::types::{CommandEvent, InboundMessage};
use std::collections::HashSet;
use tracing::{debug, warn};

/// Why a message was not turned into a command event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterDecision {
    /// Posted by the bot account itself
    OwnMessage,
    /// Direct message from someone who is not an admin
    DirectMessage,
    /// Text channel other than the home channel
    OutsideHomeChannel,
    /// Nothing but whitespace
    Empty,
}

impl FilterDecision {
    pub fn as_str(self) -> &'static str {
        match self {
            FilterDecision::OwnMessage => "own_message",
            FilterDecision::DirectMessage => "direct_message",
            FilterDecision::OutsideHomeChannel => "outside_home_channel",
            FilterDecision::Empty => "empty",
        }
    }
}

/// Inbound message filter built from the lobby settings
#[derive(Debug, Clone, Default)]
pub struct MessageFilter {
    bot_user_id: Option<String>,
    home_channel: Option<String>,
    admin_users: HashSet<String>,
}

impl MessageFilter {
    pub fn new(bot_user_id: Option<String>, home_channel: Option<String>) -> Self {
        Self {
            bot_user_id,
            home_channel,
            admin_users: HashSet::new(),
        }
    }

    pub fn with_admin_users<I, S>(mut self, users: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.admin_users = users.into_iter().map(Into::into).collect();
        self
    }

    /// Build the filter from configuration, warning if the bot's own id is unknown
    pub fn from_settings(settings: &LobbySettings) -> Self {
        let filter = Self::new(settings.bot_user_id.clone(), settings.home_channel.clone())
            .with_admin_users(settings.admin_users.iter().cloned());

        if !filter.filters_own_messages() {
            warn!(
                "bot_user_id is not set (BOT_USER_ID); the bot's own messages will not be filtered"
            );
        }
        filter
    }

    /// Whether messages authored by the bot account are dropped
    pub fn filters_own_messages(&self) -> bool {
        self.bot_user_id.is_some()
    }

    pub fn is_admin(&self, username: &str) -> bool {
        self.admin_users.contains(username)
    }

    /// Turn an accepted message into a command event
    pub fn evaluate(&self, message: &InboundMessage) -> Result<CommandEvent, FilterDecision> {
        if self
            .bot_user_id
            .as_deref()
            .is_some_and(|bot| bot == message.author.id.0)
        {
            return Err(FilterDecision::OwnMessage);
        }

        let is_admin = self.is_admin(&message.author.name);
        if message.channel.is_direct() {
            if !is_admin {
                return Err(FilterDecision::DirectMessage);
            }
        } else if let Some(home) = &self.home_channel {
            if *home != message.channel.name && !is_admin {
                return Err(FilterDecision::OutsideHomeChannel);
            }
        }

        let content = message.content.trim();
        if content.is_empty() {
            return Err(FilterDecision::Empty);
        }

        let mut event = CommandEvent::new(
            content,
            message.author.clone(),
            message.channel.clone(),
        );
        event.message_id = Some(message.message_id.clone());
        event.timestamp = message.timestamp;
        Ok(event)
    }

    /// Like `evaluate`, logging and discarding the reason for a drop
    pub fn accept(&self, message: &InboundMessage) -> Option<CommandEvent> {
        match self.evaluate(message) {
            Ok(event) => Some(event),
            Err(decision) => {
                debug!(
                    "Dropping message {} from '{}' in #{}: {}",
                    message.message_id,
                    message.author.name,
                    message.channel.name,
                    decision.as_str()
                );
                None
            }
        }
    }
}
