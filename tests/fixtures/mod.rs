//! Test fixtures and helpers shared by the integration tests
#![allow(dead_code)]

use async_trait::async_trait;
use quorum_lobby::amqp::publisher::RecordingNotificationSender;
use quorum_lobby::error::{LobbyBotError, Result};
use quorum_lobby::lobby::{LobbyCoordinator, LobbyRules};
use quorum_lobby::types::{
    ChannelRef, CommandEvent, InboundMessage, Notification, Outbound, Participant, Reaction,
};
use quorum_lobby::NotificationSender;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

pub const AUTHORIZED_USER: &str = "Moderator";

pub fn general() -> ChannelRef {
    ChannelRef::text("channel-general", "general")
}

/// Participant whose id is the lowercased name
pub fn user(name: &str) -> Participant {
    Participant::new(name.to_lowercase(), name)
}

/// Numbered synthetic players: Player1, Player2, ...
pub fn players(count: usize) -> Vec<Participant> {
    (1..=count).map(|i| user(&format!("Player{}", i))).collect()
}

pub fn command(text: &str, requester: &Participant) -> CommandEvent {
    let mut event = CommandEvent::new(text, requester.clone(), general());
    event.message_id = Some(uuid::Uuid::new_v4().to_string());
    event
}

pub fn inbound(text: &str, author: &Participant, channel: ChannelRef) -> InboundMessage {
    InboundMessage {
        message_id: uuid::Uuid::new_v4().to_string(),
        content: text.to_string(),
        author: author.clone(),
        channel,
        timestamp: chrono::Utc::now(),
    }
}

pub fn test_rules(players_to_begin: usize) -> LobbyRules {
    LobbyRules::new(players_to_begin)
        .with_auth_users([AUTHORIZED_USER])
        .with_self_destruct_time(Some(15))
}

/// Coordinator wired to a recording sender
pub fn create_test_coordinator(
    players_to_begin: usize,
) -> (Arc<LobbyCoordinator>, Arc<RecordingNotificationSender>) {
    let sender = Arc::new(RecordingNotificationSender::new());
    let coordinator = LobbyCoordinator::new(test_rules(players_to_begin), sender.clone());
    (Arc::new(coordinator), sender)
}

/// Sender that fails every delivery and counts the attempts
#[derive(Debug, Default)]
pub struct FailingNotificationSender {
    attempts: AtomicUsize,
}

impl FailingNotificationSender {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }

    fn fail(&self, kind: &str) -> Result<()> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        Err(LobbyBotError::DeliveryFailed {
            kind: kind.to_string(),
            message: "chat platform unavailable".to_string(),
        }
        .into())
    }
}

#[async_trait]
impl NotificationSender for FailingNotificationSender {
    async fn send_notification(&self, _notification: Notification) -> Result<()> {
        self.fail("notification")
    }

    async fn add_reaction(&self, _reaction: Reaction) -> Result<()> {
        self.fail("reaction")
    }
}

/// Notifications whose text is exactly `text`
pub fn count_text(sent: &[Outbound], text: &str) -> usize {
    sent.iter().filter(|o| o.text() == Some(text)).count()
}
