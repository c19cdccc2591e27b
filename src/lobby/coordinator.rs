//! Lobby coordinator: owns the single shared lobby and dispatches chat commands
//!
//! Every command that reads or changes the lobby runs its whole decision
//! (existence check, mutation, quorum or emptiness check, choice of
//! notifications) while holding the lobby lock. Notifications are delivered
//! after the lock is released; a failed delivery is logged and never undoes a
//! transition.

use crate::amqp::publisher::{deliver, NotificationSender};
use crate::config::LobbySettings;
use crate::error::{LobbyBotError, Result};
use crate::lobby::command::Command;
use crate::lobby::instance::Lobby;
use crate::lobby::messages;
use crate::metrics::MetricsCollector;
use crate::types::{ChannelRef, CommandEvent, LobbyId, Notification, Outbound, Reaction};
use chrono::{DateTime, Utc};
use std::collections::HashSet;
use std::sync::{Arc, RwLock};
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// Policy applied to the shared lobby
#[derive(Debug, Clone)]
pub struct LobbyRules {
    /// Member count that triggers the start sequence
    pub players_to_begin: usize,
    /// Usernames allowed to close a lobby they do not own
    pub auth_users: HashSet<String>,
    /// Deletion delay attached to ephemeral notifications
    pub self_destruct_time: Option<u64>,
}

impl LobbyRules {
    /// Create rules with no authorized users and no deletion delay
    pub fn new(players_to_begin: usize) -> Self {
        Self {
            players_to_begin,
            auth_users: HashSet::new(),
            self_destruct_time: None,
        }
    }

    /// Replace the set of users allowed to close any lobby
    pub fn with_auth_users<I, S>(mut self, users: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.auth_users = users.into_iter().map(Into::into).collect();
        self
    }

    /// Set the deletion delay for ephemeral notifications
    pub fn with_self_destruct_time(mut self, seconds: Option<u64>) -> Self {
        self.self_destruct_time = seconds;
        self
    }

    /// Check if a username may close a lobby it does not own
    pub fn is_authorized(&self, username: &str) -> bool {
        self.auth_users.contains(username)
    }
}

impl From<&LobbySettings> for LobbyRules {
    fn from(settings: &LobbySettings) -> Self {
        LobbyRules::new(settings.players_to_begin)
            .with_auth_users(settings.auth_users.iter().cloned())
            .with_self_destruct_time(settings.self_destruct_time)
    }
}

/// Why a lobby was closed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseReason {
    /// The owner asked for it
    Owner,
    /// An authorized user closed someone else's lobby
    Authorized,
    /// The last member left
    Empty,
    /// Quorum was reached and the start sequence ran
    Quorum,
}

impl CloseReason {
    /// Label used in logs and metrics
    pub fn as_str(self) -> &'static str {
        match self {
            CloseReason::Owner => "owner",
            CloseReason::Authorized => "authorized",
            CloseReason::Empty => "empty",
            CloseReason::Quorum => "quorum",
        }
    }
}

/// State change caused by one command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// Nothing changed; the command was rejected or read-only
    Unchanged,
    /// A new lobby was created
    Opened,
    MemberJoined,
    MemberLeft,
    /// The lobby is gone
    Closed(CloseReason),
}

/// Guard that stopped a command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    NoLobby,
    AlreadyOwner,
    LobbyAlreadyOpen,
    AlreadyMember,
    NotMember,
    NotAuthorized,
}

impl Rejection {
    /// Label used in logs and metrics
    pub fn as_str(self) -> &'static str {
        match self {
            Rejection::NoLobby => "no_lobby",
            Rejection::AlreadyOwner => "already_owner",
            Rejection::LobbyAlreadyOpen => "lobby_already_open",
            Rejection::AlreadyMember => "already_member",
            Rejection::NotMember => "not_member",
            Rejection::NotAuthorized => "not_authorized",
        }
    }
}

/// What the coordinator decided for one inbound command
#[derive(Debug, Clone, PartialEq)]
pub struct DispatchOutcome {
    /// `None` when the text was not a command
    pub command: Option<Command>,
    /// Resulting state change
    pub transition: Transition,
    /// Guard that stopped the command, if any
    pub rejection: Option<Rejection>,
    /// Messages and reactions, in the order they are delivered
    pub outbound: Vec<Outbound>,
}

impl DispatchOutcome {
    fn ignored() -> Self {
        Self {
            command: None,
            transition: Transition::Unchanged,
            rejection: None,
            outbound: Vec::new(),
        }
    }

    fn for_command(command: Command) -> Self {
        Self {
            command: Some(command),
            ..Self::ignored()
        }
    }

    fn reject(&mut self, rejection: Rejection) {
        self.rejection = Some(rejection);
    }

    /// Whether the start sequence ran
    pub fn started_game(&self) -> bool {
        self.transition == Transition::Closed(CloseReason::Quorum)
    }

    /// Notification texts, in delivery order
    pub fn texts(&self) -> Vec<&str> {
        self.outbound.iter().filter_map(Outbound::text).collect()
    }
}

/// Statistics about coordinator operations
#[derive(Debug, Clone, Default)]
pub struct CoordinatorStats {
    /// Recognised commands handled
    pub commands_handled: u64,
    /// Total number of lobbies opened
    pub lobbies_opened: u64,
    /// Total number of lobbies closed for any reason
    pub lobbies_closed: u64,
    /// Total number of start sequences
    pub games_started: u64,
    /// Outbound items the sender failed to deliver
    pub delivery_failures: u64,
    /// Current lobby, if any
    pub current_lobby: Option<LobbyId>,
    /// Members in the current lobby
    pub current_members: usize,
    /// When the current lobby was opened
    pub lobby_opened_at: Option<DateTime<Utc>>,
}

/// Owner of the process-wide lobby
pub struct LobbyCoordinator {
    /// The open lobby, if any; all decisions are made under this lock
    current: Mutex<Option<Lobby>>,
    /// Quorum size and close permissions
    rules: LobbyRules,
    /// Outbound delivery to the chat platform
    sender: Arc<dyn NotificationSender>,
    /// Operation counters
    stats: RwLock<CoordinatorStats>,
    /// Prometheus metrics, when running as a service
    metrics_collector: Option<Arc<MetricsCollector>>,
}

impl LobbyCoordinator {
    /// Create a coordinator with no lobby open
    pub fn new(rules: LobbyRules, sender: Arc<dyn NotificationSender>) -> Self {
        Self {
            current: Mutex::new(None),
            rules,
            sender,
            stats: RwLock::new(CoordinatorStats::default()),
            metrics_collector: None,
        }
    }

    /// Create a coordinator that also records prometheus metrics
    pub fn with_metrics(
        rules: LobbyRules,
        sender: Arc<dyn NotificationSender>,
        metrics_collector: Arc<MetricsCollector>,
    ) -> Self {
        Self {
            metrics_collector: Some(metrics_collector),
            ..Self::new(rules, sender)
        }
    }

    /// Rules this coordinator enforces
    pub fn rules(&self) -> &LobbyRules {
        &self.rules
    }

    /// Copy of the current lobby, if one is open
    pub async fn current_lobby(&self) -> Option<Lobby> {
        self.current.lock().await.clone()
    }

    /// Check if a lobby is currently open
    pub async fn is_lobby_open(&self) -> bool {
        self.current.lock().await.is_some()
    }

    /// Current statistics
    pub fn stats(&self) -> Result<CoordinatorStats> {
        let stats = self
            .stats
            .read()
            .map_err(|_| LobbyBotError::InternalError {
                message: "Failed to acquire stats lock".to_string(),
            })?;
        Ok(stats.clone())
    }

    /// Handle one inbound command: decide, then deliver
    pub async fn handle_command(&self, event: CommandEvent) -> Result<DispatchOutcome> {
        // Anything outside the alias table is ignored without a reply
        let Some(command) = Command::parse(&event.command) else {
            debug!(
                "Ignoring non-command message from '{}': {:?}",
                event.requester.name, event.command
            );
            return Ok(DispatchOutcome::ignored());
        };

        let start_time = Instant::now();
        info!(
            "Processing {} command from '{}' ({}) in #{}",
            command, event.requester.name, event.requester.id, event.origin_channel.name
        );

        // Decide under the lobby lock; the lock is released before delivery
        let outcome = self.decide(command, &event).await?;

        if let Some(rejection) = outcome.rejection {
            debug!(
                "{} command from '{}' rejected: {}",
                command,
                event.requester.name,
                rejection.as_str()
            );
            if let Some(metrics) = &self.metrics_collector {
                metrics.record_rejection(rejection);
            }
        }

        self.deliver_all(&outcome.outbound).await?;

        // Update metrics
        if let Some(metrics) = &self.metrics_collector {
            metrics.record_command(command, start_time.elapsed());
        }
        Ok(outcome)
    }

    /// Run the state machine for one command under the lobby lock
    async fn decide(&self, command: Command, event: &CommandEvent) -> Result<DispatchOutcome> {
        let mut outcome = DispatchOutcome::for_command(command);

        // Help, ping and coin flips never wait for the lobby lock
        if !command.touches_lobby() {
            self.handle_utility(command, event, &mut outcome);
            self.record_stats(&outcome, None)?;
            return Ok(outcome);
        }

        let mut current = self.current.lock().await;
        match command {
            Command::Create => self.handle_create(&mut current, event, &mut outcome),
            Command::Join => self.handle_join(&mut current, event, &mut outcome),
            Command::Leave => self.handle_leave(&mut current, event, &mut outcome),
            Command::Close => self.handle_close(&mut current, event, &mut outcome),
            Command::Status => self.handle_status(&current, event, &mut outcome),
            Command::Help | Command::Ping | Command::CoinFlip => {}
        }

        // Record stats while still holding the lock so the snapshot matches
        self.record_stats(&outcome, current.as_ref())?;

        Ok(outcome)
    }

    /// Open a lobby owned by the requester, unless one already exists
    fn handle_create(
        &self,
        current: &mut Option<Lobby>,
        event: &CommandEvent,
        outcome: &mut DispatchOutcome,
    ) {
        let requester = &event.requester;

        // Only one lobby at a time
        if let Some(lobby) = current.as_ref() {
            if lobby.is_owner(requester) {
                outcome.reject(Rejection::AlreadyOwner);
                outcome
                    .outbound
                    .push(self.ephemeral(&event.origin_channel, messages::ALREADY_OWNER));
            } else {
                outcome.reject(Rejection::LobbyAlreadyOpen);
                outcome.outbound.push(self.ephemeral(
                    &event.origin_channel,
                    messages::lobby_already_open(&lobby.owner().name),
                ));
            }
            return;
        }

        // Create the lobby with the requester as sole member and owner
        let lobby = Lobby::create(requester.clone());
        info!("Lobby {} opened by '{}'", lobby.id(), requester.name);
        *current = Some(lobby);

        outcome.transition = Transition::Opened;
        outcome.outbound.push(self.ack(event));
        outcome.outbound.push(self.say(
            &event.origin_channel,
            messages::lobby_started(&requester.name),
        ));
    }

    /// Add the requester and run the quorum check
    fn handle_join(
        &self,
        current: &mut Option<Lobby>,
        event: &CommandEvent,
        outcome: &mut DispatchOutcome,
    ) {
        let Some(lobby) = current.as_mut() else {
            outcome.reject(Rejection::NoLobby);
            outcome
                .outbound
                .push(self.ephemeral(&event.origin_channel, messages::no_lobby_open()));
            return;
        };

        // Joining twice is silent
        if !lobby.add_member(event.requester.clone()) {
            outcome.reject(Rejection::AlreadyMember);
            return;
        }

        info!(
            "'{}' joined lobby {} - {}/{} ready",
            event.requester.name,
            lobby.id(),
            lobby.member_count(),
            self.rules.players_to_begin
        );
        outcome.transition = Transition::MemberJoined;
        outcome.outbound.push(self.ack(event));

        // Quorum check
        if lobby.member_count() >= self.rules.players_to_begin {
            self.start_game(current, event, outcome);
        }
    }

    /// Broadcast, ping every member, and close regardless of who asked
    fn start_game(
        &self,
        current: &mut Option<Lobby>,
        event: &CommandEvent,
        outcome: &mut DispatchOutcome,
    ) {
        let Some(lobby) = current.take() else {
            return;
        };

        info!(
            "Lobby {} reached quorum with {} members, starting",
            lobby.id(),
            lobby.member_count()
        );
        outcome.transition = Transition::Closed(CloseReason::Quorum);

        // Announce first, then ping everyone in join order
        outcome.outbound.push(self.say(
            &event.origin_channel,
            messages::ready_to_begin(self.rules.players_to_begin),
        ));
        outcome
            .outbound
            .push(self.say(&event.origin_channel, lobby.mentions()));
    }

    /// Remove the requester and run the emptiness check
    fn handle_leave(
        &self,
        current: &mut Option<Lobby>,
        event: &CommandEvent,
        outcome: &mut DispatchOutcome,
    ) {
        let Some(lobby) = current.as_mut() else {
            outcome.reject(Rejection::NoLobby);
            return;
        };

        // Leaving a lobby you are not in is silent
        if !lobby.remove_member(&event.requester) {
            outcome.reject(Rejection::NotMember);
            return;
        }

        info!(
            "'{}' left lobby {} - {} remaining",
            event.requester.name,
            lobby.id(),
            lobby.member_count()
        );
        outcome.transition = Transition::MemberLeft;
        outcome.outbound.push(self.ack(event));
        outcome.outbound.push(self.ephemeral(
            &event.origin_channel,
            messages::member_left(&event.requester.name),
        ));

        // Emptiness is decided by count, not by who left
        if lobby.member_count() == 0 {
            info!("Lobby {} is empty, closing", lobby.id());
            *current = None;
            outcome.transition = Transition::Closed(CloseReason::Empty);
            outcome
                .outbound
                .push(self.ephemeral(&event.origin_channel, messages::LOBBY_EMPTY));
        }
    }

    /// Close the lobby for its owner or an authorized user
    fn handle_close(
        &self,
        current: &mut Option<Lobby>,
        event: &CommandEvent,
        outcome: &mut DispatchOutcome,
    ) {
        let Some(lobby) = current.as_ref() else {
            outcome.reject(Rejection::NoLobby);
            return;
        };

        // Everyone else is ignored silently
        let reason = if lobby.is_owner(&event.requester) {
            CloseReason::Owner
        } else if self.rules.is_authorized(&event.requester.name) {
            CloseReason::Authorized
        } else {
            outcome.reject(Rejection::NotAuthorized);
            return;
        };

        info!(
            "Lobby {} closed by '{}' ({})",
            lobby.id(),
            event.requester.name,
            reason.as_str()
        );
        *current = None;
        outcome.transition = Transition::Closed(reason);
        outcome.outbound.push(self.ack(event));
    }

    /// Report the roster and how many more players are needed
    fn handle_status(
        &self,
        current: &Option<Lobby>,
        event: &CommandEvent,
        outcome: &mut DispatchOutcome,
    ) {
        let text = match current {
            Some(lobby) => messages::status(
                &lobby.render_roster(),
                lobby.member_count(),
                self.rules.players_to_begin,
            ),
            None => {
                debug!("Status requested with no lobby open");
                messages::no_lobby_open()
            }
        };
        outcome.outbound.push(self.say(&event.origin_channel, text));
    }

    /// Commands that never look at the lobby
    fn handle_utility(
        &self,
        command: Command,
        event: &CommandEvent,
        outcome: &mut DispatchOutcome,
    ) {
        match command {
            // Help goes to the requester privately
            Command::Help => {
                outcome.outbound.push(self.say(
                    &ChannelRef::direct(&event.requester),
                    messages::help(self.rules.players_to_begin),
                ));
                outcome.outbound.push(self.ack(event));
            }
            Command::Ping => outcome
                .outbound
                .push(self.ephemeral(&event.origin_channel, messages::PING_REPLY)),
            Command::CoinFlip => outcome.outbound.push(self.say(
                &event.origin_channel,
                messages::coin_flip(rand::random::<bool>()),
            )),
            _ => {}
        }
    }

    /// Plain notification that stays in the channel
    fn say(&self, channel: &ChannelRef, text: impl Into<String>) -> Outbound {
        Outbound::Notify(Notification {
            channel: channel.clone(),
            text: text.into(),
            ephemeral: false,
            delete_after_seconds: None,
        })
    }

    /// Notification the platform may delete after `self_destruct_time`
    fn ephemeral(&self, channel: &ChannelRef, text: impl Into<String>) -> Outbound {
        Outbound::Notify(Notification {
            channel: channel.clone(),
            text: text.into(),
            ephemeral: true,
            delete_after_seconds: self.rules.self_destruct_time,
        })
    }

    /// Acknowledgement reaction on the triggering message
    fn ack(&self, event: &CommandEvent) -> Outbound {
        Outbound::React(Reaction {
            channel: event.origin_channel.clone(),
            message_id: event.message_id.clone(),
            emoji: messages::ACK_EMOJI.to_string(),
        })
    }

    /// Update stats and metrics after a decision
    fn record_stats(&self, outcome: &DispatchOutcome, current: Option<&Lobby>) -> Result<()> {
        let mut stats = self
            .stats
            .write()
            .map_err(|_| LobbyBotError::InternalError {
                message: "Failed to acquire stats lock".to_string(),
            })?;

        stats.commands_handled += 1;
        match outcome.transition {
            Transition::Opened => stats.lobbies_opened += 1,
            Transition::Closed(reason) => {
                stats.lobbies_closed += 1;
                if reason == CloseReason::Quorum {
                    stats.games_started += 1;
                }
            }
            Transition::Unchanged | Transition::MemberJoined | Transition::MemberLeft => {}
        }

        // Utility commands did not see the lobby, so leave the snapshot alone
        if outcome.command.is_some_and(Command::touches_lobby) {
            stats.current_lobby = current.map(Lobby::id);
            stats.current_members = current.map_or(0, Lobby::member_count);
            stats.lobby_opened_at = current.map(Lobby::created_at);
        }

        if let Some(metrics) = &self.metrics_collector {
            match outcome.transition {
                Transition::Opened => metrics.record_lobby_opened(),
                Transition::Closed(reason) => metrics.record_lobby_closed(reason),
                _ => {}
            }
            metrics.set_lobby_members(stats.current_lobby.is_some(), stats.current_members);
        }

        Ok(())
    }

    /// Deliver in decision order; failures are logged and counted, not retried
    async fn deliver_all(&self, outbound: &[Outbound]) -> Result<()> {
        let mut failures = 0;

        for item in outbound {
            let kind = item.kind();
            match deliver(self.sender.as_ref(), item.clone()).await {
                Ok(()) => {
                    if let Some(metrics) = &self.metrics_collector {
                        metrics.record_outbound(kind, true);
                    }
                }
                Err(e) => {
                    failures += 1;
                    warn!("Failed to deliver {}: {}", kind, e);
                    if let Some(metrics) = &self.metrics_collector {
                        metrics.record_outbound(kind, false);
                    }
                }
            }
        }

        if failures > 0 {
            let mut stats = self
                .stats
                .write()
                .map_err(|_| LobbyBotError::InternalError {
                    message: "Failed to acquire stats lock".to_string(),
                })?;
            stats.delivery_failures += failures;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::amqp::publisher::{MockNotificationSender, RecordingNotificationSender};
    use crate::types::Participant;

    fn user(name: &str) -> Participant {
        Participant::new(name.to_lowercase(), name)
    }

    fn general() -> ChannelRef {
        ChannelRef::text("c1", "general")
    }

    fn event(command: &str, requester: &Participant) -> CommandEvent {
        let mut event = CommandEvent::new(command, requester.clone(), general());
        event.message_id = Some(format!("{}-{}", requester.id, command));
        event
    }

    fn coordinator(
        players_to_begin: usize,
    ) -> (LobbyCoordinator, Arc<RecordingNotificationSender>) {
        let sender = Arc::new(RecordingNotificationSender::new());
        let rules = LobbyRules::new(players_to_begin)
            .with_auth_users(["Mod"])
            .with_self_destruct_time(Some(30));
        (LobbyCoordinator::new(rules, sender.clone()), sender)
    }

    #[tokio::test]
    async fn test_create_opens_lobby() {
        let (coordinator, sender) = coordinator(8);
        let alice = user("Alice");

        let outcome = coordinator.handle_command(event("!open", &alice)).await.unwrap();

        assert_eq!(outcome.command, Some(Command::Create));
        assert_eq!(outcome.transition, Transition::Opened);
        assert!(outcome.outbound[0].is_reaction());
        assert_eq!(
            outcome.texts(),
            vec!["Alice is starting a lobby. Type !join to ready up."]
        );
        assert_eq!(sender.sent(), outcome.outbound);

        let lobby = coordinator.current_lobby().await.unwrap();
        assert!(lobby.is_owner(&alice));
        assert_eq!(lobby.member_count(), 1);
    }

    #[tokio::test]
    async fn test_create_when_open() {
        let (coordinator, _sender) = coordinator(8);
        let alice = user("Alice");
        let bob = user("Bob");
        coordinator.handle_command(event("!o", &alice)).await.unwrap();

        let again = coordinator.handle_command(event("!openlobby", &alice)).await.unwrap();
        assert_eq!(again.rejection, Some(Rejection::AlreadyOwner));
        assert_eq!(again.texts(), vec!["You already have an open lobby."]);

        let other = coordinator.handle_command(event("!createlobby", &bob)).await.unwrap();
        assert_eq!(other.rejection, Some(Rejection::LobbyAlreadyOpen));
        assert_eq!(
            other.texts(),
            vec!["Alice has a lobby open. Type !join to ready up."]
        );
        match &other.outbound[0] {
            Outbound::Notify(n) => {
                assert!(n.ephemeral);
                assert_eq!(n.delete_after_seconds, Some(30));
            }
            Outbound::React(_) => panic!("expected a notification"),
        }

        assert!(coordinator.current_lobby().await.unwrap().is_owner(&alice));
    }

    #[tokio::test]
    async fn test_join_without_lobby() {
        let (coordinator, _sender) = coordinator(8);

        let outcome = coordinator.handle_command(event("!join", &user("Bob"))).await.unwrap();

        assert_eq!(outcome.rejection, Some(Rejection::NoLobby));
        assert_eq!(
            outcome.texts(),
            vec!["There is no lobby open. Type !open to start one."]
        );
        assert!(!coordinator.is_lobby_open().await);
    }

    #[tokio::test]
    async fn test_duplicate_join_is_silent() {
        let (coordinator, sender) = coordinator(8);
        let alice = user("Alice");
        let bob = user("Bob");
        coordinator.handle_command(event("!open", &alice)).await.unwrap();
        coordinator.handle_command(event("!join", &bob)).await.unwrap();
        sender.clear();

        let again = coordinator.handle_command(event("!ready", &bob)).await.unwrap();
        let owner = coordinator.handle_command(event("!j", &alice)).await.unwrap();

        assert_eq!(again.rejection, Some(Rejection::AlreadyMember));
        assert_eq!(owner.rejection, Some(Rejection::AlreadyMember));
        assert!(sender.sent().is_empty());
        assert_eq!(coordinator.current_lobby().await.unwrap().member_count(), 2);
    }

    #[tokio::test]
    async fn test_leave_silent_cases() {
        let (coordinator, sender) = coordinator(8);
        let alice = user("Alice");

        let no_lobby = coordinator.handle_command(event("!leave", &alice)).await.unwrap();
        assert_eq!(no_lobby.rejection, Some(Rejection::NoLobby));

        coordinator.handle_command(event("!open", &alice)).await.unwrap();
        sender.clear();

        let stranger = coordinator.handle_command(event("!out", &user("Zed"))).await.unwrap();
        assert_eq!(stranger.rejection, Some(Rejection::NotMember));
        assert!(sender.sent().is_empty());
    }

    #[tokio::test]
    async fn test_owner_leaving_hands_over_ownership() {
        let (coordinator, _sender) = coordinator(8);
        let alice = user("Alice");
        let bob = user("Bob");
        coordinator.handle_command(event("!open", &alice)).await.unwrap();
        coordinator.handle_command(event("!join", &bob)).await.unwrap();

        let outcome = coordinator.handle_command(event("!gottago", &alice)).await.unwrap();

        assert_eq!(outcome.transition, Transition::MemberLeft);
        assert_eq!(outcome.texts(), vec!["Alice left the lobby."]);
        let lobby = coordinator.current_lobby().await.unwrap();
        assert!(lobby.is_owner(&bob));
        assert_eq!(lobby.member_count(), 1);
    }

    #[tokio::test]
    async fn test_last_member_leaving_closes_lobby() {
        let (coordinator, _sender) = coordinator(8);
        let alice = user("Alice");
        let bob = user("Bob");
        coordinator.handle_command(event("!open", &alice)).await.unwrap();
        coordinator.handle_command(event("!join", &bob)).await.unwrap();
        coordinator.handle_command(event("!leave", &alice)).await.unwrap();

        let outcome = coordinator.handle_command(event("!l", &bob)).await.unwrap();

        assert_eq!(outcome.transition, Transition::Closed(CloseReason::Empty));
        assert_eq!(
            outcome.texts(),
            vec!["Bob left the lobby.", "The lobby is now empty. Closing."]
        );
        assert!(!coordinator.is_lobby_open().await);
    }

    #[tokio::test]
    async fn test_quorum_starts_game_once() {
        let (coordinator, _sender) = coordinator(3);
        let (a, b, c) = (user("A"), user("B"), user("C"));
        coordinator.handle_command(event("!open", &a)).await.unwrap();

        let second = coordinator.handle_command(event("!join", &b)).await.unwrap();
        assert_eq!(second.transition, Transition::MemberJoined);
        assert!(second.texts().is_empty());

        let third = coordinator.handle_command(event("!join", &c)).await.unwrap();
        let ready = messages::ready_to_begin(3);
        assert!(third.started_game());
        assert!(third.outbound[0].is_reaction());
        assert_eq!(third.texts(), vec![ready.as_str(), "<@a> <@b> <@c>"]);
        assert!(!coordinator.is_lobby_open().await);
        assert_eq!(coordinator.stats().unwrap().games_started, 1);
    }

    #[tokio::test]
    async fn test_quorum_of_one_starts_on_first_join() {
        let (coordinator, _sender) = coordinator(1);
        let alice = user("Alice");
        coordinator.handle_command(event("!open", &alice)).await.unwrap();
        // The creator alone never triggers the quorum check; only a join does
        assert!(coordinator.is_lobby_open().await);

        let outcome = coordinator.handle_command(event("!join", &user("Bob"))).await.unwrap();
        assert!(outcome.started_game());
    }

    #[tokio::test]
    async fn test_close_guards() {
        let (coordinator, sender) = coordinator(8);
        let alice = user("Alice");
        coordinator.handle_command(event("!open", &alice)).await.unwrap();
        sender.clear();

        let denied = coordinator.handle_command(event("!close", &user("Dana"))).await.unwrap();
        assert_eq!(denied.rejection, Some(Rejection::NotAuthorized));
        assert!(sender.sent().is_empty());
        assert!(coordinator.is_lobby_open().await);

        let forced = coordinator.handle_command(event("!c", &user("Mod"))).await.unwrap();
        assert_eq!(forced.transition, Transition::Closed(CloseReason::Authorized));
        assert_eq!(forced.outbound.len(), 1);
        assert!(forced.outbound[0].is_reaction());
        assert!(!coordinator.is_lobby_open().await);
    }

    #[tokio::test]
    async fn test_owner_close_and_close_without_lobby() {
        let (coordinator, sender) = coordinator(8);
        let alice = user("Alice");

        let nothing = coordinator.handle_command(event("!close", &alice)).await.unwrap();
        assert_eq!(nothing.rejection, Some(Rejection::NoLobby));
        assert!(sender.sent().is_empty());

        coordinator.handle_command(event("!open", &alice)).await.unwrap();
        let closed = coordinator.handle_command(event("!closelobby", &alice)).await.unwrap();
        assert_eq!(closed.transition, Transition::Closed(CloseReason::Owner));
        assert!(!coordinator.is_lobby_open().await);
    }

    #[tokio::test]
    async fn test_status_reports() {
        let (coordinator, _sender) = coordinator(8);
        let alice = user("Alice");

        let empty = coordinator.handle_command(event("!status", &alice)).await.unwrap();
        assert_eq!(
            empty.texts(),
            vec!["There is no lobby open. Type !open to start one."]
        );

        coordinator.handle_command(event("!open", &alice)).await.unwrap();
        let one = coordinator.handle_command(event("!lobby", &alice)).await.unwrap();
        assert_eq!(one.texts(), vec!["Alice is ready to go. Need 7 more."]);

        coordinator.handle_command(event("!join", &user("Bob"))).await.unwrap();
        coordinator.handle_command(event("!join", &user("Cy"))).await.unwrap();
        let three = coordinator.handle_command(event("!+", &alice)).await.unwrap();
        assert_eq!(
            three.texts(),
            vec!["Alice, Bob, and Cy are ready to go. Need 5 more."]
        );
    }

    #[tokio::test]
    async fn test_unknown_text_is_ignored() {
        let (coordinator, sender) = coordinator(8);

        let outcome = coordinator
            .handle_command(event("hello there", &user("Alice")))
            .await
            .unwrap();

        assert_eq!(outcome.command, None);
        assert!(outcome.outbound.is_empty());
        assert!(sender.sent().is_empty());
        assert_eq!(coordinator.stats().unwrap().commands_handled, 0);
    }

    #[tokio::test]
    async fn test_utility_commands() {
        let (coordinator, _sender) = coordinator(5);
        let alice = user("Alice");

        let help = coordinator.handle_command(event("!?", &alice)).await.unwrap();
        match &help.outbound[0] {
            Outbound::Notify(n) => {
                assert!(n.channel.is_direct());
                assert_eq!(n.channel.id, "alice");
                assert!(n.text.contains("5 players"));
            }
            Outbound::React(_) => panic!("expected help text first"),
        }
        assert!(help.outbound[1].is_reaction());

        let ping = coordinator.handle_command(event("!test", &alice)).await.unwrap();
        assert_eq!(ping.texts(), vec!["Yes hello I am here"]);

        let flip = coordinator.handle_command(event("!coinflip", &alice)).await.unwrap();
        let text = flip.texts()[0];
        assert!(text == "Heads" || text == "Tails");

        assert!(!coordinator.is_lobby_open().await);
    }

    #[tokio::test]
    async fn test_delivery_failure_keeps_transition() {
        let mut mock = MockNotificationSender::new();
        mock.expect_add_reaction()
            .times(1)
            .returning(|_| Err(anyhow::anyhow!("broker unavailable")));
        mock.expect_send_notification()
            .times(1)
            .returning(|_| Err(anyhow::anyhow!("broker unavailable")));

        let coordinator = LobbyCoordinator::new(LobbyRules::new(8), Arc::new(mock));
        let outcome = coordinator
            .handle_command(event("!open", &user("Alice")))
            .await
            .unwrap();

        assert_eq!(outcome.transition, Transition::Opened);
        assert!(coordinator.is_lobby_open().await);
        assert_eq!(coordinator.stats().unwrap().delivery_failures, 2);
    }

    #[tokio::test]
    async fn test_stats_track_lifecycle() {
        let (coordinator, _sender) = coordinator(2);
        let alice = user("Alice");
        coordinator.handle_command(event("!open", &alice)).await.unwrap();

        let stats = coordinator.stats().unwrap();
        assert_eq!(stats.lobbies_opened, 1);
        assert_eq!(stats.current_members, 1);
        assert!(stats.current_lobby.is_some());

        coordinator.handle_command(event("!join", &user("Bob"))).await.unwrap();
        let stats = coordinator.stats().unwrap();
        assert_eq!(stats.lobbies_closed, 1);
        assert_eq!(stats.games_started, 1);
        assert_eq!(stats.current_members, 0);
        assert!(stats.current_lobby.is_none());
    }
}
