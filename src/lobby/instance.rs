//! Lobby instance: membership and ownership of one lobby
//!
//! The lobby knows nothing about chat commands, quorum sizes or notification
//! text. Precondition checks (does a lobby exist, is this a duplicate action)
//! belong to the coordinator.

use crate::types::{LobbyId, Participant};
use crate::utils::{current_timestamp, generate_lobby_id, join_names};
use chrono::{DateTime, Utc};
use tracing::debug;

/// A group of participants waiting for quorum
#[derive(Debug, Clone)]
pub struct Lobby {
    /// Unique identifier, used in logs and stats
    id: LobbyId,
    /// Member allowed to close the lobby
    owner: Participant,
    /// Join order, oldest first, no duplicates
    members: Vec<Participant>,
    /// When the lobby was opened
    created_at: DateTime<Utc>,
}

impl Lobby {
    /// Open a lobby with `owner` as its only member
    pub fn create(owner: Participant) -> Self {
        Self {
            id: generate_lobby_id(),
            members: vec![owner.clone()],
            owner,
            created_at: current_timestamp(),
        }
    }

    /// Get the lobby ID
    pub fn id(&self) -> LobbyId {
        self.id
    }

    /// Get the current owner
    pub fn owner(&self) -> &Participant {
        &self.owner
    }

    /// Get all members in join order
    pub fn members(&self) -> &[Participant] {
        &self.members
    }

    /// Get the creation time
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Append a member; returns false if they were already in the lobby
    pub fn add_member(&mut self, participant: Participant) -> bool {
        // Duplicate joins leave the order untouched
        if self.contains_member(&participant) {
            return false;
        }
        self.members.push(participant);
        true
    }

    /// Remove a member; returns false if they were not in the lobby
    ///
    /// When the owner leaves, the longest-tenured remaining member takes over.
    pub fn remove_member(&mut self, participant: &Participant) -> bool {
        let Some(index) = self.members.iter().position(|m| m == participant) else {
            return false;
        };
        self.members.remove(index);

        // Hand ownership to whoever has been here longest
        if self.is_owner(participant) {
            match self.members.first() {
                Some(successor) => {
                    debug!(
                        "Lobby {} ownership passed from '{}' to '{}'",
                        self.id, participant.name, successor.name
                    );
                    self.owner = successor.clone();
                }
                None => debug!("Lobby {} is empty, no owner to reassign", self.id),
            }
        }
        true
    }

    /// Check if a participant is in the lobby
    pub fn contains_member(&self, participant: &Participant) -> bool {
        self.members.contains(participant)
    }

    /// Get the current number of members
    pub fn member_count(&self) -> usize {
        self.members.len()
    }

    /// Check if everyone has left
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Check if a participant owns the lobby
    pub fn is_owner(&self, participant: &Participant) -> bool {
        &self.owner == participant
    }

    /// Display names joined as "A", "A and B" or "A, B, and C"
    pub fn render_roster(&self) -> String {
        let names: Vec<&str> = self.members.iter().map(|m| m.name.as_str()).collect();
        join_names(&names)
    }

    /// Mention tokens of every member, space separated, in join order
    pub fn mentions(&self) -> String {
        self.members
            .iter()
            .map(Participant::mention)
            .collect::<Vec<_>>()
            .join(" ")
    }
}

impl std::fmt::Display for Lobby {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.render_roster())
    }
}
