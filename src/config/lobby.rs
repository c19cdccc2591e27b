//! Lobby configuration

use serde::{Deserialize, Serialize};

/// Rules for the shared lobby and the chat users around it
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LobbySettings {
    /// Number of ready members that starts the game
    pub players_to_begin: usize,
    /// Usernames exempt from the home channel restriction
    pub admin_users: Vec<String>,
    /// Usernames allowed to close any lobby
    pub auth_users: Vec<String>,
    /// Seconds after which ephemeral notifications should disappear
    pub self_destruct_time: Option<u64>,
    /// Only text channel the bot listens to; `None` listens everywhere
    pub home_channel: Option<String>,
    /// Platform id of the bot account, used to ignore its own messages
    pub bot_user_id: Option<String>,
}

impl Default for LobbySettings {
    fn default() -> Self {
        Self {
            players_to_begin: 8,
            admin_users: Vec::new(),
            auth_users: Vec::new(),
            self_destruct_time: None,
            home_channel: Some("general".to_string()),
            bot_user_id: None,
        }
    }
}
