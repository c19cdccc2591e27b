//! Quorum Lobby - chat bot that gathers players until a game can start
//!
//! This crate keeps a single server-wide lobby, drives it from chat commands
//! delivered over AMQP, and publishes the resulting notifications (including
//! the mass-mention ping once enough players are ready) back to the chat adapter.

pub mod amqp;
pub mod config;
pub mod error;
pub mod gateway;
pub mod lobby;
pub mod metrics;
pub mod service;
pub mod types;
pub mod utils;

// Re-export commonly used types and traits
pub use error::{LobbyBotError, Result};
pub use types::*;

// Re-export key components
pub use amqp::publisher::NotificationSender;
pub use lobby::{Command, Lobby, LobbyCoordinator, LobbyRules};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
