//! Configuration management for the quorum-lobby service
//!
//! This module handles configuration loading from TOML files or environment
//! variables, validation, and default values.

pub mod app;
pub mod lobby;

// Re-export commonly used types
pub use app::{validate_config, AmqpSettings, AppConfig, ServiceSettings};
pub use lobby::LobbySettings;
