//! Error types for the lobby bot
//!
//! Policy rejections (no lobby open, not the owner, ...) are never errors; they
//! are answered with a notification or ignored. The types here cover transport,
//! configuration and internal faults only.

/// Result type alias for convenience
pub type Result<T> = anyhow::Result<T>;

/// Custom error types for transport and configuration failures
#[derive(Debug, thiserror::Error)]
pub enum LobbyBotError {
    #[error("AMQP connection failed: {message}")]
    AmqpConnectionFailed { message: String },

    #[error("Invalid inbound message: {reason}")]
    InvalidInboundMessage { reason: String },

    #[error("Configuration error: {message}")]
    ConfigurationError { message: String },

    #[error("Delivery of {kind} failed: {message}")]
    DeliveryFailed { kind: String, message: String },

    #[error("Internal service error: {message}")]
    InternalError { message: String },
}
