//! AMQP message definitions and serialization

use crate::error::{LobbyBotError, Result};
use crate::types::*;
use serde_json;

/// AMQP queue and exchange names
pub const INBOUND_QUEUE: &str = "lobby.inbound_messages";
pub const OUTBOUND_EXCHANGE: &str = "lobby.outbound";

/// Routing keys on the outbound exchange
pub const NOTIFICATION_ROUTING_KEY: &str = "notification.send";
pub const REACTION_ROUTING_KEY: &str = "reaction.add";

/// Message envelope with metadata
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct MessageEnvelope<T> {
    pub payload: T,
    pub correlation_id: String,
    pub timestamp: chrono::DateTime<chrono::Utc>,
    pub routing_key: String,
}

impl<T> MessageEnvelope<T>
where
    T: serde::Serialize + serde::de::DeserializeOwned,
{
    /// Create a new message envelope
    pub fn new(payload: T, routing_key: String) -> Self {
        Self {
            payload,
            correlation_id: uuid::Uuid::new_v4().to_string(),
            timestamp: chrono::Utc::now(),
            routing_key,
        }
    }

    /// Serialize the envelope to JSON bytes
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        serde_json::to_vec(self).map_err(|e| {
            LobbyBotError::InternalError {
                message: format!("Failed to serialize message: {}", e),
            }
            .into()
        })
    }

    /// Deserialize envelope from JSON bytes
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        serde_json::from_slice(bytes).map_err(|e| {
            LobbyBotError::InvalidInboundMessage {
                reason: format!("Failed to deserialize message: {}", e),
            }
            .into()
        })
    }
}

/// Message serialization and validation utilities
pub struct MessageUtils;

impl MessageUtils {
    /// Serialize an inbound chat message to bytes
    pub fn serialize_inbound_message(message: &InboundMessage) -> Result<Vec<u8>> {
        Self::validate_inbound_message(message)?;
        serde_json::to_vec(message).map_err(|e| {
            LobbyBotError::InternalError {
                message: format!("Failed to serialize inbound message: {}", e),
            }
            .into()
        })
    }

    /// Deserialize an inbound chat message, accepting a bare message or an envelope
    pub fn deserialize_inbound_message(bytes: &[u8]) -> Result<InboundMessage> {
        let message: InboundMessage = match serde_json::from_slice(bytes) {
            Ok(message) => message,
            Err(bare_err) => MessageEnvelope::<InboundMessage>::from_bytes(bytes)
                .map(|envelope| envelope.payload)
                .map_err(|_| LobbyBotError::InvalidInboundMessage {
                    reason: format!("Failed to deserialize inbound message: {}", bare_err),
                })?,
        };

        Self::validate_inbound_message(&message)?;
        Ok(message)
    }

    /// Validate an inbound chat message
    pub fn validate_inbound_message(message: &InboundMessage) -> Result<()> {
        if message.author.id.0.is_empty() {
            return Err(LobbyBotError::InvalidInboundMessage {
                reason: "Author ID cannot be empty".to_string(),
            }
            .into());
        }

        if message.channel.id.is_empty() {
            return Err(LobbyBotError::InvalidInboundMessage {
                reason: "Channel ID cannot be empty".to_string(),
            }
            .into());
        }

        Ok(())
    }
}
