//! AMQP consumer for inbound chat messages

use crate::amqp::messages::MessageUtils;
use crate::error::{LobbyBotError, Result};
use crate::types::InboundMessage;
use amqprs::{
    channel::{BasicAckArguments, BasicCancelArguments, BasicConsumeArguments, Channel},
    consumer::AsyncConsumer,
    BasicProperties, Deliver,
};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Receives decoded chat messages from the consumer
#[async_trait]
pub trait MessageHandler: Send + Sync {
    /// Handle one chat message forwarded by the platform adapter
    async fn handle_inbound_message(&self, message: InboundMessage) -> Result<()>;

    /// Handle a payload that could not be processed
    async fn handle_error(&self, error: LobbyBotError, message_data: &[u8]);
}

/// Consumer bound to the inbound message queue
pub struct InboundMessageConsumer {
    handler: Arc<dyn MessageHandler>,
    channel: Channel,
    consumer_tag: String,
}

impl InboundMessageConsumer {
    pub fn new(handler: Arc<dyn MessageHandler>, channel: Channel) -> Self {
        let consumer_tag = format!("lobby-consumer-{}", uuid::Uuid::new_v4());

        Self {
            handler,
            channel,
            consumer_tag,
        }
    }

    /// Start consuming messages from the queue
    pub async fn start_consuming(&self, queue_name: &str) -> Result<()> {
        let args = BasicConsumeArguments::new(queue_name, &self.consumer_tag);

        self.channel
            .basic_consume(InboundConsumer::new(self.handler.clone()), args)
            .await
            .map_err(|e| LobbyBotError::AmqpConnectionFailed {
                message: format!("Failed to start consuming: {}", e),
            })?;

        info!("Started consuming messages from queue: {}", queue_name);
        Ok(())
    }

    pub async fn stop_consuming(&self) -> Result<()> {
        let args = BasicCancelArguments::new(&self.consumer_tag);

        self.channel
            .basic_cancel(args)
            .await
            .map_err(|e| LobbyBotError::AmqpConnectionFailed {
                message: format!("Failed to stop consuming: {}", e),
            })?;

        info!("Stopped consuming messages");
        Ok(())
    }
}

struct InboundConsumer {
    handler: Arc<dyn MessageHandler>,
}

impl InboundConsumer {
    fn new(handler: Arc<dyn MessageHandler>) -> Self {
        Self { handler }
    }

    /// Decode and hand over one payload; malformed payloads go to `handle_error`
    async fn process_message(&self, content: &[u8]) {
        let message = match MessageUtils::deserialize_inbound_message(content) {
            Ok(message) => message,
            Err(e) => {
                let error = match e.downcast::<LobbyBotError>() {
                    Ok(error) => error,
                    Err(other) => LobbyBotError::InvalidInboundMessage {
                        reason: other.to_string(),
                    },
                };
                self.handler.handle_error(error, content).await;
                return;
            }
        };

        debug!(
            "Inbound message {} from '{}' in #{}",
            message.message_id, message.author.name, message.channel.name
        );

        if let Err(e) = self.handler.handle_inbound_message(message).await {
            self.handler
                .handle_error(
                    LobbyBotError::InternalError {
                        message: e.to_string(),
                    },
                    content,
                )
                .await;
        }
    }
}

#[async_trait]
impl AsyncConsumer for InboundConsumer {
    async fn consume(
        &mut self,
        channel: &Channel,
        deliver: Deliver,
        _basic_properties: BasicProperties,
        content: Vec<u8>,
    ) {
        let delivery_tag = deliver.delivery_tag();
        let start_time = std::time::Instant::now();

        self.process_message(&content).await;

        debug!(
            "Delivery {} handled in {:.2}ms",
            delivery_tag,
            start_time.elapsed().as_secs_f64() * 1000.0
        );

        // Failures are dropped rather than requeued
        if let Err(e) = channel
            .basic_ack(BasicAckArguments::new(delivery_tag, false))
            .await
        {
            error!("Failed to ack delivery {}: {}", delivery_tag, e);
        }
    }
}

/// Handler that stores everything it receives, for tests and dry runs
#[derive(Default)]
pub struct RecordingMessageHandler {
    pub received: tokio::sync::Mutex<Vec<InboundMessage>>,
    pub errors: tokio::sync::Mutex<Vec<String>>,
}

impl RecordingMessageHandler {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl MessageHandler for RecordingMessageHandler {
    async fn handle_inbound_message(&self, message: InboundMessage) -> Result<()> {
        self.received.lock().await.push(message);
        Ok(())
    }

    async fn handle_error(&self, error: LobbyBotError, _message_data: &[u8]) {
        warn!("Recording handler received error: {}", error);
        self.errors.lock().await.push(error.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ChannelRef, Participant};

    fn payload(content: &str) -> Vec<u8> {
        let message = InboundMessage {
            message_id: "m1".to_string(),
            content: content.to_string(),
            author: Participant::new("u1", "Alice"),
            channel: ChannelRef::text("c1", "general"),
            timestamp: chrono::Utc::now(),
        };
        MessageUtils::serialize_inbound_message(&message).unwrap()
    }

    #[tokio::test]
    async fn test_valid_payload_reaches_handler() {
        let handler = Arc::new(RecordingMessageHandler::new());
        let consumer = InboundConsumer::new(handler.clone());

        consumer.process_message(&payload("!join")).await;

        let received = handler.received.lock().await;
        assert_eq!(received.len(), 1);
        assert_eq!(received[0].content, "!join");
        assert!(handler.errors.lock().await.is_empty());
    }

    #[tokio::test]
    async fn test_malformed_payload_is_reported() {
        let handler = Arc::new(RecordingMessageHandler::new());
        let consumer = InboundConsumer::new(handler.clone());

        consumer.process_message(b"{\"content\": 3}").await;

        assert!(handler.received.lock().await.is_empty());
        let errors = handler.errors.lock().await;
        assert_eq!(errors.len(), 1);
        assert!(errors[0].starts_with("Invalid inbound message"));
    }
}
