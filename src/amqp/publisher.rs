//! AMQP publisher for outbound notifications and reactions

use crate::amqp::messages::{MessageEnvelope, NOTIFICATION_ROUTING_KEY, REACTION_ROUTING_KEY};
use crate::error::{LobbyBotError, Result};
use crate::types::{Notification, Outbound, Reaction};
use amqprs::{
    channel::{BasicPublishArguments, Channel, ExchangeDeclareArguments},
    BasicProperties,
};
use async_trait::async_trait;
use std::time::Duration;
use tracing::{debug, info};

/// Trait for delivering bot output to the chat platform
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait NotificationSender: Send + Sync {
    /// Post a text message
    async fn send_notification(&self, notification: Notification) -> Result<()>;

    /// Attach a reaction to the triggering message
    async fn add_reaction(&self, reaction: Reaction) -> Result<()>;
}

/// Route one outbound item to the matching sender method
pub async fn deliver(sender: &dyn NotificationSender, outbound: Outbound) -> Result<()> {
    match outbound {
        Outbound::Notify(notification) => sender.send_notification(notification).await,
        Outbound::React(reaction) => sender.add_reaction(reaction).await,
    }
}

/// Configuration for outbound publishing
#[derive(Debug, Clone)]
pub struct PublisherConfig {
    pub exchange: String,
    pub publish_timeout_ms: u64,
}

impl Default for PublisherConfig {
    fn default() -> Self {
        Self {
            exchange: crate::amqp::messages::OUTBOUND_EXCHANGE.to_string(),
            publish_timeout_ms: 5000,
        }
    }
}

/// AMQP-based sender; the chat adapter consumes the exchange and performs the sends
pub struct AmqpNotificationSender {
    channel: Channel,
    config: PublisherConfig,
}

impl AmqpNotificationSender {
    /// Create a new sender and declare its exchange
    pub async fn new(channel: Channel, config: PublisherConfig) -> Result<Self> {
        let sender = Self { channel, config };
        sender.setup_exchange().await?;
        Ok(sender)
    }

    async fn setup_exchange(&self) -> Result<()> {
        let args = ExchangeDeclareArguments::new(&self.config.exchange, "topic")
            .durable(true)
            .finish();
        self.channel.exchange_declare(args).await.map_err(|e| {
            LobbyBotError::AmqpConnectionFailed {
                message: format!(
                    "Failed to declare outbound exchange {}: {}",
                    self.config.exchange, e
                ),
            }
        })?;

        info!("Declared outbound exchange '{}'", self.config.exchange);
        Ok(())
    }

    /// Single publish attempt; delivery failures are reported, never retried
    async fn publish<T>(&self, envelope: &MessageEnvelope<T>) -> Result<()>
    where
        T: serde::Serialize + serde::de::DeserializeOwned,
    {
        let payload = envelope.to_bytes()?;

        let args = BasicPublishArguments::new(&self.config.exchange, &envelope.routing_key);
        let mut properties = BasicProperties::default();
        properties
            .with_message_id(&envelope.correlation_id)
            .with_timestamp(envelope.timestamp.timestamp() as u64)
            .with_content_type("application/json");

        let timeout = Duration::from_millis(self.config.publish_timeout_ms);
        tokio::time::timeout(timeout, self.channel.basic_publish(properties, payload, args))
            .await
            .map_err(|_| LobbyBotError::DeliveryFailed {
                kind: envelope.routing_key.clone(),
                message: format!("publish timed out after {:?}", timeout),
            })?
            .map_err(|e| LobbyBotError::DeliveryFailed {
                kind: envelope.routing_key.clone(),
                message: e.to_string(),
            })?;

        debug!(
            "Published {} to exchange {}",
            envelope.correlation_id, self.config.exchange
        );
        Ok(())
    }
}

#[async_trait]
impl NotificationSender for AmqpNotificationSender {
    async fn send_notification(&self, notification: Notification) -> Result<()> {
        let envelope = MessageEnvelope::new(notification, NOTIFICATION_ROUTING_KEY.to_string());
        self.publish(&envelope).await
    }

    async fn add_reaction(&self, reaction: Reaction) -> Result<()> {
        let envelope = MessageEnvelope::new(reaction, REACTION_ROUTING_KEY.to_string());
        self.publish(&envelope).await
    }
}

/// Sender that records everything it is asked to deliver
#[derive(Debug, Default)]
pub struct RecordingNotificationSender {
    sent: std::sync::Mutex<Vec<Outbound>>,
}

impl RecordingNotificationSender {
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything delivered so far, in delivery order
    pub fn sent(&self) -> Vec<Outbound> {
        self.sent
            .lock()
            .map(|sent| sent.clone())
            .unwrap_or_default()
    }

    /// Texts of delivered notifications, in delivery order
    pub fn texts(&self) -> Vec<String> {
        self.sent()
            .iter()
            .filter_map(|outbound| outbound.text().map(str::to_string))
            .collect()
    }

    pub fn clear(&self) {
        if let Ok(mut sent) = self.sent.lock() {
            sent.clear();
        }
    }

    fn record(&self, outbound: Outbound) {
        if let Ok(mut sent) = self.sent.lock() {
            sent.push(outbound);
        }
    }
}

#[async_trait]
impl NotificationSender for RecordingNotificationSender {
    async fn send_notification(&self, notification: Notification) -> Result<()> {
        self.record(Outbound::Notify(notification));
        Ok(())
    }

    async fn add_reaction(&self, reaction: Reaction) -> Result<()> {
        self.record(Outbound::React(reaction));
        Ok(())
    }
}
