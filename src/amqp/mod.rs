//! AMQP integration for the lobby bot
//!
//! Inbound chat messages arrive on a durable queue fed by the chat platform
//! adapter; notifications and reactions go back out through a topic exchange.

pub mod connection;
pub mod handlers;
pub mod messages;
pub mod publisher;

// Re-export commonly used types
pub use connection::{AmqpConfig, AmqpConnection};
pub use handlers::{InboundMessageConsumer, MessageHandler};
pub use messages::*;
pub use publisher::{AmqpNotificationSender, NotificationSender, PublisherConfig};
