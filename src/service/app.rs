//! Main application state and service coordination
//!
//! Wires the broker connection, the lobby coordinator, the inbound consumer
//! and the health server together, and owns their background tasks.

use crate::amqp::connection::{AmqpConfig, AmqpConnection};
use crate::amqp::handlers::{InboundMessageConsumer, MessageHandler};
use crate::amqp::publisher::{AmqpNotificationSender, PublisherConfig};
use crate::config::AppConfig;
use crate::error::{LobbyBotError, Result as LobbyResult};
use crate::gateway::MessageFilter;
use crate::lobby::{LobbyCoordinator, LobbyRules};
use crate::metrics::health::HealthServerConfig;
use crate::metrics::{HealthServer, MetricsCollector, MetricsService};
use crate::service::health::{HealthCheck, ServiceMonitor};
use crate::types::InboundMessage;
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;
use tokio::task::JoinHandle;
use tokio::time::Duration;
use tracing::{debug, error, info, warn};

/// Service-level errors
#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("AMQP connection error: {message}")]
    AmqpConnection { message: String },

    #[error("Service initialization error: {message}")]
    Initialization { message: String },

    #[error("Background task error: {message}")]
    BackgroundTask { message: String },
}

/// Filters inbound chat messages and feeds accepted ones to the coordinator
pub struct CoordinatorMessageHandler {
    filter: MessageFilter,
    coordinator: Arc<LobbyCoordinator>,
    metrics_collector: Arc<MetricsCollector>,
}

impl CoordinatorMessageHandler {
    pub fn new(
        filter: MessageFilter,
        coordinator: Arc<LobbyCoordinator>,
        metrics_collector: Arc<MetricsCollector>,
    ) -> Self {
        Self {
            filter,
            coordinator,
            metrics_collector,
        }
    }
}

#[async_trait]
impl MessageHandler for CoordinatorMessageHandler {
    async fn handle_inbound_message(&self, message: InboundMessage) -> LobbyResult<()> {
        let Some(event) = self.filter.accept(&message) else {
            self.metrics_collector.record_inbound("filtered");
            return Ok(());
        };
        self.metrics_collector.record_inbound("accepted");

        let outcome = self.coordinator.handle_command(event).await?;
        if let Some(command) = outcome.command {
            debug!(
                "Message {} handled as {} - transition: {:?}, outbound: {}",
                message.message_id,
                command,
                outcome.transition,
                outcome.outbound.len()
            );
        }
        Ok(())
    }

    async fn handle_error(&self, error: LobbyBotError, message_data: &[u8]) {
        self.metrics_collector.record_inbound("invalid");
        error!(
            "Dropping inbound message ({} bytes): {}",
            message_data.len(),
            error
        );

        if !message_data.is_empty() {
            let preview_len = std::cmp::min(100, message_data.len());
            let preview = String::from_utf8_lossy(&message_data[..preview_len]);
            debug!("Message preview: {:?}", preview);
        }
    }
}

/// Main application state containing all service components
pub struct AppState {
    config: AppConfig,

    coordinator: Arc<LobbyCoordinator>,

    amqp_connection: Arc<AmqpConnection>,

    metrics_service: Arc<MetricsService>,

    /// Running flag, broker flag and coordinator handle shared with the probes
    monitor: ServiceMonitor,

    background_tasks: Vec<JoinHandle<()>>,

    consumer: Option<InboundMessageConsumer>,
}

impl AppState {
    /// Connect to the broker and build every component
    pub async fn new(config: AppConfig) -> Result<Self, ServiceError> {
        info!("Initializing {} lobby bot", config.service.name);
        info!(
            "Configuration: players_to_begin={}, home_channel={:?}, amqp_url={}",
            config.lobby.players_to_begin, config.lobby.home_channel, config.amqp.url
        );

        let amqp_connection = Self::initialize_amqp(&config).await?;

        let metrics_collector =
            Arc::new(
                MetricsCollector::new().map_err(|e| ServiceError::Initialization {
                    message: format!("Failed to create metrics collector: {}", e),
                })?,
            );

        let coordinator =
            Self::initialize_coordinator(&config, &amqp_connection, metrics_collector.clone())
                .await?;

        let monitor = ServiceMonitor::new(config.service.name.clone(), coordinator.clone());
        monitor.set_amqp_connected(amqp_connection.is_open()).await;

        let health_server = HealthServer::new(
            HealthServerConfig {
                port: config.service.health_port,
                host: "0.0.0.0".to_string(),
            },
            metrics_collector.clone(),
        )
        .with_monitor(monitor.clone());
        let metrics_service = Arc::new(MetricsService::new(
            metrics_collector,
            Arc::new(health_server),
        ));

        Ok(Self {
            config,
            coordinator,
            amqp_connection,
            metrics_service,
            monitor,
            background_tasks: Vec::new(),
            consumer: None,
        })
    }

    /// Start the health server, the consumer and the background tasks
    pub async fn start(&mut self) -> Result<(), ServiceError> {
        info!("Starting {}", self.config.service.name);

        self.monitor.set_running(true).await;

        self.start_metrics_service().await?;
        self.start_amqp_consumption().await?;
        self.start_background_tasks();

        info!("✅ {} started successfully", self.config.service.name);
        Ok(())
    }

    /// Perform graceful shutdown
    pub async fn shutdown(&mut self) -> Result<(), ServiceError> {
        info!("Starting graceful shutdown of {}", self.config.service.name);

        self.monitor.set_running(false).await;

        if let Some(consumer) = self.consumer.take() {
            if let Err(e) = consumer.stop_consuming().await {
                warn!("Failed to stop AMQP consumer: {}", e);
            } else {
                info!("✅ AMQP message consumption stopped");
            }
        }

        if let Err(e) = self.metrics_service.stop().await {
            warn!("Failed to stop metrics service: {}", e);
        }

        self.stop_background_tasks().await;

        let final_stats =
            self.coordinator
                .stats()
                .map_err(|e| ServiceError::BackgroundTask {
                    message: format!("Failed to get final stats: {}", e),
                })?;
        info!("Final coordinator statistics: {:?}", final_stats);

        if let Some(lobby) = self.coordinator.current_lobby().await {
            info!("Discarding open lobby at shutdown: {}", lobby);
        }

        info!("✅ {} shutdown completed", self.config.service.name);
        Ok(())
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub async fn is_running(&self) -> bool {
        self.monitor.is_running().await
    }

    pub fn coordinator(&self) -> Arc<LobbyCoordinator> {
        self.coordinator.clone()
    }

    pub fn monitor(&self) -> &ServiceMonitor {
        &self.monitor
    }

    /// Full health report for the current process
    pub async fn health(&self) -> LobbyResult<HealthCheck> {
        HealthCheck::check(&self.monitor).await
    }

    async fn initialize_amqp(config: &AppConfig) -> Result<Arc<AmqpConnection>, ServiceError> {
        info!("Connecting to AMQP broker: {}", config.amqp.url);

        let amqp_config =
            AmqpConfig::from_settings(&config.amqp).map_err(|e| ServiceError::Configuration {
                message: format!("Failed to parse AMQP URL: {}", e),
            })?;

        let connection =
            AmqpConnection::new(amqp_config)
                .await
                .map_err(|e| ServiceError::AmqpConnection {
                    message: format!("Failed to connect to AMQP: {}", e),
                })?;

        Ok(Arc::new(connection))
    }

    async fn initialize_coordinator(
        config: &AppConfig,
        amqp_connection: &AmqpConnection,
        metrics_collector: Arc<MetricsCollector>,
    ) -> Result<Arc<LobbyCoordinator>, ServiceError> {
        let channel = amqp_connection
            .connection()
            .open_channel(None)
            .await
            .map_err(|e| ServiceError::Initialization {
                message: format!("Failed to open AMQP channel: {}", e),
            })?;

        let publisher_config = PublisherConfig {
            exchange: config.amqp.outbound_exchange.clone(),
            ..PublisherConfig::default()
        };
        let sender = AmqpNotificationSender::new(channel, publisher_config)
            .await
            .map_err(|e| ServiceError::Initialization {
                message: format!("Failed to initialize notification sender: {}", e),
            })?;

        let rules = LobbyRules::from(&config.lobby);
        info!(
            "Lobby rules: players_to_begin={}, auth_users={}, self_destruct_time={:?}",
            rules.players_to_begin,
            rules.auth_users.len(),
            rules.self_destruct_time
        );

        Ok(Arc::new(LobbyCoordinator::with_metrics(
            rules,
            Arc::new(sender),
            metrics_collector,
        )))
    }

    async fn start_metrics_service(&mut self) -> Result<(), ServiceError> {
        let metrics_service = self.metrics_service.clone();
        let port = self.config.service.health_port;

        let handle = tokio::spawn(async move {
            if let Err(e) = metrics_service.start().await {
                error!("Metrics service failed: {}", e);
            }
        });
        self.background_tasks.push(handle);

        // Give the server a moment to bind
        tokio::time::sleep(Duration::from_millis(100)).await;

        info!("✅ Health and metrics endpoints on port {}", port);
        Ok(())
    }

    async fn start_amqp_consumption(&mut self) -> Result<(), ServiceError> {
        let queue = self.config.amqp.inbound_queue.clone();

        let channel = self
            .amqp_connection
            .connection()
            .open_channel(None)
            .await
            .map_err(|e| ServiceError::AmqpConnection {
                message: format!("Failed to open consumer channel: {}", e),
            })?;

        let queue_declare_args = amqprs::channel::QueueDeclareArguments::new(&queue)
            .durable(true)
            .auto_delete(false)
            .finish();

        channel
            .queue_declare(queue_declare_args)
            .await
            .map_err(|e| ServiceError::AmqpConnection {
                message: format!("Failed to declare queue {}: {}", queue, e),
            })?;
        info!("Queue '{}' declared", queue);

        let handler = Arc::new(CoordinatorMessageHandler::new(
            MessageFilter::from_settings(&self.config.lobby),
            self.coordinator.clone(),
            self.metrics_service.collector(),
        ));

        let consumer = InboundMessageConsumer::new(handler, channel);
        consumer
            .start_consuming(&queue)
            .await
            .map_err(|e| ServiceError::AmqpConnection {
                message: format!("Failed to start consuming messages: {}", e),
            })?;

        self.consumer = Some(consumer);
        info!("Listening for chat commands on queue '{}'", queue);
        Ok(())
    }

    /// Periodic refresh of health gauges and the broker flag
    fn start_background_tasks(&mut self) {
        let monitor = self.monitor.clone();
        let metrics_collector = self.metrics_service.collector();
        let amqp_connection = self.amqp_connection.clone();

        let health_task = tokio::spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_secs(30));

            while monitor.is_running().await {
                interval.tick().await;

                let connected = amqp_connection.is_open();
                if !connected {
                    warn!("AMQP connection is closed");
                }
                monitor.set_amqp_connected(connected).await;

                metrics_collector.update_uptime(Duration::from_secs(monitor.uptime_seconds()));
                match HealthCheck::check(&monitor).await {
                    Ok(health) => {
                        metrics_collector.update_health_status(health.status.as_gauge());
                        for check in &health.checks {
                            metrics_collector.update_component_health(
                                &check.name,
                                check.status == crate::service::health::HealthStatus::Healthy,
                            );
                        }
                        debug!("Health refreshed: {:?}", health.status);
                    }
                    Err(e) => warn!("Health refresh failed: {}", e),
                }
            }

            info!("Health metrics task stopped");
        });

        self.background_tasks.push(health_task);
        info!("{} background tasks running", self.background_tasks.len());
    }

    async fn stop_background_tasks(&mut self) {
        let task_count = self.background_tasks.len();
        if task_count == 0 {
            return;
        }

        info!("Stopping {} background tasks...", task_count);
        for task in self.background_tasks.drain(..) {
            task.abort();
        }

        tokio::time::sleep(Duration::from_millis(100)).await;
        info!("✅ All {} background tasks stopped", task_count);
    }
}
