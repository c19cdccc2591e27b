//! Metrics collection using Prometheus
//!
//! Counters and gauges for the lobby bot, grouped the same way they are
//! reported: service health, lobby lifecycle, and command handling.

use crate::lobby::{CloseReason, Command, Rejection};
use anyhow::Result;
use prometheus::{
    HistogramOpts, HistogramVec, IntCounter, IntCounterVec, IntGauge, IntGaugeVec, Opts, Registry,
};
use std::sync::Arc;
use std::time::Duration;

/// Main metrics collector for the lobby bot
#[derive(Clone)]
pub struct MetricsCollector {
    /// Prometheus registry
    registry: Arc<Registry>,

    /// Service-level metrics
    service_metrics: ServiceMetrics,

    /// Lobby lifecycle metrics
    lobby_metrics: LobbyMetrics,

    /// Command handling metrics
    command_metrics: CommandMetrics,
}

/// Service-level metrics
#[derive(Clone)]
pub struct ServiceMetrics {
    /// Service uptime in seconds
    pub uptime_seconds: IntGauge,

    /// Inbound chat messages by filter outcome
    pub inbound_messages_total: IntCounterVec,

    /// Health check status (0=unhealthy, 1=degraded, 2=healthy)
    pub health_status: IntGauge,

    /// Component health status
    pub component_health: IntGaugeVec,
}

/// Lobby lifecycle metrics
#[derive(Clone)]
pub struct LobbyMetrics {
    pub lobbies_opened_total: IntCounter,

    pub lobbies_closed_total: IntCounterVec,

    pub games_started_total: IntCounter,

    /// Members in the open lobby, 0 when none is open
    pub members: IntGauge,

    /// 1 while a lobby is open
    pub open: IntGauge,
}

/// Command handling metrics
#[derive(Clone)]
pub struct CommandMetrics {
    pub commands_total: IntCounterVec,

    pub rejections_total: IntCounterVec,

    pub command_duration: HistogramVec,

    /// Outbound deliveries by kind and status
    pub outbound_total: IntCounterVec,
}

impl MetricsCollector {
    /// Create a new metrics collector with default registry
    pub fn new() -> Result<Self> {
        let registry = Arc::new(Registry::new());
        Self::with_registry(registry)
    }

    /// Create a new metrics collector with custom registry
    pub fn with_registry(registry: Arc<Registry>) -> Result<Self> {
        let service_metrics = ServiceMetrics::new(&registry)?;
        let lobby_metrics = LobbyMetrics::new(&registry)?;
        let command_metrics = CommandMetrics::new(&registry)?;

        Ok(Self {
            registry,
            service_metrics,
            lobby_metrics,
            command_metrics,
        })
    }

    /// Get the Prometheus registry
    pub fn registry(&self) -> Arc<Registry> {
        self.registry.clone()
    }

    pub fn service(&self) -> &ServiceMetrics {
        &self.service_metrics
    }

    pub fn lobby(&self) -> &LobbyMetrics {
        &self.lobby_metrics
    }

    pub fn command(&self) -> &CommandMetrics {
        &self.command_metrics
    }

    /// Record a recognised command and how long it took end to end
    pub fn record_command(&self, command: Command, duration: Duration) {
        self.command_metrics
            .commands_total
            .with_label_values(&[command.as_str()])
            .inc();
        self.command_metrics
            .command_duration
            .with_label_values(&[command.as_str()])
            .observe(duration.as_secs_f64());
    }

    pub fn record_rejection(&self, rejection: Rejection) {
        self.command_metrics
            .rejections_total
            .with_label_values(&[rejection.as_str()])
            .inc();
    }

    pub fn record_lobby_opened(&self) {
        self.lobby_metrics.lobbies_opened_total.inc();
    }

    /// Record a lobby closing; a quorum close also counts as a started game
    pub fn record_lobby_closed(&self, reason: CloseReason) {
        self.lobby_metrics
            .lobbies_closed_total
            .with_label_values(&[reason.as_str()])
            .inc();

        if reason == CloseReason::Quorum {
            self.lobby_metrics.games_started_total.inc();
        }
    }

    /// Mirror the current lobby into the gauges
    pub fn set_lobby_members(&self, open: bool, members: usize) {
        self.lobby_metrics.open.set(i64::from(open));
        self.lobby_metrics.members.set(members as i64);
    }

    pub fn record_outbound(&self, kind: &str, success: bool) {
        let status = if success { "success" } else { "error" };
        self.command_metrics
            .outbound_total
            .with_label_values(&[kind, status])
            .inc();
    }

    /// Record an inbound chat message by filter outcome ("accepted", "filtered", "invalid")
    pub fn record_inbound(&self, status: &str) {
        self.service_metrics
            .inbound_messages_total
            .with_label_values(&[status])
            .inc();
    }

    pub fn update_uptime(&self, uptime: Duration) {
        self.service_metrics
            .uptime_seconds
            .set(uptime.as_secs() as i64);
    }

    /// Update health status
    pub fn update_health_status(&self, status: u8) {
        self.service_metrics.health_status.set(status as i64);
    }

    /// Update component health
    pub fn update_component_health(&self, component: &str, healthy: bool) {
        let status = if healthy { 1 } else { 0 };
        self.service_metrics
            .component_health
            .with_label_values(&[component])
            .set(status);
    }
}

impl ServiceMetrics {
    fn new(registry: &Registry) -> Result<Self> {
        let uptime_seconds =
            IntGauge::new("lobby_service_uptime_seconds", "Service uptime in seconds")?;
        registry.register(Box::new(uptime_seconds.clone()))?;

        let inbound_messages_total = IntCounterVec::new(
            Opts::new(
                "lobby_inbound_messages_total",
                "Inbound chat messages by filter outcome",
            ),
            &["status"],
        )?;
        registry.register(Box::new(inbound_messages_total.clone()))?;

        let health_status = IntGauge::new(
            "lobby_health_status",
            "Health status (0=unhealthy, 1=degraded, 2=healthy)",
        )?;
        registry.register(Box::new(health_status.clone()))?;

        let component_health = IntGaugeVec::new(
            Opts::new("lobby_component_health", "Component health status"),
            &["component"],
        )?;
        registry.register(Box::new(component_health.clone()))?;

        Ok(Self {
            uptime_seconds,
            inbound_messages_total,
            health_status,
            component_health,
        })
    }
}

impl LobbyMetrics {
    fn new(registry: &Registry) -> Result<Self> {
        let lobbies_opened_total =
            IntCounter::new("lobbies_opened_total", "Total lobbies opened")?;
        registry.register(Box::new(lobbies_opened_total.clone()))?;

        let lobbies_closed_total = IntCounterVec::new(
            Opts::new("lobbies_closed_total", "Total lobbies closed"),
            &["reason"],
        )?;
        registry.register(Box::new(lobbies_closed_total.clone()))?;

        let games_started_total = IntCounter::new(
            "lobby_games_started_total",
            "Lobbies that reached quorum",
        )?;
        registry.register(Box::new(games_started_total.clone()))?;

        let members = IntGauge::new("lobby_members", "Members in the open lobby")?;
        registry.register(Box::new(members.clone()))?;

        let open = IntGauge::new("lobby_open", "Whether a lobby is open")?;
        registry.register(Box::new(open.clone()))?;

        Ok(Self {
            lobbies_opened_total,
            lobbies_closed_total,
            games_started_total,
            members,
            open,
        })
    }
}

impl CommandMetrics {
    fn new(registry: &Registry) -> Result<Self> {
        let commands_total = IntCounterVec::new(
            Opts::new("lobby_commands_total", "Recognised chat commands"),
            &["command"],
        )?;
        registry.register(Box::new(commands_total.clone()))?;

        let rejections_total = IntCounterVec::new(
            Opts::new("lobby_rejections_total", "Commands stopped by a guard"),
            &["reason"],
        )?;
        registry.register(Box::new(rejections_total.clone()))?;

        let command_duration = HistogramVec::new(
            HistogramOpts::new(
                "lobby_command_duration_seconds",
                "Command handling time including delivery",
            )
            .buckets(vec![0.001, 0.005, 0.01, 0.05, 0.1, 0.5, 1.0, 5.0]),
            &["command"],
        )?;
        registry.register(Box::new(command_duration.clone()))?;

        let outbound_total = IntCounterVec::new(
            Opts::new("lobby_outbound_total", "Outbound deliveries"),
            &["kind", "status"],
        )?;
        registry.register(Box::new(outbound_total.clone()))?;

        Ok(Self {
            commands_total,
            rejections_total,
            command_duration,
            outbound_total,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_collector_creation() {
        let collector = MetricsCollector::new().expect("Failed to create metrics collector");

        let _service = collector.service();
        let _lobby = collector.lobby();
        let _command = collector.command();
    }

    #[test]
    fn test_lobby_lifecycle_counters() {
        let collector = MetricsCollector::new().expect("Failed to create metrics collector");

        collector.record_lobby_opened();
        collector.set_lobby_members(true, 3);
        assert_eq!(collector.lobby().open.get(), 1);
        assert_eq!(collector.lobby().members.get(), 3);

        collector.record_lobby_closed(CloseReason::Quorum);
        collector.record_lobby_closed(CloseReason::Owner);
        collector.set_lobby_members(false, 0);

        let lobby = collector.lobby();
        assert_eq!(lobby.lobbies_opened_total.get(), 1);
        assert_eq!(lobby.games_started_total.get(), 1);
        assert_eq!(
            lobby.lobbies_closed_total.with_label_values(&["owner"]).get(),
            1
        );
        assert_eq!(lobby.open.get(), 0);
    }

    #[test]
    fn test_command_recording() {
        let collector = MetricsCollector::new().expect("Failed to create metrics collector");

        collector.record_command(Command::Join, Duration::from_millis(2));
        collector.record_command(Command::Join, Duration::from_millis(3));
        collector.record_rejection(Rejection::NoLobby);
        collector.record_outbound("notification", false);

        let command = collector.command();
        assert_eq!(command.commands_total.with_label_values(&["join"]).get(), 2);
        assert_eq!(
            command.rejections_total.with_label_values(&["no_lobby"]).get(),
            1
        );
        assert_eq!(
            command
                .outbound_total
                .with_label_values(&["notification", "error"])
                .get(),
            1
        );
    }

    #[test]
    fn test_health_status_updates() {
        let collector = MetricsCollector::new().expect("Failed to create metrics collector");

        collector.update_health_status(2); // Healthy
        collector.update_component_health("coordinator", true);
        collector.update_component_health("amqp", false);
        collector.update_uptime(Duration::from_secs(42));

        assert_eq!(collector.service().health_status.get(), 2);
        assert_eq!(
            collector
                .service()
                .component_health
                .with_label_values(&["amqp"])
                .get(),
            0
        );
        assert_eq!(collector.service().uptime_seconds.get(), 42);
    }
}
