//! Health checks for the lobby bot
//!
//! Readiness and liveness probes plus a detailed report combining component
//! checks with the coordinator's statistics.

use crate::lobby::LobbyCoordinator;
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::RwLock;
use tracing::error;

/// Health check status
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Degraded,
    Unhealthy,
}

impl HealthStatus {
    /// Value exported through the `lobby_health_status` gauge
    pub fn as_gauge(&self) -> u8 {
        match self {
            HealthStatus::Healthy => 2,
            HealthStatus::Degraded => 1,
            HealthStatus::Unhealthy => 0,
        }
    }

    fn combine(self, other: &HealthStatus) -> HealthStatus {
        match (self, other) {
            (HealthStatus::Unhealthy, _) | (_, HealthStatus::Unhealthy) => HealthStatus::Unhealthy,
            (HealthStatus::Degraded, _) | (_, HealthStatus::Degraded) => HealthStatus::Degraded,
            _ => HealthStatus::Healthy,
        }
    }
}

impl std::fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HealthStatus::Healthy => write!(f, "✅ healthy"),
            HealthStatus::Degraded => write!(f, "⚠️  degraded"),
            HealthStatus::Unhealthy => write!(f, "❌ unhealthy"),
        }
    }
}

/// State shared by the health probes and the HTTP server
#[derive(Clone)]
pub struct ServiceMonitor {
    /// Name reported in health responses
    service_name: String,
    /// Coordinator whose stats are reported
    coordinator: Arc<LobbyCoordinator>,
    /// Set once the consumer is running, cleared on shutdown
    is_running: Arc<RwLock<bool>>,
    /// Last known broker connection state
    amqp_connected: Arc<RwLock<bool>>,
    started_at: Instant,
}

impl ServiceMonitor {
    /// Create a monitor for a service that has not started yet
    pub fn new(service_name: impl Into<String>, coordinator: Arc<LobbyCoordinator>) -> Self {
        Self {
            service_name: service_name.into(),
            coordinator,
            is_running: Arc::new(RwLock::new(false)),
            amqp_connected: Arc::new(RwLock::new(false)),
            started_at: Instant::now(),
        }
    }

    /// Get the service name
    pub fn service_name(&self) -> &str {
        &self.service_name
    }

    /// Get a handle to the coordinator
    pub fn coordinator(&self) -> Arc<LobbyCoordinator> {
        self.coordinator.clone()
    }

    /// Check if the service is running
    pub async fn is_running(&self) -> bool {
        *self.is_running.read().await
    }

    /// Mark the service as running or stopped
    pub async fn set_running(&self, running: bool) {
        *self.is_running.write().await = running;
    }

    /// Check if the broker connection was open at the last check
    pub async fn is_amqp_connected(&self) -> bool {
        *self.amqp_connected.read().await
    }

    /// Record the broker connection state
    pub async fn set_amqp_connected(&self, connected: bool) {
        *self.amqp_connected.write().await = connected;
    }

    /// Seconds since the monitor was created
    pub fn uptime_seconds(&self) -> u64 {
        self.started_at.elapsed().as_secs()
    }
}

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthCheck {
    /// Overall service status
    pub status: HealthStatus,
    pub service: String,
    pub version: String,
    pub timestamp: chrono::DateTime<chrono::Utc>,
    /// Detailed component checks
    pub checks: Vec<ComponentCheck>,
    pub stats: ServiceStats,
}

/// Individual component health check
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentCheck {
    pub name: String,
    pub status: HealthStatus,
    /// Optional error message if not healthy
    pub message: Option<String>,
    /// Check duration in milliseconds
    pub duration_ms: u64,
}

/// Service statistics for health reporting
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServiceStats {
    pub lobby_open: bool,
    pub current_members: usize,
    pub lobbies_opened: u64,
    pub lobbies_closed: u64,
    pub games_started: u64,
    pub commands_handled: u64,
    pub delivery_failures: u64,
    pub uptime_seconds: u64,
}

impl HealthCheck {
    /// Perform a comprehensive health check of the service
    pub async fn check(monitor: &ServiceMonitor) -> Result<Self> {
        let checks = vec![
            Self::check_service_running(monitor).await,
            Self::check_coordinator(monitor),
            Self::check_amqp(monitor).await,
        ];

        let status = checks
            .iter()
            .fold(HealthStatus::Healthy, |acc, check| acc.combine(&check.status));

        Ok(HealthCheck {
            status,
            service: monitor.service_name().to_string(),
            version: crate::VERSION.to_string(),
            timestamp: chrono::Utc::now(),
            checks,
            stats: Self::gather_service_stats(monitor),
        })
    }

    /// Simple liveness check - just verify service is running
    pub async fn liveness_check(monitor: &ServiceMonitor) -> Result<HealthStatus> {
        if monitor.is_running().await {
            Ok(HealthStatus::Healthy)
        } else {
            Ok(HealthStatus::Unhealthy)
        }
    }

    /// Readiness check - running, coordinator usable, broker reachable
    pub async fn readiness_check(monitor: &ServiceMonitor) -> Result<HealthStatus> {
        if !monitor.is_running().await {
            return Ok(HealthStatus::Unhealthy);
        }

        let coordinator = Self::check_coordinator(monitor).status;
        let amqp = Self::check_amqp(monitor).await.status;
        Ok(coordinator.combine(&amqp))
    }

    async fn check_service_running(monitor: &ServiceMonitor) -> ComponentCheck {
        let start = Instant::now();

        let (status, message) = if monitor.is_running().await {
            (HealthStatus::Healthy, None)
        } else {
            (
                HealthStatus::Unhealthy,
                Some("Service is not running".to_string()),
            )
        };

        ComponentCheck {
            name: "service_running".to_string(),
            status,
            message,
            duration_ms: start.elapsed().as_millis() as u64,
        }
    }

    fn check_coordinator(monitor: &ServiceMonitor) -> ComponentCheck {
        let start = Instant::now();

        let (status, message) = match monitor.coordinator.stats() {
            Ok(_) => (HealthStatus::Healthy, None),
            Err(e) => {
                error!("Coordinator stats check failed: {}", e);
                (
                    HealthStatus::Unhealthy,
                    Some(format!("Stats check failed: {}", e)),
                )
            }
        };

        ComponentCheck {
            name: "coordinator".to_string(),
            status,
            message,
            duration_ms: start.elapsed().as_millis() as u64,
        }
    }

    /// Without a broker the bot still answers nothing, but it stays up
    async fn check_amqp(monitor: &ServiceMonitor) -> ComponentCheck {
        let start = Instant::now();

        let (status, message) = if monitor.is_amqp_connected().await {
            (HealthStatus::Healthy, None)
        } else {
            (
                HealthStatus::Degraded,
                Some("Not connected to the message broker".to_string()),
            )
        };

        ComponentCheck {
            name: "amqp_connection".to_string(),
            status,
            message,
            duration_ms: start.elapsed().as_millis() as u64,
        }
    }

    fn gather_service_stats(monitor: &ServiceMonitor) -> ServiceStats {
        let uptime_seconds = monitor.uptime_seconds();
        match monitor.coordinator.stats() {
            Ok(stats) => ServiceStats {
                lobby_open: stats.current_lobby.is_some(),
                current_members: stats.current_members,
                lobbies_opened: stats.lobbies_opened,
                lobbies_closed: stats.lobbies_closed,
                games_started: stats.games_started,
                commands_handled: stats.commands_handled,
                delivery_failures: stats.delivery_failures,
                uptime_seconds,
            },
            Err(_) => ServiceStats {
                uptime_seconds,
                ..ServiceStats::default()
            },
        }
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| anyhow::anyhow!("Failed to serialize health check: {}", e))
    }
}
