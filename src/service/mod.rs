//! Service layer for the lobby bot
//!
//! Application state, component wiring and health reporting for the
//! long-running process.

pub mod app;
pub mod health;

pub use app::{AppState, CoordinatorMessageHandler, ServiceError};
pub use health::{HealthCheck, HealthStatus, ServiceMonitor};
