//! Health Check System
//!
//! Reports on the database pool and the task queue.

use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use ck_db::Database;
use ck_tasks::TaskQueue;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{debug, warn};

/// Health check status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Degraded,
    Unhealthy,
}

impl HealthStatus {
    pub fn is_healthy(&self) -> bool {
        matches!(self, Self::Healthy | Self::Degraded)
    }

    /// The worse of two statuses
    fn combine(self, other: Self) -> Self {
        match (self, other) {
            (Self::Unhealthy, _) | (_, Self::Unhealthy) => Self::Unhealthy,
            (Self::Degraded, _) | (_, Self::Degraded) => Self::Degraded,
            _ => Self::Healthy,
        }
    }
}

/// Individual component health
#[derive(Debug, Clone, Serialize)]
pub struct ComponentHealth {
    pub name: String,
    pub status: HealthStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub response_time_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

/// Overall health report
#[derive(Debug, Clone, Serialize)]
pub struct HealthReport {
    pub status: HealthStatus,
    pub version: String,
    pub uptime_seconds: u64,
    pub components: Vec<ComponentHealth>,
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

impl HealthReport {
    pub fn http_status(&self) -> StatusCode {
        if self.status.is_healthy() {
            StatusCode::OK
        } else {
            StatusCode::SERVICE_UNAVAILABLE
        }
    }
}

/// Health checker configuration
#[derive(Debug, Clone)]
pub struct HealthConfig {
    /// Timeout for individual health checks
    pub check_timeout: Duration,
    /// Cache duration for health results
    pub cache_duration: Duration,
}

impl Default for HealthConfig {
    fn default() -> Self {
        Self {
            check_timeout: Duration::from_secs(5),
            cache_duration: Duration::from_secs(10),
        }
    }
}

struct CachedHealth {
    report: HealthReport,
    cached_at: Instant,
}

/// Health checker service
pub struct HealthChecker {
    config: HealthConfig,
    start_time: Instant,
    cache: RwLock<Option<CachedHealth>>,
    /// `None` when running on the in-memory repository
    database: Option<Database>,
    tasks: Option<TaskQueue>,
}

impl HealthChecker {
    pub fn new(config: HealthConfig) -> Self {
        Self {
            config,
            start_time: Instant::now(),
            cache: RwLock::new(None),
            database: None,
            tasks: None,
        }
    }

    pub fn with_database(mut self, database: Database) -> Self {
        self.database = Some(database);
        self
    }

    pub fn with_tasks(mut self, tasks: TaskQueue) -> Self {
        self.tasks = Some(tasks);
        self
    }

    /// Get cached health or perform checks
    pub async fn check(&self) -> HealthReport {
        {
            let cache = self.cache.read().await;
            if let Some(ref cached) = *cache {
                if cached.cached_at.elapsed() < self.config.cache_duration {
                    debug!("Returning cached health report");
                    return cached.report.clone();
                }
            }
        }

        let report = self.perform_checks().await;

        let mut cache = self.cache.write().await;
        *cache = Some(CachedHealth {
            report: report.clone(),
            cached_at: Instant::now(),
        });

        report
    }

    async fn perform_checks(&self) -> HealthReport {
        let mut components = vec![self.check_database().await];
        if let Some(tasks) = &self.tasks {
            components.push(check_tasks(tasks));
        }

        let status = components
            .iter()
            .fold(HealthStatus::Healthy, |acc, c| acc.combine(c.status));
        if !status.is_healthy() {
            warn!(?components, "Health check failed");
        }

        HealthReport {
            status,
            version: env!("CARGO_PKG_VERSION").to_string(),
            uptime_seconds: self.start_time.elapsed().as_secs(),
            components,
            timestamp: chrono::Utc::now(),
        }
    }

    async fn check_database(&self) -> ComponentHealth {
        let start = Instant::now();

        let Some(database) = &self.database else {
            return ComponentHealth {
                name: "database".to_string(),
                status: HealthStatus::Degraded,
                message: Some("Not connected, using in-memory storage".to_string()),
                response_time_ms: 0,
                details: None,
            };
        };

        let (status, message) =
            match tokio::time::timeout(self.config.check_timeout, database.ping()).await {
                Ok(Ok(())) => (HealthStatus::Healthy, "Connected".to_string()),
                Ok(Err(e)) => (HealthStatus::Unhealthy, e.to_string()),
                Err(_) => (HealthStatus::Unhealthy, "Ping timed out".to_string()),
            };

        ComponentHealth {
            name: "database".to_string(),
            status,
            message: Some(message),
            response_time_ms: start.elapsed().as_millis() as u64,
            details: serde_json::to_value(database.stats()).ok(),
        }
    }
}

fn check_tasks(tasks: &TaskQueue) -> ComponentHealth {
    let (status, message) = if tasks.is_closed() {
        (HealthStatus::Unhealthy, "Task worker stopped")
    } else {
        (HealthStatus::Healthy, "Accepting tasks")
    };

    ComponentHealth {
        name: "task_queue".to_string(),
        status,
        message: Some(message.to_string()),
        response_time_ms: 0,
        details: Some(serde_json::json!({ "pending": tasks.pending() })),
    }
}

/// Simple health check
pub async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "healthy" }))
}

/// Liveness check (Kubernetes)
pub async fn liveness() -> &'static str {
    "OK"
}

/// Readiness check (Kubernetes)
pub async fn readiness(
    State(checker): State<Arc<HealthChecker>>,
) -> (StatusCode, Json<HealthReport>) {
    let report = checker.check().await;
    let status = report.http_status();
    (status, Json(report))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_without_database_is_degraded() {
        let checker = HealthChecker::new(HealthConfig::default());
        let report = checker.check().await;

        assert_eq!(report.status, HealthStatus::Degraded);
        assert_eq!(report.http_status(), StatusCode::OK);
        assert_eq!(report.components[0].name, "database");
    }

    #[tokio::test]
    async fn test_closed_task_queue_is_unhealthy() {
        let (queue, receiver) = TaskQueue::bounded(4);
        drop(receiver);

        let checker = HealthChecker::new(HealthConfig::default()).with_tasks(queue);
        let report = checker.check().await;

        assert_eq!(report.status, HealthStatus::Unhealthy);
        assert_eq!(report.http_status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn test_health_cache() {
        let checker = HealthChecker::new(HealthConfig {
            cache_duration: Duration::from_secs(60),
            ..Default::default()
        });

        let report1 = checker.check().await;
        let report2 = checker.check().await;

        assert_eq!(report1.timestamp, report2.timestamp);
    }

    #[test]
    fn test_combine() {
        use HealthStatus::*;
        assert_eq!(Healthy.combine(Degraded), Degraded);
        assert_eq!(Degraded.combine(Unhealthy), Unhealthy);
        assert_eq!(Healthy.combine(Healthy), Healthy);
    }
}
