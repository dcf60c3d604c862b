//! Health Check Endpoints
//!
//! - /health/live - Process alive check
//! - /health - Aggregate report (database connectivity, service configuration)
//!
//! No authentication required for health endpoints.

use axum::{
    extract::State,
    http::{StatusCode, Uri},
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use blueprint_storage::BlueprintRepository;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::error::ApiError;

// ============================================================================
// TYPES
// ============================================================================

/// Ordered from best to worst so the aggregate is the maximum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Degraded,
    Unhealthy,
}

impl HealthStatus {
    /// Degraded still serves traffic; only Unhealthy is reported as 503.
    pub fn http_status(&self) -> StatusCode {
        match self {
            HealthStatus::Healthy | HealthStatus::Degraded => StatusCode::OK,
            HealthStatus::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckResult {
    pub status: HealthStatus,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latency_ms: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthChecks {
    pub database_health: CheckResult,
    pub service_health: CheckResult,
}

/// Aggregate health report
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthReport {
    pub status: HealthStatus,
    pub checks: HealthChecks,
    pub version: String,
    pub uptime_seconds: u64,
}

/// Liveness response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LivenessResponse {
    pub status: HealthStatus,
    pub message: String,
}

// ============================================================================
// STATE
// ============================================================================

#[derive(Clone)]
pub struct HealthState {
    pub repository: Arc<dyn BlueprintRepository>,
    pub service_name: String,
    pub shutdown: CancellationToken,
    pub start_time: Instant,
}

impl HealthState {
    pub fn new(
        repository: Arc<dyn BlueprintRepository>,
        service_name: impl Into<String>,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            repository,
            service_name: service_name.into(),
            shutdown,
            start_time: Instant::now(),
        }
    }
}

// ============================================================================
// CHECKS
// ============================================================================

async fn check_database(state: &HealthState) -> CheckResult {
    if state.shutdown.is_cancelled() {
        return CheckResult {
            status: HealthStatus::Unhealthy,
            description: "Service is shutting down".to_string(),
            latency_ms: None,
        };
    }

    let start = Instant::now();
    let healthy = state
        .repository
        .health_check(&state.shutdown.child_token())
        .await;
    let latency_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX);

    if healthy {
        CheckResult {
            status: HealthStatus::Healthy,
            description: "Database connection is healthy".to_string(),
            latency_ms: Some(latency_ms),
        }
    } else {
        CheckResult {
            status: HealthStatus::Degraded,
            description: "Database health check failed".to_string(),
            latency_ms: Some(latency_ms),
        }
    }
}

fn check_service(state: &HealthState) -> CheckResult {
    if state.service_name.is_empty() {
        CheckResult {
            status: HealthStatus::Degraded,
            description: "Service has configuration issues".to_string(),
            latency_ms: None,
        }
    } else {
        CheckResult {
            status: HealthStatus::Healthy,
            description: "Service is configured and running".to_string(),
            latency_ms: None,
        }
    }
}

// ============================================================================
// HANDLERS
// ============================================================================

/// GET /health/live - Process liveness check
pub async fn liveness() -> impl IntoResponse {
    let response = LivenessResponse {
        status: HealthStatus::Healthy,
        message: "Process is alive".to_string(),
    };
    (StatusCode::OK, Json(response))
}

/// GET /health - Aggregate health report
pub async fn health(State(state): State<Arc<HealthState>>) -> impl IntoResponse {
    let database_health = check_database(&state).await;
    let service_health = check_service(&state);

    let status = database_health.status.max(service_health.status);
    if status != HealthStatus::Healthy {
        tracing::warn!(
            database = ?database_health.status,
            service = ?service_health.status,
            "Health check not healthy"
        );
    }

    let report = HealthReport {
        status,
        checks: HealthChecks {
            database_health,
            service_health,
        },
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds: state.start_time.elapsed().as_secs(),
    };

    (status.http_status(), Json(report))
}

async fn not_found(uri: Uri) -> ApiError {
    ApiError::not_found(format!("No route for {}", uri.path()))
}

// ============================================================================
// ROUTER
// ============================================================================

/// Create health check router (no auth required)
pub fn create_router(state: HealthState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/health/live", get(liveness))
        .fallback(not_found)
        .with_state(Arc::new(state))
}
