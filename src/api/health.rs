//! Health check endpoints
//!
//! Implements liveness and readiness checks for Kubernetes and other
//! orchestration platforms. Readiness reflects the last observed state of
//! the database connection; liveness never touches external dependencies.

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;

use crate::api::server::AppState;
use crate::api::{ComponentHealth, HealthResponse, HealthStatus, ReadyResponse, BUILD_INFO};
use crate::db::MessageRepository;

/// Shared component health tracking
#[derive(Clone)]
pub struct HealthState {
    components: Arc<tokio::sync::RwLock<HashMap<String, ComponentHealth>>>,
}

impl HealthState {
    /// Create a new health state
    pub fn new() -> Self {
        Self {
            components: Arc::new(tokio::sync::RwLock::new(HashMap::new())),
        }
    }

    /// Update component health status
    pub async fn update_component(
        &self,
        name: String,
        status: HealthStatus,
        message: Option<String>,
    ) {
        let mut components = self.components.write().await;
        components.insert(
            name,
            ComponentHealth {
                status,
                message,
                last_check: Utc::now(),
            },
        );
    }

    /// Snapshot of all component checks
    pub async fn checks(&self) -> HashMap<String, ComponentHealth> {
        self.components.read().await.clone()
    }

    /// Get overall health status
    pub async fn get_status(&self) -> HealthStatus {
        let components = self.components.read().await;

        if components.values().any(|c| c.status == HealthStatus::Unhealthy) {
            return HealthStatus::Unhealthy;
        }

        if components.values().any(|c| c.status == HealthStatus::Degraded) {
            return HealthStatus::Degraded;
        }

        HealthStatus::Healthy
    }
}

impl Default for HealthState {
    fn default() -> Self {
        Self::new()
    }
}

/// Basic liveness check endpoint
///
/// Returns 200 OK if the service is alive.
///
/// # Example
/// ```
/// GET /healthz
/// ```
pub async fn health_check() -> Response {
    let response = HealthResponse {
        status: HealthStatus::Healthy,
        message: Some("Service is running".to_string()),
        timestamp: Utc::now(),
    };

    (StatusCode::OK, Json(response)).into_response()
}

/// Readiness check endpoint
///
/// Reports the last observed state of each tracked dependency.
///
/// # Example
/// ```
/// GET /readyz
/// ```
pub async fn ready_check(State(state): State<AppState>) -> Response {
    let checks = state.health.checks().await;
    let overall_status = state.health.get_status().await;

    let response = ReadyResponse {
        status: overall_status,
        checks,
        timestamp: Utc::now(),
    };

    let status_code = overall_status.to_status_code();
    (status_code, Json(response)).into_response()
}

/// Build information endpoint
///
/// # Example
/// ```
/// GET /build
/// ```
pub async fn build_info() -> Response {
    (StatusCode::OK, Json(&BUILD_INFO)).into_response()
}

/// Background task that periodically refreshes component health
///
/// Runs until the process exits; each tick probes the repository and
/// records the outcome for the readiness endpoint.
pub async fn health_monitor(state: HealthState, repo: Arc<dyn MessageRepository>) {
    let mut interval = tokio::time::interval(std::time::Duration::from_secs(30));

    loop {
        interval.tick().await;

        match repo.health_check().await {
            Ok(()) => {
                state
                    .update_component(
                        "database".to_string(),
                        HealthStatus::Healthy,
                        Some("Connection pool is healthy".to_string()),
                    )
                    .await;
            },
            Err(e) => {
                state
                    .update_component(
                        "database".to_string(),
                        HealthStatus::Unhealthy,
                        Some(e.to_string()),
                    )
                    .await;
            },
        }

        tracing::debug!("Health check completed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_health_state() {
        let state = HealthState::new();

        // Initially healthy
        assert_eq!(state.get_status().await, HealthStatus::Healthy);

        state.update_component("test".to_string(), HealthStatus::Healthy, None).await;
        assert_eq!(state.get_status().await, HealthStatus::Healthy);

        state
            .update_component(
                "failing".to_string(),
                HealthStatus::Unhealthy,
                Some("Connection failed".to_string()),
            )
            .await;
        assert_eq!(state.get_status().await, HealthStatus::Unhealthy);
    }

    #[tokio::test]
    async fn test_health_check_endpoint() {
        let response = health_check().await;
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_build_info_endpoint() {
        let response = build_info().await;
        assert_eq!(response.status(), StatusCode::OK);
    }
}
