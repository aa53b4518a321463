//! Health check handlers for worker processes.
//!
//! This module provides reusable Axum handlers for:
//! - Liveness probes (`/health`, `/healthz`)
//! - Readiness probes (`/ready`, `/readyz`)
//! - Worker monitoring (`/workers`)
//! - Prometheus metrics (`/metrics`)

use axum::{
    extract::State,
    http::{StatusCode, header},
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use serde::Serialize;
use serde_json::{Value, json};
use std::sync::Arc;

use crate::metrics;
use crate::registry::WorkerRegistry;

/// Shared state for health endpoints.
#[derive(Clone)]
pub struct HealthState {
    /// Registry of running workers.
    pub registry: Arc<WorkerRegistry>,
    /// Application name.
    pub app_name: String,
    /// Application version.
    pub app_version: String,
}

impl HealthState {
    /// Create a new health state.
    pub fn new(
        registry: Arc<WorkerRegistry>,
        app_name: impl Into<String>,
        app_version: impl Into<String>,
    ) -> Self {
        Self {
            registry,
            app_name: app_name.into(),
            app_version: app_version.into(),
        }
    }
}

/// Health response for liveness probes.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Status (always "healthy" if responding).
    pub status: &'static str,
    /// Application name.
    pub name: String,
    /// Application version.
    pub version: String,
}

/// Liveness probe handler.
///
/// Always returns OK if the server is running.
pub async fn health_handler(State(state): State<HealthState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        name: state.app_name,
        version: state.app_version,
    })
}

/// Readiness probe handler.
///
/// Ready when at least one registered worker is running its dispatch loop.
pub async fn ready_handler(
    State(state): State<HealthState>,
) -> Result<(StatusCode, Json<Value>), (StatusCode, Json<Value>)> {
    let workers = state.registry.snapshot().await;
    let running = workers.iter().filter(|w| w.state == "running").count();

    if running > 0 {
        Ok((
            StatusCode::OK,
            Json(json!({
                "status": "ready",
                "workers_running": running
            })),
        ))
    } else {
        Err((
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({
                "status": "not_ready",
                "workers_registered": workers.len()
            })),
        ))
    }
}

/// Worker monitoring handler.
///
/// Returns every registered instance with its dispatch state.
pub async fn workers_handler(State(state): State<HealthState>) -> Json<Value> {
    let workers = state.registry.snapshot().await;
    Json(json!({
        "count": workers.len(),
        "workers": workers
    }))
}

/// Prometheus metrics endpoint handler.
pub async fn metrics_handler() -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        metrics::render_metrics(),
    )
}

/// Build the health router for a worker process.
pub fn health_router(state: HealthState) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/healthz", get(health_handler))
        .route("/ready", get(ready_handler))
        .route("/readyz", get(ready_handler))
        .route("/workers", get(workers_handler))
        .route("/metrics", get(metrics_handler))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::worker::WorkerInstance;

    fn state_with(registry: WorkerRegistry) -> HealthState {
        HealthState::new(Arc::new(registry), "test-worker", "0.1.0")
    }

    #[tokio::test]
    async fn test_health_is_always_ok() {
        let state = state_with(WorkerRegistry::new());
        let response = health_handler(State(state)).await;
        assert_eq!(response.0.status, "healthy");
        assert_eq!(response.0.name, "test-worker");
    }

    #[tokio::test]
    async fn test_ready_requires_a_running_worker() {
        let registry = WorkerRegistry::new();
        registry
            .register(Arc::new(WorkerInstance::new("orders", Vec::new())))
            .await;

        // Registered but not running yet: not ready.
        let state = state_with(registry);
        assert!(ready_handler(State(state.clone())).await.is_err());
    }

    #[tokio::test]
    async fn test_workers_handler_lists_instances() {
        let registry = WorkerRegistry::new();
        registry
            .register(Arc::new(WorkerInstance::new("orders", Vec::new())))
            .await;

        let state = state_with(registry);
        let response = workers_handler(State(state)).await;
        assert_eq!(response.0["count"], 1);
        assert_eq!(response.0["workers"][0]["worker_type"], "orders");
    }
}
