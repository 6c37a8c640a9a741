//! Health check handlers.

use crate::state::AppState;
use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde::Serialize;
use std::fmt::Display;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

const CHECK_TIMEOUT: Duration = Duration::from_secs(5);
const STORAGE_PROBE_KEY: &str = "health-check-non-existent-key";

/// Run a check with a timeout: "healthy", "timeout" or "{prefix}: {error}".
async fn run_check<F, E>(timeout: Duration, f: F, error_prefix: &str) -> String
where
    F: Future<Output = Result<(), E>>,
    E: Display,
{
    match tokio::time::timeout(timeout, f).await {
        Ok(Ok(())) => "healthy".to_string(),
        Ok(Err(e)) => format!("{}: {}", error_prefix, e),
        Err(_) => "timeout".to_string(),
    }
}

#[derive(Debug, Serialize)]
pub struct HealthCheckResponse {
    pub status: String,
    pub database: String,
    pub storage: String,
    pub ocr_engines: Vec<String>,
    pub structuring: bool,
    pub admin_subscribers: usize,
}

/// Full health check: database, storage and configured providers.
pub async fn health_check(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let store = state.store.clone();
    let database = run_check(CHECK_TIMEOUT, async move { store.ping().await }, "unhealthy").await;

    let storage = state.storage.clone();
    let storage = run_check(
        CHECK_TIMEOUT,
        async move { storage.exists(STORAGE_PROBE_KEY).await.map(drop) },
        "unhealthy",
    )
    .await;

    let healthy = database == "healthy" && storage == "healthy";
    if !healthy {
        tracing::warn!(database = %database, storage = %storage, "Health check degraded");
    }

    let response = HealthCheckResponse {
        status: if healthy { "healthy" } else { "unhealthy" }.to_string(),
        database,
        storage,
        ocr_engines: state.ocr_engines.clone(),
        structuring: state.structuring_enabled,
        admin_subscribers: state.events.subscriber_count(),
    };
    let status = if healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (status, Json(response))
}

/// Liveness probe: the process is running.
pub async fn liveness_check() -> impl IntoResponse {
    (StatusCode::OK, Json(serde_json::json!({ "status": "alive" })))
}

/// Readiness probe: the database answers.
pub async fn readiness_check(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let store = state.store.clone();
    match tokio::time::timeout(CHECK_TIMEOUT, async move { store.ping().await }).await {
        Ok(Ok(())) => (
            StatusCode::OK,
            Json(serde_json::json!({ "status": "ready", "database": "ready" })),
        ),
        Ok(Err(e)) => {
            tracing::error!(error = %e, "Database readiness check failed");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(serde_json::json!({ "status": "not_ready", "database": format!("not_ready: {}", e) })),
            )
        }
        Err(_) => {
            tracing::error!("Database readiness check timed out");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(serde_json::json!({ "status": "not_ready", "database": "timeout" })),
            )
        }
    }
}
