//! Health check handlers and response types.

use crate::state::AppState;
use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use std::fmt::Display;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

const TIMEOUT: Duration = Duration::from_secs(5);

/// Key that is never written; a stat on it exercises the backend without side effects.
const PROBE_KEY: &str = ".health-check";

/// Run an async check with timeout; returns "healthy", "timeout", or "{prefix}: {error}".
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

#[derive(serde::Serialize)]
pub(super) struct HealthCheckResponse {
    pub status: String,
    pub storage: String,
    pub backend: kural_core::StorageBackend,
    pub environment: String,
}

/// Liveness probe - process is running.
pub async fn health_check(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(HealthCheckResponse {
            status: "alive".to_string(),
            storage: "not_checked".to_string(),
            backend: state.storage.backend_type(),
            environment: state.config.environment().to_string(),
        }),
    )
}

/// Readiness probe - the storage backend answers a stat.
pub async fn readiness_check(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let storage = state.storage.clone();
    let storage_status = run_check(
        TIMEOUT,
        async move {
            match storage.stat(PROBE_KEY).await {
                Ok(_) | Err(kural_storage::StorageError::NotFound(_)) => Ok(()),
                Err(e) => Err(e),
            }
        },
        "not_ready",
    )
    .await;

    let ready = storage_status == "healthy";
    if !ready {
        tracing::error!(storage = %storage_status, "Storage readiness check failed");
    }

    let response = HealthCheckResponse {
        status: if ready { "ready" } else { "not_ready" }.to_string(),
        storage: storage_status,
        backend: state.storage.backend_type(),
        environment: state.config.environment().to_string(),
    };

    let status_code = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (status_code, Json(response))
}
