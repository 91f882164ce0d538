use std::sync::Arc;

use axum::{
    extract::{Query, State},
    Json,
};
use kural_processing::ProbeReport;
use kural_storage::DeleteOutcome;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::error::{ErrorResponse, HttpAppError, ValidatedJson};
use crate::state::AppState;

#[derive(Debug, Deserialize, ToSchema)]
pub struct CleanupRequest {
    /// Public paths to delete, e.g. `/uploads/books/cover_42_1718000000000.webp`
    pub paths: Vec<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CleanupResponse {
    #[schema(value_type = Vec<Object>)]
    pub results: Vec<DeleteOutcome>,
    pub deleted: usize,
    pub failed: usize,
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ProbeQuery {
    /// Public path to inspect
    pub path: String,
}

/// Delete stored images
///
/// Each path is attempted independently. The default cover placeholder is
/// skipped and does not appear in the results.
#[utoipa::path(
    post,
    path = "/api/v1/uploads/cleanup",
    tag = "uploads",
    request_body = CleanupRequest,
    responses(
        (status = 200, description = "Per-path deletion results", body = CleanupResponse),
        (status = 400, description = "Malformed request body", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip_all, fields(paths = request.paths.len(), operation = "cleanup"))]
pub async fn cleanup_images(
    State(state): State<Arc<AppState>>,
    ValidatedJson(request): ValidatedJson<CleanupRequest>,
) -> Result<Json<CleanupResponse>, HttpAppError> {
    let results = state.processor.cleanup(&request.paths).await;
    let deleted = results.iter().filter(|outcome| outcome.success).count();

    Ok(Json(CleanupResponse {
        failed: results.len() - deleted,
        deleted,
        results,
    }))
}

/// Inspect a stored image
///
/// Always answers 200; a missing or unreadable file is reported with
/// `exists: false`.
#[utoipa::path(
    get,
    path = "/api/v1/uploads/probe",
    tag = "uploads",
    params(ProbeQuery),
    responses(
        (status = 200, description = "What is known about the path", body = inline(Object))
    )
)]
pub async fn probe_image(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ProbeQuery>,
) -> Json<ProbeReport> {
    Json(state.processor.probe(&query.path).await)
}
