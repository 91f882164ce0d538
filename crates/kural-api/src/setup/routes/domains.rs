//! Upload and maintenance route groups.

use crate::handlers;
use crate::state::AppState;
use axum::routing::{get, post};
use axum::Router;
use kural_core::constants::API_PREFIX;
use std::sync::Arc;

/// Cover and gallery routes under `/{entity_type}/{owner_id}/`.
pub fn upload_routes(entity_type: &str) -> Router<Arc<AppState>> {
    let base = format!("{}/{}/{{owner_id}}", API_PREFIX, entity_type);

    Router::new()
        .route(
            &format!("{}/cover", base),
            post(handlers::uploads::upload_cover),
        )
        .route(
            &format!("{}/gallery", base),
            post(handlers::uploads::upload_gallery),
        )
}

pub fn cleanup_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route(
            &format!("{}/uploads/cleanup", API_PREFIX),
            post(handlers::cleanup::cleanup_images),
        )
        .route(
            &format!("{}/uploads/probe", API_PREFIX),
            get(handlers::cleanup::probe_image),
        )
}
