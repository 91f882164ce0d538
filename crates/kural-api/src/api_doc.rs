//! OpenAPI documentation, served at `/openapi.json`.

use utoipa::OpenApi;

use crate::error;
use crate::handlers;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Kural API",
        version = "0.1.0",
        description = "Image upload pipeline for the bilingual book site: cover and gallery uploads transcoded to WebP with responsive variants, plus cleanup and probing of stored images. All endpoints are versioned under /api/v1/."
    ),
    paths(
        handlers::uploads::upload_cover,
        handlers::uploads::upload_gallery,
        handlers::cleanup::cleanup_images,
        handlers::cleanup::probe_image,
    ),
    components(schemas(
        error::ErrorResponse,
        handlers::uploads::CoverUploadResponse,
        handlers::uploads::GalleryUploadResponse,
        handlers::uploads::GalleryResult,
        handlers::cleanup::CleanupRequest,
        handlers::cleanup::CleanupResponse,
    )),
    tags(
        (name = "uploads", description = "Cover and gallery uploads, cleanup and probing")
    )
)]
pub struct ApiDoc;
