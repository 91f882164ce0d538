use std::collections::BTreeMap;
use std::sync::Arc;

use axum::{
    extract::{Multipart, Path, State},
    Json,
};
use kural_core::AppError;
use kural_processing::{ImageMetadata, UploadCandidate, VariantName, VariantSet};
use kural_storage::DeleteOutcome;
use serde::Serialize;
use utoipa::ToSchema;

use crate::error::{ErrorResponse, HttpAppError};
use crate::state::AppState;

/// Text field naming the cover an upload replaces.
const PREVIOUS_COVER_FIELD: &str = "previousCover";

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CoverUploadResponse {
    pub success: bool,
    /// Public path of the main cover image
    pub cover_image: String,
    /// Public path of each stored responsive variant, keyed by variant name
    #[schema(value_type = Object)]
    pub responsive_sizes: BTreeMap<VariantName, String>,
    #[schema(value_type = Object)]
    pub variants: VariantSet,
    #[schema(value_type = Object)]
    pub metadata: ImageMetadata,
    pub compression_ratio: f64,
    /// Outcome of deleting the replaced cover, when one was named
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<Object>)]
    pub previous_cover_cleanup: Option<DeleteOutcome>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct GalleryResult {
    pub path: String,
    pub filename: String,
    #[schema(value_type = Object)]
    pub metadata: ImageMetadata,
    pub compression_ratio: f64,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct GalleryUploadResponse {
    pub processed: usize,
    pub failed: usize,
    pub results: Vec<GalleryResult>,
    /// One message per failed file, numbered from 1 in upload order
    pub errors: Vec<String>,
}

/// What to do with file parts beyond the per-request limit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ExtraFiles {
    Ignore,
    Reject,
}

#[derive(Debug, Default)]
struct UploadForm {
    files: Vec<UploadCandidate>,
    previous_cover: Option<String>,
}

/// Buffer the file parts of a multipart body. Any part with a filename counts
/// as a file regardless of its field name.
async fn read_upload_form(
    mut multipart: Multipart,
    max_files: usize,
    extra: ExtraFiles,
) -> Result<UploadForm, HttpAppError> {
    let mut form = UploadForm::default();

    while let Some(field) = multipart.next_field().await? {
        let field_name = field.name().unwrap_or_default().to_string();

        let Some(filename) = field.file_name().map(str::to_string) else {
            if field_name == PREVIOUS_COVER_FIELD {
                form.previous_cover = Some(field.text().await?);
            }
            continue;
        };

        if form.files.len() >= max_files {
            match extra {
                ExtraFiles::Ignore => continue,
                ExtraFiles::Reject => {
                    return Err(AppError::BadRequest(format!(
                        "Too many files: at most {} may be uploaded per request",
                        max_files
                    ))
                    .into());
                }
            }
        }

        let mime_type = field
            .content_type()
            .unwrap_or("application/octet-stream")
            .to_string();
        let data = field.bytes().await?;

        tracing::debug!(
            field = %field_name,
            filename = %filename,
            mime_type = %mime_type,
            size = data.len(),
            "Received file part"
        );
        form.files.push(UploadCandidate::new(data, filename, mime_type));
    }

    Ok(form)
}

/// Upload a book cover
///
/// Takes the first file part of the form. An optional `previousCover` text
/// field names the cover being replaced; it is deleted once the new cover is
/// stored, unless it is the default placeholder.
///
/// The `books` segment is `UPLOAD_ENTITY_TYPE`; `books` is the default.
#[utoipa::path(
    post,
    path = "/api/v1/books/{owner_id}/cover",
    tag = "uploads",
    params(
        ("owner_id" = String, Path, description = "Id of the book the cover belongs to")
    ),
    request_body(content = inline(Object), content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "Cover stored", body = CoverUploadResponse),
        (status = 400, description = "Invalid file or form", body = ErrorResponse),
        (status = 413, description = "Request body too large", body = ErrorResponse),
        (status = 422, description = "Image could not be decoded or encoded", body = ErrorResponse),
        (status = 500, description = "Storage failure", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip_all, fields(owner_id = %owner_id, operation = "upload_cover"))]
pub async fn upload_cover(
    State(state): State<Arc<AppState>>,
    Path(owner_id): Path<String>,
    multipart: Multipart,
) -> Result<Json<CoverUploadResponse>, HttpAppError> {
    let form = read_upload_form(multipart, 1, ExtraFiles::Ignore).await?;
    let candidate = form
        .files
        .into_iter()
        .next()
        .ok_or_else(|| AppError::BadRequest("No image file provided".to_string()))?;

    let outcome = state.processor.process_cover(candidate, &owner_id).await?;

    let previous_cover_cleanup = state
        .processor
        .replace_reference(form.previous_cover.as_deref(), &outcome.public_path)
        .await;

    Ok(Json(CoverUploadResponse {
        success: true,
        cover_image: outcome.public_path,
        responsive_sizes: outcome.variant_paths,
        variants: outcome.variants,
        metadata: outcome.metadata,
        compression_ratio: outcome.compression_ratio,
        previous_cover_cleanup,
    }))
}

/// Upload gallery images
///
/// Every file part is processed on its own; one bad file does not stop the
/// rest. The response counts successes and failures.
///
/// The `books` segment is `UPLOAD_ENTITY_TYPE`; `books` is the default.
#[utoipa::path(
    post,
    path = "/api/v1/books/{owner_id}/gallery",
    tag = "uploads",
    params(
        ("owner_id" = String, Path, description = "Id of the book the images belong to")
    ),
    request_body(content = inline(Object), content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "Per-file results", body = GalleryUploadResponse),
        (status = 400, description = "No files, too many files or invalid owner id", body = ErrorResponse),
        (status = 413, description = "Request body too large", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip_all, fields(owner_id = %owner_id, operation = "upload_gallery"))]
pub async fn upload_gallery(
    State(state): State<Arc<AppState>>,
    Path(owner_id): Path<String>,
    multipart: Multipart,
) -> Result<Json<GalleryUploadResponse>, HttpAppError> {
    let form = read_upload_form(
        multipart,
        state.config.max_gallery_files(),
        ExtraFiles::Reject,
    )
    .await?;

    if form.files.is_empty() {
        return Err(AppError::BadRequest("No image files provided".to_string()).into());
    }

    let report = state.processor.process_gallery(form.files, &owner_id).await?;

    let results = report
        .images()
        .map(|image| GalleryResult {
            path: image.path.clone(),
            filename: image.filename.clone(),
            metadata: image.metadata.clone(),
            compression_ratio: image.compression_ratio,
        })
        .collect();

    Ok(Json(GalleryUploadResponse {
        processed: report.processed(),
        failed: report.failed(),
        results,
        errors: report.errors(),
    }))
}
