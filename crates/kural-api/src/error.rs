//! HTTP error response conversion
//!
//! Handlers return `Result<impl IntoResponse, HttpAppError>`. Domain errors
//! (`ProcessingError`, `StorageError`, multipart and JSON rejections) convert into
//! `HttpAppError` so every failure renders with the same status, body and logging.

use axum::{
    extract::multipart::MultipartError,
    extract::rejection::JsonRejection,
    extract::{FromRequest, Request},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use kural_core::{AppError, ErrorMetadata, LogLevel};
use kural_processing::{ProcessingError, TranscodeError};
use kural_storage::StorageError;
use serde::{de::DeserializeOwned, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    /// Individual violations when several checks failed at once
    #[serde(skip_serializing_if = "Option::is_none")]
    pub errors: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_type: Option<String>,
    /// Machine-readable error code for programmatic handling
    pub code: String,
    /// Whether this error is recoverable (can be retried)
    pub recoverable: bool,
    /// Suggested action for the client
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggested_action: Option<String>,
}

/// Wrapper type for AppError to implement IntoResponse
/// (orphan rule: `IntoResponse` and `AppError` are both foreign here)
#[derive(Debug)]
pub struct HttpAppError(pub AppError);

impl From<AppError> for HttpAppError {
    fn from(err: AppError) -> Self {
        HttpAppError(err)
    }
}

impl From<anyhow::Error> for HttpAppError {
    fn from(err: anyhow::Error) -> Self {
        HttpAppError(AppError::InternalWithSource {
            message: err.to_string(),
            source: err,
        })
    }
}

/// Convert JSON body deserialization failures into a 400 with our ErrorResponse format.
impl From<JsonRejection> for HttpAppError {
    fn from(rejection: JsonRejection) -> Self {
        HttpAppError(AppError::InvalidInput(format!(
            "Invalid request body: {}",
            rejection.body_text()
        )))
    }
}

impl From<MultipartError> for HttpAppError {
    fn from(err: MultipartError) -> Self {
        let app = if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
            AppError::PayloadTooLarge(err.body_text())
        } else {
            AppError::BadRequest(format!("Invalid multipart body: {}", err.body_text()))
        };
        HttpAppError(app)
    }
}

/// JSON body extractor that returns our ErrorResponse format (400 + JSON) on deserialization failure.
#[derive(Debug, Clone, Copy)]
pub struct ValidatedJson<T>(pub T);

impl<T, S> FromRequest<S> for ValidatedJson<T>
where
    T: DeserializeOwned + Send,
    S: Send + Sync,
    Json<T>: FromRequest<S, Rejection = JsonRejection>,
{
    type Rejection = HttpAppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(inner) = Json::<T>::from_request(req, state)
            .await
            .map_err(HttpAppError::from)?;
        Ok(ValidatedJson(inner))
    }
}

fn log_error(error: &AppError) {
    let error_type = error.error_type();
    match error.log_level() {
        LogLevel::Debug => {
            tracing::debug!(error = %error, error_type = error_type, "Error occurred");
        }
        LogLevel::Warn => {
            tracing::warn!(error = %error, error_type = error_type, "Error occurred");
        }
        LogLevel::Error => {
            tracing::error!(error = %error, error_type = error_type, "Error occurred");
        }
    }
}

fn is_production_env() -> bool {
    std::env::var("ENVIRONMENT")
        .or_else(|_| std::env::var("APP_ENV"))
        .map(|env| env.to_lowercase() == "production" || env.to_lowercase() == "prod")
        .unwrap_or(false)
}

impl HttpAppError {
    fn to_error_response(&self, is_production: bool) -> ErrorResponse {
        let app_error = &self.0;

        // Violation lists are the client's own input, so they are shown in every environment.
        let errors = match app_error {
            AppError::Validation(messages) => Some(messages.clone()),
            _ => None,
        };

        let show_details = !is_production && !app_error.is_sensitive();

        ErrorResponse {
            error: app_error.client_message(),
            details: show_details.then(|| app_error.detailed_message()),
            errors,
            error_type: show_details.then(|| app_error.error_type().to_string()),
            code: app_error.error_code().to_string(),
            recoverable: app_error.is_recoverable(),
            suggested_action: app_error.suggested_action().map(String::from),
        }
    }
}

impl IntoResponse for HttpAppError {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.0.http_status_code())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        log_error(&self.0);

        let body = self.to_error_response(is_production_env());
        (status, Json(body)).into_response()
    }
}

// Convert domain errors to HttpAppError (avoids orphan rule: we impl for local HttpAppError)

impl From<StorageError> for HttpAppError {
    fn from(err: StorageError) -> Self {
        let app = match err {
            StorageError::NotFound(msg) => AppError::NotFound(msg),
            StorageError::InvalidKey(msg) => AppError::InvalidInput(msg),
            StorageError::WriteFailed(msg)
            | StorageError::ReadFailed(msg)
            | StorageError::DeleteFailed(msg) => AppError::Storage(msg),
            StorageError::AlreadyExists(key) => {
                AppError::Storage(format!("File already exists: {}", key))
            }
            StorageError::IoError(err) => AppError::Storage(format!("IO error: {}", err)),
            StorageError::ConfigError(msg) => AppError::Internal(msg),
        };
        HttpAppError(app)
    }
}

impl From<ProcessingError> for HttpAppError {
    fn from(err: ProcessingError) -> Self {
        match err {
            ProcessingError::Validation(messages) => HttpAppError(AppError::Validation(messages)),
            ProcessingError::Transcode(TranscodeError::Task(msg)) => {
                HttpAppError(AppError::Internal(format!("Image transcode task failed: {}", msg)))
            }
            ProcessingError::Transcode(err) => HttpAppError(AppError::ImageProcessing(err.to_string())),
            ProcessingError::Storage(err) => err.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_from_storage_error_not_found() {
        let HttpAppError(app_err) = StorageError::NotFound("books/a.webp".to_string()).into();
        match app_err {
            AppError::NotFound(msg) => assert_eq!(msg, "books/a.webp"),
            _ => panic!("Expected NotFound variant"),
        }
    }

    #[test]
    fn test_from_storage_error_invalid_key() {
        let HttpAppError(app_err) = StorageError::InvalidKey("../x".to_string()).into();
        assert!(matches!(app_err, AppError::InvalidInput(_)));
        assert_eq!(app_err.http_status_code(), 400);
    }

    #[test]
    fn test_from_storage_error_write_failed() {
        let HttpAppError(app_err) = StorageError::WriteFailed("disk full".to_string()).into();
        assert!(matches!(app_err, AppError::Storage(_)));
        assert_eq!(app_err.http_status_code(), 500);
        assert_eq!(app_err.error_code(), "STORAGE_ERROR");
    }

    #[test]
    fn test_from_processing_validation_error() {
        let err = ProcessingError::Validation(vec!["too big".to_string(), "bad type".to_string()]);
        let http: HttpAppError = err.into();
        assert_eq!(http.0.http_status_code(), 400);

        let body = http.to_error_response(true);
        assert_eq!(body.code, "VALIDATION_ERROR");
        assert_eq!(
            body.errors,
            Some(vec!["too big".to_string(), "bad type".to_string()])
        );
        assert!(body.details.is_none());
    }

    #[test]
    fn test_from_transcode_errors() {
        let http: HttpAppError =
            ProcessingError::Transcode(TranscodeError::Decode("bad header".to_string())).into();
        assert_eq!(http.0.http_status_code(), 422);
        assert!(http.0.client_message().contains("bad header"));

        let http: HttpAppError =
            ProcessingError::Transcode(TranscodeError::Timeout(Duration::from_secs(3))).into();
        assert_eq!(http.0.error_code(), "IMAGE_PROCESSING_ERROR");

        let http: HttpAppError =
            ProcessingError::Transcode(TranscodeError::Task("panicked".to_string())).into();
        assert_eq!(http.0.http_status_code(), 500);
    }

    #[test]
    fn test_sensitive_errors_hide_details() {
        let http = HttpAppError(AppError::Storage("/var/data is read-only".to_string()));
        let body = http.to_error_response(false);
        assert_eq!(body.error, "Failed to access storage");
        assert!(body.details.is_none());
        assert!(body.error_type.is_none());
        assert!(body.recoverable);
    }

    #[test]
    fn test_details_shown_outside_production() {
        let http = HttpAppError(AppError::BadRequest("No image file provided".to_string()));
        let body = http.to_error_response(false);
        assert!(body.details.is_some());
        assert_eq!(body.error_type.as_deref(), Some("BadRequest"));

        let body = http.to_error_response(true);
        assert!(body.details.is_none());
    }

    #[test]
    fn test_error_response_shape() {
        let body = HttpAppError(AppError::NotFound("gone".to_string())).to_error_response(true);
        let json = serde_json::to_value(&body).expect("serialize");
        assert_eq!(json["code"], "NOT_FOUND");
        assert_eq!(json["recoverable"], false);
        assert!(json.get("errors").is_none());
        assert!(json.get("details").is_none());
    }
}
