//! Configuration module
//!
//! Server and upload settings, read from the environment (and `.env` via dotenvy).

use std::env;
use std::time::Duration;

use crate::constants::{
    is_safe_path_segment, DEFAULT_ALLOWED_EXTENSIONS, DEFAULT_ENTITY_TYPE,
    DEFAULT_MAX_FILE_SIZE_MB, DEFAULT_MAX_GALLERY_FILES, DEFAULT_PUBLIC_PREFIX,
    DEFAULT_UPLOAD_ROOT,
};
use crate::storage_types::StorageBackend;

const SERVER_PORT: u16 = 4000;
const HTTP_CONCURRENCY_LIMIT: usize = 1024;

/// HTTP server settings
#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub server_port: u16,
    pub cors_origins: Vec<String>,
    pub environment: String,
    /// Requests served at once; uploads are CPU and memory heavy.
    pub http_concurrency_limit: usize,
}

/// Image upload settings
#[derive(Clone, Debug)]
pub struct UploadConfig {
    pub storage_backend: StorageBackend,
    /// Filesystem directory holding every stored image.
    pub upload_root: String,
    /// Public URL prefix that maps onto `upload_root`.
    pub public_prefix: String,
    pub entity_type: String,
    pub max_file_size_bytes: usize,
    pub allowed_extensions: Vec<String>,
    pub max_gallery_files: usize,
    pub transcode_timeout: Option<Duration>,
    /// Encoding for stored covers and gallery images. Unset keeps WebP.
    pub output_format: Option<String>,
}

/// Application configuration.
#[derive(Clone, Debug)]
pub struct Config {
    pub server: ServerConfig,
    pub upload: UploadConfig,
}

impl Config {
    pub fn from_env() -> Result<Self, anyhow::Error> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build a configuration from an arbitrary key lookup. Missing or
    /// unparsable numeric values fall back to their defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, anyhow::Error>
    where
        F: Fn(&str) -> Option<String>,
    {
        let environment = lookup("ENVIRONMENT")
            .or_else(|| lookup("APP_ENV"))
            .unwrap_or_else(|| "development".to_string());

        let cors_origins = lookup("CORS_ORIGINS")
            .unwrap_or_else(|| "*".to_string())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let storage_backend = lookup("STORAGE_BACKEND")
            .map(|s| s.parse::<StorageBackend>())
            .transpose()?
            .unwrap_or(StorageBackend::Local);

        let max_file_size_bytes = lookup("MAX_FILE_SIZE_MB")
            .and_then(|s| s.parse::<usize>().ok())
            .unwrap_or(DEFAULT_MAX_FILE_SIZE_MB)
            * 1024
            * 1024;

        let allowed_extensions = lookup("ALLOWED_EXTENSIONS")
            .map(|s| {
                s.split(',')
                    .map(|ext| ext.trim().trim_start_matches('.').to_lowercase())
                    .filter(|ext| !ext.is_empty())
                    .collect()
            })
            .unwrap_or_else(|| {
                DEFAULT_ALLOWED_EXTENSIONS
                    .iter()
                    .map(|ext| ext.to_string())
                    .collect()
            });

        let transcode_timeout = lookup("TRANSCODE_TIMEOUT_SECS")
            .and_then(|s| s.parse::<u64>().ok())
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs);

        Ok(Config {
            server: ServerConfig {
                server_port: lookup("PORT")
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(SERVER_PORT),
                cors_origins,
                environment,
                http_concurrency_limit: lookup("HTTP_CONCURRENCY_LIMIT")
                    .and_then(|s| s.parse::<usize>().ok())
                    .unwrap_or(HTTP_CONCURRENCY_LIMIT)
                    .max(1),
            },
            upload: UploadConfig {
                storage_backend,
                upload_root: lookup("UPLOAD_ROOT")
                    .unwrap_or_else(|| DEFAULT_UPLOAD_ROOT.to_string()),
                public_prefix: lookup("UPLOAD_PUBLIC_PREFIX")
                    .map(|s| s.trim_end_matches('/').to_string())
                    .unwrap_or_else(|| DEFAULT_PUBLIC_PREFIX.to_string()),
                entity_type: lookup("UPLOAD_ENTITY_TYPE")
                    .unwrap_or_else(|| DEFAULT_ENTITY_TYPE.to_string()),
                max_file_size_bytes,
                allowed_extensions,
                max_gallery_files: lookup("MAX_GALLERY_FILES")
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(DEFAULT_MAX_GALLERY_FILES),
                transcode_timeout,
                output_format: lookup("IMAGE_OUTPUT_FORMAT")
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty()),
            },
        })
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if self.upload.max_file_size_bytes == 0 {
            return Err(anyhow::anyhow!("MAX_FILE_SIZE_MB must be greater than zero"));
        }

        if self.upload.allowed_extensions.is_empty() {
            return Err(anyhow::anyhow!("ALLOWED_EXTENSIONS must list at least one extension"));
        }

        if !is_safe_path_segment(&self.upload.entity_type) {
            return Err(anyhow::anyhow!(
                "UPLOAD_ENTITY_TYPE '{}' must be a single path segment of letters, digits, '_' or '-'",
                self.upload.entity_type
            ));
        }

        if !self.upload.public_prefix.starts_with('/') {
            return Err(anyhow::anyhow!(
                "UPLOAD_PUBLIC_PREFIX must start with '/' (got '{}')",
                self.upload.public_prefix
            ));
        }

        if self.upload.max_gallery_files == 0 {
            return Err(anyhow::anyhow!("MAX_GALLERY_FILES must be greater than zero"));
        }

        Ok(())
    }

    /// Check if the application is running in production mode
    pub fn is_production(&self) -> bool {
        let env = self.server.environment.to_lowercase();
        env == "production" || env == "prod"
    }

    pub fn server_port(&self) -> u16 {
        self.server.server_port
    }

    pub fn cors_origins(&self) -> &[String] {
        &self.server.cors_origins
    }

    pub fn http_concurrency_limit(&self) -> usize {
        self.server.http_concurrency_limit
    }

    pub fn environment(&self) -> &str {
        &self.server.environment
    }

    pub fn max_file_size_bytes(&self) -> usize {
        self.upload.max_file_size_bytes
    }

    pub fn max_gallery_files(&self) -> usize {
        self.upload.max_gallery_files
    }

    /// Largest request body a gallery upload may need, multipart framing included.
    pub fn max_request_body_bytes(&self) -> usize {
        const MULTIPART_OVERHEAD: usize = 64 * 1024;
        self.upload.max_file_size_bytes * self.upload.max_gallery_files + MULTIPART_OVERHEAD
    }
}
