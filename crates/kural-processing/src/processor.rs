//! Cover and gallery upload orchestration.
//!
//! validate -> transcode -> write -> (covers only) responsive variants.
//! Nothing here holds state between calls; storage is the only durable owner
//! of image bytes.

use crate::compression::OutputFormat;
use crate::error::ProcessingError;
use crate::metadata::ImageMetadata;
use crate::transcode::{CodecTranscoder, ImageTranscoder, TranscodeRunner, TranscodeSpec};
use crate::upload::UploadCandidate;
use crate::validator::ImageValidator;
use crate::variants::{Variant, VariantGenerator, VariantName, VariantSet};
use crate::writer::{ProbeReport, StorageWriter};
use chrono::Utc;
use kural_core::constants::{
    is_safe_path_segment, DEFAULT_ALLOWED_EXTENSIONS, DEFAULT_COVER_PLACEHOLDER,
    DEFAULT_ENTITY_TYPE, DEFAULT_MAX_FILE_SIZE_MB, DEFAULT_QUALITY,
};
use kural_core::UploadConfig;
use kural_storage::{DeleteOutcome, Storage};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

/// Target box, quality and format for one kind of upload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageProfile {
    pub width: u32,
    pub height: u32,
    pub quality: u8,
    pub format: OutputFormat,
}

impl ImageProfile {
    pub const COVER: ImageProfile = ImageProfile {
        width: 400,
        height: 600,
        quality: 90,
        format: OutputFormat::WebP,
    };

    pub const GALLERY: ImageProfile = ImageProfile {
        width: 800,
        height: 1000,
        quality: DEFAULT_QUALITY,
        format: OutputFormat::WebP,
    };

    fn spec(self) -> TranscodeSpec {
        TranscodeSpec::bounded(self.width, self.height)
            .with_quality(self.quality)
            .with_format(self.format)
    }
}

#[derive(Debug, Clone)]
pub struct ProcessorConfig {
    pub max_file_size: usize,
    pub allowed_extensions: Vec<String>,
    /// Directory under the upload root, e.g. `books`.
    pub entity_type: String,
    pub cover: ImageProfile,
    pub gallery: ImageProfile,
    pub variant_quality: u8,
    pub transcode_timeout: Option<Duration>,
}

impl Default for ProcessorConfig {
    fn default() -> Self {
        Self {
            max_file_size: DEFAULT_MAX_FILE_SIZE_MB * 1024 * 1024,
            allowed_extensions: DEFAULT_ALLOWED_EXTENSIONS
                .iter()
                .map(|ext| ext.to_string())
                .collect(),
            entity_type: DEFAULT_ENTITY_TYPE.to_string(),
            cover: ImageProfile::COVER,
            gallery: ImageProfile::GALLERY,
            variant_quality: DEFAULT_QUALITY,
            transcode_timeout: None,
        }
    }
}

impl From<&UploadConfig> for ProcessorConfig {
    fn from(upload: &UploadConfig) -> Self {
        let mut config = Self {
            max_file_size: upload.max_file_size_bytes,
            allowed_extensions: upload.allowed_extensions.clone(),
            entity_type: upload.entity_type.clone(),
            transcode_timeout: upload.transcode_timeout,
            ..Self::default()
        };

        // Responsive variants stay WebP whatever the main format is.
        if let Some(name) = upload.output_format.as_deref() {
            let format = OutputFormat::parse_or_webp(name);
            config.cover.format = format;
            config.gallery.format = format;
        }

        config
    }
}

/// Result of a successful cover upload.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CoverOutcome {
    pub filename: String,
    pub public_path: String,
    /// Public path of every variant that was generated and stored.
    pub variant_paths: BTreeMap<VariantName, String>,
    pub variants: VariantSet,
    pub metadata: ImageMetadata,
    pub compression_ratio: f64,
}

/// A stored gallery image.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GalleryImage {
    pub index: usize,
    pub filename: String,
    pub path: String,
    pub metadata: ImageMetadata,
    pub compression_ratio: f64,
}

/// Outcome for one gallery candidate. `index` is the 0-based input position.
#[derive(Debug, Clone)]
pub enum GalleryItem {
    Stored(GalleryImage),
    Failed { index: usize, message: String },
}

/// Per-candidate results, in input order.
#[derive(Debug, Clone, Default)]
pub struct GalleryReport {
    pub items: Vec<GalleryItem>,
}

impl GalleryReport {
    pub fn processed(&self) -> usize {
        self.images().count()
    }

    pub fn failed(&self) -> usize {
        self.items.len() - self.processed()
    }

    pub fn images(&self) -> impl Iterator<Item = &GalleryImage> {
        self.items.iter().filter_map(|item| match item {
            GalleryItem::Stored(image) => Some(image),
            GalleryItem::Failed { .. } => None,
        })
    }

    /// Failure messages, each naming the 1-based position of its candidate.
    pub fn errors(&self) -> Vec<String> {
        self.items
            .iter()
            .filter_map(|item| match item {
                GalleryItem::Failed { index, message } => {
                    Some(format!("Image {}: {}", index + 1, message))
                }
                GalleryItem::Stored(_) => None,
            })
            .collect()
    }
}

/// Cover/gallery upload processor. Built once at startup and shared.
#[derive(Clone)]
pub struct UploadProcessor {
    config: ProcessorConfig,
    validator: ImageValidator,
    runner: TranscodeRunner,
    variants: VariantGenerator,
    writer: StorageWriter,
}

impl UploadProcessor {
    pub fn new(storage: Arc<dyn Storage>, config: ProcessorConfig) -> Self {
        Self::with_transcoder(storage, Arc::new(CodecTranscoder), config)
    }

    pub fn with_transcoder(
        storage: Arc<dyn Storage>,
        transcoder: Arc<dyn ImageTranscoder>,
        config: ProcessorConfig,
    ) -> Self {
        let runner = TranscodeRunner::new(transcoder, config.transcode_timeout);
        Self {
            validator: ImageValidator::new(config.max_file_size, config.allowed_extensions.clone()),
            variants: VariantGenerator::new(runner.clone(), config.variant_quality),
            writer: StorageWriter::new(storage, config.entity_type.clone()),
            runner,
            config,
        }
    }

    /// Validate, transcode and store a cover, then its responsive variants.
    ///
    /// Validation, main transcode and main write failures abort the call. A
    /// variant that fails to transcode or store is logged and omitted.
    #[tracing::instrument(skip(self, candidate, owner_id), fields(owner_id = %owner_id, filename = %candidate.filename, size = candidate.size))]
    pub async fn process_cover(
        &self,
        candidate: UploadCandidate,
        owner_id: &str,
    ) -> Result<CoverOutcome, ProcessingError> {
        check_owner_id(owner_id)?;

        let validation = self.validator.validate(&candidate);
        if !validation.is_valid {
            return Err(ProcessingError::Validation(validation.errors));
        }

        let base_name = format!("cover_{}_{}", owner_id, Utc::now().timestamp_millis());
        let cover = self.config.cover;

        let batch = self
            .variants
            .generate(&candidate.data, &base_name, cover.spec())
            .await?;
        let main = batch.primary;
        let filename = format!("{}.{}", base_name, cover.format.extension());
        let public_path = self.writer.write(main.data, &filename).await?;

        let mut variant_paths = BTreeMap::new();
        let mut variants = VariantSet::new();

        for (name, generated) in batch.variants {
            let size = generated.result.output_size;
            match self.writer.write(generated.result.data, &generated.filename).await {
                Ok(path) => {
                    variant_paths.insert(name, path);
                    variants.insert(
                        name,
                        Variant {
                            filename: generated.filename,
                            width: generated.result.metadata.width,
                            height: generated.result.metadata.height,
                            size,
                        },
                    );
                }
                Err(e) => {
                    tracing::warn!(
                        variant = %name,
                        filename = %generated.filename,
                        error = %e,
                        "Failed to store responsive variant"
                    );
                }
            }
        }

        tracing::info!(
            path = %public_path,
            variants = variants.len(),
            compression_ratio = main.compression_ratio,
            "Cover processed"
        );

        Ok(CoverOutcome {
            filename,
            public_path,
            variant_paths,
            variants,
            metadata: main.metadata,
            compression_ratio: main.compression_ratio,
        })
    }

    /// Process every candidate inside its own failure boundary.
    ///
    /// Only an unsafe owner id fails the whole call; everything else is recorded
    /// per candidate, in input order.
    #[tracing::instrument(skip(self, candidates, owner_id), fields(owner_id = %owner_id, files = candidates.len()))]
    pub async fn process_gallery(
        &self,
        candidates: Vec<UploadCandidate>,
        owner_id: &str,
    ) -> Result<GalleryReport, ProcessingError> {
        check_owner_id(owner_id)?;

        let timestamp = Utc::now().timestamp_millis();
        let mut report = GalleryReport::default();

        for (index, candidate) in candidates.into_iter().enumerate() {
            let filename = format!(
                "image_{}_{}_{}.{}",
                owner_id,
                timestamp,
                index,
                self.config.gallery.format.extension()
            );

            let item = match self.process_gallery_item(candidate, &filename).await {
                Ok((path, result)) => GalleryItem::Stored(GalleryImage {
                    index,
                    filename,
                    path,
                    metadata: result.metadata,
                    compression_ratio: result.compression_ratio,
                }),
                Err(e) => {
                    let message = match e {
                        ProcessingError::Validation(errors) => errors.join("; "),
                        other => other.to_string(),
                    };
                    tracing::warn!(index = index + 1, error = %message, "Gallery image failed");
                    GalleryItem::Failed { index, message }
                }
            };
            report.items.push(item);
        }

        tracing::info!(
            processed = report.processed(),
            failed = report.failed(),
            "Gallery processed"
        );

        Ok(report)
    }

    async fn process_gallery_item(
        &self,
        candidate: UploadCandidate,
        filename: &str,
    ) -> Result<(String, crate::transcode::TranscodeResult), ProcessingError> {
        let validation = self.validator.validate(&candidate);
        if !validation.is_valid {
            return Err(ProcessingError::Validation(validation.errors));
        }

        let result = self.runner.run(candidate.data, self.config.gallery.spec()).await?;
        let path = self.writer.write(result.data.clone(), filename).await?;
        Ok((path, result))
    }

    /// Delete stored images. The default placeholder is never handed to storage,
    /// so it never appears in the report.
    #[tracing::instrument(skip(self, paths), fields(paths = paths.len()))]
    pub async fn cleanup(&self, paths: &[String]) -> Vec<DeleteOutcome> {
        let deletable: Vec<String> = paths
            .iter()
            .filter(|path| {
                let placeholder = is_placeholder(path);
                if placeholder {
                    tracing::debug!(path = %path, "Skipping default placeholder");
                }
                !placeholder
            })
            .cloned()
            .collect();

        if deletable.is_empty() {
            return Vec::new();
        }

        self.writer.delete(&deletable).await
    }

    /// Drop `previous` once `new` has replaced it. Nothing is deleted when there
    /// was no previous reference, it was the placeholder, or it is `new` itself.
    pub async fn replace_reference(&self, previous: Option<&str>, new: &str) -> Option<DeleteOutcome> {
        let previous = previous.map(str::trim).filter(|p| !p.is_empty())?;
        if previous == new || is_placeholder(previous) {
            return None;
        }

        self.cleanup(&[previous.to_string()]).await.into_iter().next()
    }

    pub async fn probe(&self, public_path: &str) -> ProbeReport {
        self.writer.probe(public_path).await
    }
}

fn is_placeholder(path: &str) -> bool {
    path.trim() == DEFAULT_COVER_PLACEHOLDER
}

fn check_owner_id(owner_id: &str) -> Result<(), ProcessingError> {
    if is_safe_path_segment(owner_id) {
        Ok(())
    } else {
        Err(ProcessingError::Validation(vec![format!(
            "Owner id '{}' must be 1-64 letters, digits, '_' or '-'",
            owner_id
        )]))
    }
}
