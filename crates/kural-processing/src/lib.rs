//! Kural Image Processing Library
//!
//! Turns uploaded images into stored, web-ready artifacts: validation, transcoding,
//! responsive variants, storage writes and the cover/gallery orchestration on top.

pub mod compression;
pub mod error;
pub mod metadata;
pub mod processor;
pub mod transcode;
pub mod upload;
pub mod validator;
pub mod variants;
pub mod writer;

// Re-export commonly used types
pub use compression::{compression_ratio, ImageCompressor, OutputFormat};
pub use error::{ProcessingError, TranscodeError};
pub use transcode::{
    AspectPolicy, CodecTranscoder, ImageTranscoder, TranscodeRunner, TranscodeResult,
    TranscodeSpec,
};
pub use metadata::ImageMetadata;
pub use processor::{
    CoverOutcome, GalleryImage, GalleryItem, GalleryReport, ImageProfile, ProcessorConfig,
    UploadProcessor,
};
pub use upload::UploadCandidate;
pub use validator::{ImageValidator, ValidationResult};
pub use variants::{Variant, VariantBatch, VariantGenerator, VariantName, VariantSet};
pub use writer::{ProbeReport, StorageWriter};
