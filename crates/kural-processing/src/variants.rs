//! Responsive variant generation.

use crate::compression::OutputFormat;
use crate::error::TranscodeError;
use crate::transcode::{TranscodeResult, TranscodeRunner, TranscodeSpec};
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Named responsive sizes, smallest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VariantName {
    Thumb,
    Small,
    Medium,
    Large,
}

impl VariantName {
    pub const ALL: [VariantName; 4] = [
        VariantName::Thumb,
        VariantName::Small,
        VariantName::Medium,
        VariantName::Large,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            VariantName::Thumb => "thumb",
            VariantName::Small => "small",
            VariantName::Medium => "medium",
            VariantName::Large => "large",
        }
    }

    /// Bounding box (width, height) of this variant.
    pub fn dimensions(self) -> (u32, u32) {
        match self {
            VariantName::Thumb => (150, 200),
            VariantName::Small => (300, 400),
            VariantName::Medium => (600, 800),
            VariantName::Large => (900, 1200),
        }
    }

    /// `{base_name}_{name}.webp`
    pub fn filename(self, base_name: &str) -> String {
        format!(
            "{}_{}.{}",
            base_name,
            self.as_str(),
            VariantGenerator::FORMAT.extension()
        )
    }
}

impl fmt::Display for VariantName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A stored responsive variant
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Variant {
    pub filename: String,
    pub width: u32,
    pub height: u32,
    pub size: usize,
}

/// Variants that made it through transcoding (and, in the processor, storage).
pub type VariantSet = BTreeMap<VariantName, Variant>;

/// One transcoded variant, not yet stored.
#[derive(Debug, Clone)]
pub struct GeneratedVariant {
    pub filename: String,
    pub result: TranscodeResult,
}

/// A primary image and the variants cut from the same decode.
#[derive(Debug, Clone)]
pub struct VariantBatch {
    pub primary: TranscodeResult,
    pub variants: BTreeMap<VariantName, GeneratedVariant>,
}

/// Produces the fixed family of responsive variants from one source image.
#[derive(Clone)]
pub struct VariantGenerator {
    runner: TranscodeRunner,
    quality: u8,
}

impl VariantGenerator {
    pub const FORMAT: OutputFormat = OutputFormat::WebP;

    pub fn new(runner: TranscodeRunner, quality: u8) -> Self {
        Self { runner, quality }
    }

    pub fn spec_for(&self, name: VariantName) -> TranscodeSpec {
        let (width, height) = name.dimensions();
        TranscodeSpec::bounded(width, height)
            .with_quality(self.quality)
            .with_format(Self::FORMAT)
    }

    /// Transcode `primary` and every preset from a single decode of `data`.
    ///
    /// Only a failed `primary` (or a timed-out batch) fails the call. A preset
    /// that fails is logged and left out.
    pub async fn generate(
        &self,
        data: &Bytes,
        base_name: &str,
        primary: TranscodeSpec,
    ) -> Result<VariantBatch, TranscodeError> {
        let mut specs = Vec::with_capacity(VariantName::ALL.len() + 1);
        specs.push(primary);
        specs.extend(VariantName::ALL.map(|name| self.spec_for(name)));

        let mut results = self.runner.run_all(data.clone(), specs).await?.into_iter();
        let primary = results
            .next()
            .ok_or_else(|| TranscodeError::Task("transcoder returned no results".to_string()))??;

        let mut variants = BTreeMap::new();
        for (name, result) in VariantName::ALL.into_iter().zip(results) {
            match result {
                Ok(result) => {
                    variants.insert(
                        name,
                        GeneratedVariant {
                            filename: name.filename(base_name),
                            result,
                        },
                    );
                }
                Err(e) => {
                    tracing::warn!(
                        variant = %name,
                        base_name = %base_name,
                        error = %e,
                        "Failed to generate responsive variant"
                    );
                }
            }
        }

        Ok(VariantBatch { primary, variants })
    }
}
