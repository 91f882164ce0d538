use image::imageops::FilterType;
use image::{DynamicImage, GenericImageView};
use std::borrow::Cow;
use kural_core::constants::{MAX_OUTPUT_HEIGHT, MAX_OUTPUT_WIDTH};
use serde::{Deserialize, Serialize};

/// How an image is fitted to a requested box
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AspectPolicy {
    /// Fit inside the box, keep aspect ratio, never upscale.
    #[default]
    Preserve,
    /// Cover the box exactly, cropping the overflow.
    CropToFill,
}

/// Resize step chosen for a source image
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResizePlan {
    Keep,
    Exact { width: u32, height: u32 },
    Fill { width: u32, height: u32 },
}

/// Clamp requested dimensions to the hard output ceiling.
pub fn clamp_dimensions(width: Option<u32>, height: Option<u32>) -> (Option<u32>, Option<u32>) {
    (
        width.map(|w| w.clamp(1, MAX_OUTPUT_WIDTH)),
        height.map(|h| h.clamp(1, MAX_OUTPUT_HEIGHT)),
    )
}

/// Largest size with the source aspect ratio that fits `max_width` x `max_height`
/// without exceeding the source size.
pub fn fit_within(orig_width: u32, orig_height: u32, max_width: u32, max_height: u32) -> (u32, u32) {
    if orig_width <= max_width && orig_height <= max_height {
        return (orig_width, orig_height);
    }

    let scale = (max_width as f64 / orig_width as f64).min(max_height as f64 / orig_height as f64);
    let width = ((orig_width as f64 * scale).round() as u32).clamp(1, max_width);
    let height = ((orig_height as f64 * scale).round() as u32).clamp(1, max_height);
    (width, height)
}

impl ResizePlan {
    pub fn for_request(
        orig_width: u32,
        orig_height: u32,
        width: Option<u32>,
        height: Option<u32>,
        policy: AspectPolicy,
    ) -> Self {
        let (width, height) = clamp_dimensions(width, height);

        if let (AspectPolicy::CropToFill, Some(w), Some(h)) = (policy, width, height) {
            if (w, h) == (orig_width, orig_height) {
                return ResizePlan::Keep;
            }
            return ResizePlan::Fill {
                width: w,
                height: h,
            };
        }

        // Preserve, or crop-to-fill with only one side given: a missing side is
        // bounded by the hard ceiling alone.
        let box_width = width.unwrap_or(MAX_OUTPUT_WIDTH);
        let box_height = height.unwrap_or(MAX_OUTPUT_HEIGHT);

        let (new_width, new_height) = fit_within(orig_width, orig_height, box_width, box_height);
        if (new_width, new_height) == (orig_width, orig_height) {
            ResizePlan::Keep
        } else {
            ResizePlan::Exact {
                width: new_width,
                height: new_height,
            }
        }
    }

    /// Resize `img`, leaving the source untouched so it can serve further plans.
    pub fn apply(self, img: &DynamicImage) -> Cow<'_, DynamicImage> {
        match self {
            ResizePlan::Keep => Cow::Borrowed(img),
            ResizePlan::Exact { width, height } => {
                let filter = select_filter(img.dimensions(), (width, height));
                Cow::Owned(img.resize_exact(width, height, filter))
            }
            ResizePlan::Fill { width, height } => {
                let filter = select_filter(img.dimensions(), (width, height));
                Cow::Owned(img.resize_to_fill(width, height, filter))
            }
        }
    }
}

/// Cheaper filters for large reductions, Lanczos for small ones.
fn select_filter(original: (u32, u32), target: (u32, u32)) -> FilterType {
    let width_ratio = original.0 as f32 / target.0 as f32;
    let height_ratio = original.1 as f32 / target.1 as f32;
    let max_ratio = width_ratio.max(height_ratio);

    if max_ratio > 2.0 {
        FilterType::Triangle
    } else if max_ratio > 1.5 {
        FilterType::CatmullRom
    } else {
        FilterType::Lanczos3
    }
}
