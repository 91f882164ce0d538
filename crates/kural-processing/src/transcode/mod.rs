//! Decode, resize and re-encode uploaded images.

pub mod resize;
pub mod transcoder;

pub use resize::{AspectPolicy, ResizePlan};
pub use transcoder::{CodecTranscoder, ImageTranscoder, TranscodeResult, TranscodeRunner, TranscodeSpec};
