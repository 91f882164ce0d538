use super::resize::{AspectPolicy, ResizePlan};
use crate::compression::{compression_ratio, ImageCompressor, OutputFormat};
use crate::error::TranscodeError;
use crate::metadata::ImageMetadata;
use bytes::Bytes;
use image::{DynamicImage, GenericImageView, ImageReader};
use kural_core::constants::DEFAULT_QUALITY;
use std::io::Cursor;
use std::sync::Arc;
use std::time::Duration;

/// Target constraints for one transcode.
///
/// `width` and `height` are clamped to the hard output ceiling when applied, so a
/// `TranscodeSpec` can never produce an image larger than 1200x1600.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TranscodeSpec {
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub quality: u8,
    pub format: OutputFormat,
    pub policy: AspectPolicy,
}

impl TranscodeSpec {
    /// WebP at the default quality, fitted inside `width` x `height`.
    pub fn new(width: Option<u32>, height: Option<u32>) -> Self {
        Self {
            width,
            height,
            quality: DEFAULT_QUALITY,
            format: OutputFormat::WebP,
            policy: AspectPolicy::Preserve,
        }
    }

    pub fn bounded(width: u32, height: u32) -> Self {
        Self::new(Some(width), Some(height))
    }

    pub fn with_quality(mut self, quality: u8) -> Self {
        self.quality = quality.clamp(1, 100);
        self
    }

    pub fn with_format(mut self, format: OutputFormat) -> Self {
        self.format = format;
        self
    }

    pub fn with_policy(mut self, policy: AspectPolicy) -> Self {
        self.policy = policy;
        self
    }
}

impl Default for TranscodeSpec {
    fn default() -> Self {
        Self::new(None, None)
    }
}

/// Re-encoded image plus what was learned about it.
#[derive(Debug, Clone)]
pub struct TranscodeResult {
    pub data: Bytes,
    /// Read back from `data`, not predicted from the request.
    pub metadata: ImageMetadata,
    pub original_size: usize,
    pub output_size: usize,
    pub compression_ratio: f64,
}

/// Synchronous, CPU-bound image transcoder.
pub trait ImageTranscoder: Send + Sync {
    fn transcode(&self, data: &[u8], spec: &TranscodeSpec) -> Result<TranscodeResult, TranscodeError>;

    /// One result per spec, in order. Implementations that can should decode
    /// `data` once for the whole batch.
    fn transcode_all(
        &self,
        data: &[u8],
        specs: &[TranscodeSpec],
    ) -> Vec<Result<TranscodeResult, TranscodeError>> {
        specs.iter().map(|spec| self.transcode(data, spec)).collect()
    }
}

/// [`ImageTranscoder`] backed by the `image`, `mozjpeg` and `webp` codecs.
#[derive(Debug, Clone, Copy, Default)]
pub struct CodecTranscoder;

impl CodecTranscoder {
    fn decode(data: &[u8]) -> Result<DynamicImage, TranscodeError> {
        ImageReader::new(Cursor::new(data))
            .with_guessed_format()
            .map_err(|e| TranscodeError::Decode(e.to_string()))?
            .decode()
            .map_err(|e| TranscodeError::Decode(e.to_string()))
    }

    fn encode(
        source: &DynamicImage,
        original_size: usize,
        spec: &TranscodeSpec,
    ) -> Result<TranscodeResult, TranscodeError> {
        let (orig_width, orig_height) = source.dimensions();
        let plan = ResizePlan::for_request(orig_width, orig_height, spec.width, spec.height, spec.policy);
        let img = plan.apply(source);

        let output = ImageCompressor::compress(&img, spec.format, spec.quality)?;
        let metadata = ImageMetadata::read(&output).map_err(|message| TranscodeError::Encode {
            format: spec.format,
            message: format!("encoder produced unreadable output: {}", message),
        })?;

        let ratio = compression_ratio(original_size, output.len());

        tracing::debug!(
            input_width = orig_width,
            input_height = orig_height,
            output_width = metadata.width,
            output_height = metadata.height,
            format = %spec.format,
            quality = spec.quality,
            original_bytes = original_size,
            output_bytes = output.len(),
            compression_ratio = ratio,
            "Image transcoded"
        );

        Ok(TranscodeResult {
            original_size,
            output_size: output.len(),
            compression_ratio: ratio,
            metadata,
            data: output,
        })
    }
}

impl ImageTranscoder for CodecTranscoder {
    fn transcode(&self, data: &[u8], spec: &TranscodeSpec) -> Result<TranscodeResult, TranscodeError> {
        let img = Self::decode(data)?;
        Self::encode(&img, data.len(), spec)
    }

    fn transcode_all(
        &self,
        data: &[u8],
        specs: &[TranscodeSpec],
    ) -> Vec<Result<TranscodeResult, TranscodeError>> {
        match Self::decode(data) {
            Ok(img) => specs
                .iter()
                .map(|spec| Self::encode(&img, data.len(), spec))
                .collect(),
            Err(e) => specs.iter().map(|_| Err(e.clone())).collect(),
        }
    }
}

/// Runs an [`ImageTranscoder`] on the blocking pool, optionally under a timeout.
///
/// A timed-out transcode keeps its blocking thread until the codec returns; only
/// the caller stops waiting.
#[derive(Clone)]
pub struct TranscodeRunner {
    transcoder: Arc<dyn ImageTranscoder>,
    timeout: Option<Duration>,
}

impl TranscodeRunner {
    pub fn new(transcoder: Arc<dyn ImageTranscoder>, timeout: Option<Duration>) -> Self {
        Self {
            transcoder,
            timeout,
        }
    }

    pub async fn run(&self, data: Bytes, spec: TranscodeSpec) -> Result<TranscodeResult, TranscodeError> {
        self.blocking(move |transcoder| transcoder.transcode(&data, &spec))
            .await?
    }

    /// Transcode `data` for every spec in one blocking task. The timeout covers
    /// the whole batch; per-spec failures come back in place.
    pub async fn run_all(
        &self,
        data: Bytes,
        specs: Vec<TranscodeSpec>,
    ) -> Result<Vec<Result<TranscodeResult, TranscodeError>>, TranscodeError> {
        self.blocking(move |transcoder| transcoder.transcode_all(&data, &specs))
            .await
    }

    async fn blocking<T, F>(&self, work: F) -> Result<T, TranscodeError>
    where
        F: FnOnce(&dyn ImageTranscoder) -> T + Send + 'static,
        T: Send + 'static,
    {
        let transcoder = Arc::clone(&self.transcoder);
        let task = tokio::task::spawn_blocking(move || work(transcoder.as_ref()));

        let joined = match self.timeout {
            Some(limit) => tokio::time::timeout(limit, task)
                .await
                .map_err(|_| TranscodeError::Timeout(limit))?,
            None => task.await,
        };

        joined.map_err(|e| TranscodeError::Task(e.to_string()))
    }
}

impl Default for TranscodeRunner {
    fn default() -> Self {
        Self::new(Arc::new(CodecTranscoder), None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageFormat, Rgb, RgbImage};

    fn encode(width: u32, height: u32, format: ImageFormat) -> Vec<u8> {
        let img = DynamicImage::ImageRgb8(RgbImage::from_fn(width, height, |x, y| {
            Rgb([(x * 7 % 256) as u8, (y * 3 % 256) as u8, 128])
        }));
        let mut buffer = Vec::new();
        img.write_to(&mut Cursor::new(&mut buffer), format).unwrap();
        buffer
    }

    struct SlowTranscoder;

    impl ImageTranscoder for SlowTranscoder {
        fn transcode(&self, data: &[u8], spec: &TranscodeSpec) -> Result<TranscodeResult, TranscodeError> {
            std::thread::sleep(Duration::from_millis(300));
            CodecTranscoder.transcode(data, spec)
        }
    }

    #[test]
    fn test_requested_size_is_clamped_to_hard_maximum() {
        let input = encode(2500, 2500, ImageFormat::Png);
        let spec = TranscodeSpec::bounded(5000, 5000);
        let result = CodecTranscoder.transcode(&input, &spec).unwrap();

        assert!(result.metadata.width <= 1200);
        assert!(result.metadata.height <= 1600);
        assert_eq!((result.metadata.width, result.metadata.height), (1200, 1200));
    }

    #[test]
    fn test_crop_to_fill_oversized_request_is_clamped() {
        let input = encode(300, 300, ImageFormat::Png);
        let spec = TranscodeSpec::bounded(4000, 2000).with_policy(AspectPolicy::CropToFill);
        let result = CodecTranscoder.transcode(&input, &spec).unwrap();

        assert!(result.metadata.width <= 1200);
        assert!(result.metadata.height <= 1600);
    }

    #[test]
    fn test_preserve_never_upscales() {
        let input = encode(120, 90, ImageFormat::Png);
        let spec = TranscodeSpec::bounded(800, 1000);
        let result = CodecTranscoder.transcode(&input, &spec).unwrap();

        assert_eq!((result.metadata.width, result.metadata.height), (120, 90));
    }

    #[test]
    fn test_unbounded_spec_fits_hard_maximum() {
        let input = encode(1300, 1000, ImageFormat::Png);
        let result = CodecTranscoder
            .transcode(&input, &TranscodeSpec::default())
            .unwrap();

        assert_eq!(result.metadata.width, 1200);
        assert_eq!(result.metadata.height, 923);
    }

    #[test]
    fn test_result_reports_sizes_and_ratio() {
        let input = encode(400, 300, ImageFormat::Png);
        let spec = TranscodeSpec::bounded(200, 200)
            .with_format(OutputFormat::Jpeg)
            .with_quality(70);
        let result = CodecTranscoder.transcode(&input, &spec).unwrap();

        assert_eq!(result.original_size, input.len());
        assert_eq!(result.output_size, result.data.len());
        assert_eq!(result.metadata.format, "jpeg");
        assert_eq!(
            result.compression_ratio,
            compression_ratio(input.len(), result.data.len())
        );
    }

    #[test]
    fn test_undecodable_input() {
        let result = CodecTranscoder.transcode(b"not an image at all", &TranscodeSpec::default());
        assert!(matches!(result, Err(TranscodeError::Decode(_))));
    }

    #[test]
    fn test_transcode_all_matches_single_transcodes() {
        let input = encode(900, 600, ImageFormat::Png);
        let specs = [
            TranscodeSpec::bounded(300, 300),
            TranscodeSpec::bounded(120, 80).with_format(OutputFormat::Png),
            TranscodeSpec::bounded(2000, 2000),
        ];

        let batch = CodecTranscoder.transcode_all(&input, &specs);
        assert_eq!(batch.len(), specs.len());

        for (result, spec) in batch.into_iter().zip(&specs) {
            let result = result.unwrap();
            let single = CodecTranscoder.transcode(&input, spec).unwrap();
            assert_eq!(
                (result.metadata.width, result.metadata.height),
                (single.metadata.width, single.metadata.height)
            );
            assert_eq!(result.metadata.format, single.metadata.format);
            assert_eq!(result.original_size, input.len());
        }
    }

    #[test]
    fn test_transcode_all_undecodable_fails_every_spec() {
        let specs = [TranscodeSpec::bounded(10, 10), TranscodeSpec::default()];
        let batch = CodecTranscoder.transcode_all(b"garbage", &specs);

        assert_eq!(batch.len(), 2);
        assert!(batch
            .iter()
            .all(|result| matches!(result, Err(TranscodeError::Decode(_)))));
    }

    #[test]
    fn test_quality_is_clamped() {
        assert_eq!(TranscodeSpec::default().with_quality(0).quality, 1);
        assert_eq!(TranscodeSpec::default().with_quality(200).quality, 100);
        assert_eq!(TranscodeSpec::default().quality, 85);
    }

    #[tokio::test]
    async fn test_runner_transcodes_on_blocking_pool() {
        let input = Bytes::from(encode(640, 480, ImageFormat::Jpeg));
        let result = TranscodeRunner::default()
            .run(input, TranscodeSpec::bounded(150, 200))
            .await
            .unwrap();

        assert_eq!((result.metadata.width, result.metadata.height), (150, 113));
        assert_eq!(result.metadata.format, "webp");
    }

    #[tokio::test]
    async fn test_runner_timeout() {
        let runner = TranscodeRunner::new(Arc::new(SlowTranscoder), Some(Duration::from_millis(20)));
        let input = Bytes::from(encode(10, 10, ImageFormat::Png));
        let result = runner.run(input, TranscodeSpec::default()).await;

        assert!(matches!(result, Err(TranscodeError::Timeout(_))));
    }

    #[tokio::test]
    async fn test_runner_batch_timeout() {
        let runner = TranscodeRunner::new(Arc::new(SlowTranscoder), Some(Duration::from_millis(20)));
        let input = Bytes::from(encode(10, 10, ImageFormat::Png));
        let result = runner
            .run_all(input, vec![TranscodeSpec::default(), TranscodeSpec::bounded(5, 5)])
            .await;

        assert!(matches!(result, Err(TranscodeError::Timeout(_))));
    }
}
