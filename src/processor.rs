//! Background removal processor
//!
//! `BackgroundRemovalProcessor` ties decoding, the pixel transform and
//! encoding together. The CLI and the design pipeline both go through it so
//! every entry point applies the same options the same way.

use crate::{
    config::RemovalConfig,
    error::{ImageGenError, Result},
    pixel::{self, PixelBuffer},
    services::{HttpImageFetcher, ImageIOService, ImageSource, OutputFormatHandler},
    types::{ProcessingMetadata, ProcessingTimings, RemovalResult},
};
use image::DynamicImage;
use instant::Instant;
use log::{debug, info};
use std::path::Path;
use std::sync::Arc;
use tracing::{info as trace_info, instrument};

/// Run CPU-heavy image work on the blocking pool so async callers keep
/// overlapping their network waits
///
/// # Errors
/// - Whatever `work` returns
/// - `Decode` with `stage` context if the blocking task panicked or was cancelled
pub(crate) async fn run_blocking<T, F>(stage: &str, work: F) -> Result<T>
where
    F: FnOnce() -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    let span = tracing::Span::current();
    tokio::task::spawn_blocking(move || {
        let _entered = span.enter();
        work()
    })
    .await
    .map_err(|e| ImageGenError::processing_stage_error(stage, &e.to_string(), None))?
}

/// Decode → transform → encode orchestration
#[derive(Clone)]
pub struct BackgroundRemovalProcessor {
    config: RemovalConfig,
    source: Arc<dyn ImageSource>,
}

impl BackgroundRemovalProcessor {
    /// Create a processor that downloads remote images over HTTP
    ///
    /// # Errors
    /// - Invalid configuration
    /// - HTTP client initialization failures
    pub fn new(config: RemovalConfig) -> Result<Self> {
        let source = Arc::new(HttpImageFetcher::new()?);
        Self::with_source(config, source)
    }

    /// Create a processor with a custom image source for URL inputs
    ///
    /// # Errors
    /// - Invalid configuration
    pub fn with_source(config: RemovalConfig, source: Arc<dyn ImageSource>) -> Result<Self> {
        config.validate()?;
        debug!("Processor configured: {:?}", config);
        Ok(Self { config, source })
    }

    #[must_use]
    pub fn config(&self) -> &RemovalConfig {
        &self.config
    }

    /// Run the transform over an already decoded buffer
    ///
    /// # Errors
    /// - `InvalidOptionRange` from option validation
    #[instrument(
        skip(self, buffer),
        fields(dimensions = %format!("{}x{}", buffer.width(), buffer.height()))
    )]
    pub fn process_buffer(&self, buffer: PixelBuffer) -> Result<RemovalResult> {
        let total_start = Instant::now();
        let mut timings = ProcessingTimings::new();
        self.transform_with_timings(buffer, &mut timings, total_start)
    }

    /// Process a `DynamicImage`, adding an alpha channel if it has none
    ///
    /// # Errors
    /// - `InvalidBufferShape` for zero-sized images
    /// - `InvalidOptionRange` from option validation
    pub fn process_image(&self, image: &DynamicImage) -> Result<RemovalResult> {
        let total_start = Instant::now();
        let mut timings = ProcessingTimings::new();

        let decode_start = Instant::now();
        let buffer = PixelBuffer::from_dynamic_image(image)?;
        timings.image_decode_ms = decode_start.elapsed().as_millis() as u64;

        self.transform_with_timings(buffer, &mut timings, total_start)
    }

    /// Process encoded image bytes
    ///
    /// # Errors
    /// - `Decode` for unreadable data
    /// - Transform errors
    pub fn process_bytes(&self, image_bytes: &[u8]) -> Result<RemovalResult> {
        let total_start = Instant::now();
        let mut timings = ProcessingTimings::new();

        let decode_start = Instant::now();
        let buffer = ImageIOService::decode_to_buffer(image_bytes)?;
        timings.image_decode_ms = decode_start.elapsed().as_millis() as u64;

        self.transform_with_timings(buffer, &mut timings, total_start)
    }

    /// Process an image file
    ///
    /// # Errors
    /// - File I/O and decode failures
    /// - Transform errors
    pub fn process_file<P: AsRef<Path>>(&self, input_path: P) -> Result<RemovalResult> {
        let total_start = Instant::now();
        let mut timings = ProcessingTimings::new();

        let decode_start = Instant::now();
        let image = ImageIOService::load_image(input_path.as_ref())?;
        let buffer = PixelBuffer::from_dynamic_image(&image)?;
        timings.image_decode_ms = decode_start.elapsed().as_millis() as u64;

        self.transform_with_timings(buffer, &mut timings, total_start)
    }

    /// Download and process a remote image
    ///
    /// # Errors
    /// - Network failures from the image source
    /// - Decode and transform errors
    #[instrument(skip(self))]
    pub async fn process_url(&self, url: &str) -> Result<RemovalResult> {
        let total_start = Instant::now();
        let mut timings = ProcessingTimings::new();

        let fetch_start = Instant::now();
        let bytes = self.source.fetch(url).await?;
        timings.fetch_ms = Some(fetch_start.elapsed().as_millis() as u64);

        let processor = self.clone();
        run_blocking("transform", move || {
            let decode_start = Instant::now();
            let buffer = ImageIOService::decode_to_buffer(&bytes)?;
            timings.image_decode_ms = decode_start.elapsed().as_millis() as u64;

            processor.transform_with_timings(buffer, &mut timings, total_start)
        })
        .await
    }

    /// Process image data from an async reader
    ///
    /// # Errors
    /// - Stream reading failures
    /// - Decode and transform errors
    pub async fn process_reader<R: tokio::io::AsyncRead + Unpin>(
        &self,
        mut reader: R,
    ) -> Result<RemovalResult> {
        use tokio::io::AsyncReadExt;

        let mut buffer = Vec::new();
        reader
            .read_to_end(&mut buffer)
            .await
            .map_err(|e| ImageGenError::decode(format!("Failed to read from stream: {}", e)))?;

        self.process_bytes(&buffer)
    }

    /// Encode a result with the configured format and quality
    ///
    /// # Errors
    /// - Codec failures
    pub fn encode(&self, result: &RemovalResult) -> Result<Vec<u8>> {
        OutputFormatHandler::encode(&result.buffer, self.config.output_format, self.config.quality)
    }

    fn transform_with_timings(
        &self,
        buffer: PixelBuffer,
        timings: &mut ProcessingTimings,
        total_start: Instant,
    ) -> Result<RemovalResult> {
        let options = self.config.options;
        let light_pixel_ratio = pixel::light_pixel_ratio(&buffer, options.threshold);

        let skip = self.config.skip_dark_backgrounds
            && light_pixel_ratio <= pixel::WHITE_BACKGROUND_RATIO;

        let transform_start = Instant::now();
        let buffer = if skip {
            info!(
                "Skipping background removal: only {:.1}% of pixels are light",
                light_pixel_ratio * 100.0
            );
            buffer
        } else {
            pixel::transform(buffer, &options)?
        };
        timings.transform_ms = transform_start.elapsed().as_millis() as u64;
        timings.total_ms = total_start.elapsed().as_millis() as u64;

        trace_info!(
            transform_ms = timings.transform_ms,
            total_ms = timings.total_ms,
            light_pixel_ratio = light_pixel_ratio,
            "Background removal complete"
        );

        Ok(RemovalResult::new(
            buffer,
            ProcessingMetadata {
                options,
                light_pixel_ratio,
                background_removed: !skip,
                timings: timings.clone(),
            },
        ))
    }
}
