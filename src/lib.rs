#![allow(clippy::too_many_lines)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::unused_async)]

//! # T-shirt Image Generation Library
//!
//! Turns text prompts into t-shirt mockups: an image-generation API renders
//! the design, a threshold-based pass strips its white or light background,
//! and the cut-out is composited onto a shirt-coloured canvas.
//!
//! ## Features
//!
//! - **White background removal**: brightness threshold, optional box
//!   smoothing of partially transparent pixels and optional alpha feathering
//!   over plain RGBA buffers
//! - **Mockups**: contain-fit placement on a solid canvas in one of the
//!   named shirt colours or any `#rrggbb`
//! - **Generation client**: async HTTP client for the image-generation API
//! - **Format Support**: PNG and JPEG input, PNG and lossless WebP output
//! - **CLI Integration**: optional command-line interface (`cli` feature)
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use tshirt_image_gen::{remove_white_background_from_bytes, RemovalConfig};
//!
//! # fn example(upload: Vec<u8>) -> anyhow::Result<()> {
//! let config = RemovalConfig::builder()
//!     .threshold(235)
//!     .smoothing_radius(2)
//!     .build()?;
//! let result = remove_white_background_from_bytes(&upload, &config)?;
//! result.save_png("design.png")?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Prompt to mockup
//!
//! ```rust,no_run
//! use tshirt_image_gen::{
//!     DesignPipeline, HttpImageFetcher, ImageGenerationClient, MockupConfig,
//!     RemovalConfig, TshirtColor,
//! };
//!
//! # async fn example() -> anyhow::Result<()> {
//! let pipeline = DesignPipeline::new(
//!     ImageGenerationClient::from_env()?,
//!     HttpImageFetcher::new()?,
//!     RemovalConfig::default(),
//!     MockupConfig::default(),
//! )?;
//! let outcome = pipeline.create_design("a retro sunset", TshirtColor::Navy).await?;
//! std::fs::write("mockup.png", &outcome.mockup_png)?;
//! # Ok(())
//! # }
//! ```
//!
//! ### Feature Flags
//!
//! - `cli` (default): command-line interface and tracing subscriber setup
//! - `webp-support` (default): WebP encoding
//! - `tracing-json`: JSON log output for the CLI

#[cfg(feature = "cli")]
pub mod cli;
pub mod config;
pub mod error;
pub mod generation;
pub mod mockup;
pub mod pipeline;
pub mod pixel;
pub mod processor;
pub mod services;
#[cfg(feature = "cli")]
pub mod tracing_config;
pub mod types;

use tokio::io::AsyncRead;

pub use config::{
    AlphaPolicy, FeatherScope, OutputFormat, RemovalConfig, RemovalOptions, DEFAULT_THRESHOLD,
    MAX_SMOOTHING_RADIUS,
};
pub use error::{ImageGenError, Result};
pub use generation::{
    GenerateImageRequest, GenerateImageResponse, GenerationConfig, ImageGenerationClient,
    ImageGenerator,
};
pub use mockup::{MockupCompositor, MockupConfig, TshirtColor};
pub use pipeline::{DesignOutcome, DesignPipeline};
pub use pixel::{has_white_background, transform, ImageData, PixelBuffer, RgbaSurface};
pub use processor::BackgroundRemovalProcessor;
pub use services::{HttpImageFetcher, ImageIOService, ImageSource, OutputFormatHandler};
pub use types::{ProcessingMetadata, ProcessingTimings, RemovalResult};

#[cfg(feature = "cli")]
pub use tracing_config::{init_cli_tracing, TracingConfig, TracingFormat};

/// Remove the light background from encoded image bytes
///
/// Suitable for upload handlers and other in-memory callers.
///
/// # Examples
/// ```rust,no_run
/// use tshirt_image_gen::{remove_white_background_from_bytes, OutputFormat, RemovalConfig};
///
/// # fn example(upload_bytes: Vec<u8>) -> anyhow::Result<()> {
/// let config = RemovalConfig::default();
/// let result = remove_white_background_from_bytes(&upload_bytes, &config)?;
/// let png = result.to_bytes(OutputFormat::Png, 1.0)?;
/// # Ok(())
/// # }
/// ```
pub fn remove_white_background_from_bytes(
    image_bytes: &[u8],
    config: &RemovalConfig,
) -> Result<RemovalResult> {
    BackgroundRemovalProcessor::new(config.clone())?.process_bytes(image_bytes)
}

/// Remove the light background from a decoded image
pub fn remove_white_background_from_image(
    image: &image::DynamicImage,
    config: &RemovalConfig,
) -> Result<RemovalResult> {
    BackgroundRemovalProcessor::new(config.clone())?.process_image(image)
}

/// Download an image over HTTP(S) and remove its light background
///
/// # Examples
/// ```rust,no_run
/// use tshirt_image_gen::{remove_white_background_from_url, RemovalConfig};
///
/// # async fn example() -> anyhow::Result<()> {
/// let result = remove_white_background_from_url(
///     "https://cdn.example.com/logo.png",
///     &RemovalConfig::default(),
/// )
/// .await?;
/// result.save_png("logo.png")?;
/// # Ok(())
/// # }
/// ```
pub async fn remove_white_background_from_url(
    url: &str,
    config: &RemovalConfig,
) -> Result<RemovalResult> {
    BackgroundRemovalProcessor::new(config.clone())?
        .process_url(url)
        .await
}

/// Remove the light background from an async stream of encoded image data
pub async fn remove_white_background_from_reader<R: AsyncRead + Unpin>(
    reader: R,
    config: &RemovalConfig,
) -> Result<RemovalResult> {
    BackgroundRemovalProcessor::new(config.clone())?
        .process_reader(reader)
        .await
}

/// Compose encoded design bytes into a PNG mockup
pub fn create_mockup(design_bytes: &[u8], config: &MockupConfig) -> Result<Vec<u8>> {
    MockupCompositor::new(config.clone())?.compose_bytes(design_bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageFormat, Rgba, RgbaImage};
    use std::io::Cursor;

    fn white_png(width: u32, height: u32) -> Vec<u8> {
        let image = RgbaImage::from_pixel(width, height, Rgba([255, 255, 255, 255]));
        let mut cursor = Cursor::new(Vec::new());
        image.write_to(&mut cursor, ImageFormat::Png).unwrap();
        cursor.into_inner()
    }

    #[test]
    fn test_bytes_api() {
        let result = remove_white_background_from_bytes(&white_png(3, 3), &RemovalConfig::default())
            .unwrap();
        assert_eq!(result.transparent_pixels(), 9);
    }

    #[tokio::test]
    async fn test_reader_api() {
        let reader = Cursor::new(white_png(2, 2));
        let result = remove_white_background_from_reader(reader, &RemovalConfig::default())
            .await
            .unwrap();
        assert_eq!(result.dimensions(), (2, 2));
    }

    #[test]
    fn test_create_mockup_api() {
        let config = MockupConfig {
            canvas_width: 8,
            canvas_height: 8,
            design_width: 4,
            design_height: 4,
            top: 2,
            left: None,
            color: TshirtColor::Red,
        };
        let png = create_mockup(&white_png(4, 4), &config).unwrap();
        let mockup = image::load_from_memory(&png).unwrap().to_rgba8();
        assert_eq!(mockup.dimensions(), (8, 8));
        assert_eq!(*mockup.get_pixel(0, 0), Rgba([255, 0, 0, 255]));
    }
}
