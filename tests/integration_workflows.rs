//! Integration tests for complete design workflows
//!
//! These tests run the processor, compositor and pipeline end to end with an
//! in-process generator and image source, so no network access is needed.

use async_trait::async_trait;
use image::{DynamicImage, ImageFormat, Rgb, RgbImage, Rgba, RgbaImage};
use std::collections::HashMap;
use std::sync::Arc;
use tempfile::TempDir;
use tshirt_image_gen::{
    error::{ImageGenError, Result},
    generation::{GenerateImageRequest, GenerateImageResponse, ImageGenerator},
    BackgroundRemovalProcessor, DesignPipeline, ImageSource, MockupCompositor, MockupConfig,
    OutputFormat, RemovalConfig, TshirtColor,
};

/// A JPEG-like design: red disc on a slightly noisy white background
fn create_design_image(size: u32) -> DynamicImage {
    let centre = size as f32 / 2.0;
    let radius = size as f32 / 4.0;
    let mut image = RgbImage::new(size, size);
    for (x, y, pixel) in image.enumerate_pixels_mut() {
        let dx = x as f32 - centre;
        let dy = y as f32 - centre;
        *pixel = if (dx * dx + dy * dy).sqrt() < radius {
            Rgb([200, 30, 30])
        } else {
            let jitter = ((x * 7 + y * 13) % 6) as u8;
            Rgb([250 - jitter, 251 - jitter, 249 - jitter])
        };
    }
    DynamicImage::ImageRgb8(image)
}

fn encode(image: &DynamicImage, format: ImageFormat) -> Vec<u8> {
    let mut cursor = std::io::Cursor::new(Vec::new());
    image.write_to(&mut cursor, format).unwrap();
    cursor.into_inner()
}

/// Serves fixed bytes per URL
struct MapSource {
    images: HashMap<String, Vec<u8>>,
}

#[async_trait]
impl ImageSource for MapSource {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>> {
        self.images
            .get(url)
            .cloned()
            .ok_or_else(|| ImageGenError::Network(format!("Failed to download {}: HTTP 404", url)))
    }
}

/// Answers every prompt with a URL derived from the prompt
struct SlugGenerator;

#[async_trait]
impl ImageGenerator for SlugGenerator {
    async fn generate_image(&self, request: &GenerateImageRequest) -> Result<GenerateImageResponse> {
        let slug: String = request
            .prompt
            .split(',')
            .next()
            .unwrap_or_default()
            .replace(' ', "-");
        Ok(GenerateImageResponse {
            image_url: format!("https://cdn.example/{}.png", slug),
            seed: request.seed,
            prompt: request.prompt.clone(),
        })
    }
}

fn small_mockup() -> MockupConfig {
    MockupConfig {
        canvas_width: 60,
        canvas_height: 80,
        design_width: 40,
        design_height: 40,
        top: 15,
        left: None,
        color: TshirtColor::Black,
    }
}

#[test]
fn test_file_to_file_workflow() -> Result<()> {
    let temp = TempDir::new()?;
    let input = temp.path().join("design.png");
    std::fs::write(&input, encode(&create_design_image(32), ImageFormat::Png))?;

    let processor = BackgroundRemovalProcessor::new(RemovalConfig::default())?;
    let result = processor.process_file(&input)?;

    assert_eq!(result.dimensions(), (32, 32));
    assert!(result.metadata.background_removed);
    assert!(result.metadata.light_pixel_ratio > 0.7);
    // corners are background, the disc centre is kept
    assert_eq!(result.buffer.pixel(0, 0).map(|p| p[3]), Some(0));
    assert_eq!(result.buffer.pixel(16, 16), Some([200, 30, 30, 255]));

    let output = temp.path().join("out").join("design_bg_removed.png");
    result.save(&output, OutputFormat::Png, 1.0)?;
    let reloaded = image::open(&output)?.to_rgba8();
    assert_eq!(reloaded.as_raw(), result.buffer.as_bytes());
    Ok(())
}

#[test]
fn test_jpeg_input_gains_alpha_channel() -> Result<()> {
    let jpeg = encode(&create_design_image(24), ImageFormat::Jpeg);
    let processor = BackgroundRemovalProcessor::new(RemovalConfig::default())?;
    let result = processor.process_bytes(&jpeg)?;

    assert_eq!(result.buffer.as_bytes().len(), 24 * 24 * 4);
    assert!(result.transparent_pixels() > 0);
    Ok(())
}

#[cfg(feature = "webp-support")]
#[test]
fn test_webp_output_is_lossless() -> Result<()> {
    let processor = BackgroundRemovalProcessor::new(
        RemovalConfig::builder()
            .output_format(OutputFormat::WebP)
            .quality(0.5)
            .build()?,
    )?;
    let result = processor.process_image(&create_design_image(16))?;
    let bytes = processor.encode(&result)?;

    assert_eq!(&bytes[8..12], b"WEBP");
    let decoded = image::load_from_memory(&bytes)?.to_rgba8();
    // fully transparent pixels may lose their colour, alpha survives
    let alphas: Vec<u8> = decoded.pixels().map(|p| p[3]).collect();
    assert_eq!(alphas, result.buffer.alphas().collect::<Vec<_>>());
    Ok(())
}

#[tokio::test]
async fn test_remote_image_workflow() -> Result<()> {
    let url = "https://cdn.example/logo.png".to_string();
    let source = MapSource {
        images: HashMap::from([(url.clone(), encode(&create_design_image(20), ImageFormat::Png))]),
    };
    let processor = BackgroundRemovalProcessor::with_source(RemovalConfig::default(), Arc::new(source))?;

    let result = processor.process_url(&url).await?;
    assert!(result.metadata.timings.fetch_ms.is_some());
    assert!(result.transparent_pixels() > 200);

    let missing = processor.process_url("https://cdn.example/missing.png").await;
    assert!(matches!(missing, Err(ImageGenError::Network(_))));
    Ok(())
}

#[test]
fn test_removed_background_shows_shirt_colour() -> Result<()> {
    let processor = BackgroundRemovalProcessor::new(RemovalConfig::default())?;
    let design = processor.process_image(&create_design_image(40))?;

    let compositor = MockupCompositor::new(small_mockup().with_color(TshirtColor::Navy))?;
    let mockup = compositor.compose(&DynamicImage::ImageRgba8(design.buffer.into_rgba_image()))?;

    assert_eq!(mockup.dimensions(), (60, 80));
    // design box spans x 10..50, y 15..55
    assert_eq!(*mockup.get_pixel(11, 16), Rgba([0, 31, 63, 255]));
    assert_eq!(*mockup.get_pixel(30, 35), Rgba([200, 30, 30, 255]));
    assert_eq!(*mockup.get_pixel(30, 70), Rgba([0, 31, 63, 255]));
    Ok(())
}

#[tokio::test]
async fn test_prompt_to_mockup_pipeline() -> Result<()> {
    let design_png = encode(&create_design_image(40), ImageFormat::Png);
    let source = MapSource {
        images: HashMap::from([
            ("https://cdn.example/red-disc.png".to_string(), design_png.clone()),
            ("https://cdn.example/other-disc.png".to_string(), design_png),
        ]),
    };
    let pipeline = DesignPipeline::new(SlugGenerator, source, RemovalConfig::default(), small_mockup())?
        .with_request_template(GenerateImageRequest::default().seed(99));

    let outcome = pipeline.create_design("red disc", TshirtColor::White).await?;
    assert_eq!(outcome.logo_url, "https://cdn.example/red-disc.png");
    assert_eq!(outcome.seed, Some(99));

    let mockup = image::load_from_memory(&outcome.mockup_png)?.to_rgba8();
    assert_eq!(*mockup.get_pixel(0, 0), Rgba([255, 255, 255, 255]));
    assert_eq!(*mockup.get_pixel(30, 35), Rgba([200, 30, 30, 255]));

    let json = serde_json::to_value(&outcome).unwrap();
    assert_eq!(json["logo_url"], "https://cdn.example/red-disc.png");
    assert!(json.get("mockup_png").is_none());

    let batch = pipeline
        .create_designs(
            &["red disc".to_string(), "other disc".to_string()],
            TshirtColor::Gray,
        )
        .await?;
    assert_eq!(batch.len(), 2);
    assert_eq!(batch[1].logo_url, "https://cdn.example/other-disc.png");
    Ok(())
}

#[tokio::test]
async fn test_dark_design_is_kept_when_skipping() -> Result<()> {
    let dark = DynamicImage::ImageRgba8(RgbaImage::from_pixel(10, 10, Rgba([15, 15, 40, 255])));
    let source = MapSource {
        images: HashMap::from([("https://cdn.example/night.png".to_string(), encode(&dark, ImageFormat::Png))]),
    };
    let removal = RemovalConfig::builder().skip_dark_backgrounds(true).build()?;
    let pipeline = DesignPipeline::new(SlugGenerator, source, removal, small_mockup())?;

    let outcome = pipeline.create_design("night", TshirtColor::Red).await?;
    assert!(!outcome.metadata.background_removed);

    let transparent = image::load_from_memory(&outcome.transparent_png)?.to_rgba8();
    assert!(transparent.pixels().all(|p| *p == Rgba([15, 15, 40, 255])));
    Ok(())
}
