//! Result and metadata types for background removal runs

use crate::{
    config::{OutputFormat, RemovalOptions},
    error::Result,
    pixel::PixelBuffer,
    services::{ImageIOService, OutputFormatHandler},
};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Result of a background removal operation
#[derive(Debug, Clone)]
pub struct RemovalResult {
    /// The transformed pixels
    pub buffer: PixelBuffer,

    /// Processing metadata
    pub metadata: ProcessingMetadata,
}

impl RemovalResult {
    #[must_use]
    pub fn new(buffer: PixelBuffer, metadata: ProcessingMetadata) -> Self {
        Self { buffer, metadata }
    }

    /// Image dimensions
    #[must_use]
    pub fn dimensions(&self) -> (u32, u32) {
        self.buffer.dimensions()
    }

    /// Encode the result
    ///
    /// # Errors
    /// - Invalid quality or codec failures
    pub fn to_bytes(&self, format: OutputFormat, quality: f32) -> Result<Vec<u8>> {
        OutputFormatHandler::encode(&self.buffer, format, quality)
    }

    /// Encode and write the result, returning the encode time in milliseconds
    ///
    /// # Errors
    /// - Invalid quality, codec or write failures
    pub fn save<P: AsRef<Path>>(&self, path: P, format: OutputFormat, quality: f32) -> Result<u64> {
        let encode_start = instant::Instant::now();
        let bytes = self.to_bytes(format, quality)?;
        let encode_ms = encode_start.elapsed().as_millis() as u64;
        ImageIOService::write_bytes(&bytes, path)?;
        Ok(encode_ms)
    }

    /// Save as PNG
    ///
    /// # Errors
    /// - Codec or write failures
    pub fn save_png<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        self.save(path, OutputFormat::Png, 1.0).map(|_| ())
    }

    /// Number of fully transparent pixels
    #[must_use]
    pub fn transparent_pixels(&self) -> usize {
        self.buffer.alphas().filter(|&a| a == 0).count()
    }
}

/// What happened during a run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessingMetadata {
    /// Options the transform ran with
    pub options: RemovalOptions,

    /// Share of pixels above the threshold in the decoded input
    pub light_pixel_ratio: f32,

    /// False when the transform was skipped for a dark background
    pub background_removed: bool,

    /// Per-stage timings
    pub timings: ProcessingTimings,
}

/// Per-stage timings in milliseconds
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessingTimings {
    /// Download time, when the source was remote
    pub fetch_ms: Option<u64>,

    /// Image decoding into a pixel buffer
    pub image_decode_ms: u64,

    /// Threshold, smoothing and feathering
    pub transform_ms: u64,

    /// Total end-to-end processing time
    pub total_ms: u64,
}

impl ProcessingTimings {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Share of the total spent in the pixel transform
    #[must_use]
    pub fn transform_ratio(&self) -> f64 {
        if self.total_ms == 0 {
            0.0
        } else {
            self.transform_ms as f64 / self.total_ms as f64
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn sample_result() -> RemovalResult {
        let mut data = [0u8, 0, 0, 255].repeat(4);
        data[3] = 0;
        data[7] = 0;
        RemovalResult::new(
            PixelBuffer::new(2, 2, data).unwrap(),
            ProcessingMetadata {
                options: RemovalOptions::default(),
                light_pixel_ratio: 0.5,
                background_removed: true,
                timings: ProcessingTimings::new(),
            },
        )
    }

    #[test]
    fn test_transparent_pixel_count() {
        let result = sample_result();
        assert_eq!(result.dimensions(), (2, 2));
        assert_eq!(result.transparent_pixels(), 2);
    }

    #[test]
    fn test_save_png() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out.png");
        let result = sample_result();
        result.save_png(&path).unwrap();

        let decoded = image::open(&path).unwrap().to_rgba8();
        assert_eq!(decoded.as_raw(), result.buffer.as_bytes());
    }

    #[test]
    fn test_transform_ratio() {
        let mut timings = ProcessingTimings::new();
        assert!(timings.transform_ratio().abs() < f64::EPSILON);
        timings.transform_ms = 25;
        timings.total_ms = 100;
        assert!((timings.transform_ratio() - 0.25).abs() < f64::EPSILON);
    }

    #[test]
    fn test_metadata_serializes() {
        let json = serde_json::to_string(&sample_result().metadata).unwrap();
        assert!(json.contains("\"background_removed\":true"));
        assert!(json.contains("\"fetch_ms\":null"));
    }
}
