//! Output format handling service
//!
//! Encodes transformed pixels into the byte formats handed to callers,
//! keeping codec details out of the processor.

use crate::{
    config::OutputFormat,
    error::{ImageGenError, Result},
    pixel::PixelBuffer,
};
use image::{ExtendedColorType, ImageEncoder, RgbaImage};

/// Service for handling output format conversions
pub struct OutputFormatHandler;

impl OutputFormatHandler {
    /// Encode a pixel buffer into the requested format
    ///
    /// # Arguments
    /// * `buffer` - Pixels to encode
    /// * `format` - Target output format
    /// * `quality` - Lossy quality in 0.0-1.0
    ///
    /// # Errors
    /// - `InvalidOptionRange` for a quality outside 0.0-1.0
    /// - Codec errors from the `image` crate
    pub fn encode(buffer: &PixelBuffer, format: OutputFormat, quality: f32) -> Result<Vec<u8>> {
        Self::encode_rgba(buffer.as_bytes(), buffer.width(), buffer.height(), format, quality)
    }

    /// Encode an `image` crate RGBA buffer into the requested format
    ///
    /// # Errors
    /// - `InvalidOptionRange` for a quality outside 0.0-1.0
    /// - Codec errors from the `image` crate
    pub fn encode_image(image: &RgbaImage, format: OutputFormat, quality: f32) -> Result<Vec<u8>> {
        Self::encode_rgba(image.as_raw(), image.width(), image.height(), format, quality)
    }

    fn encode_rgba(
        rgba: &[u8],
        width: u32,
        height: u32,
        format: OutputFormat,
        quality: f32,
    ) -> Result<Vec<u8>> {
        Self::validate_quality(quality)?;

        let mut bytes = Vec::new();
        match format {
            OutputFormat::Png => {
                image::codecs::png::PngEncoder::new(&mut bytes).write_image(
                    rgba,
                    width,
                    height,
                    ExtendedColorType::Rgba8,
                )?;
            },
            #[cfg(feature = "webp-support")]
            OutputFormat::WebP => {
                // The pure-Rust WebP encoder is lossless only
                log::debug!("Encoding lossless WebP, requested quality {:.2}", quality);
                image::codecs::webp::WebPEncoder::new_lossless(&mut bytes).write_image(
                    rgba,
                    width,
                    height,
                    ExtendedColorType::Rgba8,
                )?;
            },
            #[cfg(not(feature = "webp-support"))]
            OutputFormat::WebP => {
                return Err(ImageGenError::invalid_config(
                    "WebP output requires the 'webp-support' feature",
                ));
            },
        }
        Ok(bytes)
    }

    /// Check that a lossy quality value lies in 0.0-1.0
    ///
    /// # Errors
    /// - `InvalidOptionRange` for non-finite or out-of-range values
    pub fn validate_quality(quality: f32) -> Result<f32> {
        if quality.is_finite() && (0.0..=1.0).contains(&quality) {
            Ok(quality)
        } else {
            Err(ImageGenError::config_value_error(
                "quality",
                quality,
                "0.0-1.0",
                Some(crate::config::DEFAULT_QUALITY),
            ))
        }
    }

    /// Get the file extension for a given output format
    ///
    /// # Examples
    /// ```rust
    /// use tshirt_image_gen::{services::OutputFormatHandler, OutputFormat};
    ///
    /// assert_eq!(OutputFormatHandler::get_extension(OutputFormat::Png), "png");
    /// assert_eq!(OutputFormatHandler::get_extension(OutputFormat::WebP), "webp");
    /// ```
    #[must_use]
    pub fn get_extension(format: OutputFormat) -> &'static str {
        match format {
            OutputFormat::Png => "png",
            OutputFormat::WebP => "webp",
        }
    }

    /// MIME type to send alongside encoded bytes
    #[must_use]
    pub fn content_type(format: OutputFormat) -> &'static str {
        match format {
            OutputFormat::Png => "image/png",
            OutputFormat::WebP => "image/webp",
        }
    }

    /// Guess an output format from a file extension (case-insensitive)
    #[must_use]
    pub fn from_extension(extension: &str) -> Option<OutputFormat> {
        match extension.to_ascii_lowercase().as_str() {
            "png" => Some(OutputFormat::Png),
            "webp" => Some(OutputFormat::WebP),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_buffer() -> PixelBuffer {
        let mut data = [255u8, 0, 0, 255].repeat(4);
        data[3] = 0;
        PixelBuffer::new(2, 2, data).unwrap()
    }

    #[test]
    fn test_encode_png_keeps_alpha() {
        let buffer = sample_buffer();
        let bytes = OutputFormatHandler::encode(&buffer, OutputFormat::Png, 1.0).unwrap();
        assert_eq!(&bytes[..8], b"\x89PNG\r\n\x1a\n");

        let decoded = image::load_from_memory(&bytes).unwrap().to_rgba8();
        assert_eq!(decoded.as_raw(), buffer.as_bytes());
    }

    #[cfg(feature = "webp-support")]
    #[test]
    fn test_encode_webp_is_lossless() {
        let buffer = sample_buffer();
        let bytes = OutputFormatHandler::encode(&buffer, OutputFormat::WebP, 0.5).unwrap();
        assert_eq!(&bytes[..4], b"RIFF");
        assert_eq!(&bytes[8..12], b"WEBP");

        let decoded = image::load_from_memory(&bytes).unwrap().to_rgba8();
        assert_eq!(decoded.as_raw(), buffer.as_bytes());
    }

    #[test]
    fn test_encode_rejects_bad_quality() {
        let buffer = sample_buffer();
        let err = OutputFormatHandler::encode(&buffer, OutputFormat::Png, 1.5).unwrap_err();
        assert!(matches!(err, ImageGenError::InvalidOptionRange(_)));
        assert!(OutputFormatHandler::validate_quality(f32::INFINITY).is_err());
        assert!(OutputFormatHandler::validate_quality(0.0).is_ok());
    }

    #[test]
    fn test_extension_and_content_type() {
        assert_eq!(OutputFormatHandler::content_type(OutputFormat::Png), "image/png");
        assert_eq!(OutputFormatHandler::content_type(OutputFormat::WebP), "image/webp");
        assert_eq!(OutputFormatHandler::from_extension("PNG"), Some(OutputFormat::Png));
        assert_eq!(OutputFormatHandler::from_extension("webp"), Some(OutputFormat::WebP));
        assert_eq!(OutputFormatHandler::from_extension("jpg"), None);
    }
}
