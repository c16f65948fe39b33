//! Image I/O operations service
//!
//! Decoding from files and memory plus writing encoded results, kept apart
//! from the pixel transform so the transform never performs I/O.

use crate::{
    error::{ImageGenError, Result},
    pixel::PixelBuffer,
};
use image::DynamicImage;
use std::path::Path;

/// Service for handling image input/output operations
pub struct ImageIOService;

impl ImageIOService {
    /// Load an image from a file path
    ///
    /// Extension-based detection is tried first, then content sniffing.
    ///
    /// # Errors
    /// - File does not exist or cannot be read
    /// - Content is not a supported image
    pub fn load_image<P: AsRef<Path>>(path: P) -> Result<DynamicImage> {
        let path_ref = path.as_ref();

        if !path_ref.exists() {
            return Err(ImageGenError::file_io_error(
                "read image file",
                path_ref,
                &std::io::Error::new(std::io::ErrorKind::NotFound, "file does not exist"),
            ));
        }

        match image::open(path_ref) {
            Ok(img) => Ok(img),
            Err(e) => {
                log::debug!(
                    "Extension-based loading failed for {}: {}. Attempting content-based detection.",
                    path_ref.display(),
                    e
                );

                let data = std::fs::read(path_ref).map_err(|io_err| {
                    ImageGenError::file_io_error("read image data", path_ref, &io_err)
                })?;

                image::load_from_memory(&data).map_err(|content_err| {
                    let extension = path_ref
                        .extension()
                        .and_then(|s| s.to_str())
                        .unwrap_or("unknown");

                    ImageGenError::processing_stage_error(
                        "image loading",
                        &format!(
                            "Extension error ({}): {}. Content error: {}",
                            extension, e, content_err
                        ),
                        Some(&format!(
                            "path: {}, size: {} bytes",
                            path_ref.display(),
                            data.len()
                        )),
                    )
                })
            },
        }
    }

    /// Decode in-memory image bytes
    ///
    /// # Errors
    /// - `Decode` if the bytes are empty or not a supported image
    pub fn decode_bytes(bytes: &[u8]) -> Result<DynamicImage> {
        if bytes.is_empty() {
            return Err(ImageGenError::decode("image data is empty"));
        }

        image::load_from_memory(bytes).map_err(|e| {
            ImageGenError::processing_stage_error(
                "decode",
                &e.to_string(),
                Some(&format!("{} bytes", bytes.len())),
            )
        })
    }

    /// Decode in-memory bytes straight into a pixel buffer
    ///
    /// # Errors
    /// - `Decode` for unreadable data
    /// - `InvalidBufferShape` for zero-sized images
    pub fn decode_to_buffer(bytes: &[u8]) -> Result<PixelBuffer> {
        let image = Self::decode_bytes(bytes)?;
        PixelBuffer::from_dynamic_image(&image)
    }

    /// Write encoded bytes, creating parent directories as needed
    ///
    /// # Errors
    /// - Directory creation or write failures
    pub fn write_bytes<P: AsRef<Path>>(bytes: &[u8], path: P) -> Result<()> {
        let path_ref = path.as_ref();

        if let Some(parent) = path_ref.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| {
                ImageGenError::file_io_error("create output directory", parent, &e)
            })?;
        }

        std::fs::write(path_ref, bytes)
            .map_err(|e| ImageGenError::file_io_error("write image", path_ref, &e))?;

        log::debug!("Wrote {} bytes to {}", bytes.len(), path_ref.display());
        Ok(())
    }
}
