//! RGBA pixel buffer and its two I/O adapters

use crate::error::{ImageGenError, Result};
use image::{DynamicImage, RgbaImage};

/// Number of interleaved channels per pixel (R, G, B, A)
pub const CHANNELS: usize = 4;

/// Rectangular grid of interleaved RGBA bytes
///
/// Pixel `(x, y)` lives at `data[(y * width + x) * 4..][..4]`. The length
/// invariant `width * height * 4` and non-zero dimensions are checked once at
/// construction, so every pass can index freely afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PixelBuffer {
    width: u32,
    height: u32,
    data: Vec<u8>,
}

impl PixelBuffer {
    /// Wrap raw RGBA bytes
    ///
    /// # Errors
    /// - `InvalidBufferShape` if a dimension is zero or the length is not `width * height * 4`
    pub fn new(width: u32, height: u32, data: Vec<u8>) -> Result<Self> {
        let expected = (width as usize)
            .checked_mul(height as usize)
            .and_then(|pixels| pixels.checked_mul(CHANNELS));

        match expected {
            Some(expected) if width > 0 && height > 0 && expected == data.len() => Ok(Self {
                width,
                height,
                data,
            }),
            _ => Err(ImageGenError::buffer_shape(width, height, data.len())),
        }
    }

    /// Buffer where every pixel has the same RGBA value
    ///
    /// # Errors
    /// - `InvalidBufferShape` if a dimension is zero or the byte count overflows
    pub fn filled(width: u32, height: u32, rgba: [u8; 4]) -> Result<Self> {
        let pixels = (width as usize)
            .checked_mul(height as usize)
            .filter(|pixels| pixels.checked_mul(CHANNELS).is_some())
            .ok_or_else(|| ImageGenError::buffer_shape(width, height, 0))?;
        Self::new(width, height, rgba.repeat(pixels))
    }

    /// Raw-buffer adapter: take ownership of a decoded RGBA image
    ///
    /// # Errors
    /// - `InvalidBufferShape` for zero-sized images
    pub fn from_rgba_image(image: RgbaImage) -> Result<Self> {
        let (width, height) = image.dimensions();
        Self::new(width, height, image.into_raw())
    }

    /// Canvas-style adapter
    ///
    /// # Errors
    /// - `InvalidBufferShape` if `data` does not hold `width * height` pixels
    pub fn from_image_data(image_data: ImageData) -> Result<Self> {
        image_data.into_pixel_buffer()
    }

    /// Decode-path helper that adds an alpha channel where the source has none
    ///
    /// # Errors
    /// - `InvalidBufferShape` for zero-sized images
    pub fn from_dynamic_image(image: &DynamicImage) -> Result<Self> {
        Self::from_rgba_image(image.to_rgba8())
    }

    /// Hand the pixels back as an `image` crate buffer for encoding
    #[must_use]
    pub fn into_rgba_image(self) -> RgbaImage {
        // Length was validated at construction
        RgbaImage::from_raw(self.width, self.height, self.data)
            .unwrap_or_else(|| unreachable!("PixelBuffer length invariant violated"))
    }

    #[must_use]
    pub fn width(&self) -> u32 {
        self.width
    }

    #[must_use]
    pub fn height(&self) -> u32 {
        self.height
    }

    #[must_use]
    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    #[must_use]
    pub fn pixel_count(&self) -> usize {
        self.data.len() / CHANNELS
    }

    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    pub(crate) fn as_bytes_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    #[must_use]
    pub fn into_raw(self) -> Vec<u8> {
        self.data
    }

    /// Byte offset of pixel `(x, y)`
    #[must_use]
    pub fn offset(&self, x: u32, y: u32) -> usize {
        ((y as usize) * (self.width as usize) + (x as usize)) * CHANNELS
    }

    /// RGBA value at `(x, y)`, or `None` outside the grid
    #[must_use]
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let offset = self.offset(x, y);
        self.data
            .get(offset..offset + CHANNELS)
            .and_then(|px| px.try_into().ok())
    }

    /// Alpha channel in row-major order
    pub fn alphas(&self) -> impl Iterator<Item = u8> + '_ {
        self.data.chunks_exact(CHANNELS).map(|px| px[3])
    }
}

/// Anything that can carry a [`PixelBuffer`] in and out of the transform
///
/// The two implementations cover the raw decoded buffer (`RgbaImage`) and the
/// canvas-style `ImageData` layout.
pub trait RgbaSurface: Sized {
    /// Move the surface's pixels into a validated buffer
    ///
    /// # Errors
    /// - `InvalidBufferShape` if the surface is malformed
    fn into_pixel_buffer(self) -> Result<PixelBuffer>;

    /// Rebuild the surface from transformed pixels
    fn from_pixel_buffer(buffer: PixelBuffer) -> Self;
}

impl RgbaSurface for RgbaImage {
    fn into_pixel_buffer(self) -> Result<PixelBuffer> {
        PixelBuffer::from_rgba_image(self)
    }

    fn from_pixel_buffer(buffer: PixelBuffer) -> Self {
        buffer.into_rgba_image()
    }
}

/// Canvas-style pixel block: explicit dimensions plus a flat byte array
///
/// Mirrors the shape a 2D canvas hands out, so callers bridging from a
/// browser context can pass the block through unchanged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageData {
    pub width: u32,
    pub height: u32,
    pub data: Vec<u8>,
}

impl ImageData {
    #[must_use]
    pub fn new(width: u32, height: u32, data: Vec<u8>) -> Self {
        Self {
            width,
            height,
            data,
        }
    }

    /// Build from wide integer samples, saturating each into `0..=255`
    #[must_use]
    pub fn from_clamped(width: u32, height: u32, samples: &[i32]) -> Self {
        let data = samples
            .iter()
            .map(|&sample| sample.clamp(0, 255) as u8)
            .collect();
        Self::new(width, height, data)
    }
}

impl RgbaSurface for ImageData {
    fn into_pixel_buffer(self) -> Result<PixelBuffer> {
        PixelBuffer::new(self.width, self.height, self.data)
    }

    fn from_pixel_buffer(buffer: PixelBuffer) -> Self {
        let (width, height) = buffer.dimensions();
        Self::new(width, height, buffer.into_raw())
    }
}
