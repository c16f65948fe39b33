//! White-background removal core
//!
//! A pure transform over RGBA pixel buffers: a global brightness threshold,
//! an optional box smoothing of partially transparent pixels, and an optional
//! feathering of alpha next to transparent pixels. There is no subject
//! detection, so results on busy or light-coloured subjects are limited
//! compared to model-based removal.

mod buffer;
mod passes;

pub use buffer::{ImageData, PixelBuffer, RgbaSurface, CHANNELS};
pub use passes::{
    exceeds_threshold, feathered_alpha, feathering_pass, has_white_background, is_edge_alpha,
    light_pixel_ratio, smoothing_pass, threshold_pass, WHITE_BACKGROUND_RATIO,
};

use crate::config::RemovalOptions;
use crate::error::Result;
use tracing::{debug_span, instrument};

/// Run threshold → smoothing → feathering over a buffer
///
/// Smoothing runs only when `smoothing_radius > 0` and feathering only when
/// `feathering_enabled`. Each pass sees the complete output of the one
/// before. The result depends on nothing but the arguments.
///
/// # Errors
/// - `InvalidOptionRange` if the options fail validation
///
/// # Examples
/// ```rust
/// use tshirt_image_gen::{pixel::{self, PixelBuffer}, RemovalOptions};
///
/// let mut data = [255u8, 255, 255, 255].repeat(4);
/// data[8..12].copy_from_slice(&[0, 0, 0, 255]);
/// let buffer = PixelBuffer::new(4, 1, data).unwrap();
///
/// let options = RemovalOptions::builder()
///     .smoothing_radius(0)
///     .feathering(false)
///     .build()
///     .unwrap();
/// let out = pixel::transform(buffer, &options).unwrap();
/// assert_eq!(out.alphas().collect::<Vec<_>>(), vec![0, 0, 255, 0]);
/// ```
#[instrument(
    skip(buffer, options),
    fields(
        width = buffer.width(),
        height = buffer.height(),
        threshold = options.threshold,
        smoothing_radius = options.smoothing_radius,
        feathering = options.feathering_enabled
    )
)]
pub fn transform(buffer: PixelBuffer, options: &RemovalOptions) -> Result<PixelBuffer> {
    options.validate()?;

    let mut buffer = {
        let _span = debug_span!("threshold_pass", policy = %options.alpha_policy).entered();
        threshold_pass(buffer, options.threshold, options.alpha_policy)
    };

    if options.smoothing_enabled() {
        let _span = debug_span!("smoothing_pass", radius = options.smoothing_radius).entered();
        buffer = smoothing_pass(buffer, options.smoothing_radius);
    }

    if options.feathering_enabled {
        let _span = debug_span!("feathering_pass", scope = ?options.feather_scope).entered();
        buffer = feathering_pass(buffer, options.feather_scope);
    }

    Ok(buffer)
}

/// Transform raw interleaved RGBA bytes of a `width × height` image
///
/// # Errors
/// - `InvalidBufferShape` if `data.len() != width * height * 4` or a dimension is zero
/// - `InvalidOptionRange` if the options fail validation
pub fn transform_raw(
    width: u32,
    height: u32,
    data: Vec<u8>,
    options: &RemovalOptions,
) -> Result<Vec<u8>> {
    let buffer = PixelBuffer::new(width, height, data)?;
    transform(buffer, options).map(PixelBuffer::into_raw)
}

/// Transform any [`RgbaSurface`] and hand back the same kind of surface
///
/// # Errors
/// - `InvalidBufferShape` if the surface is malformed
/// - `InvalidOptionRange` if the options fail validation
pub fn transform_surface<S: RgbaSurface>(surface: S, options: &RemovalOptions) -> Result<S> {
    let buffer = surface.into_pixel_buffer()?;
    transform(buffer, options).map(S::from_pixel_buffer)
}
