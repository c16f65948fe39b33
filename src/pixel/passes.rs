//! Threshold, smoothing and feathering passes
//!
//! Each pass consumes a [`PixelBuffer`] and returns the transformed one. Passes
//! that look at neighbours first take a snapshot of what they read, so writes
//! never feed back into later reads of the same pass.

use super::buffer::{PixelBuffer, CHANNELS};
use crate::config::{AlphaPolicy, FeatherScope};

/// Share of light pixels above which an image counts as having a white background
pub const WHITE_BACKGROUND_RATIO: f32 = 0.8;

/// Feathering keeps four fifths of the alpha (`floor(alpha * 0.8)`)
const FEATHER_NUMERATOR: u16 = 4;
const FEATHER_DENOMINATOR: u16 = 5;

/// Whether a pixel's brightness `(r + g + b) / 3` is strictly above `threshold`
///
/// Compared as `r + g + b > 3 * threshold` so no rounding is involved.
#[must_use]
pub fn exceeds_threshold(r: u8, g: u8, b: u8, threshold: u8) -> bool {
    u16::from(r) + u16::from(g) + u16::from(b) > 3 * u16::from(threshold)
}

/// Partially transparent: strictly between 0 and 255
#[must_use]
pub fn is_edge_alpha(alpha: u8) -> bool {
    alpha > 0 && alpha < u8::MAX
}

/// `floor(alpha * 0.8)`
#[must_use]
pub fn feathered_alpha(alpha: u8) -> u8 {
    (u16::from(alpha) * FEATHER_NUMERATOR / FEATHER_DENOMINATOR) as u8
}

/// Make every pixel brighter than `threshold` fully transparent
///
/// RGB is never touched. Pixels at or below the cutoff keep their alpha under
/// [`AlphaPolicy::Preserve`] and become opaque under [`AlphaPolicy::ForceOpaque`].
#[must_use]
pub fn threshold_pass(mut buffer: PixelBuffer, threshold: u8, policy: AlphaPolicy) -> PixelBuffer {
    for px in buffer.as_bytes_mut().chunks_exact_mut(CHANNELS) {
        if exceeds_threshold(px[0], px[1], px[2], threshold) {
            px[3] = 0;
        } else if policy == AlphaPolicy::ForceOpaque {
            px[3] = u8::MAX;
        }
    }
    buffer
}

/// Box-average the edge pixels over a `(2r + 1)²` window
///
/// Only pixels whose snapshot alpha is strictly between 0 and 255 change; all
/// four channels take the floor mean of the window. Pixels closer than
/// `radius` to any image edge are left as they are. A radius of 0 returns the
/// buffer unchanged.
#[must_use]
pub fn smoothing_pass(mut buffer: PixelBuffer, radius: u32) -> PixelBuffer {
    let width = buffer.width() as usize;
    let height = buffer.height() as usize;
    let r = radius as usize;

    if r == 0 || width <= 2 * r || height <= 2 * r {
        return buffer;
    }

    let snapshot = buffer.as_bytes().to_vec();
    let window = ((2 * r + 1) * (2 * r + 1)) as u32;
    let data = buffer.as_bytes_mut();

    for y in r..height - r {
        for x in r..width - r {
            let i = (y * width + x) * CHANNELS;
            if !is_edge_alpha(snapshot[i + 3]) {
                continue;
            }

            let mut sums = [0u32; CHANNELS];
            for ny in y - r..=y + r {
                let row = ny * width;
                for nx in x - r..=x + r {
                    let ni = (row + nx) * CHANNELS;
                    for (sum, &value) in sums.iter_mut().zip(&snapshot[ni..ni + CHANNELS]) {
                        *sum += u32::from(value);
                    }
                }
            }

            for (out, sum) in data[i..i + CHANNELS].iter_mut().zip(sums) {
                // Mean of u8 samples always fits
                *out = (sum / window) as u8;
            }
        }
    }

    buffer
}

/// Soften alpha next to fully transparent pixels
///
/// A candidate pixel (see [`FeatherScope`]) whose up, down, left or right
/// neighbour is transparent in the snapshot gets `floor(alpha * 0.8)`. Pixels
/// on the outermost rows and columns are never feathered.
#[must_use]
pub fn feathering_pass(mut buffer: PixelBuffer, scope: FeatherScope) -> PixelBuffer {
    let width = buffer.width() as usize;
    let height = buffer.height() as usize;

    if width < 3 || height < 3 {
        return buffer;
    }

    let alphas: Vec<u8> = buffer.alphas().collect();
    let data = buffer.as_bytes_mut();

    for y in 1..height - 1 {
        for x in 1..width - 1 {
            let p = y * width + x;
            let alpha = alphas[p];

            let candidate = match scope {
                FeatherScope::Visible => alpha > 0,
                FeatherScope::EdgeOnly => is_edge_alpha(alpha),
            };
            if !candidate {
                continue;
            }

            let touches_transparent = alphas[p - width] == 0
                || alphas[p + width] == 0
                || alphas[p - 1] == 0
                || alphas[p + 1] == 0;

            if touches_transparent {
                data[p * CHANNELS + 3] = feathered_alpha(alpha);
            }
        }
    }

    buffer
}

/// Fraction of pixels whose brightness is above `threshold`
#[must_use]
pub fn light_pixel_ratio(buffer: &PixelBuffer, threshold: u8) -> f32 {
    let light = buffer
        .as_bytes()
        .chunks_exact(CHANNELS)
        .filter(|px| exceeds_threshold(px[0], px[1], px[2], threshold))
        .count();
    light as f32 / buffer.pixel_count() as f32
}

/// Whether more than 80% of the image is lighter than `threshold`
#[must_use]
pub fn has_white_background(buffer: &PixelBuffer, threshold: u8) -> bool {
    light_pixel_ratio(buffer, threshold) > WHITE_BACKGROUND_RATIO
}

#[cfg(test)]
mod tests {
    use super::*;

    fn buffer_from_pixels(width: u32, height: u32, pixels: &[[u8; 4]]) -> PixelBuffer {
        PixelBuffer::new(width, height, pixels.concat()).unwrap()
    }

    #[test]
    fn test_exceeds_threshold_is_strict() {
        // 240 * 3 = 720
        assert!(!exceeds_threshold(240, 240, 240, 240));
        assert!(exceeds_threshold(241, 240, 240, 240));
        assert!(exceeds_threshold(255, 255, 255, 254));
        assert!(!exceeds_threshold(255, 255, 255, 255));
        assert!(exceeds_threshold(1, 0, 0, 0));
        assert!(!exceeds_threshold(0, 0, 0, 0));
    }

    #[test]
    fn test_feathered_alpha_floors() {
        assert_eq!(feathered_alpha(255), 204);
        assert_eq!(feathered_alpha(128), 102);
        assert_eq!(feathered_alpha(4), 3);
        assert_eq!(feathered_alpha(1), 0);
        assert_eq!(feathered_alpha(0), 0);
        for alpha in 0..=u8::MAX {
            assert!(feathered_alpha(alpha) <= alpha);
            assert_eq!(
                u32::from(feathered_alpha(alpha)),
                (f64::from(alpha) * 0.8).floor() as u32
            );
        }
    }

    #[test]
    fn test_threshold_policies() {
        let pixels = [[250, 250, 250, 255], [10, 10, 10, 128], [240, 240, 240, 0]];

        let preserved = threshold_pass(buffer_from_pixels(3, 1, &pixels), 240, AlphaPolicy::Preserve);
        assert_eq!(preserved.alphas().collect::<Vec<_>>(), vec![0, 128, 0]);

        let forced =
            threshold_pass(buffer_from_pixels(3, 1, &pixels), 240, AlphaPolicy::ForceOpaque);
        assert_eq!(forced.alphas().collect::<Vec<_>>(), vec![0, 255, 255]);
    }

    #[test]
    fn test_smoothing_averages_edge_pixel() {
        // 3x3, centre partially transparent, everything else opaque grey
        let mut pixels = [[90, 90, 90, 255]; 9];
        pixels[4] = [0, 9, 18, 100];
        let smoothed = smoothing_pass(buffer_from_pixels(3, 3, &pixels), 1);

        // R: 8*90/9 = 80, G: (720+9)/9 = 81, B: (720+18)/9 = 82, A: (2040+100)/9 = 237
        assert_eq!(smoothed.pixel(1, 1), Some([80, 81, 82, 237]));
        assert_eq!(smoothed.pixel(0, 0), Some([90, 90, 90, 255]));
    }

    #[test]
    fn test_smoothing_reads_snapshot() {
        // Two adjacent edge pixels: the second must average the first's original value
        let mut pixels = [[0, 0, 0, 255]; 16];
        pixels[5] = [0, 0, 0, 10];
        pixels[6] = [0, 0, 0, 10];
        let smoothed = smoothing_pass(buffer_from_pixels(4, 4, &pixels), 1);

        // window around (1,1) and (2,1) both hold 7 * 255 + 2 * 10 = 1805 -> 200
        assert_eq!(smoothed.pixel(1, 1).map(|p| p[3]), Some(200));
        assert_eq!(smoothed.pixel(2, 1).map(|p| p[3]), Some(200));
    }

    #[test]
    fn test_smoothing_skips_border_and_small_images() {
        let mut pixels = [[0, 0, 0, 255]; 9];
        pixels[0] = [0, 0, 0, 50];
        let smoothed = smoothing_pass(buffer_from_pixels(3, 3, &pixels), 1);
        assert_eq!(smoothed.pixel(0, 0), Some([0, 0, 0, 50]));

        let tiny = buffer_from_pixels(2, 2, &[[1, 2, 3, 7]; 4]);
        assert_eq!(smoothing_pass(tiny.clone(), 1), tiny);

        // radius 2 needs at least 5x5
        let mut pixels = [[0, 0, 0, 255]; 16];
        pixels[5] = [0, 0, 0, 9];
        let four = buffer_from_pixels(4, 4, &pixels);
        assert_eq!(smoothing_pass(four.clone(), 2), four);
    }

    #[test]
    fn test_smoothing_radius_zero_is_identity() {
        let pixels = [[5, 6, 7, 100]; 9];
        let buffer = buffer_from_pixels(3, 3, &pixels);
        assert_eq!(smoothing_pass(buffer.clone(), 0), buffer);
    }

    #[test]
    fn test_feathering_scopes() {
        // Opaque centre surrounded by transparency
        let mut pixels = [[0, 0, 0, 0]; 9];
        pixels[4] = [0, 0, 0, 255];

        let visible = feathering_pass(buffer_from_pixels(3, 3, &pixels), FeatherScope::Visible);
        assert_eq!(visible.pixel(1, 1), Some([0, 0, 0, 204]));

        let edge_only = feathering_pass(buffer_from_pixels(3, 3, &pixels), FeatherScope::EdgeOnly);
        assert_eq!(edge_only.pixel(1, 1), Some([0, 0, 0, 255]));

        pixels[4] = [0, 0, 0, 100];
        let edge_only = feathering_pass(buffer_from_pixels(3, 3, &pixels), FeatherScope::EdgeOnly);
        assert_eq!(edge_only.pixel(1, 1), Some([0, 0, 0, 80]));
    }

    #[test]
    fn test_feathering_needs_transparent_neighbour() {
        // Only the diagonal neighbours are transparent
        let pixels = [
            [0, 0, 0, 0],
            [0, 0, 0, 255],
            [0, 0, 0, 0],
            [0, 0, 0, 255],
            [0, 0, 0, 200],
            [0, 0, 0, 255],
            [0, 0, 0, 0],
            [0, 0, 0, 255],
            [0, 0, 0, 0],
        ];
        let feathered = feathering_pass(buffer_from_pixels(3, 3, &pixels), FeatherScope::Visible);
        assert_eq!(feathered.pixel(1, 1).map(|p| p[3]), Some(200));
    }

    #[test]
    fn test_feathering_reads_snapshot() {
        // Transparent left column: only the pixels touching it are feathered, and the
        // attenuated values are not seen as transparent by their right-hand neighbours.
        let mut pixels = [[0, 0, 0, 255]; 16];
        for y in 0..4 {
            pixels[y * 4] = [0, 0, 0, 0];
        }
        let feathered = feathering_pass(buffer_from_pixels(4, 4, &pixels), FeatherScope::Visible);
        assert_eq!(feathered.pixel(1, 1).map(|p| p[3]), Some(204));
        assert_eq!(feathered.pixel(2, 1).map(|p| p[3]), Some(255));
        // border row untouched
        assert_eq!(feathered.pixel(1, 0).map(|p| p[3]), Some(255));
    }

    #[test]
    fn test_white_background_detection() {
        let mut pixels = [[255, 255, 255, 255]; 10];
        pixels[0] = [0, 0, 0, 255];
        let mostly_white = buffer_from_pixels(10, 1, &pixels);
        assert!((light_pixel_ratio(&mostly_white, 240) - 0.9).abs() < 1e-6);
        assert!(has_white_background(&mostly_white, 240));

        pixels[1] = [0, 0, 0, 255];
        let exactly_eighty = buffer_from_pixels(10, 1, &pixels);
        assert!(!has_white_background(&exactly_eighty, 240));
    }
}
