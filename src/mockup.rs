//! T-shirt mockup composition
//!
//! Pastes a design onto a solid canvas in the shirt colour. The design is
//! scaled to fit its box without distortion, centred in the box, and
//! alpha-blended so transparent areas left by background removal show the
//! shirt underneath.

use crate::{
    config::OutputFormat,
    error::{ImageGenError, Result},
    services::{ImageIOService, OutputFormatHandler},
};
use image::{imageops, imageops::FilterType, DynamicImage, Rgba, RgbaImage};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::instrument;

pub const DEFAULT_CANVAS_WIDTH: u32 = 1200;
pub const DEFAULT_CANVAS_HEIGHT: u32 = 1600;
pub const DEFAULT_DESIGN_WIDTH: u32 = 800;
pub const DEFAULT_DESIGN_HEIGHT: u32 = 800;
pub const DEFAULT_DESIGN_TOP: i64 = 300;

/// Shirt colours
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TshirtColor {
    #[default]
    Black,
    White,
    Navy,
    Gray,
    Red,
    Blue,
    /// Any `#rrggbb` colour
    Custom([u8; 3]),
}

impl TshirtColor {
    pub const NAMED: [TshirtColor; 6] = [
        Self::Black,
        Self::White,
        Self::Navy,
        Self::Gray,
        Self::Red,
        Self::Blue,
    ];

    /// Resolve a colour name or `#rrggbb` value, case-insensitively
    ///
    /// Anything unrecognised falls back to black.
    #[must_use]
    pub fn from_name(name: &str) -> Self {
        let name = name.trim().to_ascii_lowercase();
        match name.as_str() {
            "black" => Self::Black,
            "white" => Self::White,
            "navy" => Self::Navy,
            "gray" | "grey" => Self::Gray,
            "red" => Self::Red,
            "blue" => Self::Blue,
            other => Self::parse_hex(other).unwrap_or_else(|| {
                log::warn!("Unknown t-shirt colour '{}', using black", other);
                Self::Black
            }),
        }
    }

    fn parse_hex(value: &str) -> Option<Self> {
        let hex = value.strip_prefix('#')?;
        if hex.len() != 6 || !hex.is_ascii() {
            return None;
        }
        let channel = |range: std::ops::Range<usize>| u8::from_str_radix(hex.get(range)?, 16).ok();
        Some(Self::Custom([channel(0..2)?, channel(2..4)?, channel(4..6)?]))
    }

    #[must_use]
    pub fn rgb(self) -> [u8; 3] {
        match self {
            Self::Black => [0x1a, 0x1a, 0x1a],
            Self::White => [0xff, 0xff, 0xff],
            Self::Navy => [0x00, 0x1f, 0x3f],
            Self::Gray => [0x80, 0x80, 0x80],
            Self::Red => [0xff, 0x00, 0x00],
            Self::Blue => [0x00, 0x00, 0xff],
            Self::Custom(rgb) => rgb,
        }
    }

    #[must_use]
    pub fn hex(self) -> String {
        let [r, g, b] = self.rgb();
        format!("#{:02x}{:02x}{:02x}", r, g, b)
    }
}

impl fmt::Display for TshirtColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Black => write!(f, "black"),
            Self::White => write!(f, "white"),
            Self::Navy => write!(f, "navy"),
            Self::Gray => write!(f, "gray"),
            Self::Red => write!(f, "red"),
            Self::Blue => write!(f, "blue"),
            Self::Custom(_) => write!(f, "{}", self.hex()),
        }
    }
}

/// Canvas and placement settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MockupConfig {
    pub canvas_width: u32,
    pub canvas_height: u32,
    pub design_width: u32,
    pub design_height: u32,
    /// Top edge of the design box
    pub top: i64,
    /// Left edge of the design box; centred horizontally when unset
    pub left: Option<i64>,
    pub color: TshirtColor,
}

impl Default for MockupConfig {
    fn default() -> Self {
        Self {
            canvas_width: DEFAULT_CANVAS_WIDTH,
            canvas_height: DEFAULT_CANVAS_HEIGHT,
            design_width: DEFAULT_DESIGN_WIDTH,
            design_height: DEFAULT_DESIGN_HEIGHT,
            top: DEFAULT_DESIGN_TOP,
            left: None,
            color: TshirtColor::default(),
        }
    }
}

impl MockupConfig {
    #[must_use]
    pub fn with_color(mut self, color: TshirtColor) -> Self {
        self.color = color;
        self
    }

    /// Effective left edge of the design box
    #[must_use]
    pub fn design_left(&self) -> i64 {
        self.left.unwrap_or_else(|| {
            (i64::from(self.canvas_width) - i64::from(self.design_width)) / 2
        })
    }

    /// # Errors
    /// - `Composition` for an empty canvas or design box, or a box entirely
    ///   outside the canvas
    pub fn validate(&self) -> Result<()> {
        if self.canvas_width == 0 || self.canvas_height == 0 {
            return Err(ImageGenError::composition(format!(
                "canvas must not be empty, got {}x{}",
                self.canvas_width, self.canvas_height
            )));
        }
        if self.design_width == 0 || self.design_height == 0 {
            return Err(ImageGenError::composition(format!(
                "design box must not be empty, got {}x{}",
                self.design_width, self.design_height
            )));
        }

        let left = self.design_left();
        let intersects = left < i64::from(self.canvas_width)
            && left + i64::from(self.design_width) > 0
            && self.top < i64::from(self.canvas_height)
            && self.top + i64::from(self.design_height) > 0;
        if !intersects {
            return Err(ImageGenError::composition(format!(
                "design box {}x{} at ({}, {}) lies outside the {}x{} canvas",
                self.design_width,
                self.design_height,
                left,
                self.top,
                self.canvas_width,
                self.canvas_height
            )));
        }
        Ok(())
    }
}

/// Scale `image` to fit inside `width × height`, preserving aspect ratio
#[must_use]
pub fn fit_within(image: &DynamicImage, width: u32, height: u32) -> RgbaImage {
    let (src_w, src_h) = (image.width().max(1), image.height().max(1));
    let scale = f64::min(
        f64::from(width) / f64::from(src_w),
        f64::from(height) / f64::from(src_h),
    );
    let new_w = ((f64::from(src_w) * scale).round() as u32).clamp(1, width);
    let new_h = ((f64::from(src_h) * scale).round() as u32).clamp(1, height);

    let rgba = image.to_rgba8();
    if (new_w, new_h) == rgba.dimensions() {
        return rgba;
    }
    imageops::resize(&rgba, new_w, new_h, FilterType::Lanczos3)
}

/// Scale into a `width × height` image, padding with transparency
#[must_use]
pub fn resize_contain(image: &DynamicImage, width: u32, height: u32) -> RgbaImage {
    let fitted = fit_within(image, width, height);
    let mut layer = RgbaImage::new(width, height);
    let x = (width - fitted.width()) / 2;
    let y = (height - fitted.height()) / 2;
    imageops::replace(&mut layer, &fitted, i64::from(x), i64::from(y));
    layer
}

/// Builds t-shirt mockups
#[derive(Debug, Clone)]
pub struct MockupCompositor {
    config: MockupConfig,
}

impl MockupCompositor {
    /// # Errors
    /// - `Composition` if the config does not validate
    pub fn new(config: MockupConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    #[must_use]
    pub fn config(&self) -> &MockupConfig {
        &self.config
    }

    /// Composite `design` onto a shirt-coloured canvas
    ///
    /// # Errors
    /// - `Composition` for an empty design image
    #[instrument(skip(self, design), fields(color = %self.config.color))]
    pub fn compose(&self, design: &DynamicImage) -> Result<RgbaImage> {
        if design.width() == 0 || design.height() == 0 {
            return Err(ImageGenError::composition("design image is empty"));
        }

        let config = &self.config;
        let [r, g, b] = config.color.rgb();
        let mut canvas =
            RgbaImage::from_pixel(config.canvas_width, config.canvas_height, Rgba([r, g, b, 255]));

        let layer = resize_contain(design, config.design_width, config.design_height);
        imageops::overlay(&mut canvas, &layer, config.design_left(), config.top);

        tracing::debug!(
            design = %format!("{}x{}", design.width(), design.height()),
            left = config.design_left(),
            top = config.top,
            "Composed mockup"
        );
        Ok(canvas)
    }

    /// Compose and encode as PNG
    ///
    /// # Errors
    /// - Composition or codec failures
    pub fn compose_png(&self, design: &DynamicImage) -> Result<Vec<u8>> {
        let mockup = self.compose(design)?;
        OutputFormatHandler::encode_image(&mockup, OutputFormat::Png, 1.0)
    }

    /// Decode `design_bytes`, compose and encode as PNG
    ///
    /// # Errors
    /// - Decode, composition or codec failures
    pub fn compose_bytes(&self, design_bytes: &[u8]) -> Result<Vec<u8>> {
        let design = ImageIOService::decode_bytes(design_bytes)?;
        self.compose_png(&design)
    }
}
