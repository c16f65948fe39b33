//! Configuration types for background removal operations

use serde::{Deserialize, Serialize};

/// Brightness cutoff used when none is configured
pub const DEFAULT_THRESHOLD: u8 = 240;

/// Neighbourhood radius used by the smoothing pass when none is configured
pub const DEFAULT_SMOOTHING_RADIUS: u32 = 1;

/// Largest accepted smoothing radius
pub const MAX_SMOOTHING_RADIUS: u32 = 10;

/// Encoder quality used for lossy formats when none is configured
pub const DEFAULT_QUALITY: f32 = 0.95;

/// What the threshold pass does to pixels at or below the cutoff
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlphaPolicy {
    /// Keep whatever alpha the source carried (canvas-style input)
    #[default]
    Preserve,
    /// Force every kept pixel to full opacity (raw decoded buffer input)
    ForceOpaque,
}

impl std::fmt::Display for AlphaPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Preserve => write!(f, "preserve"),
            Self::ForceOpaque => write!(f, "force-opaque"),
        }
    }
}

/// Which pixels the feathering pass may attenuate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeatherScope {
    /// Any visible pixel (`alpha > 0`) touching a transparent neighbour
    #[default]
    Visible,
    /// Only partially transparent pixels (`0 < alpha < 255`)
    EdgeOnly,
}

/// Output image format options
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// PNG with alpha channel transparency
    #[default]
    Png,
    /// WebP with alpha channel transparency
    WebP,
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Png => write!(f, "png"),
            Self::WebP => write!(f, "webp"),
        }
    }
}

/// Per-call options of the pixel transform
///
/// Immutable once built. The encoder settings live in [`RemovalConfig`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RemovalOptions {
    /// Pixels brighter than this become fully transparent
    pub threshold: u8,
    /// Smoothing neighbourhood radius (0 disables smoothing)
    pub smoothing_radius: u32,
    /// Whether the feathering pass runs
    pub feathering_enabled: bool,
    /// Alpha handling for pixels that survive the threshold
    pub alpha_policy: AlphaPolicy,
    /// Candidate pixels for feathering
    pub feather_scope: FeatherScope,
}

impl Default for RemovalOptions {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_THRESHOLD,
            smoothing_radius: DEFAULT_SMOOTHING_RADIUS,
            feathering_enabled: true,
            alpha_policy: AlphaPolicy::default(),
            feather_scope: FeatherScope::default(),
        }
    }
}

impl RemovalOptions {
    /// Create a new options builder
    #[must_use]
    pub fn builder() -> RemovalOptionsBuilder {
        RemovalOptionsBuilder::default()
    }

    /// Build options from untyped integer levels, as received from a CLI or JSON request
    ///
    /// # Errors
    /// - `InvalidOptionRange` if `threshold` is outside 0-255
    /// - `InvalidOptionRange` if `smoothing_radius` is negative or above [`MAX_SMOOTHING_RADIUS`]
    ///
    /// # Examples
    /// ```rust
    /// use tshirt_image_gen::RemovalOptions;
    ///
    /// let options = RemovalOptions::from_levels(200, 2, false).unwrap();
    /// assert_eq!(options.threshold, 200);
    /// assert!(RemovalOptions::from_levels(256, 1, true).is_err());
    /// assert!(RemovalOptions::from_levels(240, -1, true).is_err());
    /// ```
    pub fn from_levels(
        threshold: i64,
        smoothing_radius: i64,
        feathering_enabled: bool,
    ) -> crate::Result<Self> {
        let threshold = u8::try_from(threshold).map_err(|_| {
            crate::ImageGenError::config_value_error(
                "threshold",
                threshold,
                "0-255",
                Some(i64::from(DEFAULT_THRESHOLD)),
            )
        })?;

        let smoothing_radius = u32::try_from(smoothing_radius)
            .ok()
            .filter(|radius| *radius <= MAX_SMOOTHING_RADIUS)
            .ok_or_else(|| {
                crate::ImageGenError::config_value_error(
                    "smoothing radius",
                    smoothing_radius,
                    "0-10",
                    Some(i64::from(DEFAULT_SMOOTHING_RADIUS)),
                )
            })?;

        let options = Self {
            threshold,
            smoothing_radius,
            feathering_enabled,
            ..Self::default()
        };
        options.validate()?;
        Ok(options)
    }

    /// Whether the smoothing pass runs with these options
    #[must_use]
    pub fn smoothing_enabled(&self) -> bool {
        self.smoothing_radius > 0
    }

    /// Validate all option ranges
    ///
    /// The threshold is range-checked by its type; the radius is bounded by
    /// [`MAX_SMOOTHING_RADIUS`].
    ///
    /// # Errors
    /// - Smoothing radius above the maximum
    pub fn validate(&self) -> crate::Result<()> {
        if self.smoothing_radius > MAX_SMOOTHING_RADIUS {
            return Err(crate::ImageGenError::config_value_error(
                "smoothing radius",
                self.smoothing_radius,
                "0-10",
                Some(DEFAULT_SMOOTHING_RADIUS),
            ));
        }
        Ok(())
    }
}

/// Builder for `RemovalOptions`
#[derive(Debug, Default)]
pub struct RemovalOptionsBuilder {
    options: RemovalOptions,
}

impl RemovalOptionsBuilder {
    #[must_use]
    pub fn threshold(mut self, threshold: u8) -> Self {
        self.options.threshold = threshold;
        self
    }

    /// Set the smoothing radius, clamped to [`MAX_SMOOTHING_RADIUS`]
    #[must_use]
    pub fn smoothing_radius(mut self, radius: u32) -> Self {
        self.options.smoothing_radius = radius.min(MAX_SMOOTHING_RADIUS);
        self
    }

    #[must_use]
    pub fn feathering(mut self, enabled: bool) -> Self {
        self.options.feathering_enabled = enabled;
        self
    }

    #[must_use]
    pub fn alpha_policy(mut self, policy: AlphaPolicy) -> Self {
        self.options.alpha_policy = policy;
        self
    }

    #[must_use]
    pub fn feather_scope(mut self, scope: FeatherScope) -> Self {
        self.options.feather_scope = scope;
        self
    }

    /// Build and validate the options
    ///
    /// # Errors
    /// - Any range check of [`RemovalOptions::validate`]
    pub fn build(self) -> crate::Result<RemovalOptions> {
        self.options.validate()?;
        Ok(self.options)
    }
}

/// Configuration for a full decode → transform → encode run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RemovalConfig {
    /// Pixel transform options
    pub options: RemovalOptions,

    /// Output format
    pub output_format: OutputFormat,

    /// Quality for lossy formats (0.0-1.0)
    pub quality: f32,

    /// Skip the transform when the image is not mostly light (original pixels are encoded as-is)
    pub skip_dark_backgrounds: bool,
}

impl Default for RemovalConfig {
    fn default() -> Self {
        Self {
            options: RemovalOptions::default(),
            output_format: OutputFormat::default(),
            quality: DEFAULT_QUALITY,
            skip_dark_backgrounds: false,
        }
    }
}

impl RemovalConfig {
    /// Create a new configuration builder
    ///
    /// # Examples
    /// ```rust
    /// use tshirt_image_gen::{OutputFormat, RemovalConfig};
    ///
    /// let config = RemovalConfig::builder()
    ///     .threshold(230)
    ///     .smoothing_radius(0)
    ///     .output_format(OutputFormat::WebP)
    ///     .quality(0.8)
    ///     .build()
    ///     .unwrap();
    /// assert_eq!(config.options.threshold, 230);
    /// ```
    #[must_use]
    pub fn builder() -> RemovalConfigBuilder {
        RemovalConfigBuilder::default()
    }

    /// Validate all configuration parameters
    ///
    /// # Errors
    /// - Quality outside 0.0-1.0 or not finite
    /// - Any range check of [`RemovalOptions::validate`]
    ///
    /// # Examples
    /// ```rust
    /// use tshirt_image_gen::RemovalConfig;
    ///
    /// let mut config = RemovalConfig::default();
    /// assert!(config.validate().is_ok());
    ///
    /// config.quality = 1.5;
    /// assert!(config.validate().is_err());
    /// ```
    pub fn validate(&self) -> crate::Result<()> {
        if !self.quality.is_finite() || !(0.0..=1.0).contains(&self.quality) {
            return Err(crate::ImageGenError::config_value_error(
                "quality",
                self.quality,
                "0.0-1.0",
                Some(DEFAULT_QUALITY),
            ));
        }
        self.options.validate()
    }
}

/// Builder for `RemovalConfig`
#[derive(Debug, Default)]
pub struct RemovalConfigBuilder {
    config: RemovalConfig,
}

impl RemovalConfigBuilder {
    /// Replace all transform options at once
    #[must_use]
    pub fn options(mut self, options: RemovalOptions) -> Self {
        self.config.options = options;
        self
    }

    #[must_use]
    pub fn threshold(mut self, threshold: u8) -> Self {
        self.config.options.threshold = threshold;
        self
    }

    #[must_use]
    pub fn smoothing_radius(mut self, radius: u32) -> Self {
        self.config.options.smoothing_radius = radius.min(MAX_SMOOTHING_RADIUS);
        self
    }

    #[must_use]
    pub fn feathering(mut self, enabled: bool) -> Self {
        self.config.options.feathering_enabled = enabled;
        self
    }

    #[must_use]
    pub fn alpha_policy(mut self, policy: AlphaPolicy) -> Self {
        self.config.options.alpha_policy = policy;
        self
    }

    #[must_use]
    pub fn feather_scope(mut self, scope: FeatherScope) -> Self {
        self.config.options.feather_scope = scope;
        self
    }

    #[must_use]
    pub fn output_format(mut self, format: OutputFormat) -> Self {
        self.config.output_format = format;
        self
    }

    /// Set lossy quality, clamped to 0.0-1.0
    #[must_use]
    pub fn quality(mut self, quality: f32) -> Self {
        self.config.quality = quality.clamp(0.0, 1.0);
        self
    }

    #[must_use]
    pub fn skip_dark_backgrounds(mut self, skip: bool) -> Self {
        self.config.skip_dark_backgrounds = skip;
        self
    }

    /// Build and validate the configuration
    ///
    /// # Errors
    /// - Any range check of [`RemovalConfig::validate`]
    pub fn build(self) -> crate::Result<RemovalConfig> {
        let config = self.config;
        config.validate()?;
        Ok(config)
    }
}
