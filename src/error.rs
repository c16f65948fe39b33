//! Error types for background removal and mockup generation

use thiserror::Error;

/// Result type alias for all crate operations
pub type Result<T> = std::result::Result<T, ImageGenError>;

/// Error kinds surfaced by the pixel transform and the services around it
#[derive(Error, Debug)]
pub enum ImageGenError {
    /// Pixel data length does not match `width * height * 4`
    #[error(
        "Invalid buffer shape: {width}x{height} RGBA needs {expected} bytes, got {actual}"
    )]
    InvalidBufferShape {
        width: u32,
        height: u32,
        expected: usize,
        actual: usize,
    },

    /// A transform or encoder option lies outside its valid range
    #[error("Invalid option range: {0}")]
    InvalidOptionRange(String),

    /// Input/output errors (file not found, permission denied, etc.)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Image codec errors from the `image` crate
    #[error("Image processing error: {0}")]
    Image(#[from] image::ImageError),

    /// Source could not be turned into a pixel buffer
    #[error("Decode error: {0}")]
    Decode(String),

    /// HTTP transport failures
    #[error("Network error: {0}")]
    Network(String),

    /// The image-generation API failed or answered with something unusable
    #[error("Generation error: {0}")]
    Generation(String),

    /// Mockup composition failures
    #[error("Composition error: {0}")]
    Composition(String),

    /// Invalid configuration or parameters
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl ImageGenError {
    /// Create a new invalid configuration error
    pub fn invalid_config<S: Into<String>>(msg: S) -> Self {
        Self::InvalidConfig(msg.into())
    }

    /// Create a new option range error
    pub fn option_range<S: Into<String>>(msg: S) -> Self {
        Self::InvalidOptionRange(msg.into())
    }

    /// Create a new decode error
    pub fn decode<S: Into<String>>(msg: S) -> Self {
        Self::Decode(msg.into())
    }

    /// Create a new generation error
    pub fn generation<S: Into<String>>(msg: S) -> Self {
        Self::Generation(msg.into())
    }

    /// Create a new composition error
    pub fn composition<S: Into<String>>(msg: S) -> Self {
        Self::Composition(msg.into())
    }

    /// Create a network error wrapping the underlying cause
    pub fn network_error<E: std::fmt::Display>(context: &str, error: E) -> Self {
        Self::Network(format!("{}: {}", context, error))
    }

    /// Create a buffer shape error for the given dimensions
    #[must_use]
    pub fn buffer_shape(width: u32, height: u32, actual: usize) -> Self {
        Self::InvalidBufferShape {
            width,
            height,
            expected: (width as usize)
                .saturating_mul(height as usize)
                .saturating_mul(4),
            actual,
        }
    }

    /// Create file I/O error with operation context
    pub fn file_io_error<P: AsRef<std::path::Path>>(
        operation: &str,
        path: P,
        error: &std::io::Error,
    ) -> Self {
        let path_display = path.as_ref().display();
        Self::Io(std::io::Error::new(
            error.kind(),
            format!("Failed to {} '{}': {}", operation, path_display, error),
        ))
    }

    /// Create option range error with the valid range and a recommendation
    pub fn config_value_error<T: std::fmt::Display>(
        parameter: &str,
        value: T,
        valid_range: &str,
        recommended: Option<T>,
    ) -> Self {
        let recommendation = match recommended {
            Some(rec) => format!(" Recommended: {}", rec),
            None => String::new(),
        };

        Self::InvalidOptionRange(format!(
            "Invalid {}: {} (valid range: {}).{}",
            parameter, value, valid_range, recommendation
        ))
    }

    /// Create decode error with stage context
    #[must_use]
    pub fn processing_stage_error(stage: &str, details: &str, input_info: Option<&str>) -> Self {
        let input_context = match input_info {
            Some(info) => format!(" (input: {})", info),
            None => String::new(),
        };

        Self::Decode(format!(
            "Processing failed at stage '{}'{}: {}",
            stage, input_context, details
        ))
    }

    /// Whether this error belongs to the pixel transform itself rather than its I/O
    #[must_use]
    pub fn is_transform_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidBufferShape { .. } | Self::InvalidOptionRange(_)
        )
    }
}
