//! Error types for the printfit crate.

/// Errors that can occur while preparing artwork for print.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The input blob could not be decoded as an image.
    #[error("failed to decode image: {0}")]
    Decode(image::ImageError),

    /// The output raster could not be encoded as PNG.
    #[error("failed to encode PNG: {0}")]
    Encode(image::ImageError),

    /// An I/O error occurred while reading or writing files.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The image format is not supported.
    #[error("unsupported image format: {0}")]
    UnsupportedFormat(String),

    /// Two rasters that must share dimensions do not.
    #[error("raster dimensions differ: expected {}x{}, got {}x{}", expected.0, expected.1, actual.0, actual.1)]
    DimensionMismatch {
        /// Dimensions of the reference raster.
        expected: (u32, u32),
        /// Dimensions of the offending raster.
        actual: (u32, u32),
    },

    /// A configuration value is out of range.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// A configuration file could not be parsed.
    #[error("failed to parse configuration: {0}")]
    Config(#[from] toml::de::Error),

    /// An external upscale source failed to deliver a usable image.
    #[error("external source {source_name} failed: {message}")]
    External {
        /// Label of the failing source.
        source_name: String,
        /// Human-readable failure description.
        message: String,
    },

    /// Background removal failed.
    #[error("background removal failed: {0}")]
    Segmentation(String),
}

/// A specialized `Result` type for this crate.
pub type Result<T> = std::result::Result<T, Error>;
