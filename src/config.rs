//! Pipeline configuration and external-source variants.
//!
//! Every tunable of the pipeline lives in [`PipelineConfig`]. It has
//! print-ready defaults, can be loaded from TOML, and is validated once when
//! an [`ArtworkPipeline`](crate::ArtworkPipeline) is built.
//!
//! ```toml
//! [canvas]
//! width = 4500
//! height = 5400
//! fill_ratio = 0.85
//!
//! [detection]
//! alpha_threshold = 20
//! padding_fraction = 0.02
//!
//! [sharpen]
//! kernel = "ring5x5"
//! strength = 0.4
//! ```

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::alpha::DEFAULT_OPAQUE_FLOOR;
use crate::bounds::DEFAULT_ALPHA_THRESHOLD;
use crate::canvas::CanvasConfig;
use crate::cleanup::FringeThresholds;
use crate::error::{Error, Result};
use crate::fusion::{FusionTuning, DEFAULT_TRANSPARENT_CUTOFF};
use crate::geometry::DEFAULT_PADDING_FRACTION;
use crate::sharpen::SharpenConfig;
use crate::upscale::UpscaleOptions;

/// Content detection and crop padding.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectionConfig {
    /// Alpha above which a pixel counts as content.
    pub alpha_threshold: u8,
    /// Crop padding as a fraction of the larger source dimension.
    pub padding_fraction: f64,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            alpha_threshold: DEFAULT_ALPHA_THRESHOLD,
            padding_fraction: DEFAULT_PADDING_FRACTION,
        }
    }
}

/// Which cleanup passes run, and how.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CleanupConfig {
    /// Run the light pass that zeroes near-transparent pixels.
    pub light: bool,
    /// Alpha below which a pixel is treated as fully transparent.
    pub transparent_cutoff: u8,
    /// Number of neighbourhood fringe passes (0 disables them).
    pub fringe_iterations: u32,
    /// Neighbourhood thresholds for the fringe passes.
    pub fringe: FringeThresholds,
}

impl Default for CleanupConfig {
    fn default() -> Self {
        Self {
            light: true,
            transparent_cutoff: DEFAULT_TRANSPARENT_CUTOFF,
            fringe_iterations: 2,
            fringe: FringeThresholds::default(),
        }
    }
}

/// All tunables of the artwork pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Output canvas.
    pub canvas: CanvasConfig,
    /// Content detection.
    pub detection: DetectionConfig,
    /// Staged upscaling.
    pub upscale: UpscaleOptions,
    /// Edge and fringe cleanup.
    pub cleanup: CleanupConfig,
    /// Optional unsharp mask; `None` skips sharpening.
    pub sharpen: Option<SharpenConfig>,
    /// Alpha floor below which at least one pixel must fall for a raster
    /// to count as transparent.
    pub opaque_floor: u8,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            canvas: CanvasConfig::default(),
            detection: DetectionConfig::default(),
            upscale: UpscaleOptions::default(),
            cleanup: CleanupConfig::default(),
            sharpen: None,
            opaque_floor: DEFAULT_OPAQUE_FLOOR,
        }
    }
}

impl PipelineConfig {
    /// Parse a configuration from TOML. Missing keys take their defaults.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] on malformed TOML and
    /// [`Error::InvalidConfig`] if a value is out of range.
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Read and parse a TOML configuration file.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] if the file cannot be read, otherwise as
    /// [`PipelineConfig::from_toml_str`].
    pub fn from_toml_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    /// Check that every value is in range.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfig`] describing the first bad value.
    pub fn validate(&self) -> Result<()> {
        let invalid = |msg: String| -> Result<()> { Err(Error::InvalidConfig(msg)) };

        if self.canvas.width == 0 || self.canvas.height == 0 {
            return invalid(format!(
                "canvas must be non-empty, got {}x{}",
                self.canvas.width, self.canvas.height
            ));
        }
        if !(self.canvas.fill_ratio > 0.0 && self.canvas.fill_ratio <= 1.0) {
            return invalid(format!(
                "fill_ratio must be in (0, 1], got {}",
                self.canvas.fill_ratio
            ));
        }
        if !(0.0..0.5).contains(&self.detection.padding_fraction) {
            return invalid(format!(
                "padding_fraction must be in [0, 0.5), got {}",
                self.detection.padding_fraction
            ));
        }
        if !(self.upscale.max_step_factor > 1.0 && self.upscale.max_step_factor.is_finite()) {
            return invalid(format!(
                "max_step_factor must be greater than 1, got {}",
                self.upscale.max_step_factor
            ));
        }
        if let Some(sharpen) = &self.sharpen {
            if !(sharpen.strength >= 0.0 && sharpen.strength.is_finite()) {
                return invalid(format!(
                    "sharpen strength must be non-negative, got {}",
                    sharpen.strength
                ));
            }
        }
        let fringe = &self.cleanup.fringe;
        if fringe.low >= fringe.high {
            return invalid(format!(
                "fringe range is empty: low {} >= high {}",
                fringe.low, fringe.high
            ));
        }
        if fringe.min_neighbors == 0 || fringe.min_neighbors > 8 {
            return invalid(format!(
                "fringe min_neighbors must be in 1..=8, got {}",
                fringe.min_neighbors
            ));
        }
        Ok(())
    }
}

/// How an external raster is combined with the original.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FusionMode {
    /// Keep original color and alpha, borrow external luminance.
    #[default]
    Luminance,
    /// Keep external color, regenerating alpha from the original if lost.
    AlphaTransplant,
}

/// An external super-resolution source and its tuning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum SourceVariant {
    /// Real-ESRGAN at 4x.
    #[serde(rename = "real-esrgan-x4")]
    RealEsrganX4,
    /// ESRGAN at 8x.
    #[serde(rename = "esrgan-8x")]
    Esrgan8x,
    /// A 4x model applied twice for 16x.
    #[serde(rename = "double-pass-16x")]
    DoublePass16x,
    /// SeedVR at 3x.
    #[serde(rename = "seedvr-3x")]
    SeedVr3x,
    /// Any other source.
    #[serde(rename = "custom")]
    Custom {
        /// Label used in logs and output names.
        name: String,
        /// Declared scale factor; inferred from dimensions when absent.
        scale_factor: Option<f64>,
        /// Fusion tuning.
        tuning: FusionTuning,
        /// Fusion mode.
        #[serde(default)]
        mode: FusionMode,
    },
}

impl SourceVariant {
    /// All built-in variants.
    pub const BUILT_IN: [SourceVariant; 4] = [
        SourceVariant::RealEsrganX4,
        SourceVariant::Esrgan8x,
        SourceVariant::DoublePass16x,
        SourceVariant::SeedVr3x,
    ];

    /// Stable label used in logs and output file names.
    #[must_use]
    pub fn label(&self) -> &str {
        match self {
            Self::RealEsrganX4 => "real-esrgan-x4",
            Self::Esrgan8x => "esrgan-8x",
            Self::DoublePass16x => "double-pass-16x",
            Self::SeedVr3x => "seedvr-3x",
            Self::Custom { name, .. } => name,
        }
    }

    /// Native scale factor relative to the original, if known.
    #[must_use]
    pub fn scale_factor(&self) -> Option<f64> {
        match self {
            Self::RealEsrganX4 => Some(4.0),
            Self::Esrgan8x => Some(8.0),
            Self::DoublePass16x => Some(16.0),
            Self::SeedVr3x => Some(3.0),
            Self::Custom { scale_factor, .. } => *scale_factor,
        }
    }

    /// Blend strength and clamp range.
    #[must_use]
    pub fn tuning(&self) -> FusionTuning {
        match self {
            Self::RealEsrganX4 | Self::SeedVr3x => FusionTuning::symmetric(0.15, 0.15),
            Self::Esrgan8x => FusionTuning::symmetric(0.12, 0.12),
            Self::DoublePass16x => FusionTuning::symmetric(0.10, 0.10),
            Self::Custom { tuning, .. } => *tuning,
        }
    }

    /// Fusion mode.
    #[must_use]
    pub fn mode(&self) -> FusionMode {
        match self {
            Self::Custom { mode, .. } => *mode,
            _ => FusionMode::Luminance,
        }
    }

    /// Check the tuning is usable.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfig`] for a custom name that is not a
    /// plain file-name fragment, negative strength, an inverted clamp range,
    /// or a non-positive scale factor.
    pub fn validate(&self) -> Result<()> {
        if let Self::Custom { name, .. } = self {
            // The label becomes part of an output file name.
            let plain = !name.is_empty()
                && !name.starts_with('.')
                && name
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'));
            if !plain {
                return Err(Error::InvalidConfig(format!(
                    "custom source name {name:?} may only contain letters, digits, '-', '_' and '.', and must not start with '.'"
                )));
            }
        }
        let t = self.tuning();
        if !(t.blend_strength >= 0.0 && t.blend_strength.is_finite()) {
            return Err(Error::InvalidConfig(format!(
                "{}: blend strength must be non-negative, got {}",
                self.label(),
                t.blend_strength
            )));
        }
        if t.clamp_low > t.clamp_high {
            return Err(Error::InvalidConfig(format!(
                "{}: clamp range [{}, {}] is inverted",
                self.label(),
                t.clamp_low,
                t.clamp_high
            )));
        }
        if let Some(s) = self.scale_factor() {
            if !(s > 0.0 && s.is_finite()) {
                return Err(Error::InvalidConfig(format!(
                    "{}: scale factor must be positive, got {s}",
                    self.label()
                )));
            }
        }
        Ok(())
    }
}

impl fmt::Display for SourceVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for SourceVariant {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let wanted = s.trim().to_lowercase();
        Self::BUILT_IN
            .into_iter()
            .find(|v| v.label() == wanted)
            .ok_or_else(|| {
                Error::InvalidConfig(format!(
                    "unknown source variant: {s} (expected one of: real-esrgan-x4, esrgan-8x, double-pass-16x, seedvr-3x)"
                ))
            })
    }
}
