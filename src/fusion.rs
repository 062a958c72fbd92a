//! Multi-source fusion of original and externally upscaled rasters.
//!
//! The original raster owns color and transparency. An external upscale
//! contributes only its luminance, as a small multiplicative perturbation:
//!
//! `adjusted = clamp(1 + (Le / Lo - 1) * strength, low, high)`
//! `out.rgb = round(original.rgb * adjusted)`, `out.a = original.a`

use image::{Rgba, RgbaImage};
use serde::{Deserialize, Serialize};

use crate::alpha::{apply_alpha, extract_alpha, has_lost_transparency};
use crate::error::{Error, Result};
use crate::geometry::{CropRect, GeometryPlan};
use crate::upscale::{clamp_rect, upscale, UpscaleOptions};

/// Alpha below which a fused pixel is emitted fully transparent.
pub const DEFAULT_TRANSPARENT_CUTOFF: u8 = 10;

/// Blend strength and clamp range for one external source.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FusionTuning {
    /// Fraction of the luminance ratio deviation that is applied.
    pub blend_strength: f32,
    /// Lower bound of the adjusted ratio.
    pub clamp_low: f32,
    /// Upper bound of the adjusted ratio.
    pub clamp_high: f32,
}

impl FusionTuning {
    /// Tuning with a symmetric clamp of `1 +/- spread`.
    #[must_use]
    pub fn symmetric(blend_strength: f32, spread: f32) -> Self {
        Self {
            blend_strength,
            clamp_low: 1.0 - spread,
            clamp_high: 1.0 + spread,
        }
    }

    /// Adjusted multiplier for an original/external luminance pair.
    #[must_use]
    pub fn adjusted_ratio(&self, lum_original: f32, lum_external: f32) -> f32 {
        let ratio = if lum_original > 0.0 {
            lum_external / lum_original
        } else {
            1.0
        };
        (1.0 + (ratio - 1.0) * self.blend_strength).clamp(self.clamp_low, self.clamp_high)
    }
}

impl Default for FusionTuning {
    fn default() -> Self {
        Self::symmetric(0.15, 0.15)
    }
}

/// Rec. 601 luma: `0.299*R + 0.587*G + 0.114*B`.
#[must_use]
pub fn luminance(px: &Rgba<u8>) -> f32 {
    0.299 * f32::from(px[0]) + 0.587 * f32::from(px[1]) + 0.114 * f32::from(px[2])
}

/// Fuse `original` (color and alpha) with `external` (detail).
///
/// Pixels whose original alpha is below `transparent_cutoff` come out as
/// all-zero. Every other output pixel keeps the original alpha.
///
/// # Errors
///
/// Returns [`Error::DimensionMismatch`] if the rasters differ in size.
pub fn fuse(
    original: &RgbaImage,
    external: &RgbaImage,
    tuning: &FusionTuning,
    transparent_cutoff: u8,
) -> Result<RgbaImage> {
    if original.dimensions() != external.dimensions() {
        return Err(Error::DimensionMismatch {
            expected: original.dimensions(),
            actual: external.dimensions(),
        });
    }

    let mut out = RgbaImage::new(original.width(), original.height());
    for ((dst, o), e) in out.pixels_mut().zip(original.pixels()).zip(external.pixels()) {
        if o[3] < transparent_cutoff {
            continue;
        }
        let adjusted = tuning.adjusted_ratio(luminance(o), luminance(e));
        for ch in 0..3 {
            #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
            {
                dst[ch] = (f32::from(o[ch]) * adjusted).round().clamp(0.0, 255.0) as u8;
            }
        }
        dst[3] = o[3];
    }
    Ok(out)
}

/// Map a crop rectangle from original-image space into external-image space.
///
/// Each axis is scaled by `external / original` on that axis and rounded,
/// then clamped inside the external raster.
#[must_use]
#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::cast_precision_loss
)]
pub fn map_crop_to_external(
    crop: CropRect,
    original: (u32, u32),
    external: (u32, u32),
) -> CropRect {
    let sx = f64::from(external.0) / f64::from(original.0.max(1));
    let sy = f64::from(external.1) / f64::from(original.1.max(1));
    let mapped = CropRect {
        x: (f64::from(crop.x) * sx).round() as u32,
        y: (f64::from(crop.y) * sy).round() as u32,
        width: (f64::from(crop.width) * sx).round() as u32,
        height: (f64::from(crop.height) * sy).round() as u32,
    };
    clamp_rect(mapped, external.0, external.1)
}

/// Scale factor of `external` relative to `original`, from widths.
#[must_use]
pub fn inferred_scale_factor(original: (u32, u32), external: (u32, u32)) -> f64 {
    f64::from(external.0) / f64::from(original.0.max(1))
}

/// Crop `external` to the plan's region and resample it to the plan's size.
#[must_use]
pub fn prepare_external(
    original_dims: (u32, u32),
    external: &RgbaImage,
    plan: &GeometryPlan,
    opts: &UpscaleOptions,
) -> RgbaImage {
    let rect = map_crop_to_external(plan.crop_rect(), original_dims, external.dimensions());
    upscale(external, rect, plan.scaled_width, plan.scaled_height, opts)
}

/// Use the external raster's colors directly, repairing its alpha if needed.
///
/// When `external_upscaled` has lost transparency, the alpha of `original`
/// is extracted, upscaled through the same plan, and applied in its place.
#[must_use]
pub fn transplant_alpha(
    original: &RgbaImage,
    external_upscaled: &RgbaImage,
    plan: &GeometryPlan,
    opts: &UpscaleOptions,
    opaque_floor: u8,
) -> RgbaImage {
    if !has_lost_transparency(external_upscaled, opaque_floor) {
        return external_upscaled.clone();
    }
    log::debug!("external raster is opaque, regenerating alpha from original");
    let alpha = extract_alpha(original);
    let alpha = upscale(&alpha, plan.crop_rect(), plan.scaled_width, plan.scaled_height, opts);
    apply_alpha(external_upscaled, &alpha, opts.filter)
}
