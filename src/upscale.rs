//! Staged upscaling.
//!
//! One resampling pass at high magnification leaves the result soft and
//! aliased. Instead the crop is grown in steps of at most
//! [`UpscaleOptions::max_step_factor`] (2x by default), re-filtering at each
//! step, followed by one final pass to the exact target size.
//!
//! For a magnification `s > max_step_factor` the number of passes is
//! `ceil(log_step(s))`: `ceil(log_step(s)) - 1` intermediate rasters plus the
//! final resample.

use image::imageops::{self, FilterType};
use image::{Rgba, Rgba32FImage, RgbaImage};
use serde::{Deserialize, Serialize};

use crate::geometry::CropRect;

/// Default per-step magnification cap.
pub const DEFAULT_MAX_STEP_FACTOR: f64 = 2.0;

/// Interpolation filter used for every resample.
///
/// Nearest-neighbour is deliberately absent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ResampleFilter {
    /// Linear (tent) filter.
    Triangle,
    /// Cubic filter, `B = 0`, `C = 0.5`.
    #[default]
    CatmullRom,
    /// Gaussian filter.
    Gaussian,
    /// Lanczos with window 3.
    Lanczos3,
}

impl ResampleFilter {
    fn to_filter_type(self) -> FilterType {
        match self {
            Self::Triangle => FilterType::Triangle,
            Self::CatmullRom => FilterType::CatmullRom,
            Self::Gaussian => FilterType::Gaussian,
            Self::Lanczos3 => FilterType::Lanczos3,
        }
    }
}

/// Options controlling staged upscaling.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UpscaleOptions {
    /// Largest magnification a single pass may apply (must be > 1).
    pub max_step_factor: f64,
    /// Interpolation filter.
    pub filter: ResampleFilter,
}

impl Default for UpscaleOptions {
    fn default() -> Self {
        Self {
            max_step_factor: DEFAULT_MAX_STEP_FACTOR,
            filter: ResampleFilter::default(),
        }
    }
}

/// Resample a whole raster to exactly `width` x `height`.
///
/// Filtering happens on premultiplied color, so the zero color of
/// transparent pixels never darkens the edges of the content.
#[must_use]
pub fn resample(src: &RgbaImage, width: u32, height: u32, filter: ResampleFilter) -> RgbaImage {
    if src.dimensions() == (width, height) {
        return src.clone();
    }
    let resized = imageops::resize(&premultiply(src), width, height, filter.to_filter_type());
    unpremultiply(&resized)
}

fn premultiply(src: &RgbaImage) -> Rgba32FImage {
    Rgba32FImage::from_fn(src.width(), src.height(), |x, y| {
        let p = src.get_pixel(x, y);
        let a = f32::from(p[3]) / 255.0;
        let c = |v: u8| f32::from(v) / 255.0 * a;
        Rgba([c(p[0]), c(p[1]), c(p[2]), a])
    })
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn unpremultiply(src: &Rgba32FImage) -> RgbaImage {
    let to_u8 = |v: f32| (v.clamp(0.0, 1.0) * 255.0).round() as u8;
    RgbaImage::from_fn(src.width(), src.height(), |x, y| {
        let p = src.get_pixel(x, y);
        let a = to_u8(p[3]);
        if a == 0 {
            return Rgba([0, 0, 0, 0]);
        }
        let alpha = p[3].clamp(0.0, 1.0);
        Rgba([to_u8(p[0] / alpha), to_u8(p[1] / alpha), to_u8(p[2] / alpha), a])
    })
}

/// Number of passes needed for magnification `max_scale`.
///
/// Equals `ceil(log_step(max_scale))`, and 1 whenever `max_scale <= step`.
#[must_use]
pub fn step_count(max_scale: f64, max_step_factor: f64) -> usize {
    if !max_scale.is_finite() || max_scale <= max_step_factor || max_step_factor <= 1.0 {
        return 1;
    }
    let mut steps = 1;
    let mut reach = max_step_factor;
    while reach < max_scale {
        reach *= max_step_factor;
        steps += 1;
    }
    steps
}

/// Sizes of every pass from `src` to `dst`, in order. The last entry is `dst`.
#[must_use]
#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::cast_precision_loss
)]
pub fn plan_upscale_steps(src: (u32, u32), dst: (u32, u32), max_step_factor: f64) -> Vec<(u32, u32)> {
    let (src_w, src_h) = (src.0.max(1), src.1.max(1));
    let max_scale =
        (f64::from(dst.0) / f64::from(src_w)).max(f64::from(dst.1) / f64::from(src_h));
    let steps = step_count(max_scale, max_step_factor);

    let mut sizes = Vec::with_capacity(steps);
    let (mut w, mut h) = (src_w, src_h);
    for _ in 1..steps {
        w = ((f64::from(w) * max_step_factor).round() as u32).min(dst.0);
        h = ((f64::from(h) * max_step_factor).round() as u32).min(dst.1);
        sizes.push((w, h));
    }
    sizes.push(dst);
    sizes
}

/// Clamp `rect` into a `width` x `height` raster, keeping at least one pixel.
#[must_use]
pub fn clamp_rect(rect: CropRect, width: u32, height: u32) -> CropRect {
    let x = rect.x.min(width.saturating_sub(1));
    let y = rect.y.min(height.saturating_sub(1));
    CropRect {
        x,
        y,
        width: rect.width.clamp(1, (width - x).max(1)),
        height: rect.height.clamp(1, (height - y).max(1)),
    }
}

/// Upscale `rect` of `source` to exactly `target_width` x `target_height`.
#[must_use]
pub fn upscale(
    source: &RgbaImage,
    rect: CropRect,
    target_width: u32,
    target_height: u32,
    opts: &UpscaleOptions,
) -> RgbaImage {
    upscale_with_observer(source, rect, (target_width, target_height), opts, |_, _| {})
}

/// [`upscale`], calling `on_step(done, total)` after every resample pass.
pub fn upscale_with_observer<F>(
    source: &RgbaImage,
    rect: CropRect,
    (target_width, target_height): (u32, u32),
    opts: &UpscaleOptions,
    mut on_step: F,
) -> RgbaImage
where
    F: FnMut(usize, usize),
{
    let rect = if rect.fits_within(source.width(), source.height()) {
        rect
    } else {
        let clamped = clamp_rect(rect, source.width(), source.height());
        log::warn!("crop {rect:?} exceeds {}x{} source, clamped to {clamped:?}", source.width(), source.height());
        clamped
    };

    let cropped = if rect == CropRect::full(source.width(), source.height()) {
        source.clone()
    } else {
        imageops::crop_imm(source, rect.x, rect.y, rect.width, rect.height).to_image()
    };

    let sizes = plan_upscale_steps(
        (rect.width, rect.height),
        (target_width, target_height),
        opts.max_step_factor,
    );
    let total = sizes.len();

    let mut current = cropped;
    for (i, (w, h)) in sizes.into_iter().enumerate() {
        log::debug!(
            "resample step {}/{}: {}x{} -> {w}x{h}",
            i + 1,
            total,
            current.width(),
            current.height()
        );
        current = resample(&current, w, h, opts.filter);
        on_step(i + 1, total);
    }
    current
}

#[cfg(test)]
mod tests {
    use super::*;

    fn checker(w: u32, h: u32) -> RgbaImage {
        RgbaImage::from_fn(w, h, |x, y| {
            if (x + y) % 2 == 0 {
                Rgba([255, 255, 255, 255])
            } else {
                Rgba([0, 0, 0, 255])
            }
        })
    }

    #[test]
    fn scale_of_eight_takes_three_passes() {
        let sizes = plan_upscale_steps((100, 100), (800, 800), 2.0);
        assert_eq!(sizes, vec![(200, 200), (400, 400), (800, 800)]);
    }

    #[test]
    fn scale_at_most_two_is_single_pass() {
        assert_eq!(plan_upscale_steps((100, 50), (200, 90), 2.0), vec![(200, 90)]);
        assert_eq!(plan_upscale_steps((100, 50), (150, 75), 2.0), vec![(150, 75)]);
        assert_eq!(plan_upscale_steps((100, 100), (40, 40), 2.0), vec![(40, 40)]);
    }

    #[test]
    fn non_power_of_two_scale_ends_on_exact_target() {
        // 3 -> 100 is 33.3x: 2^5 = 32 < 33.3, so six passes.
        let sizes = plan_upscale_steps((3, 3), (100, 100), 2.0);
        assert_eq!(sizes.len(), 6);
        assert_eq!(sizes[..5], [(6, 6), (12, 12), (24, 24), (48, 48), (96, 96)]);
        assert_eq!(*sizes.last().unwrap(), (100, 100));
    }

    #[test]
    fn intermediate_sizes_never_overshoot_short_axis() {
        let sizes = plan_upscale_steps((10, 100), (80, 120), 2.0);
        assert_eq!(sizes, vec![(20, 120), (40, 120), (80, 120)]);
    }

    #[test]
    fn step_count_matches_ceil_log2() {
        assert_eq!(step_count(1.0, 2.0), 1);
        assert_eq!(step_count(2.0, 2.0), 1);
        assert_eq!(step_count(2.01, 2.0), 2);
        assert_eq!(step_count(4.0, 2.0), 2);
        assert_eq!(step_count(8.0, 2.0), 3);
        assert_eq!(step_count(9.0, 2.0), 4);
        assert_eq!(step_count(27.0, 3.0), 3);
    }

    #[test]
    fn upscale_produces_exact_dimensions_and_reports_steps() {
        let src = checker(16, 12);
        let rect = CropRect {
            x: 2,
            y: 1,
            width: 10,
            height: 9,
        };
        let mut seen = Vec::new();
        let out = upscale_with_observer(
            &src,
            rect,
            (97, 83),
            &UpscaleOptions::default(),
            |done, total| seen.push((done, total)),
        );
        assert_eq!(out.dimensions(), (97, 83));
        // max scale = 97 / 10 = 9.7 -> 4 passes
        assert_eq!(seen, vec![(1, 4), (2, 4), (3, 4), (4, 4)]);
    }

    #[test]
    fn out_of_range_rect_is_clamped() {
        let src = checker(8, 8);
        let rect = CropRect {
            x: 6,
            y: 6,
            width: 10,
            height: 10,
        };
        let out = upscale(&src, rect, 20, 20, &UpscaleOptions::default());
        assert_eq!(out.dimensions(), (20, 20));
    }

    fn white_square_on_clear(size: u32, inset: u32) -> RgbaImage {
        RgbaImage::from_fn(size, size, |x, y| {
            let inside = (inset..size - inset).contains(&x) && (inset..size - inset).contains(&y);
            if inside {
                Rgba([255, 255, 255, 255])
            } else {
                Rgba([0, 0, 0, 0])
            }
        })
    }

    #[test]
    fn soft_edges_keep_content_color() {
        let src = white_square_on_clear(32, 8);
        let out = upscale(&src, CropRect::full(32, 32), 256, 256, &UpscaleOptions::default());
        let mut partial = 0;
        for px in out.pixels().filter(|p| p[3] > 0) {
            if px[3] < 255 {
                partial += 1;
            }
            assert_eq!(&px.0[..3], &[255, 255, 255], "edge darkened to {:?}", px.0);
        }
        assert!(partial > 0);
    }

    #[test]
    fn resample_of_colored_edge_does_not_pick_up_black() {
        let mut src = RgbaImage::new(4, 1);
        src.put_pixel(2, 0, Rgba([200, 100, 40, 255]));
        src.put_pixel(3, 0, Rgba([200, 100, 40, 255]));
        let out = resample(&src, 16, 1, ResampleFilter::Triangle);
        for px in out.pixels().filter(|p| p[3] >= 8) {
            assert!(px[0].abs_diff(200) <= 2 && px[1].abs_diff(100) <= 2 && px[2].abs_diff(40) <= 2);
        }
    }

    #[test]
    fn uniform_color_survives_upscaling() {
        let src = RgbaImage::from_pixel(5, 5, Rgba([40, 80, 120, 255]));
        let out = upscale(&src, CropRect::full(5, 5), 64, 64, &UpscaleOptions::default());
        for px in out.pixels() {
            for ch in 0..4 {
                let diff = (i32::from(px[ch]) - i32::from([40u8, 80, 120, 255][ch])).abs();
                assert!(diff <= 1, "channel {ch} drifted to {}", px[ch]);
            }
        }
    }
}
