//! Crop, fit and centering geometry for the print canvas.
//!
//! A [`GeometryPlan`] is computed once per source raster. It holds the padded
//! crop rectangle in source space, the aspect-preserving target size of the
//! content on the canvas, and the offsets that center it.

use image::RgbaImage;

use crate::bounds::Bounds;

/// Default crop padding as a fraction of the larger source dimension.
pub const DEFAULT_PADDING_FRACTION: f64 = 0.02;

/// Default fraction of the canvas the content may occupy on each axis.
pub const DEFAULT_FILL_RATIO: f64 = 0.85;

/// A source-space rectangle given by origin and size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CropRect {
    /// Left column.
    pub x: u32,
    /// Top row.
    pub y: u32,
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl CropRect {
    /// Rectangle covering a whole raster.
    #[must_use]
    pub fn full(width: u32, height: u32) -> Self {
        Self {
            x: 0,
            y: 0,
            width,
            height,
        }
    }

    /// Whether the rectangle lies entirely inside a `width` x `height` raster.
    #[must_use]
    pub fn fits_within(&self, width: u32, height: u32) -> bool {
        self.width > 0
            && self.height > 0
            && u64::from(self.x) + u64::from(self.width) <= u64::from(width)
            && u64::from(self.y) + u64::from(self.height) <= u64::from(height)
    }
}

/// Derived layout for one source raster on one canvas.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GeometryPlan {
    /// Left edge of the padded crop in source space.
    pub crop_left: u32,
    /// Top edge of the padded crop in source space.
    pub crop_top: u32,
    /// Width of the padded crop.
    pub content_width: u32,
    /// Height of the padded crop.
    pub content_height: u32,
    /// Width of the content once scaled onto the canvas.
    pub scaled_width: u32,
    /// Height of the content once scaled onto the canvas.
    pub scaled_height: u32,
    /// Horizontal offset of the content on the canvas.
    pub offset_x: u32,
    /// Vertical offset of the content on the canvas.
    pub offset_y: u32,
    /// Padding applied around the detected bounds.
    pub padding: u32,
}

impl GeometryPlan {
    /// The padded crop as a [`CropRect`].
    #[must_use]
    pub fn crop_rect(&self) -> CropRect {
        CropRect {
            x: self.crop_left,
            y: self.crop_top,
            width: self.content_width,
            height: self.content_height,
        }
    }

    /// Largest per-axis magnification from crop to scaled content.
    #[must_use]
    pub fn max_scale(&self) -> f64 {
        let sx = f64::from(self.scaled_width) / f64::from(self.content_width);
        let sy = f64::from(self.scaled_height) / f64::from(self.content_height);
        sx.max(sy)
    }
}

/// Compute the crop, fit and centering plan for `raster`.
///
/// The detected `bounds` are grown by
/// `round(max(width, height) * padding_fraction)` pixels and clamped to the
/// raster. The resulting crop is fitted into
/// `(output_width * fill_ratio) x (output_height * fill_ratio)` preserving
/// its aspect ratio, then centered on the `output_width` x `output_height`
/// canvas.
#[must_use]
pub fn plan_geometry(
    raster: &RgbaImage,
    bounds: Bounds,
    output_width: u32,
    output_height: u32,
    fill_ratio: f64,
    padding_fraction: f64,
) -> GeometryPlan {
    plan_geometry_for_size(
        (raster.width(), raster.height()),
        bounds,
        (output_width, output_height),
        fill_ratio,
        padding_fraction,
    )
}

/// [`plan_geometry`] working from dimensions alone.
#[must_use]
#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::cast_precision_loss
)]
pub fn plan_geometry_for_size(
    (width, height): (u32, u32),
    bounds: Bounds,
    (output_width, output_height): (u32, u32),
    fill_ratio: f64,
    padding_fraction: f64,
) -> GeometryPlan {
    let max_x = width.saturating_sub(1);
    let max_y = height.saturating_sub(1);

    let padding = (f64::from(width.max(height)) * padding_fraction).round() as u32;

    let crop_left = bounds.left.min(max_x).saturating_sub(padding);
    let crop_top = bounds.top.min(max_y).saturating_sub(padding);
    let crop_right = bounds.right.min(max_x).saturating_add(padding).min(max_x);
    let crop_bottom = bounds.bottom.min(max_y).saturating_add(padding).min(max_y);

    let content_width = crop_right - crop_left + 1;
    let content_height = crop_bottom - crop_top + 1;

    let max_content_w = f64::from(output_width) * fill_ratio;
    let max_content_h = f64::from(output_height) * fill_ratio;

    let content_ratio = f64::from(content_width) / f64::from(content_height);
    let target_ratio = max_content_w / max_content_h;

    let (scaled_w, scaled_h) = if content_ratio > target_ratio {
        (max_content_w, max_content_w / content_ratio)
    } else {
        (max_content_h * content_ratio, max_content_h)
    };

    let scaled_width = (scaled_w.round() as u32).clamp(1, output_width.max(1));
    let scaled_height = (scaled_h.round() as u32).clamp(1, output_height.max(1));

    GeometryPlan {
        crop_left,
        crop_top,
        content_width,
        content_height,
        scaled_width,
        scaled_height,
        offset_x: centered_offset(output_width, scaled_width),
        offset_y: centered_offset(output_height, scaled_height),
        padding,
    }
}

/// `round((outer - inner) / 2)`, saturating at zero.
#[must_use]
pub fn centered_offset(outer: u32, inner: u32) -> u32 {
    outer.saturating_sub(inner).div_ceil(2)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reference_bounds() -> Bounds {
        Bounds {
            left: 100,
            top: 100,
            right: 900,
            bottom: 1400,
        }
    }

    #[test]
    fn print_canvas_scenario_matches_hand_computed_plan() {
        let plan = plan_geometry_for_size(
            (1024, 1536),
            reference_bounds(),
            (4500, 5400),
            DEFAULT_FILL_RATIO,
            DEFAULT_PADDING_FRACTION,
        );

        // round(1536 * 0.02) = round(30.72) = 31
        assert_eq!(plan.padding, 31);
        assert_eq!((plan.crop_left, plan.crop_top), (69, 69));
        // right: 900 + 31 = 931, bottom: 1400 + 31 = 1431
        assert_eq!(plan.content_width, 931 - 69 + 1);
        assert_eq!(plan.content_height, 1431 - 69 + 1);

        // 863 / 1363 = 0.633 < 3825 / 4590 = 0.833, so height limits:
        // scaled_h = 4590, scaled_w = round(4590 * 863 / 1363) = 2906
        assert_eq!(plan.scaled_height, 4590);
        assert_eq!(plan.scaled_width, 2906);
        assert_eq!(plan.offset_x, 797);
        assert_eq!(plan.offset_y, 405);
    }

    #[test]
    fn wide_content_is_width_limited() {
        let bounds = Bounds {
            left: 0,
            top: 40,
            right: 199,
            bottom: 59,
        };
        let plan = plan_geometry_for_size((200, 100), bounds, (1000, 1000), 0.5, 0.0);
        assert_eq!((plan.content_width, plan.content_height), (200, 20));
        assert_eq!((plan.scaled_width, plan.scaled_height), (500, 50));
        assert_eq!((plan.offset_x, plan.offset_y), (250, 475));
    }

    #[test]
    fn padding_is_clamped_to_raster_edges() {
        let bounds = Bounds {
            left: 1,
            top: 2,
            right: 97,
            bottom: 98,
        };
        let plan = plan_geometry_for_size((100, 100), bounds, (500, 500), 0.85, 0.1);
        assert_eq!((plan.crop_left, plan.crop_top), (0, 0));
        assert_eq!((plan.content_width, plan.content_height), (100, 100));
        assert!(plan.crop_rect().fits_within(100, 100));
    }

    #[test]
    fn tiny_content_still_scales_to_fill_box() {
        let bounds = Bounds {
            left: 5,
            top: 5,
            right: 5,
            bottom: 5,
        };
        let plan = plan_geometry_for_size((10, 10), bounds, (4500, 5400), 0.85, 0.0);
        assert_eq!((plan.content_width, plan.content_height), (1, 1));
        assert_eq!((plan.scaled_width, plan.scaled_height), (3825, 3825));
        assert!(plan.max_scale() > 3000.0);
    }

    #[test]
    fn centered_offset_rounds_half_up() {
        assert_eq!(centered_offset(10, 5), 3);
        assert_eq!(centered_offset(10, 4), 3);
        assert_eq!(centered_offset(4, 10), 0);
    }
}
