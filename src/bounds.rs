//! Content-bounds detection on the alpha channel.

use image::RgbaImage;

/// Default alpha above which a pixel counts as content.
pub const DEFAULT_ALPHA_THRESHOLD: u8 = 20;

/// Inclusive, axis-aligned pixel rectangle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Bounds {
    /// Leftmost column (inclusive).
    pub left: u32,
    /// Topmost row (inclusive).
    pub top: u32,
    /// Rightmost column (inclusive).
    pub right: u32,
    /// Bottom row (inclusive).
    pub bottom: u32,
}

impl Bounds {
    /// Bounds covering a whole `width` x `height` frame.
    ///
    /// Degenerate zero-sized frames collapse to the single origin pixel.
    #[must_use]
    pub fn full_frame(width: u32, height: u32) -> Self {
        Self {
            left: 0,
            top: 0,
            right: width.saturating_sub(1),
            bottom: height.saturating_sub(1),
        }
    }

    /// Number of columns covered.
    #[must_use]
    pub fn width(&self) -> u32 {
        self.right - self.left + 1
    }

    /// Number of rows covered.
    #[must_use]
    pub fn height(&self) -> u32 {
        self.bottom - self.top + 1
    }

    /// Whether `(x, y)` lies inside the rectangle.
    #[must_use]
    pub fn contains(&self, x: u32, y: u32) -> bool {
        (self.left..=self.right).contains(&x) && (self.top..=self.bottom).contains(&y)
    }
}

/// Find the bounding box of pixels whose alpha exceeds `alpha_threshold`.
///
/// If no pixel qualifies the whole frame is returned, so callers never see an
/// empty crop.
#[must_use]
pub fn find_content_bounds(raster: &RgbaImage, alpha_threshold: u8) -> Bounds {
    let mut min_x = u32::MAX;
    let mut min_y = u32::MAX;
    let mut max_x = 0u32;
    let mut max_y = 0u32;
    let mut found = false;

    for (x, y, px) in raster.enumerate_pixels() {
        if px[3] > alpha_threshold {
            found = true;
            min_x = min_x.min(x);
            min_y = min_y.min(y);
            max_x = max_x.max(x);
            max_y = max_y.max(y);
        }
    }

    if !found {
        return Bounds::full_frame(raster.width(), raster.height());
    }

    Bounds {
        left: min_x,
        top: min_y,
        right: max_x,
        bottom: max_y,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    #[test]
    fn empty_raster_falls_back_to_full_frame() {
        let img = RgbaImage::new(40, 30);
        let b = find_content_bounds(&img, DEFAULT_ALPHA_THRESHOLD);
        assert_eq!(b, Bounds::full_frame(40, 30));
        assert_eq!((b.width(), b.height()), (40, 30));
    }

    #[test]
    fn finds_tight_box_around_content() {
        let mut img = RgbaImage::new(50, 50);
        img.put_pixel(12, 7, Rgba([255, 0, 0, 255]));
        img.put_pixel(30, 41, Rgba([0, 255, 0, 200]));
        let b = find_content_bounds(&img, DEFAULT_ALPHA_THRESHOLD);
        assert_eq!(
            b,
            Bounds {
                left: 12,
                top: 7,
                right: 30,
                bottom: 41
            }
        );
    }

    #[test]
    fn threshold_is_exclusive() {
        let mut img = RgbaImage::new(10, 10);
        img.put_pixel(2, 2, Rgba([255, 255, 255, 20]));
        img.put_pixel(5, 6, Rgba([255, 255, 255, 21]));
        let b = find_content_bounds(&img, 20);
        assert_eq!((b.left, b.top, b.right, b.bottom), (5, 6, 5, 6));

        let b = find_content_bounds(&img, 15);
        assert_eq!((b.left, b.top, b.right, b.bottom), (2, 2, 5, 6));
    }

    #[test]
    fn contains_is_inclusive() {
        let b = Bounds {
            left: 1,
            top: 2,
            right: 3,
            bottom: 4,
        };
        assert!(b.contains(1, 2));
        assert!(b.contains(3, 4));
        assert!(!b.contains(0, 2));
        assert!(!b.contains(3, 5));
    }
}
