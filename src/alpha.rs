//! Alpha channel extraction and reapplication.
//!
//! The alpha channel is carried as an opaque grayscale raster
//! (`R = G = B = alpha`, `A = 255`) so it can be resampled like any other
//! image without premultiplication effects.

use image::{Rgba, RgbaImage};

use crate::upscale::{resample, ResampleFilter};

/// Default alpha floor used to detect lost transparency.
pub const DEFAULT_OPAQUE_FLOOR: u8 = 250;

/// Copy the alpha channel of `raster` into an opaque grayscale raster.
#[must_use]
pub fn extract_alpha(raster: &RgbaImage) -> RgbaImage {
    let mut out = RgbaImage::new(raster.width(), raster.height());
    for (dst, src) in out.pixels_mut().zip(raster.pixels()) {
        let a = src[3];
        *dst = Rgba([a, a, a, 255]);
    }
    out
}

/// Put the alpha stored in `alpha`'s red channel onto the colors of `rgb`.
///
/// `alpha` is resampled to `rgb`'s dimensions first when they differ.
#[must_use]
pub fn apply_alpha(rgb: &RgbaImage, alpha: &RgbaImage, filter: ResampleFilter) -> RgbaImage {
    let resized;
    let alpha = if alpha.dimensions() == rgb.dimensions() {
        alpha
    } else {
        resized = resample(alpha, rgb.width(), rgb.height(), filter);
        &resized
    };

    let mut out = rgb.clone();
    for (dst, a) in out.pixels_mut().zip(alpha.pixels()) {
        dst[3] = a[0];
    }
    out
}

/// Whether `raster` appears to have lost its transparency.
///
/// True when no pixel has alpha below `opaque_floor`.
#[must_use]
pub fn has_lost_transparency(raster: &RgbaImage, opaque_floor: u8) -> bool {
    !raster.pixels().any(|px| px[3] < opaque_floor)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[allow(clippy::cast_possible_truncation)]
    fn gradient_alpha(w: u32, h: u32) -> RgbaImage {
        RgbaImage::from_fn(w, h, |x, y| Rgba([200, 100, 50, ((x * 31 + y * 17) % 256) as u8]))
    }

    #[test]
    fn extract_stores_alpha_as_opaque_gray() {
        let img = gradient_alpha(6, 4);
        let alpha = extract_alpha(&img);
        for (a, src) in alpha.pixels().zip(img.pixels()) {
            assert_eq!(a.0, [src[3], src[3], src[3], 255]);
        }
    }

    #[test]
    fn extract_then_apply_is_lossless_on_same_size() {
        let img = gradient_alpha(9, 7);
        let mut stripped = img.clone();
        for px in stripped.pixels_mut() {
            px[3] = 255;
        }
        let restored = apply_alpha(&stripped, &extract_alpha(&img), ResampleFilter::default());
        assert_eq!(restored.as_raw(), img.as_raw());
    }

    #[test]
    fn apply_resamples_mismatched_alpha() {
        let rgb = RgbaImage::from_pixel(20, 10, Rgba([1, 2, 3, 255]));
        let alpha_src = RgbaImage::from_pixel(10, 5, Rgba([0, 0, 0, 128]));
        let out = apply_alpha(&rgb, &extract_alpha(&alpha_src), ResampleFilter::Lanczos3);
        assert_eq!(out.dimensions(), (20, 10));
        for px in out.pixels() {
            assert_eq!(&px.0[..3], &[1, 2, 3]);
            assert!((i32::from(px[3]) - 128).abs() <= 1);
        }
    }

    #[test]
    fn lost_transparency_detection() {
        let opaque = RgbaImage::from_pixel(4, 4, Rgba([9, 9, 9, 252]));
        assert!(has_lost_transparency(&opaque, DEFAULT_OPAQUE_FLOOR));

        let mut cutout = opaque.clone();
        cutout.put_pixel(3, 3, Rgba([0, 0, 0, 0]));
        assert!(!has_lost_transparency(&cutout, DEFAULT_OPAQUE_FLOOR));
    }
}
