//! Unsharp-mask sharpening on color channels.

use image::RgbaImage;
use serde::{Deserialize, Serialize};

/// Sharpening kernel shape. Every kernel sums to 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SharpenKernel {
    /// 3x3 Laplacian sharpen: center 5, 4-neighbours -1.
    #[default]
    Laplacian3x3,
    /// 5x5 kernel: center 9, inner ring -0.75, outer ring -0.125.
    Ring5x5,
}

const LAPLACIAN_3X3: [f32; 9] = [
    0.0, -1.0, 0.0, //
    -1.0, 5.0, -1.0, //
    0.0, -1.0, 0.0,
];

const RING_5X5: [f32; 25] = [
    -0.125, -0.125, -0.125, -0.125, -0.125, //
    -0.125, -0.75, -0.75, -0.75, -0.125, //
    -0.125, -0.75, 9.0, -0.75, -0.125, //
    -0.125, -0.75, -0.75, -0.75, -0.125, //
    -0.125, -0.125, -0.125, -0.125, -0.125,
];

impl SharpenKernel {
    /// Half-width of the kernel.
    #[must_use]
    pub fn radius(self) -> u32 {
        match self {
            Self::Laplacian3x3 => 1,
            Self::Ring5x5 => 2,
        }
    }

    fn weights(self) -> &'static [f32] {
        match self {
            Self::Laplacian3x3 => &LAPLACIAN_3X3,
            Self::Ring5x5 => &RING_5X5,
        }
    }
}

/// Unsharp-mask settings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SharpenConfig {
    /// Kernel shape.
    pub kernel: SharpenKernel,
    /// Blend factor between original (0) and full convolution (1).
    pub strength: f32,
    /// Pixels with alpha below this value are skipped.
    pub alpha_threshold: u8,
}

impl Default for SharpenConfig {
    fn default() -> Self {
        Self {
            kernel: SharpenKernel::default(),
            strength: 0.5,
            alpha_threshold: 20,
        }
    }
}

/// Sharpen the color channels of `raster`.
///
/// `out = orig + (conv - orig) * strength` per RGB channel. Alpha is copied,
/// pixels under the alpha threshold and pixels within the kernel radius of
/// the border are left unmodified.
#[must_use]
pub fn sharpen(raster: &RgbaImage, config: &SharpenConfig) -> RgbaImage {
    let mut out = raster.clone();
    let (width, height) = raster.dimensions();
    let r = config.kernel.radius();
    if width <= 2 * r || height <= 2 * r {
        return out;
    }

    let weights = config.kernel.weights();
    let side = (2 * r + 1) as usize;

    for y in r..height - r {
        for x in r..width - r {
            let px = raster.get_pixel(x, y);
            if px[3] < config.alpha_threshold {
                continue;
            }

            let mut acc = [0.0f32; 3];
            for ky in 0..side {
                for kx in 0..side {
                    let w = weights[ky * side + kx];
                    if w == 0.0 {
                        continue;
                    }
                    #[allow(clippy::cast_possible_truncation)]
                    let n = raster.get_pixel(x + kx as u32 - r, y + ky as u32 - r);
                    for (a, &c) in acc.iter_mut().zip(&n.0[..3]) {
                        *a += w * f32::from(c);
                    }
                }
            }

            let dst = out.get_pixel_mut(x, y);
            for (ch, &conv) in acc.iter().enumerate() {
                let orig = f32::from(px[ch]);
                let v = orig + (conv - orig) * config.strength;
                #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
                {
                    dst[ch] = v.round().clamp(0.0, 255.0) as u8;
                }
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    #[test]
    fn kernels_sum_to_one() {
        for k in [SharpenKernel::Laplacian3x3, SharpenKernel::Ring5x5] {
            let sum: f32 = k.weights().iter().sum();
            assert!((sum - 1.0).abs() < 1e-6, "{k:?} sums to {sum}");
            let side = (2 * k.radius() + 1) as usize;
            assert_eq!(k.weights().len(), side * side);
        }
    }

    #[test]
    fn fully_transparent_image_is_unchanged() {
        let mut img = RgbaImage::new(16, 16);
        for (x, y, px) in img.enumerate_pixels_mut() {
            #[allow(clippy::cast_possible_truncation)]
            {
                *px = Rgba([(x * 13) as u8, (y * 7) as u8, 99, 0]);
            }
        }
        for kernel in [SharpenKernel::Laplacian3x3, SharpenKernel::Ring5x5] {
            let cfg = SharpenConfig {
                kernel,
                strength: 1.0,
                ..SharpenConfig::default()
            };
            assert_eq!(sharpen(&img, &cfg).as_raw(), img.as_raw());
        }
    }

    #[test]
    fn flat_region_is_unchanged() {
        let img = RgbaImage::from_pixel(9, 9, Rgba([120, 60, 30, 255]));
        let cfg = SharpenConfig {
            kernel: SharpenKernel::Ring5x5,
            ..SharpenConfig::default()
        };
        assert_eq!(sharpen(&img, &cfg).as_raw(), img.as_raw());
    }

    #[test]
    fn edge_contrast_increases_and_border_is_kept() {
        let img = RgbaImage::from_fn(6, 3, |x, _| {
            if x < 3 {
                Rgba([100, 100, 100, 255])
            } else {
                Rgba([200, 200, 200, 255])
            }
        });
        let cfg = SharpenConfig {
            strength: 1.0,
            ..SharpenConfig::default()
        };
        let out = sharpen(&img, &cfg);
        // dark side of the edge: 5*100 - 3*100 - 200 = 0
        assert_eq!(out.get_pixel(2, 1)[0], 0);
        // bright side: 5*200 - 3*200 - 100 = 300 -> 255
        assert_eq!(out.get_pixel(3, 1)[0], 255);
        assert_eq!(out.get_pixel(0, 1), img.get_pixel(0, 1));
        assert_eq!(out.get_pixel(2, 0), img.get_pixel(2, 0));
        assert!(out.pixels().all(|p| p[3] == 255));
    }

    #[test]
    fn ring_kernel_sharpens_step_edge() {
        let img = RgbaImage::from_fn(10, 5, |x, _| {
            if x < 5 {
                Rgba([100, 100, 100, 255])
            } else {
                Rgba([200, 200, 200, 255])
            }
        });
        let cfg = SharpenConfig {
            kernel: SharpenKernel::Ring5x5,
            strength: 0.1,
            ..SharpenConfig::default()
        };
        let out = sharpen(&img, &cfg);
        // dark side: 900 - 0.75 * 1100 - 0.125 * 2300 = -212.5, 10% of the way
        assert_eq!(out.get_pixel(4, 2).0, [69, 69, 69, 255]);
        // bright side: 1800 - 0.75 * 1300 - 0.125 * 2500 = 512.5
        assert_eq!(out.get_pixel(5, 2).0, [231, 231, 231, 255]);
        // far from the edge the 5x5 window is flat
        assert_eq!(out.get_pixel(2, 2), img.get_pixel(2, 2));
        assert_eq!(out.get_pixel(7, 2), img.get_pixel(7, 2));
        // within two pixels of the border nothing changes
        assert_eq!(out.get_pixel(1, 2), img.get_pixel(1, 2));
        assert_eq!(out.get_pixel(4, 1), img.get_pixel(4, 1));
    }

    #[test]
    fn half_strength_moves_halfway() {
        let mut img = RgbaImage::from_pixel(3, 3, Rgba([100, 100, 100, 255]));
        img.put_pixel(1, 0, Rgba([80, 80, 80, 255]));
        let out = sharpen(&img, &SharpenConfig::default());
        // conv = 500 - 80 - 300 = 120, halfway from 100 is 110
        assert_eq!(out.get_pixel(1, 1).0, [110, 110, 110, 255]);
    }
}
