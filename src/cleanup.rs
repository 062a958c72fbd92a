//! Edge and fringe cleanup on the alpha channel.
//!
//! Resampling semi-transparent art leaves a halo of partially transparent
//! pixels carrying blended background color. Two passes remove it:
//!
//! - [`clean_edges`] zeroes the color of nearly transparent pixels.
//! - [`clean_alpha_edges`] reclassifies fringe pixels as solid or transparent
//!   from their 8-neighbourhood.

use image::{Rgba, RgbaImage};
use serde::{Deserialize, Serialize};

/// Neighbourhood thresholds for fringe reclassification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FringeThresholds {
    /// Fringe pixels have alpha strictly above this value.
    pub low: u8,
    /// Fringe pixels have alpha strictly below this value.
    pub high: u8,
    /// Neighbours with alpha above this are solid.
    pub solid: u8,
    /// Neighbours with alpha below this are transparent.
    pub transparent: u8,
    /// Neighbour count that decides a reclassification.
    pub min_neighbors: u8,
    /// Alpha cutoff for undecided pixels: below is transparent, else opaque.
    pub binary_cutoff: u8,
}

impl Default for FringeThresholds {
    fn default() -> Self {
        Self {
            low: 10,
            high: 240,
            solid: 200,
            transparent: 30,
            min_neighbors: 5,
            binary_cutoff: 128,
        }
    }
}

/// Zero color and alpha of every pixel with alpha below `cutoff`, in place.
pub fn clean_edges(raster: &mut RgbaImage, cutoff: u8) {
    for px in raster.pixels_mut() {
        if px[3] < cutoff {
            *px = Rgba([0, 0, 0, 0]);
        }
    }
}

/// Reclassify fringe pixels from their neighbourhood, `iterations` times.
///
/// Each iteration reads from a snapshot of the previous state, so writes
/// within one iteration never influence neighbour lookups in the same one.
/// Border pixels are left untouched.
pub fn clean_alpha_edges(raster: &mut RgbaImage, thresholds: &FringeThresholds, iterations: u32) {
    let (width, height) = raster.dimensions();
    if width < 3 || height < 3 {
        return;
    }

    for iteration in 0..iterations {
        let snapshot = raster.clone();
        let mut changed = 0usize;

        for y in 1..height - 1 {
            for x in 1..width - 1 {
                let px = snapshot.get_pixel(x, y);
                let a = px[3];
                if a <= thresholds.low || a >= thresholds.high {
                    continue;
                }

                let mut solid = 0u8;
                let mut transparent = 0u8;
                let mut sum = [0u32; 3];
                for (nx, ny) in neighbours(x, y) {
                    let n = snapshot.get_pixel(nx, ny);
                    if n[3] > thresholds.solid {
                        solid += 1;
                        for (s, &c) in sum.iter_mut().zip(&n.0[..3]) {
                            *s += u32::from(c);
                        }
                    } else if n[3] < thresholds.transparent {
                        transparent += 1;
                    }
                }

                let out = if transparent >= thresholds.min_neighbors {
                    Rgba([0, 0, 0, 0])
                } else if solid >= thresholds.min_neighbors {
                    let n = u32::from(solid);
                    #[allow(clippy::cast_possible_truncation)]
                    let avg = |s: u32| ((s + n / 2) / n) as u8;
                    Rgba([avg(sum[0]), avg(sum[1]), avg(sum[2]), 255])
                } else if a < thresholds.binary_cutoff {
                    Rgba([0, 0, 0, 0])
                } else {
                    Rgba([px[0], px[1], px[2], 255])
                };

                raster.put_pixel(x, y, out);
                changed += 1;
            }
        }

        log::debug!("fringe pass {}/{iterations}: {changed} pixels reclassified", iteration + 1);
        if changed == 0 {
            break;
        }
    }
}

fn neighbours(x: u32, y: u32) -> [(u32, u32); 8] {
    [
        (x - 1, y - 1),
        (x, y - 1),
        (x + 1, y - 1),
        (x - 1, y),
        (x + 1, y),
        (x - 1, y + 1),
        (x, y + 1),
        (x + 1, y + 1),
    ]
}
