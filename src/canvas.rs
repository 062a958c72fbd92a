//! Centering finished content on the fixed print canvas.

use image::{imageops, RgbaImage};
use serde::{Deserialize, Serialize};

use crate::geometry::{centered_offset, DEFAULT_FILL_RATIO};

/// Canonical print canvas width.
pub const PRINT_WIDTH: u32 = 4500;

/// Canonical print canvas height.
pub const PRINT_HEIGHT: u32 = 5400;

/// Output canvas dimensions and the share of it content may fill.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CanvasConfig {
    /// Canvas width in pixels.
    pub width: u32,
    /// Canvas height in pixels.
    pub height: u32,
    /// Fraction of each canvas axis the content may occupy, in `(0, 1]`.
    pub fill_ratio: f64,
}

impl Default for CanvasConfig {
    fn default() -> Self {
        Self {
            width: PRINT_WIDTH,
            height: PRINT_HEIGHT,
            fill_ratio: DEFAULT_FILL_RATIO,
        }
    }
}

/// Copy `content` unchanged onto the center of a transparent canvas.
///
/// Content larger than the canvas is clipped symmetrically.
#[must_use]
pub fn composite_on_canvas(content: &RgbaImage, width: u32, height: u32) -> RgbaImage {
    let mut canvas = RgbaImage::new(width, height);
    let x = signed_offset(width, content.width());
    let y = signed_offset(height, content.height());
    imageops::replace(&mut canvas, content, x, y);
    canvas
}

fn signed_offset(outer: u32, inner: u32) -> i64 {
    if inner <= outer {
        i64::from(centered_offset(outer, inner))
    } else {
        -i64::from((inner - outer) / 2)
    }
}
