//! Key-color thresholding.

use image::{Rgba, RgbaImage};
use serde::{Deserialize, Serialize};

/// Per-channel distance below which a pixel counts as the key color.
pub const DEFAULT_TOLERANCE: u8 = 8;

const WHITE: Rgba<u8> = Rgba([255, 255, 255, 255]);
const BLACK: Rgba<u8> = Rgba([0, 0, 0, 255]);

/// Flat color the reference plane is drawn with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyColor {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Default for KeyColor {
    fn default() -> Self {
        Self { r: 0, g: 0, b: 255 }
    }
}

impl KeyColor {
    /// True when every channel is strictly within `tolerance` of the key.
    #[must_use]
    pub fn matches(&self, px: Rgba<u8>, tolerance: u8) -> bool {
        let [r, g, b, _] = px.0;
        r.abs_diff(self.r) < tolerance && g.abs_diff(self.g) < tolerance && b.abs_diff(self.b) < tolerance
    }
}

/// Plane pixels become white, everything else black; alpha is forced opaque.
#[must_use]
pub fn threshold_mask(frame: &RgbaImage, key: KeyColor, tolerance: u8) -> RgbaImage {
    let mut out = RgbaImage::new(frame.width(), frame.height());
    for (src, dst) in frame.pixels().zip(out.pixels_mut()) {
        *dst = if key.matches(*src, tolerance) { WHITE } else { BLACK };
    }
    out
}

/// Fraction of white pixels in a mask.
#[must_use]
pub fn coverage(mask: &RgbaImage) -> f64 {
    let total = u64::from(mask.width()) * u64::from(mask.height());
    if total == 0 {
        return 0.0;
    }
    let white = mask.pixels().filter(|p| is_set(**p)).count() as u64;
    white as f64 / total as f64
}

/// Mask pixel test shared with the comparison and composition code.
#[must_use]
pub fn is_set(px: Rgba<u8>) -> bool {
    px.0[0] >= 128
}

#[cfg(test)]
#[path = "threshold_test.rs"]
mod tests;
