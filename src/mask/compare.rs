//! Pixel-wise comparison of two masks.
//!
//! The overwater mask (buildings occlude the plane) and the naive mask
//! (terrain only) differ exactly where buildings hide water; the diff counts
//! make that visible without eyeballing PNGs.

use image::RgbaImage;
use serde::Serialize;

use super::MaskError;
use super::threshold::is_set;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MaskDiff {
    pub both: u64,
    pub only_a: u64,
    pub only_b: u64,
    pub neither: u64,
    /// Intersection over union; `1.0` when both masks are empty.
    pub iou: f64,
}

pub fn compare_masks(a: &RgbaImage, b: &RgbaImage) -> Result<MaskDiff, MaskError> {
    if a.dimensions() != b.dimensions() {
        return Err(MaskError::SizeMismatch { a: a.dimensions(), b: b.dimensions() });
    }

    let (mut both, mut only_a, mut only_b, mut neither) = (0u64, 0u64, 0u64, 0u64);
    for (pa, pb) in a.pixels().zip(b.pixels()) {
        match (is_set(*pa), is_set(*pb)) {
            (true, true) => both += 1,
            (true, false) => only_a += 1,
            (false, true) => only_b += 1,
            (false, false) => neither += 1,
        }
    }

    let union = both + only_a + only_b;
    let iou = if union == 0 { 1.0 } else { both as f64 / union as f64 };
    Ok(MaskDiff { both, only_a, only_b, neither, iou })
}

#[cfg(test)]
#[path = "compare_test.rs"]
mod tests;
