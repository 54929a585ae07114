//! Combine the planar distance field with a visibility mask.

use image::{GrayImage, Luma, RgbaImage};

use super::MaskError;
use super::threshold::is_set;

/// Zero out distance-field pixels the mask marks as occluded.
pub fn apply_visibility(distance: &GrayImage, mask: &RgbaImage) -> Result<GrayImage, MaskError> {
    if distance.dimensions() != mask.dimensions() {
        return Err(MaskError::SizeMismatch { a: distance.dimensions(), b: mask.dimensions() });
    }
    let mut out = GrayImage::new(distance.width(), distance.height());
    for ((d, m), o) in distance.pixels().zip(mask.pixels()).zip(out.pixels_mut()) {
        *o = if is_set(*m) { *d } else { Luma([0]) };
    }
    Ok(out)
}
