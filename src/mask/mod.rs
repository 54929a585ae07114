//! Black/white flood-extent masks.
//!
//! SYSTEM CONTEXT
//! ==============
//! The renderer draws a key-colored reference plane with depth testing on,
//! so terrain and buildings occlude it. Everything after the frame is read
//! back lives here: thresholding by key color, comparing masks, mixing in
//! the planar distance field, the raycast water-depth coloring, and PNG
//! data-URL transport to the relay.

pub mod compare;
pub mod compose;
pub mod datauri;
pub mod raycast;
pub mod threshold;

pub use compare::{MaskDiff, compare_masks};
pub use datauri::{DataUrl, DataUrlError, ImageFormat};
pub use threshold::{KeyColor, coverage, threshold_mask};

#[derive(Debug, thiserror::Error)]
pub enum MaskError {
    #[error("mask sizes differ: {a:?} vs {b:?}")]
    SizeMismatch { a: (u32, u32), b: (u32, u32) },
    #[error("image encoding failed: {0}")]
    Encode(#[from] image::ImageError),
}
