//! Water-depth coloring by per-pixel surface probing.
//!
//! DESIGN
//! ======
//! Instead of drawing a plane and reading it back, the viewer can cast one
//! ray per `downsample`×`downsample` block and ask the engine for the height
//! of the nearest surface hit (terrain, optionally buildings). Each probe is
//! colored by how far below or above the water level the hit lies:
//!
//! - red:   depth under water, scaled by `under_range_m`
//! - green: height over water, scaled by `over_range_m`
//! - blue:  255 for any submerged hit
//!
//! Misses stay black. The low-res grid is then upscaled nearest-neighbour to
//! the full canvas so pixel blocks stay crisp.

use image::imageops::{self, FilterType};
use image::{Rgba, RgbaImage};

/// Lower bound on the color ranges.
const MIN_RANGE: f64 = 1e-6;

/// Anything that can report the height of the nearest surface under a
/// canvas pixel.
pub trait SurfaceProbe {
    /// Height above the ellipsoid of the nearest hit through canvas pixel
    /// `(x, y)`, or `None` on a miss.
    fn hit_height(&self, x: f64, y: f64) -> Option<f64>;
}

impl<F> SurfaceProbe for F
where
    F: Fn(f64, f64) -> Option<f64>,
{
    fn hit_height(&self, x: f64, y: f64) -> Option<f64> {
        self(x, y)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RaycastParams {
    pub water_level: f64,
    pub downsample: u32,
    pub under_range_m: f64,
    pub over_range_m: f64,
}

impl RaycastParams {
    #[must_use]
    pub fn new(water_level: f64) -> Self {
        Self { water_level, downsample: 4, under_range_m: 5.0, over_range_m: 10.0 }
    }
}

/// Low-res probe grid plus its full-size upscale.
#[derive(Debug, Clone)]
pub struct WaterMask {
    pub low_res: RgbaImage,
    pub mask: RgbaImage,
}

/// Color for one probe.
#[must_use]
pub fn shade(hit: Option<f64>, params: &RaycastParams) -> Rgba<u8> {
    let Some(height) = hit else {
        return Rgba([0, 0, 0, 255]);
    };
    let under = (params.water_level - height).max(0.0);
    let over = (height - params.water_level).max(0.0);
    let r = scale(under, params.under_range_m);
    let g = scale(over, params.over_range_m);
    let b = if under > 0.0 { 255 } else { 0 };
    Rgba([r, g, b, 255])
}

fn scale(value: f64, range: f64) -> u8 {
    (255.0 * (value / range.max(MIN_RANGE))).round().min(255.0) as u8
}

/// Probe grid size for a canvas.
#[must_use]
pub fn grid_size(canvas_w: u32, canvas_h: u32, downsample: u32) -> (u32, u32) {
    let ds = downsample.max(1);
    ((canvas_w / ds).max(1), (canvas_h / ds).max(1))
}

/// Probe every grid cell centre and build the water mask.
pub fn water_mask<P: SurfaceProbe + ?Sized>(
    probe: &P,
    canvas_w: u32,
    canvas_h: u32,
    params: &RaycastParams,
) -> WaterMask {
    let ds = f64::from(params.downsample.max(1));
    let (w, h) = grid_size(canvas_w, canvas_h, params.downsample);

    let low_res = RgbaImage::from_fn(w, h, |x, y| {
        let px = (f64::from(x) + 0.5) * ds;
        let py = (f64::from(y) + 0.5) * ds;
        shade(probe.hit_height(px, py), params)
    });
    let mask = imageops::resize(&low_res, canvas_w.max(1), canvas_h.max(1), FilterType::Nearest);

    WaterMask { low_res, mask }
}

#[cfg(test)]
#[path = "raycast_test.rs"]
mod tests;
