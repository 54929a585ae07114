//! Planar distance field for the flood plane.
//!
//! DESIGN
//! ======
//! For every pixel a camera ray is rebuilt from the inverse projection and
//! inverse view, intersected with the flood plane, and the hit's tangential
//! distance from the camera (the component of `hit - camera` lying in the
//! plane) is mapped to a grey level: white at or below `near_m`, black at or
//! beyond `far_m`. Geometry depth is not consulted; occlusion comes from
//! multiplying by a visibility mask afterwards (see `mask::compose`).

use glam::DVec3;
use image::{GrayImage, Luma};

use crate::camera::ViewCamera;

/// Rays closer to parallel than this never hit the plane.
const PARALLEL_EPS: f64 = 1e-6;
/// Lower bound on the `far - near` span.
const MIN_SPAN: f64 = 1e-3;

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum PlaneError {
    #[error("plane normal must be non-zero and finite")]
    DegenerateNormal,
}

/// Infinite plane through `point` with unit `normal`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Plane {
    pub point: DVec3,
    pub normal: DVec3,
}

impl Plane {
    pub fn new(point: DVec3, normal: DVec3) -> Result<Self, PlaneError> {
        let normal = normal.try_normalize().ok_or(PlaneError::DegenerateNormal)?;
        Ok(Self { point, normal })
    }

    /// Horizontal water surface at `height` in the local up-frame.
    #[must_use]
    pub fn horizontal(height: f64) -> Self {
        Self { point: DVec3::new(0.0, 0.0, height), normal: DVec3::Z }
    }

    /// Ray parameter of the hit, if the ray meets the plane in front of
    /// its origin.
    #[must_use]
    pub fn intersect(&self, origin: DVec3, dir: DVec3) -> Option<f64> {
        let denom = self.normal.dot(dir);
        if denom.abs() < PARALLEL_EPS {
            return None;
        }
        let t = self.normal.dot(self.point - origin) / denom;
        (t > 0.0).then_some(t)
    }

    /// Tangential distance from `origin` to where the ray meets the plane.
    #[must_use]
    pub fn planar_distance(&self, origin: DVec3, dir: DVec3) -> Option<f64> {
        let t = self.intersect(origin, dir)?;
        let v = dir * t;
        let tangent = v - self.normal * v.dot(self.normal);
        Some(tangent.length())
    }
}

/// Near/far mapping for the distance field.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DistanceFieldParams {
    /// White at or below this planar distance.
    pub near_m: f64,
    /// Black at or beyond this planar distance.
    pub far_m: f64,
}

impl Default for DistanceFieldParams {
    fn default() -> Self {
        Self { near_m: 0.0, far_m: 50.0 }
    }
}

impl DistanceFieldParams {
    /// `1` at `near_m`, falling linearly to `0` at `far_m`.
    #[must_use]
    pub fn intensity(&self, planar: f64) -> f64 {
        let span = (self.far_m - self.near_m).max(MIN_SPAN);
        1.0 - ((planar - self.near_m) / span).clamp(0.0, 1.0)
    }
}

/// Render the distance field for a `width`×`height` frame. Pixels whose ray
/// misses the plane are black.
#[must_use]
pub fn render_distance_field(
    camera: &ViewCamera,
    plane: &Plane,
    params: DistanceFieldParams,
    width: u32,
    height: u32,
) -> GrayImage {
    let rays = camera.rays();
    let origin = camera.position;
    let (w, h) = (f64::from(width), f64::from(height));

    GrayImage::from_fn(width, height, |x, y| {
        let u = (f64::from(x) + 0.5) / w;
        // Image rows run top-down; texture coordinates run bottom-up.
        let v = 1.0 - (f64::from(y) + 0.5) / h;
        let level = plane
            .planar_distance(origin, rays.direction(u, v))
            .map_or(0.0, |planar| params.intensity(planar));
        Luma([(level * 255.0).round() as u8])
    })
}

#[cfg(test)]
#[path = "plane_test.rs"]
mod tests;
