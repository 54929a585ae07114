//! Street-level camera placement.
//!
//! DESIGN
//! ======
//! The viewer places its camera at a producer-supplied pose: eye height
//! above sampled terrain, heading clockwise from north, a single `fov` that
//! applies to the wider canvas dimension. `ViewCamera` is the same camera
//! expressed in a local east-north-up frame (x east, y north, z up) so the
//! planar distance field can rebuild per-pixel rays from it.

use glam::{DMat4, DVec3, DVec4};
use serde::Serialize;

use crate::message::CameraPose;

/// Eye height above terrain for street-level poses.
pub const EYE_HEIGHT_M: f64 = 2.05;
/// Field of view used when a pose does not carry one.
pub const DEFAULT_FOV_DEG: f64 = 120.0;
/// Near plane used for street-level views.
pub const STREET_NEAR_M: f64 = 0.001;

/// Frustum fov for a requested horizontal fov: landscape canvases take it
/// as-is, portrait canvases convert it so the horizontal extent still
/// matches.
#[must_use]
pub fn frustum_fov(fov_deg: f64, aspect: f64) -> f64 {
    let fov = fov_deg.to_radians();
    if aspect >= 1.0 {
        fov
    } else {
        2.0 * ((fov / 2.0).tan() / aspect).atan()
    }
}

/// Vertical fov for a frustum fov (radians) that applies to the wider side.
#[must_use]
pub fn vertical_fov(frustum_fov: f64, aspect: f64) -> f64 {
    if aspect > 1.0 {
        2.0 * ((frustum_fov / 2.0).tan() / aspect).atan()
    } else {
        frustum_fov
    }
}

/// Where and how the viewer camera is placed for a pose.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CameraPlacement {
    pub lon: f64,
    pub lat: f64,
    /// Height above the ellipsoid.
    pub height: f64,
    pub heading_deg: f64,
    pub pitch_deg: f64,
    pub fov_deg: f64,
    pub near: f64,
}

impl CameraPlacement {
    #[must_use]
    pub fn from_pose(pose: &CameraPose, terrain_height: f64) -> Self {
        Self {
            lon: pose.lng,
            lat: pose.lat,
            height: terrain_height + EYE_HEIGHT_M,
            heading_deg: pose.heading.unwrap_or(0.0),
            pitch_deg: pose.pitch.unwrap_or(0.0),
            fov_deg: pose.fov.filter(|f| *f > 0.0).unwrap_or(DEFAULT_FOV_DEG),
            near: STREET_NEAR_M,
        }
    }
}

// =============================================================================
// VIEW CAMERA
// =============================================================================

/// Perspective camera in a local east-north-up frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewCamera {
    pub position: DVec3,
    /// Radians clockwise from north.
    pub heading: f64,
    /// Radians above the horizon.
    pub pitch: f64,
    /// Vertical fov in radians.
    pub fov_y: f64,
    pub aspect: f64,
    pub near: f64,
    pub far: f64,
}

impl ViewCamera {
    /// Camera at `height` metres above the local origin for a placement,
    /// rendering into a `width`×`height_px` canvas.
    #[must_use]
    pub fn from_placement(placement: &CameraPlacement, width: u32, height_px: u32) -> Self {
        let aspect = f64::from(width.max(1)) / f64::from(height_px.max(1));
        let fov = frustum_fov(placement.fov_deg, aspect);
        Self {
            position: DVec3::new(0.0, 0.0, placement.height),
            heading: placement.heading_deg.to_radians(),
            pitch: placement.pitch_deg.to_radians(),
            fov_y: vertical_fov(fov, aspect),
            aspect,
            near: placement.near,
            far: 1.0e7,
        }
    }

    /// Unit view direction.
    #[must_use]
    pub fn forward(&self) -> DVec3 {
        let (sin_h, cos_h) = self.heading.sin_cos();
        let (sin_p, cos_p) = self.pitch.sin_cos();
        DVec3::new(sin_h * cos_p, cos_h * cos_p, sin_p)
    }

    #[must_use]
    pub fn view(&self) -> DMat4 {
        DMat4::look_to_rh(self.position, self.forward(), DVec3::Z)
    }

    #[must_use]
    pub fn projection(&self) -> DMat4 {
        DMat4::perspective_rh_gl(self.fov_y, self.aspect, self.near, self.far)
    }

    /// World-space ray direction through texture coordinate `uv`
    /// (origin bottom-left, both axes in `0..=1`).
    #[must_use]
    pub fn ray_direction(&self, u: f64, v: f64) -> DVec3 {
        self.rays().direction(u, v)
    }

    /// Precomputed inverse matrices for per-pixel ray reconstruction.
    #[must_use]
    pub fn rays(&self) -> RayCaster {
        RayCaster { inverse_projection: self.projection().inverse(), inverse_view: self.view().inverse() }
    }
}

/// Rebuilds world-space rays from texture coordinates.
#[derive(Debug, Clone, Copy)]
pub struct RayCaster {
    inverse_projection: DMat4,
    inverse_view: DMat4,
}

impl RayCaster {
    #[must_use]
    pub fn direction(&self, u: f64, v: f64) -> DVec3 {
        let clip = DVec4::new(u * 2.0 - 1.0, v * 2.0 - 1.0, 1.0, 1.0);
        let eye = self.inverse_projection * clip;
        let dir_eye = (eye.truncate() / eye.w).normalize();
        (self.inverse_view * dir_eye.extend(0.0)).truncate().normalize()
    }

    /// Camera position recovered from the inverse view.
    #[must_use]
    pub fn origin(&self) -> DVec3 {
        self.inverse_view.w_axis.truncate()
    }
}

#[cfg(test)]
#[path = "camera_test.rs"]
mod tests;
