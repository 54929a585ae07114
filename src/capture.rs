//! Capture planning and the viewer session.
//!
//! DESIGN
//! ======
//! A depth message asks for a set of captures at one building:
//!
//! 1. Terrain height at the building is the base; base + depth is the flood
//!    level. A 100 m half-width water box is placed around the building.
//! 2. Depths inside the `WATER_EPS_M` deadband skip mask capture entirely.
//! 3. A flood level above the camera means the camera is submerged: one
//!    underwater mask. Otherwise two overwater masks, one with buildings
//!    occluding the plane and a naive one with terrain only.
//! 4. A scene screenshot is always taken.
//!
//! The engine side (terrain sampling, rendering the key-colored plane) is
//! reached through `TerrainSampler` and `FrameSource`; everything else is
//! decided here so it can be tested without a renderer.

use image::RgbaImage;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::camera::CameraPlacement;
use crate::geo::{self, GeoError, GeoRect};
use crate::mask::datauri::encode_png_data_url;
use crate::mask::threshold::{DEFAULT_TOLERANCE, KeyColor, coverage, threshold_mask};
use crate::mask::MaskError;
use crate::message::{DepthMessage, RelayMessage};

/// Depths at or below this magnitude do not produce masks.
pub const WATER_EPS_M: f64 = 0.25;
/// Half-width of the local water box around the building.
pub const HALF_SIZE_METERS: f64 = 100.0;
/// Full width of the key-colored reference plane.
pub const REFERENCE_PLANE_SIZE_M: f64 = 1500.0;
/// Marker sits this far above terrain.
pub const MARKER_LIFT_M: f64 = 1.5;

// =============================================================================
// PROFILES AND KINDS
// =============================================================================

/// Which side of the water surface the camera is on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MaskProfile {
    Overwater,
    Underwater,
}

impl MaskProfile {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Overwater => "overwater",
            Self::Underwater => "underwater",
        }
    }

    #[must_use]
    pub fn other(self) -> Self {
        match self {
            Self::Overwater => Self::Underwater,
            Self::Underwater => Self::Overwater,
        }
    }

    /// Underwater iff the filename says so; everything else is overwater.
    #[must_use]
    pub fn from_filename(filename: &str) -> Self {
        if filename.to_ascii_lowercase().contains("underwater") { Self::Underwater } else { Self::Overwater }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum CaptureKind {
    Overwater,
    NaiveOverwater,
    Underwater,
    Scene,
}

impl CaptureKind {
    #[must_use]
    pub fn suffix(self) -> &'static str {
        match self {
            Self::Overwater => "overwater_mask",
            Self::NaiveOverwater => "naive_overwater_mask",
            Self::Underwater => "underwater_mask",
            Self::Scene => "scene",
        }
    }

    #[must_use]
    pub fn is_mask(self) -> bool {
        !matches!(self, Self::Scene)
    }
}

/// `<uuid>_<suffix>.png`.
#[must_use]
pub fn capture_filename(uuid: &str, kind: CaptureKind) -> String {
    format!("{uuid}_{}.png", kind.suffix())
}

// =============================================================================
// PLAN
// =============================================================================

/// One frame the viewer must render and upload.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CaptureJob {
    pub kind: CaptureKind,
    pub filename: String,
    pub include_buildings: bool,
    pub include_terrain: bool,
}

impl CaptureJob {
    fn new(uuid: &str, kind: CaptureKind, include_buildings: bool) -> Self {
        Self { kind, filename: capture_filename(uuid, kind), include_buildings, include_terrain: true }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FloodPlan {
    pub building_lon: f64,
    pub building_lat: f64,
    pub depth: f64,
    pub base_height: f64,
    pub flood_height: f64,
    pub water_box: GeoRect,
    /// Key-colored reference plane used for mask frames.
    pub reference_plane: GeoRect,
    pub jobs: Vec<CaptureJob>,
}

impl FloodPlan {
    pub fn mask_jobs(&self) -> impl Iterator<Item = &CaptureJob> {
        self.jobs.iter().filter(|j| j.kind.is_mask())
    }
}

/// Decide the captures for one depth measurement.
pub fn plan_capture(
    depth_msg: &DepthMessage,
    base_height: f64,
    camera_height: f64,
    uuid: &str,
) -> Result<FloodPlan, GeoError> {
    let (lat, lon) = depth_msg.building()?;
    let depth = depth_msg.depth();
    let flood_height = base_height + depth;
    let water_box = geo::rect_from_center_meters(lon, lat, HALF_SIZE_METERS)?;

    let mut jobs = Vec::new();
    if depth.abs() > WATER_EPS_M {
        if flood_height > camera_height {
            jobs.push(CaptureJob::new(uuid, CaptureKind::Underwater, true));
        } else {
            jobs.push(CaptureJob::new(uuid, CaptureKind::Overwater, true));
            jobs.push(CaptureJob::new(uuid, CaptureKind::NaiveOverwater, false));
        }
    }
    jobs.push(CaptureJob::new(uuid, CaptureKind::Scene, true));

    Ok(FloodPlan {
        building_lon: lon,
        building_lat: lat,
        depth,
        base_height,
        flood_height,
        water_box,
        reference_plane: geo::rect_from_size_naive(lon, lat, REFERENCE_PLANE_SIZE_M),
        jobs,
    })
}

// =============================================================================
// ENGINE SEAMS
// =============================================================================

/// Terrain heights from the globe engine.
pub trait TerrainSampler {
    /// Most detailed terrain height at a point, if known.
    fn height_at(&self, lon: f64, lat: f64) -> Option<f64>;
}

/// Renders a frame with the key-colored plane at `water_level`, depth-tested
/// against terrain and (optionally) buildings.
pub trait FrameSource {
    type Error: std::error::Error + Send + Sync + 'static;

    fn render_plane(&mut self, plan: &FloodPlan, job: &CaptureJob, key: KeyColor) -> Result<RgbaImage, Self::Error>;
}

#[derive(Debug, thiserror::Error)]
pub enum CaptureError<E: std::error::Error + 'static> {
    #[error("frame source failed: {0}")]
    Source(#[source] E),
    #[error(transparent)]
    Mask(#[from] MaskError),
}

/// A mask ready for `/save-mask`.
#[derive(Debug, Clone)]
pub struct CapturedMask {
    pub filename: String,
    pub mask: RgbaImage,
    pub coverage: f64,
}

impl CapturedMask {
    /// `{dataUrl, filename}` body for the relay.
    pub fn upload_body(&self) -> Result<serde_json::Value, MaskError> {
        Ok(serde_json::json!({ "dataUrl": encode_png_data_url(&self.mask)?, "filename": self.filename }))
    }
}

/// Render and threshold every mask job in a plan.
pub fn capture_masks<S: FrameSource>(
    plan: &FloodPlan,
    source: &mut S,
    key: KeyColor,
) -> Result<Vec<CapturedMask>, CaptureError<S::Error>> {
    let mut out = Vec::new();
    for job in plan.mask_jobs() {
        let frame = source.render_plane(plan, job, key).map_err(CaptureError::Source)?;
        let mask = threshold_mask(&frame, key, DEFAULT_TOLERANCE);
        let coverage = coverage(&mask);
        debug!(filename = %job.filename, coverage, "mask captured");
        out.push(CapturedMask { filename: job.filename.clone(), mask, coverage });
    }
    Ok(out)
}

// =============================================================================
// VIEWER SESSION
// =============================================================================

/// Extruded water box shown in the scene.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WaterBox {
    pub rect: GeoRect,
    pub base_height: f64,
    pub flood_height: f64,
    pub visible: bool,
}

/// Point + depth label at the building.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Marker {
    pub lon: f64,
    pub lat: f64,
    pub height: f64,
    pub label: String,
    pub visible: bool,
}

#[must_use]
pub fn marker_label(depth: f64) -> String {
    format!("Depth: {depth:.2} m")
}

/// What the viewer should do for a relay message.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum SessionAction {
    PlaceCamera(CameraPlacement),
    Capture(FloodPlan),
}

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum SessionError {
    #[error("camera message carries no poses")]
    NoCamera,
    #[error("no terrain height at {lon},{lat}")]
    NoTerrain { lon: f64, lat: f64 },
    #[error(transparent)]
    Geo(#[from] GeoError),
}

/// Viewer-side state across relay messages. Holds at most one water box and
/// one marker, which are updated in place.
#[derive(Debug, Default)]
pub struct ViewerSession {
    uuid: String,
    camera: Option<CameraPlacement>,
    water: Option<WaterBox>,
    marker: Option<Marker>,
}

impl ViewerSession {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn uuid(&self) -> &str {
        &self.uuid
    }

    #[must_use]
    pub fn camera(&self) -> Option<&CameraPlacement> {
        self.camera.as_ref()
    }

    #[must_use]
    pub fn water(&self) -> Option<&WaterBox> {
        self.water.as_ref()
    }

    #[must_use]
    pub fn marker(&self) -> Option<&Marker> {
        self.marker.as_ref()
    }

    /// Apply one relay message.
    pub fn handle<T: TerrainSampler + ?Sized>(
        &mut self,
        msg: &RelayMessage,
        terrain: &T,
    ) -> Result<SessionAction, SessionError> {
        match msg {
            RelayMessage::Cameras(poses) => {
                let pose = poses.first().ok_or(SessionError::NoCamera)?;
                if let Some(uuid) = pose.uuid.as_deref().filter(|u| !u.is_empty()) {
                    self.uuid = uuid.to_owned();
                }
                let ground = terrain
                    .height_at(pose.lng, pose.lat)
                    .ok_or(SessionError::NoTerrain { lon: pose.lng, lat: pose.lat })?;
                let placement = CameraPlacement::from_pose(pose, ground);
                info!(uuid = %self.uuid, lat = pose.lat, lng = pose.lng, "camera placed");
                self.camera = Some(placement.clone());
                Ok(SessionAction::PlaceCamera(placement))
            }
            RelayMessage::Depth(depth) => {
                let (lat, lon) = depth.building()?;
                let base = terrain.height_at(lon, lat).ok_or(SessionError::NoTerrain { lon, lat })?;
                let camera_height = self.camera.as_ref().map_or(f64::INFINITY, |c| c.height);
                let plan = plan_capture(depth, base, camera_height, &self.uuid)?;
                self.upsert_water(&plan);
                self.upsert_marker(&plan);
                info!(uuid = %self.uuid, depth = plan.depth, jobs = plan.jobs.len(), "capture planned");
                Ok(SessionAction::Capture(plan))
            }
        }
    }

    fn upsert_water(&mut self, plan: &FloodPlan) {
        match &mut self.water {
            Some(water) => {
                water.rect = plan.water_box;
                water.base_height = plan.base_height;
                water.flood_height = plan.flood_height;
            }
            None => {
                self.water = Some(WaterBox {
                    rect: plan.water_box,
                    base_height: plan.base_height,
                    flood_height: plan.flood_height,
                    visible: true,
                });
            }
        }
    }

    fn upsert_marker(&mut self, plan: &FloodPlan) {
        let height = plan.base_height + MARKER_LIFT_M;
        let label = marker_label(plan.depth);
        match &mut self.marker {
            Some(marker) => {
                marker.lon = plan.building_lon;
                marker.lat = plan.building_lat;
                marker.height = height;
                marker.label = label;
            }
            None => {
                self.marker = Some(Marker {
                    lon: plan.building_lon,
                    lat: plan.building_lat,
                    height,
                    label,
                    visible: false,
                });
            }
        }
    }
}

#[cfg(test)]
#[path = "capture_test.rs"]
mod tests;
