use super::*;
use crate::message::CameraPose;
use image::Rgba;

struct FlatTerrain(f64);

impl TerrainSampler for FlatTerrain {
    fn height_at(&self, _lon: f64, _lat: f64) -> Option<f64> {
        Some(self.0)
    }
}

struct NoTerrain;

impl TerrainSampler for NoTerrain {
    fn height_at(&self, _lon: f64, _lat: f64) -> Option<f64> {
        None
    }
}

fn pose(uuid: Option<&str>) -> CameraPose {
    CameraPose {
        lat: 40.0,
        lng: -74.0,
        heading: Some(90.0),
        fov: Some(60.0),
        pitch: Some(0.0),
        uuid: uuid.map(str::to_owned),
    }
}

fn kinds(plan: &FloodPlan) -> Vec<CaptureKind> {
    plan.jobs.iter().map(|j| j.kind).collect()
}

#[test]
fn profile_from_filename() {
    assert_eq!(MaskProfile::from_filename("u1_underwater_mask.png"), MaskProfile::Underwater);
    assert_eq!(MaskProfile::from_filename("u1_UNDERWATER.png"), MaskProfile::Underwater);
    assert_eq!(MaskProfile::from_filename("u1_overwater_mask.png"), MaskProfile::Overwater);
    assert_eq!(MaskProfile::from_filename("u1_scene.png"), MaskProfile::Overwater);
    assert_eq!(MaskProfile::Overwater.other(), MaskProfile::Underwater);
}

#[test]
fn filenames_follow_convention() {
    assert_eq!(capture_filename("u1", CaptureKind::Overwater), "u1_overwater_mask.png");
    assert_eq!(capture_filename("u1", CaptureKind::NaiveOverwater), "u1_naive_overwater_mask.png");
    assert_eq!(capture_filename("u1", CaptureKind::Underwater), "u1_underwater_mask.png");
    assert_eq!(capture_filename("u1", CaptureKind::Scene), "u1_scene.png");
}

#[test]
fn shallow_depth_only_takes_scene() {
    let msg = DepthMessage::new(40.0, -74.0, 0.2);
    let plan = plan_capture(&msg, 10.0, 12.05, "u1").unwrap();
    assert_eq!(kinds(&plan), vec![CaptureKind::Scene]);
    assert_eq!(plan.mask_jobs().count(), 0);
}

#[test]
fn negative_depth_past_deadband_still_captures() {
    let msg = DepthMessage::new(40.0, -74.0, -0.5);
    let plan = plan_capture(&msg, 10.0, 12.05, "u1").unwrap();
    assert_eq!(kinds(&plan), vec![CaptureKind::Overwater, CaptureKind::NaiveOverwater, CaptureKind::Scene]);
}

#[test]
fn camera_above_flood_gets_two_overwater_masks() {
    let msg = DepthMessage::new(40.0, -74.0, 1.0);
    let plan = plan_capture(&msg, 10.0, 12.05, "u1").unwrap();

    assert_eq!(plan.flood_height, 11.0);
    assert_eq!(kinds(&plan), vec![CaptureKind::Overwater, CaptureKind::NaiveOverwater, CaptureKind::Scene]);
    assert!(plan.jobs[0].include_buildings);
    assert!(!plan.jobs[1].include_buildings);
    assert_eq!(plan.jobs[1].filename, "u1_naive_overwater_mask.png");
}

#[test]
fn submerged_camera_gets_underwater_mask() {
    let msg = DepthMessage::new(40.0, -74.0, 3.0);
    let plan = plan_capture(&msg, 10.0, 12.05, "u1").unwrap();
    assert_eq!(kinds(&plan), vec![CaptureKind::Underwater, CaptureKind::Scene]);
}

#[test]
fn water_box_surrounds_building() {
    let msg = DepthMessage::new(40.0, -74.0, 1.0);
    let plan = plan_capture(&msg, 0.0, 2.05, "u1").unwrap();
    assert!(plan.water_box.contains(-74.0, 40.0));
    let half_lat = (plan.water_box.north - plan.water_box.south) / 2.0;
    assert!((half_lat * crate::geo::METERS_PER_DEG_LAT - HALF_SIZE_METERS).abs() < 1e-6);
}

#[test]
fn bad_location_fails_plan() {
    let mut msg = DepthMessage::new(40.0, -74.0, 1.0);
    msg.location = "nowhere".into();
    assert!(plan_capture(&msg, 0.0, 2.0, "u1").is_err());
}

#[test]
fn marker_label_has_two_decimals() {
    assert_eq!(marker_label(1.0), "Depth: 1.00 m");
    assert_eq!(marker_label(0.456), "Depth: 0.46 m");
}

#[test]
fn session_adopts_uuid_and_places_camera() {
    let mut session = ViewerSession::new();
    let action = session.handle(&RelayMessage::Cameras(vec![pose(Some("abc"))]), &FlatTerrain(10.0)).unwrap();

    assert_eq!(session.uuid(), "abc");
    let SessionAction::PlaceCamera(placement) = action else { panic!("expected camera placement") };
    assert!((placement.height - 12.05).abs() < 1e-9);
    assert_eq!(placement.heading_deg, 90.0);
}

#[test]
fn session_keeps_uuid_when_pose_has_none() {
    let mut session = ViewerSession::new();
    session.handle(&RelayMessage::Cameras(vec![pose(Some("abc"))]), &FlatTerrain(0.0)).unwrap();
    session.handle(&RelayMessage::Cameras(vec![pose(None)]), &FlatTerrain(0.0)).unwrap();
    assert_eq!(session.uuid(), "abc");
}

#[test]
fn session_rejects_empty_cameras() {
    let mut session = ViewerSession::new();
    assert_eq!(session.handle(&RelayMessage::Cameras(Vec::new()), &FlatTerrain(0.0)), Err(SessionError::NoCamera));
}

#[test]
fn session_requires_terrain() {
    let mut session = ViewerSession::new();
    let err = session.handle(&RelayMessage::Depth(DepthMessage::new(40.0, -74.0, 1.0)), &NoTerrain).unwrap_err();
    assert!(matches!(err, SessionError::NoTerrain { .. }));
}

#[test]
fn session_upserts_single_water_box_and_marker() {
    let mut session = ViewerSession::new();
    let terrain = FlatTerrain(10.0);
    session.handle(&RelayMessage::Cameras(vec![pose(Some("abc"))]), &terrain).unwrap();

    session.handle(&RelayMessage::Depth(DepthMessage::new(40.0, -74.0, 1.0)), &terrain).unwrap();
    let action = session.handle(&RelayMessage::Depth(DepthMessage::new(40.001, -74.0, 2.5)), &terrain).unwrap();

    let SessionAction::Capture(plan) = action else { panic!("expected capture") };
    assert_eq!(plan.jobs[0].filename, "abc_underwater_mask.png");

    let water = session.water().unwrap();
    assert_eq!(water.flood_height, 12.5);
    assert!(water.rect.contains(-74.0, 40.001));

    let marker = session.marker().unwrap();
    assert_eq!(marker.label, "Depth: 2.50 m");
    assert_eq!(marker.lat, 40.001);
    assert!((marker.height - 11.5).abs() < 1e-9);
}

#[test]
fn depth_before_camera_is_overwater() {
    let mut session = ViewerSession::new();
    let action = session.handle(&RelayMessage::Depth(DepthMessage::new(40.0, -74.0, 50.0)), &FlatTerrain(0.0)).unwrap();
    let SessionAction::Capture(plan) = action else { panic!("expected capture") };
    assert_eq!(plan.jobs[0].kind, CaptureKind::Overwater);
}

/// Draws the key color on the left half when buildings are included and on
/// the whole frame otherwise.
struct HalfFrames;

impl FrameSource for HalfFrames {
    type Error = std::io::Error;

    fn render_plane(&mut self, _plan: &FloodPlan, job: &CaptureJob, key: KeyColor) -> Result<RgbaImage, Self::Error> {
        let mut frame = RgbaImage::from_pixel(4, 2, Rgba([key.r, key.g, key.b, 255]));
        if job.include_buildings {
            for y in 0..2 {
                for x in 2..4 {
                    frame.put_pixel(x, y, Rgba([90, 90, 90, 255]));
                }
            }
        }
        Ok(frame)
    }
}

struct BrokenFrames;

impl FrameSource for BrokenFrames {
    type Error = std::io::Error;

    fn render_plane(&mut self, _: &FloodPlan, _: &CaptureJob, _: KeyColor) -> Result<RgbaImage, Self::Error> {
        Err(std::io::Error::other("gpu lost"))
    }
}

#[test]
fn capture_masks_thresholds_each_mask_job() {
    let plan = plan_capture(&DepthMessage::new(40.0, -74.0, 1.0), 10.0, 12.05, "u1").unwrap();
    let masks = capture_masks(&plan, &mut HalfFrames, KeyColor::default()).unwrap();

    assert_eq!(masks.len(), 2);
    assert_eq!(masks[0].filename, "u1_overwater_mask.png");
    assert!((masks[0].coverage - 0.5).abs() < 1e-9);
    assert!((masks[1].coverage - 1.0).abs() < 1e-9);

    let body = masks[0].upload_body().unwrap();
    assert_eq!(body["filename"], "u1_overwater_mask.png");
    assert!(body["dataUrl"].as_str().unwrap().starts_with("data:image/png;base64,"));
}

#[test]
fn capture_masks_surfaces_source_errors() {
    let plan = plan_capture(&DepthMessage::new(40.0, -74.0, 1.0), 10.0, 12.05, "u1").unwrap();
    assert!(matches!(capture_masks(&plan, &mut BrokenFrames, KeyColor::default()), Err(CaptureError::Source(_))));
}
