use super::*;

const EPS: f64 = 1e-9;

fn placement(heading: f64, pitch: f64, fov: f64) -> CameraPlacement {
    CameraPlacement {
        lon: 139.6,
        lat: 35.6,
        height: 12.0,
        heading_deg: heading,
        pitch_deg: pitch,
        fov_deg: fov,
        near: STREET_NEAR_M,
    }
}

#[test]
fn frustum_fov_keeps_landscape_fov() {
    assert!((frustum_fov(90.0, 1.5) - 90f64.to_radians()).abs() < EPS);
    assert!((frustum_fov(90.0, 1.0) - 90f64.to_radians()).abs() < EPS);
}

#[test]
fn frustum_fov_widens_for_portrait() {
    // tan(45°) / 0.5 = 2
    let expected = 2.0 * 2f64.atan();
    assert!((frustum_fov(90.0, 0.5) - expected).abs() < EPS);
}

#[test]
fn vertical_fov_narrows_for_landscape_only() {
    let fov = 90f64.to_radians();
    assert!((vertical_fov(fov, 2.0) - 2.0 * 0.5f64.atan()).abs() < EPS);
    assert!((vertical_fov(fov, 0.75) - fov).abs() < EPS);
}

#[test]
fn placement_from_pose_applies_defaults() {
    let pose = CameraPose { lat: 1.0, lng: 2.0, heading: None, fov: None, pitch: None, uuid: None };
    let p = CameraPlacement::from_pose(&pose, 10.0);
    assert!((p.height - (10.0 + EYE_HEIGHT_M)).abs() < EPS);
    assert!((p.fov_deg - DEFAULT_FOV_DEG).abs() < EPS);
    assert!(p.heading_deg.abs() < EPS);
    assert!((p.near - STREET_NEAR_M).abs() < EPS);
    assert!((p.lon - 2.0).abs() < EPS);
}

#[test]
fn placement_ignores_non_positive_fov() {
    let pose = CameraPose { lat: 1.0, lng: 2.0, heading: Some(90.0), fov: Some(0.0), pitch: None, uuid: None };
    let p = CameraPlacement::from_pose(&pose, 0.0);
    assert!((p.fov_deg - DEFAULT_FOV_DEG).abs() < EPS);
    assert!((p.heading_deg - 90.0).abs() < EPS);
}

#[test]
fn forward_follows_heading_clockwise_from_north() {
    let north = ViewCamera::from_placement(&placement(0.0, 0.0, 90.0), 100, 100);
    assert!((north.forward() - DVec3::Y).length() < EPS);

    let east = ViewCamera::from_placement(&placement(90.0, 0.0, 90.0), 100, 100);
    assert!((east.forward() - DVec3::X).length() < EPS);

    let down = ViewCamera::from_placement(&placement(0.0, -30.0, 90.0), 100, 100);
    assert!(down.forward().z < 0.0);
}

#[test]
fn center_ray_matches_forward() {
    let cam = ViewCamera::from_placement(&placement(336.0, -10.0, 90.0), 200, 100);
    let dir = cam.ray_direction(0.5, 0.5);
    assert!((dir - cam.forward()).length() < 1e-6);
}

#[test]
fn top_of_frame_ray_points_upward() {
    let cam = ViewCamera::from_placement(&placement(0.0, 0.0, 90.0), 100, 100);
    let top = cam.ray_direction(0.5, 1.0);
    let bottom = cam.ray_direction(0.5, 0.0);
    assert!(top.z > 0.0);
    assert!(bottom.z < 0.0);
    // 90° vertical fov on a square canvas: edge rays sit 45° off-axis.
    assert!((top.z - std::f64::consts::FRAC_1_SQRT_2).abs() < 1e-6);
}

#[test]
fn ray_caster_origin_is_camera_position() {
    let cam = ViewCamera::from_placement(&placement(45.0, 5.0, 60.0), 64, 48);
    assert!((cam.rays().origin() - cam.position).length() < 1e-6);
}
