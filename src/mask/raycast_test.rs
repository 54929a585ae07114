use super::*;
use std::cell::RefCell;

#[test]
fn shade_miss_is_black() {
    assert_eq!(shade(None, &RaycastParams::new(10.0)), Rgba([0, 0, 0, 255]));
}

#[test]
fn shade_submerged_hit() {
    let params = RaycastParams::new(10.0);
    // 2.5 m under a 5 m range: half red, blue flag on.
    assert_eq!(shade(Some(7.5), &params), Rgba([128, 0, 255, 255]));
    // Deeper than the range saturates.
    assert_eq!(shade(Some(-20.0), &params), Rgba([255, 0, 255, 255]));
}

#[test]
fn shade_dry_hit() {
    let params = RaycastParams::new(10.0);
    assert_eq!(shade(Some(15.0), &params), Rgba([0, 128, 0, 255]));
    assert_eq!(shade(Some(10.0), &params), Rgba([0, 0, 0, 255]));
}

#[test]
fn shade_guards_zero_ranges() {
    let params = RaycastParams { under_range_m: 0.0, over_range_m: 0.0, ..RaycastParams::new(0.0) };
    assert_eq!(shade(Some(-0.001), &params), Rgba([255, 0, 255, 255]));
}

#[test]
fn grid_size_never_collapses() {
    assert_eq!(grid_size(1920, 1080, 4), (480, 270));
    assert_eq!(grid_size(2, 2, 4), (1, 1));
    assert_eq!(grid_size(10, 10, 0), (10, 10));
}

#[test]
fn water_mask_probes_cell_centres() {
    let seen = RefCell::new(Vec::new());
    let probe = |x: f64, y: f64| -> Option<f64> {
        seen.borrow_mut().push((x, y));
        None
    };
    let params = RaycastParams { downsample: 4, ..RaycastParams::new(0.0) };
    let out = water_mask(&probe, 8, 4, &params);

    assert_eq!(out.low_res.dimensions(), (2, 1));
    assert_eq!(out.mask.dimensions(), (8, 4));
    assert_eq!(*seen.borrow(), vec![(2.0, 2.0), (6.0, 2.0)]);
}

#[test]
fn water_mask_upscale_keeps_blocks_crisp() {
    // Left half of the canvas is terrain below water, right half above.
    let probe = |x: f64, _y: f64| -> Option<f64> { Some(if x < 4.0 { 0.0 } else { 20.0 }) };
    let params = RaycastParams { downsample: 4, ..RaycastParams::new(5.0) };
    let out = water_mask(&probe, 8, 8, &params);

    for y in 0..8 {
        for x in 0..4 {
            assert_eq!(out.mask.get_pixel(x, y)[2], 255, "left block submerged at ({x},{y})");
        }
        for x in 4..8 {
            assert_eq!(out.mask.get_pixel(x, y)[2], 0, "right block dry at ({x},{y})");
        }
    }
}
