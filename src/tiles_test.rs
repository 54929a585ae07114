use super::*;
use serde_json::json;

fn region_around(lat_deg: f64, lon_deg: f64) -> Vec<f64> {
    let d = 0.0001_f64;
    vec![
        (lon_deg - d).to_radians(),
        (lat_deg - d).to_radians(),
        (lon_deg + d).to_radians(),
        (lat_deg + d).to_radians(),
        0.0,
        50.0,
    ]
}

fn tile(lat: f64, lon: f64, uri: &str) -> TileRef {
    TileRef { region: region_around(lat, lon), uri: uri.into() }
}

#[test]
fn collect_tiles_walks_children_and_resolves_uris() {
    let tileset = json!({
        "root": {
            "boundingVolume": { "region": region_around(40.0, -74.0) },
            "content": { "uri": "root.b3dm" },
            "children": [
                { "boundingVolume": { "region": region_around(40.1, -74.0) }, "content": { "uri": "a/child.b3dm" } },
                { "boundingVolume": { "box": [0, 0, 0] }, "content": { "uri": "boxed.b3dm" } },
                { "boundingVolume": { "region": region_around(40.2, -74.0) },
                  "children": [
                      { "boundingVolume": { "region": region_around(40.3, -74.0) }, "content": { "uri": "../up.b3dm" } }
                  ] }
            ]
        }
    });

    let tiles = collect_tiles(&tileset, "https://example.test/data/tileset.json").unwrap();
    let uris: Vec<&str> = tiles.iter().map(|t| t.uri.as_str()).collect();
    assert_eq!(
        uris,
        vec![
            "https://example.test/data/root.b3dm",
            "https://example.test/data/a/child.b3dm",
            "https://example.test/up.b3dm",
        ]
    );
}

#[test]
fn collect_tiles_needs_root_and_absolute_url() {
    assert!(matches!(collect_tiles(&json!({}), "https://example.test/t.json"), Err(TileError::NoRoot)));
    assert!(matches!(collect_tiles(&json!({ "root": {} }), "relative/t.json"), Err(TileError::BadUrl(_))));
}

#[test]
fn region_center_converts_radians() {
    let (lat, lon) = region_center_deg(&region_around(40.0, -74.0)).unwrap();
    assert!((lat - 40.0).abs() < 1e-9);
    assert!((lon + 74.0).abs() < 1e-9);
    assert_eq!(region_center_deg(&[0.0, 1.0]), None);
}

#[test]
fn bearing_cardinal_directions() {
    assert!((bearing_deg(0.0, 0.0, 1.0, 0.0) - 0.0).abs() < 1e-9);
    assert!((bearing_deg(0.0, 0.0, 0.0, 1.0) - 90.0).abs() < 1e-9);
    assert!((bearing_deg(0.0, 0.0, -1.0, 0.0) - 180.0).abs() < 1e-9);
    assert!((bearing_deg(0.0, 0.0, 0.0, -1.0) - 270.0).abs() < 1e-9);
}

#[test]
fn haversine_one_degree_of_latitude() {
    let d = haversine_m(0.0, 0.0, 1.0, 0.0);
    assert!((d - EARTH_RADIUS_M * 1f64.to_radians()).abs() < 1e-6);
    assert_eq!(haversine_m(10.0, 10.0, 10.0, 10.0), 0.0);
}

#[test]
fn tiles_in_view_filters_by_cone_and_distance() {
    let cam = (40.0, -74.0);
    let look = (40.01, -74.0); // due north
    let tiles = vec![
        tile(40.005, -74.0, "north-near"),
        tile(40.05, -74.0, "north-far"),
        tile(40.0, -73.99, "east"),
        tile(39.99, -74.0, "south"),
        TileRef { region: vec![0.0], uri: "broken".into() },
    ];

    assert_eq!(tiles_in_view(&tiles, cam, look, 60.0, None), vec!["north-near", "north-far"]);
    assert_eq!(tiles_in_view(&tiles, cam, look, 60.0, Some(1_000.0)), vec!["north-near"]);
    assert_eq!(tiles_in_view(&tiles, cam, look, 200.0, Some(2_000.0)), vec!["north-near", "east"]);
}
