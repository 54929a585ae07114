//! 3D-tiles tileset traversal and view-cone filtering.
//!
//! Regions follow the 3D Tiles convention: `[west, south, east, north,
//! minHeight, maxHeight]` with angles in radians.

use reqwest::Url;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

/// Mean Earth radius used by `haversine_m`.
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

#[derive(Debug, thiserror::Error)]
pub enum TileError {
    #[error("invalid tileset url {0:?}")]
    BadUrl(String),
    #[error("tileset has no root node")]
    NoRoot,
    #[error("failed to load tileset: {0}")]
    Http(#[from] reqwest::Error),
}

/// A leaf or interior tile with renderable content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TileRef {
    pub region: Vec<f64>,
    pub uri: String,
}

/// Walk a parsed tileset and collect every node that has both a region
/// bounding volume and a content uri. Uris are resolved against the
/// tileset's directory.
pub fn collect_tiles(tileset: &Value, tileset_url: &str) -> Result<Vec<TileRef>, TileError> {
    let url = Url::parse(tileset_url).map_err(|_| TileError::BadUrl(tileset_url.to_owned()))?;
    let base = url.join(".").map_err(|_| TileError::BadUrl(tileset_url.to_owned()))?;
    let root = tileset.get("root").ok_or(TileError::NoRoot)?;

    let mut tiles = Vec::new();
    let mut stack = vec![root];
    while let Some(node) = stack.pop() {
        let region = node
            .pointer("/boundingVolume/region")
            .and_then(Value::as_array)
            .map(|r| r.iter().filter_map(Value::as_f64).collect::<Vec<_>>())
            .filter(|r| r.len() >= 4);
        let uri = node
            .pointer("/content/uri")
            .and_then(Value::as_str)
            .and_then(|u| base.join(u).ok());

        if let (Some(region), Some(uri)) = (region, uri) {
            tiles.push(TileRef { region, uri: uri.to_string() });
        }
        if let Some(children) = node.get("children").and_then(Value::as_array) {
            // Reverse so traversal order matches depth-first, children in order.
            stack.extend(children.iter().rev());
        }
    }
    Ok(tiles)
}

/// Fetch and traverse a tileset over HTTP.
pub async fn load_tiles(client: &reqwest::Client, tileset_url: &str) -> Result<Vec<TileRef>, TileError> {
    let tileset: Value = client.get(tileset_url).send().await?.error_for_status()?.json().await?;
    let tiles = collect_tiles(&tileset, tileset_url)?;
    debug!(tileset_url, tiles = tiles.len(), "tileset loaded");
    Ok(tiles)
}

/// Region centre as `(lat, lon)` degrees; `None` for short regions.
#[must_use]
pub fn region_center_deg(region: &[f64]) -> Option<(f64, f64)> {
    let [west, south, east, north, ..] = *region else {
        return None;
    };
    Some((((south + north) / 2.0).to_degrees(), ((west + east) / 2.0).to_degrees()))
}

/// Initial great-circle bearing in `[0, 360)`.
#[must_use]
pub fn bearing_deg(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let (p1, p2) = (lat1.to_radians(), lat2.to_radians());
    let dl = (lon2 - lon1).to_radians();
    let x = dl.sin() * p2.cos();
    let y = p1.cos() * p2.sin() - p1.sin() * p2.cos() * dl.cos();
    (x.atan2(y).to_degrees() + 360.0) % 360.0
}

#[must_use]
pub fn haversine_m(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let (p1, p2) = (lat1.to_radians(), lat2.to_radians());
    let dp = (lat2 - lat1).to_radians();
    let dl = (lon2 - lon1).to_radians();
    let a = (dp / 2.0).sin().powi(2) + p1.cos() * p2.cos() * (dl / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_M * a.sqrt().asin()
}

/// A `(lat, lon)` pair in degrees.
pub type LatLon = (f64, f64);

/// Uris of tiles whose centre lies within `hfov_deg / 2` of the camera's
/// look bearing and, when given, within `max_dist_m`.
#[must_use]
pub fn tiles_in_view<'a>(
    tiles: &'a [TileRef],
    cam: LatLon,
    look: LatLon,
    hfov_deg: f64,
    max_dist_m: Option<f64>,
) -> Vec<&'a str> {
    let heading = bearing_deg(cam.0, cam.1, look.0, look.1);
    let half = hfov_deg / 2.0;

    tiles
        .iter()
        .filter(|t| {
            let Some((lat, lon)) = region_center_deg(&t.region) else {
                return false;
            };
            let b = bearing_deg(cam.0, cam.1, lat, lon);
            let delta = ((b - heading + 360.0) % 360.0).min((heading - b + 360.0) % 360.0);
            delta <= half && max_dist_m.is_none_or(|max| haversine_m(cam.0, cam.1, lat, lon) <= max)
        })
        .map(|t| t.uri.as_str())
        .collect()
}

#[cfg(test)]
#[path = "tiles_test.rs"]
mod tests;
