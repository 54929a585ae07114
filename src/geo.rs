//! Geographic helpers for placing the flood box, markers and depth dots.
//!
//! All angles are degrees unless a name says otherwise. Distances use the
//! same flat-earth approximation the viewer uses for its local water box:
//! fixed metres-per-degree constants, with longitude optionally scaled by
//! `cos(lat)`.

use serde::{Deserialize, Serialize};

/// Metres per degree of longitude at the equator.
pub const METERS_PER_DEG_LON: f64 = 111_320.0;
/// Metres per degree of latitude.
pub const METERS_PER_DEG_LAT: f64 = 110_540.0;

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum GeoError {
    #[error("bad inputs lon={lon} lat={lat} half={half}")]
    NonFinite { lon: f64, lat: f64, half: f64 },
    #[error("location must be \"lat,lng\", got {0:?}")]
    BadLocation(String),
    #[error("depth grid rows must have equal length")]
    RaggedGrid,
}

/// Axis-aligned lon/lat rectangle in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoRect {
    pub west: f64,
    pub east: f64,
    pub south: f64,
    pub north: f64,
}

impl GeoRect {
    /// Corners in `west,south / east,south / east,north / west,north` order.
    #[must_use]
    pub fn corners(&self) -> [(f64, f64); 4] {
        [
            (self.west, self.south),
            (self.east, self.south),
            (self.east, self.north),
            (self.west, self.north),
        ]
    }

    #[must_use]
    pub fn contains(&self, lon: f64, lat: f64) -> bool {
        (self.west..=self.east).contains(&lon) && (self.south..=self.north).contains(&lat)
    }
}

/// Square of half-width `half_m` metres centred on a point, with longitude
/// scaled by the cosine of latitude.
pub fn rect_from_center_meters(lon: f64, lat: f64, half_m: f64) -> Result<GeoRect, GeoError> {
    if !lon.is_finite() || !lat.is_finite() || !half_m.is_finite() {
        return Err(GeoError::NonFinite { lon, lat, half: half_m });
    }
    let meters_per_deg_lon = METERS_PER_DEG_LON * lat.to_radians().cos();
    let d_lon = half_m / meters_per_deg_lon;
    let d_lat = half_m / METERS_PER_DEG_LAT;
    Ok(GeoRect { west: lon - d_lon, east: lon + d_lon, south: lat - d_lat, north: lat + d_lat })
}

/// Square of full width `size_m` metres centred on a point, without the
/// latitude correction. Used for the large key-colored reference plane.
#[must_use]
pub fn rect_from_size_naive(lon: f64, lat: f64, size_m: f64) -> GeoRect {
    let d_lon = size_m / METERS_PER_DEG_LON;
    let d_lat = size_m / METERS_PER_DEG_LAT;
    GeoRect {
        west: lon - d_lon / 2.0,
        east: lon + d_lon / 2.0,
        south: lat - d_lat / 2.0,
        north: lat + d_lat / 2.0,
    }
}

/// Parse a `"lat,lng"` pair into `(lat, lon)`.
pub fn parse_location(raw: &str) -> Result<(f64, f64), GeoError> {
    let bad = || GeoError::BadLocation(raw.to_owned());
    let (lat, lon) = raw.split_once(',').ok_or_else(bad)?;
    let lat: f64 = lat.trim().parse().map_err(|_| bad())?;
    let lon: f64 = lon.trim().parse().map_err(|_| bad())?;
    if !lat.is_finite() || !lon.is_finite() {
        return Err(bad());
    }
    Ok((lat, lon))
}

// =============================================================================
// DEPTH DOTS
// =============================================================================

/// One colored point for a non-zero cell of a depth grid.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DepthDot {
    pub lon: f64,
    pub lat: f64,
    /// Height above the ellipsoid, equal to the cell depth.
    pub height: f64,
    /// Opacity of the blue dot.
    pub alpha: f64,
    pub pixel_size: u32,
}

/// Lay out a row-major depth grid centred on `(lon0, lat0)`.
pub fn depth_dots(grid: &[Vec<f64>], lon0: f64, lat0: f64, step_deg: f64) -> Result<Vec<DepthDot>, GeoError> {
    let Some(first) = grid.first() else {
        return Ok(Vec::new());
    };
    let cols = first.len();
    if grid.iter().any(|row| row.len() != cols) {
        return Err(GeoError::RaggedGrid);
    }
    let half_cols = (cols as f64 - 1.0) / 2.0;
    let half_rows = (grid.len() as f64 - 1.0) / 2.0;

    let mut dots = Vec::new();
    for (r, row) in grid.iter().enumerate() {
        for (c, &depth) in row.iter().enumerate() {
            if depth == 0.0 || !depth.is_finite() {
                continue;
            }
            dots.push(DepthDot {
                lon: lon0 + (c as f64 - half_cols) * step_deg,
                lat: lat0 + (r as f64 - half_rows) * step_deg,
                height: depth,
                alpha: (depth / 3.0).clamp(0.2, 0.8),
                pixel_size: 6,
            });
        }
    }
    Ok(dots)
}

#[cfg(test)]
#[path = "geo_test.rs"]
mod tests;
