// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Pure geospatial math shared by the tracking pipeline.
//!
//! Points are `[latitude, longitude]` pairs in degrees unless a function says
//! otherwise. Conversions to the `polyline` crate's lon/lat coordinate order
//! happen inside the codec helpers.

use geo::LineString;

/// Mean Earth radius in kilometers.
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// Polyline codec failures.
#[derive(Debug, thiserror::Error)]
pub enum PolylineCodecError {
    #[error("Failed to encode polyline: {0}")]
    Encode(String),

    #[error("Failed to decode polyline: {0}")]
    Decode(String),
}

/// Great-circle distance between two coordinates in kilometers (haversine).
pub fn distance_km(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let d_lat = (lat2 - lat1).to_radians();
    let d_lon = (lon2 - lon1).to_radians();

    let a = (d_lat / 2.0).sin().powi(2)
        + lat1.to_radians().cos() * lat2.to_radians().cos() * (d_lon / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

    EARTH_RADIUS_KM * c
}

/// Initial bearing from the first coordinate to the second, in degrees
/// normalized to `[0, 360)`.
pub fn bearing_deg(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let d_lon = (lon2 - lon1).to_radians();
    let y = d_lon.sin() * lat2.to_radians().cos();
    let x = lat1.to_radians().cos() * lat2.to_radians().sin()
        - lat1.to_radians().sin() * lat2.to_radians().cos() * d_lon.cos();

    let bearing = y.atan2(x).to_degrees();
    (bearing + 360.0) % 360.0
}

/// Axis-aligned latitude/longitude box.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub min_lat: f64,
    pub min_lon: f64,
    pub max_lat: f64,
    pub max_lon: f64,
}

impl BoundingBox {
    /// Whether a coordinate lies inside the box (edges inclusive).
    pub fn contains(&self, lat: f64, lon: f64) -> bool {
        lat >= self.min_lat && lat <= self.max_lat && lon >= self.min_lon && lon <= self.max_lon
    }
}

/// Bounding box of the given radius around a point, for map viewports and
/// coarse area queries.
///
/// Uses the flat-earth approximation (1 degree latitude ~ 111 km). Not exact
/// enough to pre-screen containment checks at the boundary, and degenerates
/// near the poles where `cos(lat)` approaches zero.
pub fn bounding_box(lat: f64, lon: f64, radius_km: f64) -> BoundingBox {
    let lat_offset = radius_km / 111.0;
    let lon_offset = radius_km / (111.0 * lat.to_radians().cos());

    BoundingBox {
        min_lat: lat - lat_offset,
        min_lon: lon - lon_offset,
        max_lat: lat + lat_offset,
        max_lon: lon + lon_offset,
    }
}

/// Orthogonal projection of `point` onto the segment `start`..`end`, clamped
/// to the segment's endpoints.
///
/// Planar math over raw degrees. Fine at route-segment scale; do not use for
/// continent-length segments.
pub fn project_onto_segment(point: [f64; 2], start: [f64; 2], end: [f64; 2]) -> [f64; 2] {
    let seg_lat = end[0] - start[0];
    let seg_lon = end[1] - start[1];

    let mag_sq = seg_lat * seg_lat + seg_lon * seg_lon;
    if mag_sq == 0.0 {
        // Degenerate segment, both endpoints coincide
        return start;
    }

    let rel_lat = point[0] - start[0];
    let rel_lon = point[1] - start[1];

    let t = ((rel_lon * seg_lon + rel_lat * seg_lat) / mag_sq).clamp(0.0, 1.0);

    [start[0] + seg_lat * t, start[1] + seg_lon * t]
}

/// Linear interpolation between two coordinates; `progress` runs 0 to 1.
pub fn interpolate_position(
    lat1: f64,
    lon1: f64,
    lat2: f64,
    lon2: f64,
    progress: f64,
) -> [f64; 2] {
    [
        lat1 + (lat2 - lat1) * progress,
        lon1 + (lon2 - lon1) * progress,
    ]
}

/// Exponential smoothing of a raw fix against the previous one, for GPS
/// jitter removal. Higher `factor` means more weight on the new fix.
pub fn smooth_position(current: [f64; 2], previous: [f64; 2], factor: f64) -> [f64; 2] {
    [
        previous[0] + (current[0] - previous[0]) * factor,
        previous[1] + (current[1] - previous[1]) * factor,
    ]
}

/// Estimated travel time in whole minutes at an average speed. `None` when
/// the speed is not positive.
pub fn eta_minutes(distance_km: f64, avg_speed_kmh: f64) -> Option<u32> {
    if avg_speed_kmh <= 0.0 {
        return None;
    }
    Some((distance_km / avg_speed_kmh * 60.0).round() as u32)
}

/// Encode a path as a precision-5 polyline string.
pub fn encode_polyline(path: &[[f64; 2]]) -> Result<String, PolylineCodecError> {
    // The polyline crate wants x = longitude, y = latitude
    let line = LineString::from(
        path.iter()
            .map(|p| (p[1], p[0]))
            .collect::<Vec<(f64, f64)>>(),
    );

    polyline::encode_coordinates(line, 5).map_err(|e| PolylineCodecError::Encode(e.to_string()))
}

/// Decode a precision-5 polyline string into `[lat, lon]` pairs.
pub fn decode_polyline(encoded: &str) -> Result<Vec<[f64; 2]>, PolylineCodecError> {
    let line = polyline::decode_polyline(encoded, 5)
        .map_err(|e| PolylineCodecError::Decode(e.to_string()))?;

    Ok(line.coords().map(|c| [c.y, c.x]).collect())
}
