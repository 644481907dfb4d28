// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Route snapping.
//!
//! Projects a raw GPS fix onto the closest segment of the active route's
//! path. A fix further than [`SNAP_THRESHOLD_KM`] from every segment is left
//! untouched, so off-route driving is never silently rewritten.

use serde::Serialize;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

use crate::geo::{distance_km, project_onto_segment};

/// Maximum deviation for a snap to be accepted (50 meters).
pub const SNAP_THRESHOLD_KM: f64 = 0.05;

/// A fix snapped onto a route path.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct SnappedPoint {
    pub latitude: f64,
    pub longitude: f64,
    /// Distance from the raw fix to the accepted projection
    pub deviation_km: f64,
}

/// Snap a fix to the nearest point on `path`, or `None` when the path is
/// degenerate or every segment is too far away.
pub fn snap_to_path(latitude: f64, longitude: f64, path: &[[f64; 2]]) -> Option<SnappedPoint> {
    if path.len() < 2 {
        return None;
    }

    let mut best: Option<SnappedPoint> = None;
    for segment in path.windows(2) {
        let projected = project_onto_segment([latitude, longitude], segment[0], segment[1]);
        let deviation = distance_km(latitude, longitude, projected[0], projected[1]);

        if best.is_none_or(|b| deviation < b.deviation_km) {
            best = Some(SnappedPoint {
                latitude: projected[0],
                longitude: projected[1],
                deviation_km: deviation,
            });
        }
    }

    best.filter(|b| b.deviation_km < SNAP_THRESHOLD_KM)
}
