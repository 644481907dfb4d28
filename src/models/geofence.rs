// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Geofence definitions, containment checks, and enter/exit event records.

use chrono::{DateTime, Utc};
use geo::{Contains, Point, Polygon};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

use crate::geo::distance_km;

/// Fence shape, tagged by `type` on the wire.
///
/// `Circle` centers are `[lat, lon]` with a radius in meters. `Polygon`
/// carries GeoJSON-style rings (lon/lat positions, first ring exterior), so
/// map-drawing clients can submit their geometry unchanged. Anything else
/// deserializes to `Unknown`, which no point is ever inside.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
#[serde(tag = "type")]
pub enum FenceGeometry {
    Circle { center: [f64; 2], radius_m: f64 },
    Polygon { coordinates: Vec<Vec<[f64; 2]>> },
    #[serde(other)]
    Unknown,
}

impl FenceGeometry {
    /// Whether the given coordinate is inside the fence.
    ///
    /// Circle membership is inclusive of the boundary; polygon membership
    /// follows `geo::Contains`, which excludes it.
    pub fn contains(&self, latitude: f64, longitude: f64) -> bool {
        match self {
            FenceGeometry::Circle { center, radius_m } => {
                let distance = distance_km(latitude, longitude, center[0], center[1]);
                distance <= radius_m / 1000.0
            }
            FenceGeometry::Polygon { coordinates } => match Self::to_polygon(coordinates) {
                Some(polygon) => polygon.contains(&Point::new(longitude, latitude)),
                None => false,
            },
            FenceGeometry::Unknown => false,
        }
    }

    /// Convert GeoJSON-style rings to a `geo` polygon.
    fn to_polygon(coordinates: &[Vec<[f64; 2]>]) -> Option<Polygon<f64>> {
        use std::convert::TryInto;

        let rings = coordinates
            .iter()
            .map(|ring| ring.iter().map(|p| vec![p[0], p[1]]).collect())
            .collect();

        let value = geojson::Value::Polygon(rings);
        let result: Result<Polygon<f64>, _> = value.try_into();
        result.ok()
    }

    /// Reject geometries that could never match anything.
    pub fn validate(&self) -> Result<(), String> {
        match self {
            FenceGeometry::Circle { center, radius_m } => {
                if !(-90.0..=90.0).contains(&center[0]) || !(-180.0..=180.0).contains(&center[1]) {
                    return Err("circle center out of range".to_string());
                }
                if !radius_m.is_finite() || *radius_m <= 0.0 {
                    return Err("circle radius must be positive".to_string());
                }
                Ok(())
            }
            FenceGeometry::Polygon { coordinates } => {
                // GeoJSON rings are closed, so 4 positions is the minimum
                let exterior_len = coordinates.first().map(|ring| ring.len()).unwrap_or(0);
                if exterior_len < 4 {
                    return Err("polygon exterior ring needs at least 4 positions".to_string());
                }
                if Self::to_polygon(coordinates).is_none() {
                    return Err("polygon rings are not valid GeoJSON".to_string());
                }
                Ok(())
            }
            FenceGeometry::Unknown => Err("unrecognized geometry type".to_string()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
#[serde(rename_all = "lowercase")]
pub enum GeofenceStatus {
    #[default]
    Active,
    Inactive,
    Triggered,
}

/// Stored geofence record.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct Geofence {
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub geometry: FenceGeometry,
    pub status: GeofenceStatus,
    /// Gates webhook delivery together with `webhook_url`
    pub notification_enabled: bool,
    pub webhook_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
#[serde(rename_all = "lowercase")]
pub enum GeofenceEventType {
    Enter,
    Exit,
    /// Represented in storage but never emitted by the evaluator
    Dwell,
}

/// Enter/exit record for one geofence.
///
/// An enter event stays open (`exited_at` unset) until the matching exit
/// closes the same row, flipping `event_type` to `Exit` and recording the
/// dwell duration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct GeofenceEvent {
    pub id: Uuid,
    pub geofence_id: Uuid,
    pub user_id: Uuid,
    pub event_type: GeofenceEventType,
    pub latitude: f64,
    pub longitude: f64,
    pub entered_at: Option<DateTime<Utc>>,
    pub exited_at: Option<DateTime<Utc>>,
    /// Fractional minutes between enter and exit
    pub duration_minutes: Option<f64>,
    pub created_at: DateTime<Utc>,
}

impl GeofenceEvent {
    /// An open enter event means the user is currently inside the fence.
    pub fn is_open(&self) -> bool {
        self.event_type == GeofenceEventType::Enter && self.exited_at.is_none()
    }
}
