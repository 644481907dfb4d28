// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Location sample model and the inbound update payload.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// Stored location fix. Immutable once written; history is append-only.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct LocationSample {
    pub id: Uuid,
    pub user_id: Uuid,
    /// Reporting device identifier ("unknown" when the client omits it)
    pub device_id: String,
    pub latitude: f64,
    pub longitude: f64,
    /// Horizontal accuracy in meters
    pub accuracy: Option<f64>,
    /// Altitude in meters
    pub altitude: Option<f64>,
    /// Heading in degrees from true north
    pub heading: Option<f64>,
    /// Speed in m/s (normalized from the km/h wire value at ingestion)
    pub speed: Option<f64>,
    /// Reverse-geocoded address, if the client supplied one
    pub address: Option<String>,
    /// Battery percentage 0-100
    pub battery_level: Option<u8>,
    /// Network type the device reported (wifi, cellular, ...)
    pub connectivity: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Client battery-optimization mode, stretches the reporting cadence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BatteryOptimization {
    #[default]
    None,
    Low,
    Medium,
    High,
}

/// Inbound location update, shared by the HTTP and WebSocket ingest paths.
///
/// `latitude`/`longitude` are optional here so their absence surfaces as a
/// validation error instead of a deserialization failure; `speed` arrives in
/// km/h and is converted at ingestion.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct LocationUpdate {
    pub device_id: Option<String>,
    #[validate(range(min = -90.0, max = 90.0, message = "latitude out of range"))]
    pub latitude: Option<f64>,
    #[validate(range(min = -180.0, max = 180.0, message = "longitude out of range"))]
    pub longitude: Option<f64>,
    #[validate(range(min = 0.0, message = "accuracy must be non-negative"))]
    pub accuracy: Option<f64>,
    pub altitude: Option<f64>,
    #[validate(range(min = 0.0, max = 360.0, message = "heading out of range"))]
    pub heading: Option<f64>,
    /// Speed in km/h as reported by the device
    #[validate(range(min = 0.0, message = "speed must be non-negative"))]
    pub speed: Option<f64>,
    pub address: Option<String>,
    #[validate(range(min = 0, max = 100, message = "battery_level out of range"))]
    pub battery_level: Option<u8>,
    pub connectivity: Option<String>,
    pub battery_optimization: Option<BatteryOptimization>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_update_accepts_minimal_payload() {
        let update: LocationUpdate =
            serde_json::from_str(r#"{"latitude": 37.7749, "longitude": -122.4194}"#).unwrap();
        assert_eq!(update.latitude, Some(37.7749));
        assert!(update.device_id.is_none());
        assert!(update.validate().is_ok());
    }

    #[test]
    fn test_update_rejects_out_of_range_latitude() {
        let update = LocationUpdate {
            latitude: Some(91.0),
            longitude: Some(0.0),
            ..Default::default()
        };
        assert!(update.validate().is_err());
    }

    #[test]
    fn test_battery_optimization_parses_lowercase() {
        let update: LocationUpdate = serde_json::from_str(
            r#"{"latitude": 0.0, "longitude": 0.0, "battery_optimization": "high"}"#,
        )
        .unwrap();
        assert_eq!(
            update.battery_optimization,
            Some(BatteryOptimization::High)
        );
    }
}
