// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Planned route model and its lifecycle states.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
#[serde(rename_all = "lowercase")]
pub enum RouteStatus {
    #[default]
    Pending,
    Active,
    Completed,
    Cancelled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
#[serde(rename_all = "lowercase")]
pub enum TransportMode {
    #[default]
    Driving,
    Walking,
    Cycling,
    Transit,
    Motorcycle,
}

/// Stored route record.
///
/// Lifecycle: pending -> active -> completed, with cancelled reachable from
/// pending or active. At most one route per user is active at a time; the
/// active one is the snapping target for incoming location fixes.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct Route {
    pub id: Uuid,
    pub user_id: Uuid,
    /// `[lat, lon]`
    pub start_location: [f64; 2],
    /// `[lat, lon]`
    pub end_location: [f64; 2],
    pub start_address: Option<String>,
    pub end_address: Option<String>,
    pub distance_meters: Option<f64>,
    pub duration_seconds: Option<f64>,
    pub transport_mode: TransportMode,
    /// Ordered `[lat, lon]` waypoints; needs at least 2 points to snap against
    pub path: Vec<[f64; 2]>,
    pub status: RouteStatus,
    pub is_favorite: bool,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
}

impl Route {
    pub fn is_active(&self) -> bool {
        self.status == RouteStatus::Active
    }
}
