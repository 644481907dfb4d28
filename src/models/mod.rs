// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Data models for the application.

pub mod device;
pub mod geofence;
pub mod location;
pub mod route;
pub mod share;

pub use device::Device;
pub use geofence::{FenceGeometry, Geofence, GeofenceEvent, GeofenceEventType, GeofenceStatus};
pub use location::{BatteryOptimization, LocationSample, LocationUpdate};
pub use route::{Route, RouteStatus, TransportMode};
pub use share::{ShareType, SharedLocation, ViewPermission};
