// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Services module - business logic layer.

pub mod geofence;
pub mod sampling;
pub mod snap;
pub mod tracking;
pub mod webhook;

pub use geofence::GeofenceEvaluator;
pub use snap::{snap_to_path, SnappedPoint};
pub use tracking::{IngestOutcome, TrackingService};
pub use webhook::{WebhookNotifier, WebhookPayload};
