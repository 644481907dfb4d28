// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! WebSocket wire protocol.
//!
//! Client frames are JSON objects tagged by `action`, with an optional
//! `request_id` echoed back in the acknowledgment. Server frames are tagged
//! by `event`. Broadcast payloads flatten the domain record and append a
//! server-side `timestamp`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{GeofenceEvent, LocationSample, LocationUpdate, Route};

/// One inbound client frame.
#[derive(Debug, Deserialize)]
pub struct Envelope {
    #[serde(default)]
    pub request_id: Option<String>,
    #[serde(flatten)]
    pub request: ClientRequest,
}

/// Client-initiated operations.
#[derive(Debug, Deserialize)]
#[serde(tag = "action")]
pub enum ClientRequest {
    /// Push a location fix over the socket instead of HTTP.
    #[serde(rename = "location:update")]
    LocationUpdate(LocationUpdate),

    /// Join the caller's own tracking topic.
    #[serde(rename = "tracking:start")]
    TrackingStart,

    /// Leave the caller's own tracking topic.
    #[serde(rename = "tracking:stop")]
    TrackingStop,

    /// Follow another user's live location, via a share token or a
    /// standing view permission.
    #[serde(rename = "location:watch")]
    LocationWatch {
        #[serde(default)]
        target_user_id: Option<Uuid>,
        #[serde(default)]
        share_token: Option<String>,
    },

    #[serde(rename = "route:subscribe")]
    RouteSubscribe { route_id: Uuid },

    #[serde(rename = "geofence:subscribe")]
    GeofenceSubscribe { geofence_id: Uuid },
}

/// Per-request acknowledgment.
#[derive(Debug, Clone, Serialize)]
pub struct Ack {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

impl Ack {
    pub fn ok(request_id: Option<String>, message: impl Into<String>) -> Self {
        Self {
            success: true,
            request_id,
            message: Some(message.into()),
            error: None,
            data: None,
        }
    }

    pub fn ok_with_data(request_id: Option<String>, data: serde_json::Value) -> Self {
        Self {
            success: true,
            request_id,
            message: None,
            error: None,
            data: Some(data),
        }
    }

    pub fn failure(request_id: Option<String>, error: impl Into<String>) -> Self {
        Self {
            success: false,
            request_id,
            message: None,
            error: Some(error.into()),
            data: None,
        }
    }
}

/// Outbound server frames.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event")]
pub enum ServerEvent {
    /// Welcome frame sent right after registration.
    #[serde(rename = "connected")]
    Connected { user_id: Uuid, message: String },

    #[serde(rename = "ack")]
    Ack(Ack),

    #[serde(rename = "location:updated")]
    LocationUpdated(LocationBroadcast),

    #[serde(rename = "geofence:event")]
    GeofenceTriggered(GeofenceBroadcast),

    #[serde(rename = "route:updated")]
    RouteChanged(RouteBroadcast),
}

#[derive(Debug, Clone, Serialize)]
pub struct LocationBroadcast {
    pub location: LocationSample,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct GeofenceBroadcast {
    #[serde(flatten)]
    pub event: GeofenceEvent,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RouteBroadcast {
    #[serde(flatten)]
    pub route: Route,
    pub timestamp: DateTime<Utc>,
}
