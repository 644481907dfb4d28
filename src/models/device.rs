// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Device liveness record, refreshed on every location ingestion.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One reporting device per (user, device_id) pair.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Device {
    pub user_id: Uuid,
    pub device_id: String,
    pub battery_level: Option<u8>,
    pub is_active: bool,
    /// Last time a location sample arrived from this device
    pub last_ping: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}
