// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! In-memory [`Store`] implementation backed by sharded concurrent maps.
//!
//! Used by the server binary and the test suite. An offline constructor
//! makes every operation fail, for exercising storage-failure paths.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use uuid::Uuid;

use crate::db::{HistoryQuery, Store};
use crate::error::AppError;
use crate::models::{
    Device, Geofence, GeofenceEvent, LocationSample, Route, RouteStatus, SharedLocation,
    ViewPermission,
};

/// Concurrent in-memory store.
#[derive(Default)]
pub struct MemoryStore {
    offline: bool,
    samples: DashMap<Uuid, Vec<LocationSample>>,
    geofences: DashMap<Uuid, Geofence>,
    geofence_events: DashMap<Uuid, Vec<GeofenceEvent>>,
    routes: DashMap<Uuid, Route>,
    devices: DashMap<(Uuid, String), Device>,
    shares: DashMap<String, SharedLocation>,
    permissions: DashMap<(Uuid, Uuid), ViewPermission>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store whose every operation fails.
    ///
    /// Mirrors losing the backing database at runtime; tests use it to check
    /// that ingestion aborts cleanly on storage errors.
    pub fn new_offline() -> Self {
        Self {
            offline: true,
            ..Self::default()
        }
    }

    fn guard(&self) -> Result<(), AppError> {
        if self.offline {
            return Err(AppError::Storage(
                "Store not connected (offline mode)".to_string(),
            ));
        }
        Ok(())
    }
}

#[async_trait]
impl Store for MemoryStore {
    // ─── Location Samples ────────────────────────────────────────

    async fn insert_sample(&self, sample: &LocationSample) -> Result<(), AppError> {
        self.guard()?;
        self.samples
            .entry(sample.user_id)
            .or_default()
            .push(sample.clone());
        Ok(())
    }

    async fn latest_sample(&self, user_id: Uuid) -> Result<Option<LocationSample>, AppError> {
        self.guard()?;
        Ok(self
            .samples
            .get(&user_id)
            .and_then(|samples| samples.last().cloned()))
    }

    async fn query_history(
        &self,
        user_id: Uuid,
        query: &HistoryQuery,
    ) -> Result<Vec<LocationSample>, AppError> {
        self.guard()?;
        let Some(samples) = self.samples.get(&user_id) else {
            return Ok(Vec::new());
        };

        // Newest first; samples are stored in arrival order
        Ok(samples
            .iter()
            .rev()
            .filter(|s| query.from.is_none_or(|from| s.created_at >= from))
            .filter(|s| query.to.is_none_or(|to| s.created_at <= to))
            .skip(query.offset)
            .take(query.limit)
            .cloned()
            .collect())
    }

    // ─── Geofences ───────────────────────────────────────────────

    async fn insert_geofence(&self, fence: &Geofence) -> Result<(), AppError> {
        self.guard()?;
        self.geofences.insert(fence.id, fence.clone());
        Ok(())
    }

    async fn get_geofence(&self, geofence_id: Uuid) -> Result<Option<Geofence>, AppError> {
        self.guard()?;
        Ok(self.geofences.get(&geofence_id).map(|f| f.clone()))
    }

    async fn list_geofences(&self, user_id: Uuid) -> Result<Vec<Geofence>, AppError> {
        self.guard()?;
        let mut fences: Vec<Geofence> = self
            .geofences
            .iter()
            .filter(|f| f.user_id == user_id)
            .map(|f| f.clone())
            .collect();
        fences.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(fences)
    }

    async fn list_active_geofences(&self, user_id: Uuid) -> Result<Vec<Geofence>, AppError> {
        let mut fences = self.list_geofences(user_id).await?;
        fences.retain(|f| f.status == crate::models::GeofenceStatus::Active);
        Ok(fences)
    }

    async fn update_geofence(&self, fence: &Geofence) -> Result<(), AppError> {
        self.guard()?;
        self.geofences.insert(fence.id, fence.clone());
        Ok(())
    }

    async fn delete_geofence(&self, geofence_id: Uuid) -> Result<bool, AppError> {
        self.guard()?;
        let removed = self.geofences.remove(&geofence_id).is_some();
        self.geofence_events.remove(&geofence_id);
        Ok(removed)
    }

    // ─── Geofence Events ─────────────────────────────────────────

    async fn insert_geofence_event(&self, event: &GeofenceEvent) -> Result<(), AppError> {
        self.guard()?;
        self.geofence_events
            .entry(event.geofence_id)
            .or_default()
            .push(event.clone());
        Ok(())
    }

    async fn update_geofence_event(&self, event: &GeofenceEvent) -> Result<(), AppError> {
        self.guard()?;
        let stored = self
            .geofence_events
            .get_mut(&event.geofence_id)
            .and_then(|mut events| {
                events
                    .iter_mut()
                    .find(|e| e.id == event.id)
                    .map(|e| *e = event.clone())
            });
        match stored {
            Some(()) => Ok(()),
            None => Err(AppError::Storage(format!(
                "Geofence event {} not found for update",
                event.id
            ))),
        }
    }

    async fn latest_geofence_event(
        &self,
        geofence_id: Uuid,
    ) -> Result<Option<GeofenceEvent>, AppError> {
        self.guard()?;
        Ok(self
            .geofence_events
            .get(&geofence_id)
            .and_then(|events| events.last().cloned()))
    }

    async fn list_geofence_events(
        &self,
        geofence_id: Uuid,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<GeofenceEvent>, AppError> {
        self.guard()?;
        let Some(events) = self.geofence_events.get(&geofence_id) else {
            return Ok(Vec::new());
        };
        Ok(events
            .iter()
            .rev()
            .skip(offset)
            .take(limit)
            .cloned()
            .collect())
    }

    // ─── Routes ──────────────────────────────────────────────────

    async fn insert_route(&self, route: &Route) -> Result<(), AppError> {
        self.guard()?;
        self.routes.insert(route.id, route.clone());
        Ok(())
    }

    async fn get_route(&self, route_id: Uuid) -> Result<Option<Route>, AppError> {
        self.guard()?;
        Ok(self.routes.get(&route_id).map(|r| r.clone()))
    }

    async fn list_routes(
        &self,
        user_id: Uuid,
        status: Option<RouteStatus>,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<Route>, AppError> {
        self.guard()?;
        let mut routes: Vec<Route> = self
            .routes
            .iter()
            .filter(|r| r.user_id == user_id)
            .filter(|r| status.is_none_or(|s| r.status == s))
            .map(|r| r.clone())
            .collect();
        routes.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(routes.into_iter().skip(offset).take(limit).collect())
    }

    async fn update_route(&self, route: &Route) -> Result<(), AppError> {
        self.guard()?;
        self.routes.insert(route.id, route.clone());
        Ok(())
    }

    async fn delete_route(&self, route_id: Uuid) -> Result<bool, AppError> {
        self.guard()?;
        Ok(self.routes.remove(&route_id).is_some())
    }

    async fn active_route(&self, user_id: Uuid) -> Result<Option<Route>, AppError> {
        self.guard()?;
        Ok(self
            .routes
            .iter()
            .find(|r| r.user_id == user_id && r.is_active())
            .map(|r| r.clone()))
    }

    // ─── Devices ─────────────────────────────────────────────────

    async fn touch_device(
        &self,
        user_id: Uuid,
        device_id: &str,
        battery_level: Option<u8>,
        now: DateTime<Utc>,
    ) -> Result<(), AppError> {
        self.guard()?;
        self.devices
            .entry((user_id, device_id.to_string()))
            .and_modify(|device| {
                device.last_ping = Some(now);
                if battery_level.is_some() {
                    device.battery_level = battery_level;
                }
            })
            .or_insert_with(|| Device {
                user_id,
                device_id: device_id.to_string(),
                battery_level,
                is_active: true,
                last_ping: Some(now),
                created_at: now,
            });
        Ok(())
    }

    async fn get_device(
        &self,
        user_id: Uuid,
        device_id: &str,
    ) -> Result<Option<Device>, AppError> {
        self.guard()?;
        Ok(self
            .devices
            .get(&(user_id, device_id.to_string()))
            .map(|d| d.clone()))
    }

    // ─── Shares & Permissions ────────────────────────────────────

    async fn insert_share(&self, share: &SharedLocation) -> Result<(), AppError> {
        self.guard()?;
        self.shares
            .insert(share.share_token.clone(), share.clone());
        Ok(())
    }

    async fn get_share_by_token(
        &self,
        token: &str,
    ) -> Result<Option<SharedLocation>, AppError> {
        self.guard()?;
        Ok(self.shares.get(token).map(|s| s.clone()))
    }

    async fn list_active_shares(&self, user_id: Uuid) -> Result<Vec<SharedLocation>, AppError> {
        self.guard()?;
        let mut shares: Vec<SharedLocation> = self
            .shares
            .iter()
            .filter(|s| s.user_id == user_id && s.is_active)
            .map(|s| s.clone())
            .collect();
        shares.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(shares)
    }

    async fn revoke_share(&self, user_id: Uuid, token: &str) -> Result<bool, AppError> {
        self.guard()?;
        match self.shares.get_mut(token) {
            Some(mut share) if share.user_id == user_id => {
                share.is_active = false;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn grant_view_permission(&self, permission: &ViewPermission) -> Result<(), AppError> {
        self.guard()?;
        self.permissions.insert(
            (permission.user_id, permission.target_user_id),
            permission.clone(),
        );
        Ok(())
    }

    async fn get_view_permission(
        &self,
        user_id: Uuid,
        target_user_id: Uuid,
    ) -> Result<Option<ViewPermission>, AppError> {
        self.guard()?;
        Ok(self
            .permissions
            .get(&(user_id, target_user_id))
            .map(|p| p.clone()))
    }
}
