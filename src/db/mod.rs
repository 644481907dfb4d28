//! Storage layer.
//!
//! Everything above this module talks to the [`Store`] trait; the concrete
//! backend is chosen at startup. [`MemoryStore`] is the in-process
//! implementation used by the server binary and the test suite.

pub mod memory;

pub use memory::MemoryStore;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::AppError;
use crate::models::{
    Device, Geofence, GeofenceEvent, LocationSample, Route, RouteStatus, SharedLocation,
    ViewPermission,
};

/// Filters for a location history query. Ordering is newest first.
#[derive(Debug, Clone, Default)]
pub struct HistoryQuery {
    pub limit: usize,
    pub offset: usize,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
}

/// Persistence operations for the tracking pipeline.
///
/// Methods return `AppError` directly so callers can bubble storage failures
/// with `?`. Reads of single records return `Ok(None)` for absent rows;
/// deletes and revocations report whether a row was touched.
#[async_trait]
pub trait Store: Send + Sync {
    // ─── Location Samples ────────────────────────────────────────

    async fn insert_sample(&self, sample: &LocationSample) -> Result<(), AppError>;
    async fn latest_sample(&self, user_id: Uuid) -> Result<Option<LocationSample>, AppError>;
    async fn query_history(
        &self,
        user_id: Uuid,
        query: &HistoryQuery,
    ) -> Result<Vec<LocationSample>, AppError>;

    // ─── Geofences ───────────────────────────────────────────────

    async fn insert_geofence(&self, fence: &Geofence) -> Result<(), AppError>;
    async fn get_geofence(&self, geofence_id: Uuid) -> Result<Option<Geofence>, AppError>;
    async fn list_geofences(&self, user_id: Uuid) -> Result<Vec<Geofence>, AppError>;
    async fn list_active_geofences(&self, user_id: Uuid) -> Result<Vec<Geofence>, AppError>;
    async fn update_geofence(&self, fence: &Geofence) -> Result<(), AppError>;
    async fn delete_geofence(&self, geofence_id: Uuid) -> Result<bool, AppError>;

    // ─── Geofence Events ─────────────────────────────────────────

    async fn insert_geofence_event(&self, event: &GeofenceEvent) -> Result<(), AppError>;
    /// Replace the stored event with the same id (used to close open enters).
    async fn update_geofence_event(&self, event: &GeofenceEvent) -> Result<(), AppError>;
    async fn latest_geofence_event(
        &self,
        geofence_id: Uuid,
    ) -> Result<Option<GeofenceEvent>, AppError>;
    async fn list_geofence_events(
        &self,
        geofence_id: Uuid,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<GeofenceEvent>, AppError>;

    // ─── Routes ──────────────────────────────────────────────────

    async fn insert_route(&self, route: &Route) -> Result<(), AppError>;
    async fn get_route(&self, route_id: Uuid) -> Result<Option<Route>, AppError>;
    async fn list_routes(
        &self,
        user_id: Uuid,
        status: Option<RouteStatus>,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<Route>, AppError>;
    async fn update_route(&self, route: &Route) -> Result<(), AppError>;
    async fn delete_route(&self, route_id: Uuid) -> Result<bool, AppError>;
    /// The user's single active route, if any.
    async fn active_route(&self, user_id: Uuid) -> Result<Option<Route>, AppError>;

    // ─── Devices ─────────────────────────────────────────────────

    /// Upsert the device row and refresh its `last_ping`.
    async fn touch_device(
        &self,
        user_id: Uuid,
        device_id: &str,
        battery_level: Option<u8>,
        now: DateTime<Utc>,
    ) -> Result<(), AppError>;
    async fn get_device(&self, user_id: Uuid, device_id: &str)
        -> Result<Option<Device>, AppError>;

    // ─── Shares & Permissions ────────────────────────────────────

    async fn insert_share(&self, share: &SharedLocation) -> Result<(), AppError>;
    async fn get_share_by_token(&self, token: &str)
        -> Result<Option<SharedLocation>, AppError>;
    async fn list_active_shares(&self, user_id: Uuid) -> Result<Vec<SharedLocation>, AppError>;
    async fn revoke_share(&self, user_id: Uuid, token: &str) -> Result<bool, AppError>;

    async fn grant_view_permission(&self, permission: &ViewPermission) -> Result<(), AppError>;
    async fn get_view_permission(
        &self,
        user_id: Uuid,
        target_user_id: Uuid,
    ) -> Result<Option<ViewPermission>, AppError>;
}
