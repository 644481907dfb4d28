// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Geofence CRUD and event-history routes.

use crate::error::{AppError, Result};
use crate::middleware::auth::AuthUser;
use crate::models::{FenceGeometry, Geofence, GeofenceEvent, GeofenceStatus};
use crate::AppState;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Extension, Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

const MAX_EVENTS_LIMIT: usize = 500;

/// Geofence routes (require authentication via JWT).
/// The auth middleware is applied in routes/mod.rs for these routes.
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/geofences", post(create_geofence).get(list_geofences))
        .route(
            "/api/geofences/{id}",
            get(get_geofence).patch(update_geofence).delete(delete_geofence),
        )
        .route("/api/geofences/{id}/events", get(list_geofence_events))
}

/// Load a geofence the caller owns, or answer 404.
///
/// Fences owned by someone else read as missing so ids cannot be probed.
async fn owned_geofence(state: &AppState, user_id: Uuid, geofence_id: Uuid) -> Result<Geofence> {
    state
        .store
        .get_geofence(geofence_id)
        .await?
        .filter(|fence| fence.user_id == user_id)
        .ok_or_else(|| AppError::NotFound(format!("Geofence {geofence_id}")))
}

fn validate_webhook_url(url: &str) -> Result<()> {
    if url.starts_with("http://") || url.starts_with("https://") {
        Ok(())
    } else {
        Err(AppError::Validation(
            "webhook_url must be an http or https URL".to_string(),
        ))
    }
}

// ─── Create / List ───────────────────────────────────────────

#[derive(Deserialize)]
struct CreateGeofenceRequest {
    name: String,
    #[serde(default)]
    description: Option<String>,
    geometry: FenceGeometry,
    #[serde(default = "default_notification_enabled")]
    notification_enabled: bool,
    #[serde(default)]
    webhook_url: Option<String>,
}

fn default_notification_enabled() -> bool {
    true
}

/// Create a geofence. New fences start active.
async fn create_geofence(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Json(req): Json<CreateGeofenceRequest>,
) -> Result<(StatusCode, Json<Geofence>)> {
    if req.name.trim().is_empty() {
        return Err(AppError::Validation("name is required".to_string()));
    }
    req.geometry.validate().map_err(AppError::Validation)?;
    if let Some(url) = &req.webhook_url {
        validate_webhook_url(url)?;
    }

    let now = chrono::Utc::now();
    let fence = Geofence {
        id: Uuid::new_v4(),
        user_id: user.user_id,
        name: req.name,
        description: req.description,
        geometry: req.geometry,
        status: GeofenceStatus::Active,
        notification_enabled: req.notification_enabled,
        webhook_url: req.webhook_url,
        created_at: now,
        updated_at: now,
    };
    state.store.insert_geofence(&fence).await?;

    tracing::info!(user_id = %user.user_id, geofence_id = %fence.id, name = %fence.name, "Geofence created");
    Ok((StatusCode::CREATED, Json(fence)))
}

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct GeofencesResponse {
    pub geofences: Vec<Geofence>,
}

/// List the user's geofences, newest first.
async fn list_geofences(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<GeofencesResponse>> {
    let geofences = state.store.list_geofences(user.user_id).await?;
    Ok(Json(GeofencesResponse { geofences }))
}

// ─── Read / Update / Delete ──────────────────────────────────

async fn get_geofence(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(geofence_id): Path<Uuid>,
) -> Result<Json<Geofence>> {
    let fence = owned_geofence(&state, user.user_id, geofence_id).await?;
    Ok(Json(fence))
}

/// Partial update. Geometry is immutable after creation; drop and recreate
/// the fence to change its shape.
#[derive(Deserialize, Default)]
struct UpdateGeofenceRequest {
    name: Option<String>,
    description: Option<String>,
    notification_enabled: Option<bool>,
    webhook_url: Option<String>,
    status: Option<GeofenceStatus>,
}

async fn update_geofence(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(geofence_id): Path<Uuid>,
    Json(req): Json<UpdateGeofenceRequest>,
) -> Result<Json<Geofence>> {
    let mut fence = owned_geofence(&state, user.user_id, geofence_id).await?;

    if let Some(name) = req.name {
        if name.trim().is_empty() {
            return Err(AppError::Validation("name cannot be empty".to_string()));
        }
        fence.name = name;
    }
    if let Some(description) = req.description {
        fence.description = Some(description);
    }
    if let Some(enabled) = req.notification_enabled {
        fence.notification_enabled = enabled;
    }
    if let Some(url) = req.webhook_url {
        validate_webhook_url(&url)?;
        fence.webhook_url = Some(url);
    }
    if let Some(status) = req.status {
        fence.status = status;
    }
    fence.updated_at = chrono::Utc::now();

    state.store.update_geofence(&fence).await?;
    Ok(Json(fence))
}

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct DeleteGeofenceResponse {
    pub success: bool,
    pub message: String,
}

async fn delete_geofence(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(geofence_id): Path<Uuid>,
) -> Result<Json<DeleteGeofenceResponse>> {
    owned_geofence(&state, user.user_id, geofence_id).await?;
    state.store.delete_geofence(geofence_id).await?;

    tracing::info!(user_id = %user.user_id, %geofence_id, "Geofence deleted");
    Ok(Json(DeleteGeofenceResponse {
        success: true,
        message: "Geofence deleted".to_string(),
    }))
}

// ─── Event History ───────────────────────────────────────────

#[derive(Deserialize)]
struct EventsParams {
    #[serde(default = "default_events_limit")]
    limit: usize,
    #[serde(default)]
    offset: usize,
}

fn default_events_limit() -> usize {
    100
}

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct GeofenceEventsResponse {
    pub events: Vec<GeofenceEvent>,
    pub limit: usize,
    pub offset: usize,
}

/// Enter/exit events for one fence, newest first.
async fn list_geofence_events(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(geofence_id): Path<Uuid>,
    Query(params): Query<EventsParams>,
) -> Result<Json<GeofenceEventsResponse>> {
    owned_geofence(&state, user.user_id, geofence_id).await?;

    let limit = params.limit.min(MAX_EVENTS_LIMIT);
    let events = state
        .store
        .list_geofence_events(geofence_id, limit, params.offset)
        .await?;

    Ok(Json(GeofenceEventsResponse {
        events,
        limit,
        offset: params.offset,
    }))
}
