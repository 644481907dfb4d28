// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Route planning and lifecycle endpoints.

use crate::error::{AppError, Result};
use crate::geo::{decode_polyline, encode_polyline};
use crate::middleware::auth::AuthUser;
use crate::models::{Route, RouteStatus, TransportMode};
use crate::AppState;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, patch, post},
    Extension, Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

const MAX_ROUTES_LIMIT: usize = 200;

/// Route routes (require authentication via JWT).
/// The auth middleware is applied in routes/mod.rs for these routes.
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/routes", post(create_route).get(list_routes))
        .route("/api/routes/{id}", get(get_route).delete(delete_route))
        .route("/api/routes/{id}/start", post(start_route))
        .route("/api/routes/{id}/complete", post(complete_route))
        .route("/api/routes/{id}/favorite", patch(set_favorite))
}

// ─── Responses ───────────────────────────────────────────────

/// Route plus its path re-encoded as a polyline for map rendering.
#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct RouteResponse {
    #[serde(flatten)]
    pub route: Route,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub polyline: Option<String>,
}

impl RouteResponse {
    fn new(route: Route) -> Self {
        // Encoding only fails on non-finite coordinates, which validation
        // rejects at creation
        let polyline = if route.path.is_empty() {
            None
        } else {
            encode_polyline(&route.path).ok()
        };
        Self { route, polyline }
    }
}

// ─── Create / List ───────────────────────────────────────────

#[derive(Deserialize)]
struct CreateRouteRequest {
    /// `[lat, lon]`
    start_location: [f64; 2],
    /// `[lat, lon]`
    end_location: [f64; 2],
    #[serde(default)]
    start_address: Option<String>,
    #[serde(default)]
    end_address: Option<String>,
    #[serde(default)]
    transport_mode: TransportMode,
    /// Explicit `[lat, lon]` waypoints
    #[serde(default)]
    path: Option<Vec<[f64; 2]>>,
    /// Encoded polyline, used when `path` is absent
    #[serde(default)]
    polyline: Option<String>,
    #[serde(default)]
    distance_meters: Option<f64>,
    #[serde(default)]
    duration_seconds: Option<f64>,
}

fn validate_coordinate(point: &[f64; 2], name: &str) -> Result<()> {
    if !(-90.0..=90.0).contains(&point[0]) || !(-180.0..=180.0).contains(&point[1]) {
        return Err(AppError::Validation(format!("{name} out of range")));
    }
    Ok(())
}

/// Create a route. The path is taken from explicit waypoints or decoded
/// from an encoded polyline; new routes start pending.
async fn create_route(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Json(req): Json<CreateRouteRequest>,
) -> Result<(StatusCode, Json<RouteResponse>)> {
    validate_coordinate(&req.start_location, "start_location")?;
    validate_coordinate(&req.end_location, "end_location")?;

    let path = match (req.path, req.polyline) {
        (Some(path), _) => path,
        (None, Some(encoded)) => decode_polyline(&encoded)
            .map_err(|e| AppError::Validation(format!("Invalid polyline: {e}")))?,
        (None, None) => Vec::new(),
    };

    let now = chrono::Utc::now();
    let route = Route {
        id: Uuid::new_v4(),
        user_id: user.user_id,
        start_location: req.start_location,
        end_location: req.end_location,
        start_address: req.start_address,
        end_address: req.end_address,
        distance_meters: req.distance_meters,
        duration_seconds: req.duration_seconds,
        transport_mode: req.transport_mode,
        path,
        status: RouteStatus::Pending,
        is_favorite: false,
        created_at: now,
        started_at: None,
        completed_at: None,
        updated_at: now,
    };
    state.store.insert_route(&route).await?;

    tracing::info!(
        user_id = %user.user_id,
        route_id = %route.id,
        transport_mode = ?route.transport_mode,
        waypoints = route.path.len(),
        "Route created"
    );
    Ok((StatusCode::CREATED, Json(RouteResponse::new(route))))
}

#[derive(Deserialize)]
struct RoutesParams {
    #[serde(default)]
    status: Option<RouteStatus>,
    #[serde(default = "default_routes_limit")]
    limit: usize,
    #[serde(default)]
    offset: usize,
}

fn default_routes_limit() -> usize {
    50
}

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct RoutesResponse {
    pub routes: Vec<RouteResponse>,
    pub limit: usize,
    pub offset: usize,
    pub count: usize,
}

/// List the user's routes, newest first, optionally filtered by status.
async fn list_routes(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Query(params): Query<RoutesParams>,
) -> Result<Json<RoutesResponse>> {
    let limit = params.limit.min(MAX_ROUTES_LIMIT);
    let routes = state
        .store
        .list_routes(user.user_id, params.status, limit, params.offset)
        .await?;

    let routes: Vec<RouteResponse> = routes.into_iter().map(RouteResponse::new).collect();
    let count = routes.len();

    Ok(Json(RoutesResponse {
        routes,
        limit,
        offset: params.offset,
        count,
    }))
}

// ─── Read / Lifecycle / Delete ───────────────────────────────

async fn owned_route(state: &AppState, user_id: Uuid, route_id: Uuid) -> Result<Route> {
    state
        .store
        .get_route(route_id)
        .await?
        .filter(|route| route.user_id == user_id)
        .ok_or_else(|| AppError::NotFound(format!("Route {route_id}")))
}

async fn get_route(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(route_id): Path<Uuid>,
) -> Result<Json<RouteResponse>> {
    let route = owned_route(&state, user.user_id, route_id).await?;
    Ok(Json(RouteResponse::new(route)))
}

/// Activate a route and make it the snapping target.
async fn start_route(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(route_id): Path<Uuid>,
) -> Result<Json<RouteResponse>> {
    let route = state.tracking.start_route(user.user_id, route_id).await?;
    Ok(Json(RouteResponse::new(route)))
}

async fn complete_route(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(route_id): Path<Uuid>,
) -> Result<Json<RouteResponse>> {
    let route = state.tracking.complete_route(user.user_id, route_id).await?;
    Ok(Json(RouteResponse::new(route)))
}

#[derive(Deserialize)]
struct SetFavoriteRequest {
    is_favorite: bool,
}

async fn set_favorite(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(route_id): Path<Uuid>,
    Json(req): Json<SetFavoriteRequest>,
) -> Result<Json<RouteResponse>> {
    let mut route = owned_route(&state, user.user_id, route_id).await?;
    route.is_favorite = req.is_favorite;
    route.updated_at = chrono::Utc::now();
    state.store.update_route(&route).await?;

    Ok(Json(RouteResponse::new(route)))
}

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct DeleteRouteResponse {
    pub success: bool,
    pub message: String,
}

async fn delete_route(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(route_id): Path<Uuid>,
) -> Result<Json<DeleteRouteResponse>> {
    owned_route(&state, user.user_id, route_id).await?;
    state.store.delete_route(route_id).await?;

    tracing::info!(user_id = %user.user_id, %route_id, "Route deleted");
    Ok(Json(DeleteRouteResponse {
        success: true,
        message: "Route deleted".to_string(),
    }))
}
