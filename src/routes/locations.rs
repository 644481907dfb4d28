// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Location ingestion, history, and share-link routes.

use crate::error::{AppError, Result};
use crate::middleware::auth::AuthUser;
use crate::models::{LocationSample, LocationUpdate, ShareType, SharedLocation};
use crate::services::SnappedPoint;
use crate::AppState;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{delete, get, post},
    Extension, Json, Router,
};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use chrono::{DateTime, Utc};
use ring::rand::{SecureRandom, SystemRandom};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

const MAX_HISTORY_LIMIT: usize = 500;
const SHARE_TOKEN_BYTES: usize = 16;

/// Location routes (require authentication via JWT).
/// The auth middleware is applied in routes/mod.rs for these routes.
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/locations/update", post(update_location))
        .route("/api/locations/recent", get(get_recent_location))
        .route("/api/locations/history", get(get_location_history))
        .route("/api/locations/share", post(create_share))
        .route("/api/locations/shares", get(list_shares))
        .route("/api/locations/shares/{token}", delete(revoke_share))
}

/// Share-token lookup is public; the token itself is the credential.
pub fn public_routes() -> Router<Arc<AppState>> {
    Router::new().route("/api/locations/shared/{token}", get(get_shared_location))
}

// ─── Ingestion ───────────────────────────────────────────────

/// Response for a processed location update.
#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct LocationUpdateResponse {
    pub location: LocationSample,
    /// Seconds the client should wait before the next report
    pub next_update_interval_seconds: u32,
    /// Present when the fix was close enough to the active route's path
    #[serde(skip_serializing_if = "Option::is_none")]
    pub snapped: Option<SnappedPoint>,
}

/// Ingest one location fix from the authenticated user's device.
async fn update_location(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Json(update): Json<LocationUpdate>,
) -> Result<(StatusCode, Json<LocationUpdateResponse>)> {
    let outcome = state.tracking.ingest(user.user_id, update).await?;

    Ok((
        StatusCode::CREATED,
        Json(LocationUpdateResponse {
            location: outcome.sample,
            next_update_interval_seconds: outcome.next_interval_secs,
            snapped: outcome.snapped,
        }),
    ))
}

/// Most recent fix for the authenticated user.
async fn get_recent_location(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<LocationSample>> {
    let sample = state
        .store
        .latest_sample(user.user_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Location for user {}", user.user_id)))?;

    Ok(Json(sample))
}

// ─── History ─────────────────────────────────────────────────

#[derive(Deserialize)]
struct HistoryParams {
    /// Items per page, capped at 500
    #[serde(default = "default_history_limit")]
    limit: usize,
    #[serde(default)]
    offset: usize,
    /// Inclusive lower bound (RFC3339)
    from: Option<String>,
    /// Inclusive upper bound (RFC3339)
    to: Option<String>,
}

fn default_history_limit() -> usize {
    100
}

fn parse_rfc3339(raw: Option<&str>, param: &str) -> Result<Option<DateTime<Utc>>> {
    raw.map(|value| {
        DateTime::parse_from_rfc3339(value)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|_| {
                AppError::Validation(format!(
                    "Invalid '{param}' parameter: must be RFC3339 datetime"
                ))
            })
    })
    .transpose()
}

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct HistoryResponse {
    pub locations: Vec<LocationSample>,
    pub limit: usize,
    pub offset: usize,
    /// Number of items in this page
    pub total: usize,
}

/// Get the user's location history, newest first.
async fn get_location_history(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Query(params): Query<HistoryParams>,
) -> Result<Json<HistoryResponse>> {
    let limit = params.limit.min(MAX_HISTORY_LIMIT);
    let query = crate::db::HistoryQuery {
        limit,
        offset: params.offset,
        from: parse_rfc3339(params.from.as_deref(), "from")?,
        to: parse_rfc3339(params.to.as_deref(), "to")?,
    };

    tracing::debug!(
        user_id = %user.user_id,
        limit,
        offset = params.offset,
        "Fetching location history"
    );

    let locations = state.store.query_history(user.user_id, &query).await?;
    let total = locations.len();

    Ok(Json(HistoryResponse {
        locations,
        limit,
        offset: params.offset,
        total,
    }))
}

// ─── Share Links ─────────────────────────────────────────────

#[derive(Deserialize, Default)]
struct CreateShareRequest {
    #[serde(default)]
    share_type: Option<ShareType>,
    /// Omitted means the link never expires
    #[serde(default)]
    expires_in_hours: Option<i64>,
    #[serde(default)]
    shared_with: Option<Vec<Uuid>>,
}

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct ShareResponse {
    #[serde(flatten)]
    pub share: SharedLocation,
    pub share_url: String,
}

fn generate_share_token() -> Result<String> {
    let rng = SystemRandom::new();
    let mut bytes = [0u8; SHARE_TOKEN_BYTES];
    rng.fill(&mut bytes)
        .map_err(|_| AppError::Internal(anyhow::anyhow!("share token generation failed")))?;
    Ok(URL_SAFE_NO_PAD.encode(bytes))
}

/// Create a share link for the user's live location.
async fn create_share(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Json(req): Json<CreateShareRequest>,
) -> Result<(StatusCode, Json<ShareResponse>)> {
    if req.expires_in_hours.is_some_and(|h| h <= 0) {
        return Err(AppError::Validation(
            "expires_in_hours must be positive".to_string(),
        ));
    }

    let token = generate_share_token()?;
    let now = Utc::now();
    let share = SharedLocation {
        id: Uuid::new_v4(),
        user_id: user.user_id,
        share_token: token.clone(),
        share_type: req.share_type.unwrap_or_default(),
        shared_with: req.shared_with.unwrap_or_default(),
        is_active: true,
        expires_at: req.expires_in_hours.map(|h| now + chrono::Duration::hours(h)),
        created_at: now,
    };
    state.store.insert_share(&share).await?;

    let share_url = format!("{}/shared/{token}", state.config.frontend_url);
    tracing::info!(
        user_id = %user.user_id,
        share_type = ?share.share_type,
        expires_at = ?share.expires_at,
        "Share link created"
    );

    Ok((StatusCode::CREATED, Json(ShareResponse { share, share_url })))
}

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct SharesResponse {
    pub shares: Vec<SharedLocation>,
}

/// List the user's active share links, newest first.
async fn list_shares(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<SharesResponse>> {
    let shares = state.store.list_active_shares(user.user_id).await?;
    Ok(Json(SharesResponse { shares }))
}

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct RevokeShareResponse {
    pub success: bool,
    pub message: String,
}

/// Revoke one of the user's share links.
async fn revoke_share(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(token): Path<String>,
) -> Result<Json<RevokeShareResponse>> {
    let revoked = state.store.revoke_share(user.user_id, &token).await?;
    if !revoked {
        return Err(AppError::NotFound("Share link".to_string()));
    }

    tracing::info!(user_id = %user.user_id, "Share link revoked");
    Ok(Json(RevokeShareResponse {
        success: true,
        message: "Share link revoked".to_string(),
    }))
}

// ─── Shared View (public) ────────────────────────────────────

/// Fields exposed to share-link holders. Device and battery details stay
/// private to the owner.
#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct SharedLocationView {
    pub id: Uuid,
    pub latitude: f64,
    pub longitude: f64,
    pub accuracy: Option<f64>,
    pub heading: Option<f64>,
    pub speed: Option<f64>,
    pub address: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<LocationSample> for SharedLocationView {
    fn from(sample: LocationSample) -> Self {
        Self {
            id: sample.id,
            latitude: sample.latitude,
            longitude: sample.longitude,
            accuracy: sample.accuracy,
            heading: sample.heading,
            speed: sample.speed,
            address: sample.address,
            created_at: sample.created_at,
        }
    }
}

/// Resolve a share token to the owner's latest location.
///
/// Revoked and unknown tokens are indistinguishable; expired links answer
/// 410 so clients can stop polling.
async fn get_shared_location(
    State(state): State<Arc<AppState>>,
    Path(token): Path<String>,
) -> Result<Json<SharedLocationView>> {
    let share = state
        .store
        .get_share_by_token(&token)
        .await?
        .filter(|s| s.is_active)
        .ok_or_else(|| AppError::NotFound("Shared location".to_string()))?;

    if share.is_expired(Utc::now()) {
        return Err(AppError::Expired("Share link".to_string()));
    }

    let sample = state
        .store
        .latest_sample(share.user_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Location".to_string()))?;

    Ok(Json(SharedLocationView::from(sample)))
}
