// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Tracking orchestrator.
//!
//! Owns the ingestion workflow:
//! 1. Validate the payload
//! 2. Normalize speed km/h -> m/s and build the immutable sample
//! 3. Persist (storage failure aborts the whole update)
//! 4. Touch the reporting device's last_ping (best-effort)
//! 5. Kick off geofence evaluation on a detached task
//! 6. Compute the adaptive next-report interval and the advisory route snap
//!
//! Also owns route lifecycle transitions, which enforce the single active
//! route per user and broadcast to route subscribers.

use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;
use validator::Validate;

use crate::db::Store;
use crate::error::{AppError, Result};
use crate::models::{LocationSample, LocationUpdate, Route, RouteStatus};
use crate::realtime::messages::{RouteBroadcast, ServerEvent};
use crate::realtime::topics::{self, TopicRegistry};
use crate::services::geofence::GeofenceEvaluator;
use crate::services::sampling;
use crate::services::snap::{snap_to_path, SnappedPoint};

/// Result of one accepted location update.
#[derive(Debug, Clone)]
pub struct IngestOutcome {
    pub sample: LocationSample,
    /// Seconds until the client should report again
    pub next_interval_secs: u32,
    /// Advisory on-route position; never persisted
    pub snapped: Option<SnappedPoint>,
}

#[derive(Clone)]
pub struct TrackingService {
    store: Arc<dyn Store>,
    evaluator: GeofenceEvaluator,
    topics: Arc<TopicRegistry>,
}

impl TrackingService {
    pub fn new(
        store: Arc<dyn Store>,
        evaluator: GeofenceEvaluator,
        topics: Arc<TopicRegistry>,
    ) -> Self {
        Self {
            store,
            evaluator,
            topics,
        }
    }

    // ─── Ingestion ───────────────────────────────────────────────

    /// Process one inbound location update for `user_id`.
    pub async fn ingest(&self, user_id: Uuid, update: LocationUpdate) -> Result<IngestOutcome> {
        let (latitude, longitude) = match (update.latitude, update.longitude) {
            (Some(lat), Some(lon)) => (lat, lon),
            _ => {
                return Err(AppError::Validation(
                    "latitude and longitude are required".to_string(),
                ))
            }
        };
        update
            .validate()
            .map_err(|e| AppError::Validation(e.to_string()))?;

        // The interval works off the raw km/h speed, before normalization
        let next_interval_secs = sampling::next_interval(
            update.battery_level.unwrap_or(100),
            update.speed.unwrap_or(0.0),
            update.battery_optimization.unwrap_or_default(),
        );

        let now = Utc::now();
        let sample = LocationSample {
            id: Uuid::new_v4(),
            user_id,
            device_id: update
                .device_id
                .clone()
                .unwrap_or_else(|| "unknown".to_string()),
            latitude,
            longitude,
            accuracy: update.accuracy,
            altitude: update.altitude,
            heading: update.heading,
            speed: update.speed.map(|kmh| kmh / 3.6),
            address: update.address.clone(),
            battery_level: update.battery_level,
            connectivity: update.connectivity.clone(),
            created_at: now,
        };

        self.store.insert_sample(&sample).await?;

        if let Err(e) = self
            .store
            .touch_device(user_id, &sample.device_id, sample.battery_level, now)
            .await
        {
            tracing::warn!(
                user_id = %user_id,
                device_id = %sample.device_id,
                error = %e,
                "Failed to update device last_ping"
            );
        }

        // Geofence evaluation must not delay the ingest response
        let evaluator = self.evaluator.clone();
        tokio::spawn(async move {
            if let Err(e) = evaluator.evaluate_sample(user_id, latitude, longitude).await {
                tracing::warn!(user_id = %user_id, error = %e, "Geofence evaluation failed");
            }
        });

        let snapped = match self.snap_to_active_route(user_id, latitude, longitude).await {
            Ok(snapped) => snapped,
            Err(e) => {
                tracing::debug!(user_id = %user_id, error = %e, "Route snap skipped");
                None
            }
        };

        tracing::debug!(
            user_id = %user_id,
            device_id = %sample.device_id,
            next_interval_secs,
            snapped = snapped.is_some(),
            "Location sample stored"
        );

        Ok(IngestOutcome {
            sample,
            next_interval_secs,
            snapped,
        })
    }

    /// Project a fix onto the user's active route, if one exists.
    pub async fn snap_to_active_route(
        &self,
        user_id: Uuid,
        latitude: f64,
        longitude: f64,
    ) -> Result<Option<SnappedPoint>> {
        let Some(route) = self.store.active_route(user_id).await? else {
            return Ok(None);
        };
        Ok(snap_to_path(latitude, longitude, &route.path))
    }

    // ─── Route Lifecycle ─────────────────────────────────────────

    /// Transition a pending route to active.
    ///
    /// Any other active route of the same user is cancelled first, so "the
    /// active route" stays unique. Starting an already-active route is a
    /// no-op.
    pub async fn start_route(&self, user_id: Uuid, route_id: Uuid) -> Result<Route> {
        let mut route = self.owned_route(user_id, route_id).await?;
        if route.status == RouteStatus::Active {
            return Ok(route);
        }
        if route.status != RouteStatus::Pending {
            return Err(AppError::Validation(format!(
                "route cannot start from status {:?}",
                route.status
            )));
        }

        let now = Utc::now();
        if let Some(mut previous) = self.store.active_route(user_id).await? {
            if previous.id != route_id {
                previous.status = RouteStatus::Cancelled;
                previous.completed_at = Some(now);
                previous.updated_at = now;
                self.store.update_route(&previous).await?;
                tracing::info!(
                    user_id = %user_id,
                    route_id = %previous.id,
                    "Cancelled previously active route"
                );
                self.broadcast_route(&previous);
            }
        }

        route.status = RouteStatus::Active;
        route.started_at = Some(now);
        route.updated_at = now;
        self.store.update_route(&route).await?;

        tracing::info!(user_id = %user_id, route_id = %route_id, "Route started");
        self.broadcast_route(&route);
        Ok(route)
    }

    /// Transition an active route to completed.
    pub async fn complete_route(&self, user_id: Uuid, route_id: Uuid) -> Result<Route> {
        let mut route = self.owned_route(user_id, route_id).await?;
        if route.status != RouteStatus::Active {
            return Err(AppError::Validation(format!(
                "route cannot complete from status {:?}",
                route.status
            )));
        }

        let now = Utc::now();
        route.status = RouteStatus::Completed;
        route.completed_at = Some(now);
        route.updated_at = now;
        self.store.update_route(&route).await?;

        tracing::info!(user_id = %user_id, route_id = %route_id, "Route completed");
        self.broadcast_route(&route);
        Ok(route)
    }

    async fn owned_route(&self, user_id: Uuid, route_id: Uuid) -> Result<Route> {
        self.store
            .get_route(route_id)
            .await?
            .filter(|route| route.user_id == user_id)
            .ok_or_else(|| AppError::NotFound(format!("Route {route_id}")))
    }

    fn broadcast_route(&self, route: &Route) {
        self.topics.broadcast(
            &topics::route(route.id),
            &ServerEvent::RouteChanged(RouteBroadcast {
                route: route.clone(),
                timestamp: Utc::now(),
            }),
        );
    }
}
