// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Geofence evaluation.
//!
//! Runs once per active geofence per incoming sample. "Currently inside" is
//! derived from the latest persisted event rather than any in-process flag,
//! so evaluation state survives restarts. Transitions for one
//! (user, geofence) pair are serialized with a per-key async mutex; racing
//! samples cannot double-emit an enter.

use std::sync::Arc;

use chrono::Utc;
use dashmap::DashMap;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::db::Store;
use crate::error::Result;
use crate::models::{Geofence, GeofenceEvent, GeofenceEventType};
use crate::realtime::messages::{GeofenceBroadcast, ServerEvent};
use crate::realtime::topics::{self, TopicRegistry};
use crate::services::webhook::{WebhookNotifier, WebhookPayload};
use crate::time_utils::{elapsed_minutes, format_utc_rfc3339};

/// Per-(user, geofence) mutexes serializing transition checks.
pub type EvalLocks = Arc<DashMap<(Uuid, Uuid), Arc<Mutex<()>>>>;

/// Evaluates samples against the owner's active geofences and emits
/// enter/exit events.
#[derive(Clone)]
pub struct GeofenceEvaluator {
    store: Arc<dyn Store>,
    notifier: WebhookNotifier,
    topics: Arc<TopicRegistry>,
    eval_locks: EvalLocks,
}

impl GeofenceEvaluator {
    pub fn new(
        store: Arc<dyn Store>,
        notifier: WebhookNotifier,
        topics: Arc<TopicRegistry>,
    ) -> Self {
        Self {
            store,
            notifier,
            topics,
            eval_locks: Arc::new(DashMap::new()),
        }
    }

    /// Evaluate one sample against every active geofence of its owner.
    ///
    /// Returns the events emitted by this sample (empty when nothing
    /// transitioned).
    pub async fn evaluate_sample(
        &self,
        user_id: Uuid,
        latitude: f64,
        longitude: f64,
    ) -> Result<Vec<GeofenceEvent>> {
        let fences = self.store.list_active_geofences(user_id).await?;

        let mut emitted = Vec::new();
        for fence in fences {
            if let Some(event) = self
                .evaluate_fence(&fence, user_id, latitude, longitude)
                .await?
            {
                emitted.push(event);
            }
        }
        Ok(emitted)
    }

    /// Run the enter/exit state machine for a single fence.
    async fn evaluate_fence(
        &self,
        fence: &Geofence,
        user_id: Uuid,
        latitude: f64,
        longitude: f64,
    ) -> Result<Option<GeofenceEvent>> {
        // Serialize the check-then-write per (user, geofence)
        let lock = self
            .eval_locks
            .entry((user_id, fence.id))
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        let _guard = lock.lock().await;

        let inside = fence.geometry.contains(latitude, longitude);
        let last = self.store.latest_geofence_event(fence.id).await?;
        let was_inside = last.as_ref().is_some_and(|e| e.is_open());

        if inside && !was_inside {
            let now = Utc::now();
            let event = GeofenceEvent {
                id: Uuid::new_v4(),
                geofence_id: fence.id,
                user_id,
                event_type: GeofenceEventType::Enter,
                latitude,
                longitude,
                entered_at: Some(now),
                exited_at: None,
                duration_minutes: None,
                created_at: now,
            };
            self.store.insert_geofence_event(&event).await?;

            tracing::info!(
                user_id = %user_id,
                geofence_id = %fence.id,
                fence = %fence.name,
                "Geofence entered"
            );
            self.emit(fence, &event, latitude, longitude);
            return Ok(Some(event));
        }

        if !inside && was_inside {
            // was_inside guarantees an open enter event exists
            let Some(mut event) = last else {
                return Ok(None);
            };
            let now = Utc::now();
            let entered_at = event.entered_at.unwrap_or(now);

            event.event_type = GeofenceEventType::Exit;
            event.exited_at = Some(now);
            event.duration_minutes = Some(elapsed_minutes(entered_at, now));
            self.store.update_geofence_event(&event).await?;

            tracing::info!(
                user_id = %user_id,
                geofence_id = %fence.id,
                fence = %fence.name,
                duration_minutes = event.duration_minutes,
                "Geofence exited"
            );
            self.emit(fence, &event, latitude, longitude);
            return Ok(Some(event));
        }

        Ok(None)
    }

    /// Broadcast the event to the fence's topic and deliver the webhook.
    /// Both are detached from the evaluation result.
    fn emit(&self, fence: &Geofence, event: &GeofenceEvent, latitude: f64, longitude: f64) {
        let now = Utc::now();
        self.topics.broadcast(
            &topics::geofence(fence.id),
            &ServerEvent::GeofenceTriggered(GeofenceBroadcast {
                event: event.clone(),
                timestamp: now,
            }),
        );

        if let (Some(url), true) = (&fence.webhook_url, fence.notification_enabled) {
            self.notifier.notify_detached(
                url.clone(),
                WebhookPayload {
                    event: event.event_type,
                    geofence_id: fence.id,
                    user_id: event.user_id,
                    latitude,
                    longitude,
                    duration_minutes: event.duration_minutes,
                    timestamp: format_utc_rfc3339(now),
                },
            );
        }
    }
}
