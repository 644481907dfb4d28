// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Geofence evaluator state-machine tests.
//!
//! Exercise the enter/exit transitions directly against the store, including
//! the per-(user, fence) serialization that keeps racing samples from
//! double-emitting an enter.

use chrono::Utc;
use uuid::Uuid;
use waypoint_tracker::models::{FenceGeometry, Geofence, GeofenceEventType, GeofenceStatus};
use waypoint_tracker::realtime::topics;
use waypoint_tracker::services::{GeofenceEvaluator, WebhookNotifier};
use waypoint_tracker::AppState;

mod common;

// 1 km circle around downtown San Francisco
const CENTER: [f64; 2] = [37.7749, -122.4194];
const INSIDE: [f64; 2] = [37.7749, -122.4194];
const OUTSIDE: [f64; 2] = [37.8199, -122.4194];

fn circle_fence(user_id: Uuid, status: GeofenceStatus) -> Geofence {
    let now = Utc::now();
    Geofence {
        id: Uuid::new_v4(),
        user_id,
        name: "test fence".to_string(),
        description: None,
        geometry: FenceGeometry::Circle {
            center: CENTER,
            radius_m: 1000.0,
        },
        status,
        notification_enabled: false,
        webhook_url: None,
        created_at: now,
        updated_at: now,
    }
}

fn evaluator_for(state: &AppState) -> GeofenceEvaluator {
    GeofenceEvaluator::new(
        state.store.clone(),
        WebhookNotifier::new(state.config.webhook_timeout_secs),
        state.topics.clone(),
    )
}

#[tokio::test]
async fn test_enter_exit_reenter_sequence() {
    let state = common::test_state();
    let user_id = Uuid::new_v4();
    let fence = circle_fence(user_id, GeofenceStatus::Active);
    state.store.insert_geofence(&fence).await.unwrap();
    let evaluator = evaluator_for(&state);

    // First inside fix enters
    let events = evaluator
        .evaluate_sample(user_id, INSIDE[0], INSIDE[1])
        .await
        .unwrap();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].event_type, GeofenceEventType::Enter);
    assert!(events[0].exited_at.is_none());

    // Staying inside emits nothing
    let events = evaluator
        .evaluate_sample(user_id, INSIDE[0], INSIDE[1])
        .await
        .unwrap();
    assert!(events.is_empty());

    // Leaving closes the enter row in place
    let events = evaluator
        .evaluate_sample(user_id, OUTSIDE[0], OUTSIDE[1])
        .await
        .unwrap();
    assert_eq!(events.len(), 1);
    let exit = &events[0];
    assert_eq!(exit.event_type, GeofenceEventType::Exit);
    assert!(exit.exited_at.is_some());
    assert!(exit.duration_minutes.is_some());
    // The row keeps the enter coordinates
    assert_eq!(exit.latitude, INSIDE[0]);

    // Coming back opens a fresh row
    let events = evaluator
        .evaluate_sample(user_id, INSIDE[0], INSIDE[1])
        .await
        .unwrap();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].event_type, GeofenceEventType::Enter);

    let stored = state
        .store
        .list_geofence_events(fence.id, 100, 0)
        .await
        .unwrap();
    assert_eq!(stored.len(), 2);
}

#[tokio::test]
async fn test_staying_outside_emits_nothing() {
    let state = common::test_state();
    let user_id = Uuid::new_v4();
    state
        .store
        .insert_geofence(&circle_fence(user_id, GeofenceStatus::Active))
        .await
        .unwrap();
    let evaluator = evaluator_for(&state);

    let events = evaluator
        .evaluate_sample(user_id, OUTSIDE[0], OUTSIDE[1])
        .await
        .unwrap();
    assert!(events.is_empty());
}

#[tokio::test]
async fn test_inactive_fence_is_skipped() {
    let state = common::test_state();
    let user_id = Uuid::new_v4();
    let fence = circle_fence(user_id, GeofenceStatus::Inactive);
    state.store.insert_geofence(&fence).await.unwrap();
    let evaluator = evaluator_for(&state);

    let events = evaluator
        .evaluate_sample(user_id, INSIDE[0], INSIDE[1])
        .await
        .unwrap();
    assert!(events.is_empty());

    let stored = state
        .store
        .list_geofence_events(fence.id, 100, 0)
        .await
        .unwrap();
    assert!(stored.is_empty());
}

#[tokio::test]
async fn test_unknown_geometry_never_enters() {
    let state = common::test_state();
    let user_id = Uuid::new_v4();
    let mut fence = circle_fence(user_id, GeofenceStatus::Active);
    fence.geometry = FenceGeometry::Unknown;
    state.store.insert_geofence(&fence).await.unwrap();
    let evaluator = evaluator_for(&state);

    let events = evaluator
        .evaluate_sample(user_id, INSIDE[0], INSIDE[1])
        .await
        .unwrap();
    assert!(events.is_empty());
}

#[tokio::test]
async fn test_other_users_fences_are_ignored() {
    let state = common::test_state();
    let owner = Uuid::new_v4();
    let passerby = Uuid::new_v4();
    let fence = circle_fence(owner, GeofenceStatus::Active);
    state.store.insert_geofence(&fence).await.unwrap();
    let evaluator = evaluator_for(&state);

    // A different user walking through the area must not trigger anything
    let events = evaluator
        .evaluate_sample(passerby, INSIDE[0], INSIDE[1])
        .await
        .unwrap();
    assert!(events.is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_racing_samples_emit_a_single_enter() {
    let state = common::test_state();
    let user_id = Uuid::new_v4();
    let fence = circle_fence(user_id, GeofenceStatus::Active);
    state.store.insert_geofence(&fence).await.unwrap();
    let evaluator = evaluator_for(&state);

    let mut handles = Vec::new();
    for _ in 0..8 {
        let evaluator = evaluator.clone();
        handles.push(tokio::spawn(async move {
            evaluator
                .evaluate_sample(user_id, INSIDE[0], INSIDE[1])
                .await
                .unwrap()
                .len()
        }));
    }

    let mut emitted = 0;
    for handle in handles {
        emitted += handle.await.unwrap();
    }
    assert_eq!(emitted, 1);

    let stored = state
        .store
        .list_geofence_events(fence.id, 100, 0)
        .await
        .unwrap();
    assert_eq!(stored.len(), 1);
}

#[tokio::test]
async fn test_events_broadcast_to_fence_topic() {
    let state = common::test_state();
    let user_id = Uuid::new_v4();
    let fence = circle_fence(user_id, GeofenceStatus::Active);
    state.store.insert_geofence(&fence).await.unwrap();

    let conn_id = Uuid::new_v4();
    let mut rx = state.topics.register(conn_id, user_id);
    state.topics.join(&topics::geofence(fence.id), conn_id);

    let evaluator = evaluator_for(&state);
    evaluator
        .evaluate_sample(user_id, INSIDE[0], INSIDE[1])
        .await
        .unwrap();

    let frame = rx.try_recv().expect("subscriber should get the event");
    let axum::extract::ws::Message::Text(text) = frame else {
        panic!("expected a text frame");
    };
    let json: serde_json::Value = serde_json::from_str(text.as_str()).unwrap();
    assert_eq!(json["event"], "geofence:event");
    assert_eq!(json["event_type"], "enter");
    assert_eq!(json["geofence_id"], fence.id.to_string());
}

#[tokio::test]
async fn test_multiple_fences_evaluated_independently() {
    let state = common::test_state();
    let user_id = Uuid::new_v4();

    let near = circle_fence(user_id, GeofenceStatus::Active);
    let mut far = circle_fence(user_id, GeofenceStatus::Active);
    far.geometry = FenceGeometry::Circle {
        center: [40.0, -74.0],
        radius_m: 1000.0,
    };
    state.store.insert_geofence(&near).await.unwrap();
    state.store.insert_geofence(&far).await.unwrap();

    let evaluator = evaluator_for(&state);
    let events = evaluator
        .evaluate_sample(user_id, INSIDE[0], INSIDE[1])
        .await
        .unwrap();

    // Only the fence the fix is inside transitions
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].geofence_id, near.id);
}
