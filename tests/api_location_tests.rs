// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Location ingestion, history, and share-link API tests.

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    Router,
};
use chrono::Utc;
use serde_json::{json, Value};
use tower::ServiceExt;
use uuid::Uuid;
use waypoint_tracker::models::{ShareType, SharedLocation};

mod common;

async fn request_json(
    app: &Router,
    method: &str,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    let request = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, json)
}

// ─── Ingestion ───────────────────────────────────────────────

#[tokio::test]
async fn test_update_location_minimal_payload() {
    let (app, state) = common::create_test_app();
    let token = common::auth_token(&state, Uuid::new_v4());

    let (status, body) = request_json(
        &app,
        "POST",
        "/api/locations/update",
        Some(&token),
        Some(json!({"latitude": 37.7749, "longitude": -122.4194})),
    )
    .await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["location"]["latitude"], 37.7749);
    assert_eq!(body["location"]["longitude"], -122.4194);
    // Omitted device id falls back to "unknown"
    assert_eq!(body["location"]["device_id"], "unknown");
    // Stationary + full battery: slowest non-stretched cadence
    assert_eq!(body["next_update_interval_seconds"], 10);
    // No active route, so no snap advisory
    assert!(body.get("snapped").is_none());
}

#[tokio::test]
async fn test_update_location_normalizes_speed() {
    let (app, state) = common::create_test_app();
    let token = common::auth_token(&state, Uuid::new_v4());

    let (status, body) = request_json(
        &app,
        "POST",
        "/api/locations/update",
        Some(&token),
        Some(json!({
            "latitude": 37.0,
            "longitude": -122.0,
            "speed": 36.0,
            "device_id": "phone-1"
        })),
    )
    .await;

    assert_eq!(status, StatusCode::CREATED);
    // 36 km/h on the wire is stored as 10 m/s
    assert_eq!(body["location"]["speed"], 10.0);
    assert_eq!(body["location"]["device_id"], "phone-1");
    // The cadence works off the raw km/h value: 36 > 30 -> 3s
    assert_eq!(body["next_update_interval_seconds"], 3);
}

#[tokio::test]
async fn test_update_location_low_battery_stretches_interval() {
    let (app, state) = common::create_test_app();
    let token = common::auth_token(&state, Uuid::new_v4());

    let (status, body) = request_json(
        &app,
        "POST",
        "/api/locations/update",
        Some(&token),
        Some(json!({
            "latitude": 37.0,
            "longitude": -122.0,
            "speed": 100.0,
            "battery_level": 15
        })),
    )
    .await;

    assert_eq!(status, StatusCode::CREATED);
    // 2s base (speed > 80) * 2 (battery < 20) = 4
    assert_eq!(body["next_update_interval_seconds"], 4);
}

#[tokio::test]
async fn test_update_location_missing_coordinates() {
    let (app, state) = common::create_test_app();
    let token = common::auth_token(&state, Uuid::new_v4());

    let (status, body) = request_json(
        &app,
        "POST",
        "/api/locations/update",
        Some(&token),
        Some(json!({"device_id": "phone-1"})),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "validation_error");
    assert_eq!(body["details"], "latitude and longitude are required");
}

#[tokio::test]
async fn test_update_location_out_of_range_latitude() {
    let (app, state) = common::create_test_app();
    let token = common::auth_token(&state, Uuid::new_v4());

    let (status, body) = request_json(
        &app,
        "POST",
        "/api/locations/update",
        Some(&token),
        Some(json!({"latitude": 91.0, "longitude": 0.0})),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "validation_error");
}

// ─── Recent ──────────────────────────────────────────────────

#[tokio::test]
async fn test_recent_location_lifecycle() {
    let (app, state) = common::create_test_app();
    let token = common::auth_token(&state, Uuid::new_v4());

    // No fixes yet
    let (status, body) =
        request_json(&app, "GET", "/api/locations/recent", Some(&token), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "not_found");

    let (status, _) = request_json(
        &app,
        "POST",
        "/api/locations/update",
        Some(&token),
        Some(json!({"latitude": 40.0, "longitude": -74.0})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) =
        request_json(&app, "GET", "/api/locations/recent", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["latitude"], 40.0);
    assert_eq!(body["longitude"], -74.0);
}

#[tokio::test]
async fn test_recent_location_is_per_user() {
    let (app, state) = common::create_test_app();
    let alice = common::auth_token(&state, Uuid::new_v4());
    let bob = common::auth_token(&state, Uuid::new_v4());

    let (status, _) = request_json(
        &app,
        "POST",
        "/api/locations/update",
        Some(&alice),
        Some(json!({"latitude": 40.0, "longitude": -74.0})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    // Bob sees nothing
    let (status, _) = request_json(&app, "GET", "/api/locations/recent", Some(&bob), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

// ─── History ─────────────────────────────────────────────────

#[tokio::test]
async fn test_history_pagination_newest_first() {
    let (app, state) = common::create_test_app();
    let token = common::auth_token(&state, Uuid::new_v4());

    for latitude in [10.0, 20.0, 30.0] {
        let (status, _) = request_json(
            &app,
            "POST",
            "/api/locations/update",
            Some(&token),
            Some(json!({"latitude": latitude, "longitude": 0.0})),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
    }

    let (status, body) = request_json(
        &app,
        "GET",
        "/api/locations/history?limit=2",
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["limit"], 2);
    assert_eq!(body["offset"], 0);
    assert_eq!(body["total"], 2);
    let locations = body["locations"].as_array().unwrap();
    assert_eq!(locations.len(), 2);
    // Newest first
    assert_eq!(locations[0]["latitude"], 30.0);
    assert_eq!(locations[1]["latitude"], 20.0);

    let (status, body) = request_json(
        &app,
        "GET",
        "/api/locations/history?limit=2&offset=2",
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let locations = body["locations"].as_array().unwrap();
    assert_eq!(locations.len(), 1);
    assert_eq!(locations[0]["latitude"], 10.0);
}

#[tokio::test]
async fn test_history_limit_is_capped() {
    let (app, state) = common::create_test_app();
    let token = common::auth_token(&state, Uuid::new_v4());

    let (status, body) = request_json(
        &app,
        "GET",
        "/api/locations/history?limit=9999",
        Some(&token),
        None,
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["limit"], 500);
}

#[tokio::test]
async fn test_history_rejects_malformed_timestamp() {
    let (app, state) = common::create_test_app();
    let token = common::auth_token(&state, Uuid::new_v4());

    let (status, body) = request_json(
        &app,
        "GET",
        "/api/locations/history?from=yesterday",
        Some(&token),
        None,
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "validation_error");
    assert_eq!(
        body["details"],
        "Invalid 'from' parameter: must be RFC3339 datetime"
    );
}

// ─── Share Links ─────────────────────────────────────────────

#[tokio::test]
async fn test_share_link_lifecycle() {
    let (app, state) = common::create_test_app();
    let user_id = Uuid::new_v4();
    let token = common::auth_token(&state, user_id);

    // Owner needs a location before the shared view resolves
    let (status, _) = request_json(
        &app,
        "POST",
        "/api/locations/update",
        Some(&token),
        Some(json!({
            "latitude": 37.0,
            "longitude": -122.0,
            "battery_level": 80,
            "device_id": "phone-1"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) =
        request_json(&app, "POST", "/api/locations/share", Some(&token), Some(json!({}))).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["share_type"], "real_time");
    assert_eq!(body["is_active"], true);
    let share_token = body["share_token"].as_str().unwrap().to_string();
    assert_eq!(
        body["share_url"],
        format!("http://localhost:3000/shared/{}", share_token)
    );

    // Anyone with the token can read the shared view, without auth
    let uri = format!("/api/locations/shared/{}", share_token);
    let (status, body) = request_json(&app, "GET", &uri, None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["latitude"], 37.0);
    // Device and battery details never cross the share boundary
    assert!(body.get("user_id").is_none());
    assert!(body.get("device_id").is_none());
    assert!(body.get("battery_level").is_none());

    // Listed as active
    let (status, body) =
        request_json(&app, "GET", "/api/locations/shares", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["shares"].as_array().unwrap().len(), 1);

    // Revoke, then the token stops resolving
    let uri = format!("/api/locations/shares/{}", share_token);
    let (status, body) = request_json(&app, "DELETE", &uri, Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);

    let uri = format!("/api/locations/shared/{}", share_token);
    let (status, body) = request_json(&app, "GET", &uri, None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "not_found");
}

#[tokio::test]
async fn test_shared_location_unknown_token() {
    let (app, _) = common::create_test_app();

    let (status, body) =
        request_json(&app, "GET", "/api/locations/shared/no-such-token", None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "not_found");
}

#[tokio::test]
async fn test_share_rejects_non_positive_expiry() {
    let (app, state) = common::create_test_app();
    let token = common::auth_token(&state, Uuid::new_v4());

    let (status, body) = request_json(
        &app,
        "POST",
        "/api/locations/share",
        Some(&token),
        Some(json!({"expires_in_hours": 0})),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["details"], "expires_in_hours must be positive");
}

#[tokio::test]
async fn test_expired_share_answers_gone() {
    let (app, state) = common::create_test_app();
    let user_id = Uuid::new_v4();

    let share = SharedLocation {
        id: Uuid::new_v4(),
        user_id,
        share_token: "expired-token".to_string(),
        share_type: ShareType::RealTime,
        shared_with: vec![],
        is_active: true,
        expires_at: Some(Utc::now() - chrono::Duration::hours(1)),
        created_at: Utc::now() - chrono::Duration::hours(2),
    };
    state.store.insert_share(&share).await.unwrap();

    let (status, body) =
        request_json(&app, "GET", "/api/locations/shared/expired-token", None, None).await;
    assert_eq!(status, StatusCode::GONE);
    assert_eq!(body["error"], "expired");
}

#[tokio::test]
async fn test_revoke_unknown_share_is_not_found() {
    let (app, state) = common::create_test_app();
    let token = common::auth_token(&state, Uuid::new_v4());

    let (status, _) = request_json(
        &app,
        "DELETE",
        "/api/locations/shares/never-issued",
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_revoke_requires_ownership() {
    let (app, state) = common::create_test_app();
    let owner_id = Uuid::new_v4();
    let owner = common::auth_token(&state, owner_id);
    let stranger = common::auth_token(&state, Uuid::new_v4());

    let (status, body) =
        request_json(&app, "POST", "/api/locations/share", Some(&owner), Some(json!({}))).await;
    assert_eq!(status, StatusCode::CREATED);
    let share_token = body["share_token"].as_str().unwrap().to_string();

    // A stranger cannot revoke someone else's link
    let uri = format!("/api/locations/shares/{}", share_token);
    let (status, _) = request_json(&app, "DELETE", &uri, Some(&stranger), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    // The owner still can
    let (status, _) = request_json(&app, "DELETE", &uri, Some(&owner), None).await;
    assert_eq!(status, StatusCode::OK);
}
