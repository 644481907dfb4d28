// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

use std::sync::Arc;

use uuid::Uuid;
use waypoint_tracker::config::Config;
use waypoint_tracker::db::{MemoryStore, Store};
use waypoint_tracker::middleware::auth::{create_jwt, TokenVerifier};
use waypoint_tracker::realtime::TopicRegistry;
use waypoint_tracker::routes::create_router;
use waypoint_tracker::services::{GeofenceEvaluator, TrackingService, WebhookNotifier};
use waypoint_tracker::AppState;

/// Build shared state backed by in-memory storage.
#[allow(dead_code)]
pub fn test_state() -> Arc<AppState> {
    test_state_with_store(Arc::new(MemoryStore::new()))
}

/// Build shared state around a caller-supplied store (e.g. an offline one).
#[allow(dead_code)]
pub fn test_state_with_store(store: Arc<dyn Store>) -> Arc<AppState> {
    let config = Config::default();
    let topics = Arc::new(TopicRegistry::new());
    let notifier = WebhookNotifier::new(config.webhook_timeout_secs);
    let evaluator = GeofenceEvaluator::new(store.clone(), notifier, topics.clone());
    let tracking = TrackingService::new(store.clone(), evaluator, topics.clone());
    let verifier = TokenVerifier::new(&config.jwt_signing_key);

    Arc::new(AppState {
        config,
        store,
        tracking,
        verifier,
        topics,
    })
}

/// Create a test app with in-memory storage.
/// Returns the router and the shared state.
#[allow(dead_code)]
pub fn create_test_app() -> (axum::Router, Arc<AppState>) {
    let state = test_state();
    (create_router(state.clone()), state)
}

/// Mint a session token for `user_id` with the test signing key.
#[allow(dead_code)]
pub fn auth_token(state: &AppState, user_id: Uuid) -> String {
    create_jwt(user_id, None, None, &state.config.jwt_signing_key)
        .expect("JWT creation should succeed")
}
