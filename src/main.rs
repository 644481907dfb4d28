// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Waypoint-Tracker API Server
//!
//! Ingests device location updates, evaluates geofences, tracks route
//! progress, and pushes live updates to watchers over WebSocket.

use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use waypoint_tracker::{
    config::Config,
    db::{MemoryStore, Store},
    middleware::auth::TokenVerifier,
    realtime::{start_heartbeat, TopicRegistry},
    services::{GeofenceEvaluator, TrackingService, WebhookNotifier},
    AppState,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize structured JSON logging
    init_logging();

    // Load configuration from environment
    let config = Config::from_env().expect("Failed to load configuration");
    tracing::info!(port = config.port, "Starting Waypoint-Tracker API");

    // Storage backend
    let store: Arc<dyn Store> = Arc::new(MemoryStore::new());

    // Connection/topic registry shared by the HTTP handlers, the WebSocket
    // tasks, and the geofence evaluator
    let topics = Arc::new(TopicRegistry::new());

    // Wire the tracking pipeline
    let notifier = WebhookNotifier::new(config.webhook_timeout_secs);
    let evaluator = GeofenceEvaluator::new(store.clone(), notifier, topics.clone());
    let tracking = TrackingService::new(store.clone(), evaluator, topics.clone());

    let verifier = TokenVerifier::new(&config.jwt_signing_key);

    // Keep idle WebSocket connections alive
    let heartbeat = start_heartbeat(topics.clone());
    tracing::info!("WebSocket heartbeat started");

    // Build shared state
    let state = Arc::new(AppState {
        config: config.clone(),
        store,
        tracking,
        verifier,
        topics: topics.clone(),
    });

    // Build router
    let app = waypoint_tracker::routes::create_router(state);

    // Start server
    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(address = %addr, "Server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // Close every live WebSocket and stop the heartbeat before exiting
    topics.shutdown_all();
    heartbeat.abort();
    tracing::info!("Shutdown complete");
    Ok(())
}

/// Resolve when the process is asked to stop (SIGINT or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl-C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => tracing::info!("Received SIGINT, shutting down"),
        () = terminate => tracing::info!("Received SIGTERM, shutting down"),
    }
}

/// Initialize structured JSON logging.
fn init_logging() {
    let format = tracing_subscriber::fmt::layer()
        .json()
        .with_target(false)
        .with_current_span(true)
        .flatten_event(true);

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("waypoint_tracker=debug".parse().unwrap())
                .add_directive("info".parse().unwrap()),
        )
        .with(format)
        .init();
}
