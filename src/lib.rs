// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Waypoint-Tracker: live location sharing with geofencing
//!
//! This crate provides the backend API for ingesting device location
//! updates, evaluating them against user-defined geofences, tracking
//! route progress, and fanning updates out over WebSocket.

pub mod config;
pub mod db;
pub mod error;
pub mod geo;
pub mod middleware;
pub mod models;
pub mod realtime;
pub mod routes;
pub mod services;
pub mod time_utils;

use std::sync::Arc;

use config::Config;
use db::Store;
use middleware::auth::TokenVerifier;
use realtime::TopicRegistry;
use services::TrackingService;

/// Shared application state.
pub struct AppState {
    pub config: Config,
    pub store: Arc<dyn Store>,
    pub tracking: TrackingService,
    pub verifier: TokenVerifier,
    pub topics: Arc<TopicRegistry>,
}
