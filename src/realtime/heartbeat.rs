// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Periodic Ping frames so idle connections stay open through proxies.

use std::sync::Arc;
use std::time::Duration;

use crate::realtime::topics::TopicRegistry;

/// Interval between heartbeat pings (in seconds).
const HEARTBEAT_INTERVAL_SECS: u64 = 30;

/// Spawn a background task that pings every registered connection.
///
/// The task runs for the lifetime of the process. The returned `JoinHandle`
/// can be used to abort it explicitly during shutdown.
pub fn start_heartbeat(topics: Arc<TopicRegistry>) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(HEARTBEAT_INTERVAL_SECS));

        loop {
            interval.tick().await;
            let count = topics.connection_count();
            tracing::debug!(count, "WebSocket heartbeat ping");
            topics.ping_all();
        }
    })
}
