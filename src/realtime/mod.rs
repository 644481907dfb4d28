// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Real-time delivery over WebSocket.
//!
//! Connection management, the topic/subscription registry, the wire
//! protocol, heartbeat monitoring, and the HTTP upgrade handler used by
//! the Axum routes.

pub mod handler;
pub mod heartbeat;
pub mod messages;
pub mod topics;

pub use handler::ws_handler;
pub use heartbeat::start_heartbeat;
pub use topics::TopicRegistry;
