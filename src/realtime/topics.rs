// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Connection and subscription registry.
//!
//! Every WebSocket connection registers here and owns the receiving half of
//! an unbounded channel; broadcasts serialize once and push the frame into
//! each member's channel. Delivery is best-effort at-most-once: closed
//! channels are skipped and cleaned up when the connection unregisters.

use std::collections::HashSet;

use axum::body::Bytes;
use axum::extract::ws::Message;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::realtime::messages::ServerEvent;

/// Channel sender half for pushing frames to one connection.
pub type TopicSender = mpsc::UnboundedSender<Message>;

/// Topic a user's own tracking updates are published to.
pub fn user_tracking(user_id: Uuid) -> String {
    format!("user:{user_id}:tracking")
}

/// Personal topic every connection joins at registration.
pub fn user_personal(user_id: Uuid) -> String {
    format!("user:{user_id}")
}

pub fn route(route_id: Uuid) -> String {
    format!("route:{route_id}")
}

pub fn geofence(geofence_id: Uuid) -> String {
    format!("geofence:{geofence_id}")
}

/// Metadata for a single registered connection.
pub struct ConnectionHandle {
    pub user_id: Uuid,
    pub sender: TopicSender,
    pub connected_at: DateTime<Utc>,
}

/// Sharded registry of live connections and their topic memberships.
///
/// Designed to be wrapped in `Arc` and shared across the HTTP handlers, the
/// WebSocket tasks, and the geofence evaluator.
#[derive(Default)]
pub struct TopicRegistry {
    connections: DashMap<Uuid, ConnectionHandle>,
    topics: DashMap<String, HashSet<Uuid>>,
    /// Reverse index, connection id -> joined topics, for disconnect cleanup
    memberships: DashMap<Uuid, HashSet<String>>,
}

impl TopicRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a connection and hand back the receiver half of its channel.
    pub fn register(&self, conn_id: Uuid, user_id: Uuid) -> mpsc::UnboundedReceiver<Message> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.connections.insert(
            conn_id,
            ConnectionHandle {
                user_id,
                sender: tx,
                connected_at: Utc::now(),
            },
        );
        rx
    }

    /// Drop a connection and remove it from every topic it joined.
    pub fn unregister(&self, conn_id: Uuid) {
        self.connections.remove(&conn_id);

        let Some((_, joined)) = self.memberships.remove(&conn_id) else {
            return;
        };
        for topic in joined {
            if let Some(mut members) = self.topics.get_mut(&topic) {
                members.remove(&conn_id);
            }
            self.topics.remove_if(&topic, |_, members| members.is_empty());
        }
    }

    /// Add a connection to a topic. Unknown connections are ignored so a
    /// racing disconnect cannot resurrect state.
    pub fn join(&self, topic: &str, conn_id: Uuid) {
        if !self.connections.contains_key(&conn_id) {
            return;
        }
        self.topics
            .entry(topic.to_string())
            .or_default()
            .insert(conn_id);
        self.memberships
            .entry(conn_id)
            .or_default()
            .insert(topic.to_string());
    }

    pub fn leave(&self, topic: &str, conn_id: Uuid) {
        if let Some(mut members) = self.topics.get_mut(topic) {
            members.remove(&conn_id);
        }
        self.topics.remove_if(topic, |_, members| members.is_empty());
        if let Some(mut joined) = self.memberships.get_mut(&conn_id) {
            joined.remove(topic);
        }
    }

    pub fn is_member(&self, topic: &str, conn_id: Uuid) -> bool {
        self.topics
            .get(topic)
            .map(|members| members.contains(&conn_id))
            .unwrap_or(false)
    }

    pub fn member_count(&self, topic: &str) -> usize {
        self.topics.get(topic).map(|m| m.len()).unwrap_or(0)
    }

    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    /// Serialize an event once and push it to every member of the topic.
    ///
    /// Returns the number of connections the frame was handed to. Closed
    /// channels are silently skipped.
    pub fn broadcast(&self, topic: &str, event: &ServerEvent) -> usize {
        let members: Vec<Uuid> = match self.topics.get(topic) {
            Some(set) => set.iter().copied().collect(),
            None => return 0,
        };

        let Some(frame) = encode(event) else {
            return 0;
        };

        let mut delivered = 0;
        for conn_id in members {
            if let Some(conn) = self.connections.get(&conn_id) {
                if conn.sender.send(frame.clone()).is_ok() {
                    delivered += 1;
                }
            }
        }
        delivered
    }

    /// Push an event to a single connection.
    pub fn send_to(&self, conn_id: Uuid, event: &ServerEvent) -> bool {
        let Some(frame) = encode(event) else {
            return false;
        };
        self.connections
            .get(&conn_id)
            .map(|conn| conn.sender.send(frame).is_ok())
            .unwrap_or(false)
    }

    /// Send a Ping frame to every connection (heartbeat task).
    pub fn ping_all(&self) {
        for conn in self.connections.iter() {
            let _ = conn.sender.send(Message::Ping(Bytes::new()));
        }
    }

    /// Send a Close frame to every connection, then clear all state.
    pub fn shutdown_all(&self) {
        let count = self.connections.len();
        for conn in self.connections.iter() {
            let _ = conn.sender.send(Message::Close(None));
        }
        self.connections.clear();
        self.topics.clear();
        self.memberships.clear();
        tracing::info!(count, "Closed all WebSocket connections");
    }
}

fn encode(event: &ServerEvent) -> Option<Message> {
    match serde_json::to_string(event) {
        Ok(json) => Some(Message::Text(json.into())),
        Err(e) => {
            tracing::error!(error = %e, "Failed to serialize server event");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn connected_event(user_id: Uuid) -> ServerEvent {
        ServerEvent::Connected {
            user_id,
            message: "hi".to_string(),
        }
    }

    #[tokio::test]
    async fn test_broadcast_reaches_only_topic_members() {
        let registry = TopicRegistry::new();
        let user_a = Uuid::new_v4();
        let user_b = Uuid::new_v4();
        let conn_a = Uuid::new_v4();
        let conn_b = Uuid::new_v4();

        let mut rx_a = registry.register(conn_a, user_a);
        let mut rx_b = registry.register(conn_b, user_b);

        let topic = user_tracking(user_a);
        registry.join(&topic, conn_a);

        let delivered = registry.broadcast(&topic, &connected_event(user_a));
        assert_eq!(delivered, 1);
        assert!(rx_a.try_recv().is_ok());
        assert!(rx_b.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_leave_stops_delivery() {
        let registry = TopicRegistry::new();
        let conn = Uuid::new_v4();
        let mut rx = registry.register(conn, Uuid::new_v4());

        registry.join("route:abc", conn);
        registry.leave("route:abc", conn);

        assert_eq!(registry.broadcast("route:abc", &connected_event(Uuid::new_v4())), 0);
        assert!(rx.try_recv().is_err());
        assert_eq!(registry.member_count("route:abc"), 0);
    }

    #[tokio::test]
    async fn test_unregister_cleans_all_memberships() {
        let registry = TopicRegistry::new();
        let conn = Uuid::new_v4();
        let _rx = registry.register(conn, Uuid::new_v4());

        registry.join("t1", conn);
        registry.join("t2", conn);
        registry.unregister(conn);

        assert!(!registry.is_member("t1", conn));
        assert!(!registry.is_member("t2", conn));
        assert_eq!(registry.connection_count(), 0);
    }

    #[tokio::test]
    async fn test_join_requires_registered_connection() {
        let registry = TopicRegistry::new();
        let ghost = Uuid::new_v4();

        registry.join("t1", ghost);
        assert!(!registry.is_member("t1", ghost));
    }

    #[tokio::test]
    async fn test_each_member_gets_frame_once() {
        let registry = TopicRegistry::new();
        let conn = Uuid::new_v4();
        let mut rx = registry.register(conn, Uuid::new_v4());

        registry.join("shared", conn);
        // Joining twice must not duplicate delivery
        registry.join("shared", conn);

        let delivered = registry.broadcast("shared", &connected_event(Uuid::new_v4()));
        assert_eq!(delivered, 1);
        assert!(rx.try_recv().is_ok());
        assert!(rx.try_recv().is_err());
    }
}
