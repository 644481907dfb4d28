// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! WebSocket endpoint and per-connection message loop.
//!
//! Authentication happens before the upgrade: the token comes from the
//! `token` query parameter (browsers cannot set headers on WebSocket
//! requests) or from the session cookie, and is checked by the same
//! [`TokenVerifier`](crate::middleware::auth::TokenVerifier) the HTTP
//! routes use. A failed check rejects the handshake with 401 instead of
//! upgrading and then closing.

use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Query, State};
use axum::response::Response;
use axum_extra::extract::cookie::CookieJar;
use chrono::Utc;
use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use crate::error::AppError;
use crate::middleware::auth::SESSION_COOKIE;
use crate::realtime::messages::{
    Ack, ClientRequest, Envelope, LocationBroadcast, ServerEvent,
};
use crate::realtime::topics;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct WsQuery {
    #[serde(default)]
    pub token: Option<String>,
}

/// HTTP handler that authenticates and upgrades the connection.
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    Query(query): Query<WsQuery>,
    jar: CookieJar,
    State(state): State<Arc<AppState>>,
) -> Result<Response, AppError> {
    let token = query
        .token
        .or_else(|| jar.get(SESSION_COOKIE).map(|c| c.value().to_string()))
        .ok_or(AppError::Unauthorized)?;
    let auth = state.verifier.verify(&token)?;

    Ok(ws.on_upgrade(move |socket| handle_socket(socket, state, auth.user_id)))
}

/// Manage a single WebSocket connection after upgrade.
///
/// Splits the socket into a sink (outbound) and stream (inbound), then:
///   1. Registers the connection and joins the user's personal topic.
///   2. Spawns a sender task that forwards frames from the registry channel.
///   3. Dispatches inbound frames on the current task, acking each one.
///   4. Cleans up on disconnect.
async fn handle_socket(socket: WebSocket, state: Arc<AppState>, user_id: Uuid) {
    let conn_id = Uuid::new_v4();
    tracing::info!(%conn_id, %user_id, "WebSocket connected");

    let mut rx = state.topics.register(conn_id, user_id);
    state.topics.join(&topics::user_personal(user_id), conn_id);
    state.topics.send_to(
        conn_id,
        &ServerEvent::Connected {
            user_id,
            message: "Connected to location tracking".to_string(),
        },
    );

    let (mut sink, mut stream) = socket.split();

    // Sender task: forward registry frames to the WebSocket sink.
    let sender_conn_id = conn_id;
    let send_task = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            if sink.send(msg).await.is_err() {
                tracing::debug!(conn_id = %sender_conn_id, "WebSocket sink closed");
                break;
            }
        }
    });

    // Receiver loop: parse and dispatch inbound frames.
    while let Some(result) = stream.next().await {
        match result {
            Ok(Message::Text(text)) => {
                let ack = match serde_json::from_str::<Envelope>(&text) {
                    Ok(envelope) => dispatch(&state, conn_id, user_id, envelope).await,
                    Err(e) => Ack::failure(None, format!("Invalid frame: {e}")),
                };
                state.topics.send_to(conn_id, &ServerEvent::Ack(ack));
            }
            Ok(Message::Close(_)) => break,
            Ok(Message::Pong(_)) => {
                tracing::trace!(%conn_id, "Pong received");
            }
            Ok(_) => {}
            Err(e) => {
                tracing::debug!(%conn_id, error = %e, "WebSocket receive error");
                break;
            }
        }
    }

    state.topics.unregister(conn_id);
    send_task.abort();
    tracing::info!(%conn_id, %user_id, "WebSocket disconnected");
}

/// Execute one client request and build its acknowledgment.
///
/// Every arm acks, success or failure; topic joins and broadcasts happen
/// as side effects through the registry.
pub async fn dispatch(
    state: &AppState,
    conn_id: Uuid,
    user_id: Uuid,
    envelope: Envelope,
) -> Ack {
    let request_id = envelope.request_id;

    match envelope.request {
        ClientRequest::LocationUpdate(update) => {
            match state.tracking.ingest(user_id, update).await {
                Ok(outcome) => {
                    state.topics.broadcast(
                        &topics::user_tracking(user_id),
                        &ServerEvent::LocationUpdated(LocationBroadcast {
                            location: outcome.sample.clone(),
                            timestamp: Utc::now(),
                        }),
                    );
                    Ack::ok_with_data(
                        request_id,
                        json!({
                            "location": outcome.sample,
                            "next_update_interval_seconds": outcome.next_interval_secs,
                        }),
                    )
                }
                Err(e) => Ack::failure(request_id, e.to_string()),
            }
        }

        ClientRequest::TrackingStart => {
            state.topics.join(&topics::user_tracking(user_id), conn_id);
            tracing::debug!(%conn_id, %user_id, "Tracking started");
            Ack::ok(request_id, "Tracking started")
        }

        ClientRequest::TrackingStop => {
            state.topics.leave(&topics::user_tracking(user_id), conn_id);
            tracing::debug!(%conn_id, %user_id, "Tracking stopped");
            Ack::ok(request_id, "Tracking stopped")
        }

        ClientRequest::LocationWatch {
            target_user_id,
            share_token,
        } => match authorize_watch(state, user_id, target_user_id, share_token).await {
            Ok(target) => {
                state.topics.join(&topics::user_tracking(target), conn_id);
                tracing::debug!(%conn_id, viewer = %user_id, %target, "Watching location");
                Ack::ok_with_data(request_id, json!({ "target_user_id": target }))
            }
            Err(e) => Ack::failure(request_id, e.to_string()),
        },

        ClientRequest::RouteSubscribe { route_id } => {
            match state.store.get_route(route_id).await {
                // Non-owned routes ack the same as missing ones
                Ok(Some(route)) if route.user_id == user_id => {
                    state.topics.join(&topics::route(route_id), conn_id);
                    Ack::ok(request_id, "Subscribed to route")
                }
                Ok(_) => Ack::failure(request_id, "Route not found"),
                Err(e) => Ack::failure(request_id, e.to_string()),
            }
        }

        ClientRequest::GeofenceSubscribe { geofence_id } => {
            match state.store.get_geofence(geofence_id).await {
                Ok(Some(fence)) if fence.user_id == user_id => {
                    state.topics.join(&topics::geofence(geofence_id), conn_id);
                    Ack::ok(request_id, "Subscribed to geofence")
                }
                Ok(_) => Ack::failure(request_id, "Geofence not found"),
                Err(e) => Ack::failure(request_id, e.to_string()),
            }
        }
    }
}

/// Resolve which user the caller may watch.
///
/// A share token wins over a target id; a revoked token reads as missing so
/// callers cannot distinguish revoked from never-issued.
async fn authorize_watch(
    state: &AppState,
    viewer: Uuid,
    target_user_id: Option<Uuid>,
    share_token: Option<String>,
) -> crate::error::Result<Uuid> {
    if let Some(token) = share_token {
        let share = state
            .store
            .get_share_by_token(&token)
            .await?
            .filter(|s| s.is_active)
            .ok_or_else(|| AppError::NotFound("share link".to_string()))?;
        if share.is_expired(Utc::now()) {
            return Err(AppError::Expired("Share link".to_string()));
        }
        return Ok(share.user_id);
    }

    let target = target_user_id.ok_or_else(|| {
        AppError::Validation("target_user_id or share_token is required".to_string())
    })?;
    if target == viewer {
        return Ok(target);
    }
    state
        .store
        .get_view_permission(viewer, target)
        .await?
        .map(|_| target)
        .ok_or_else(|| AppError::Forbidden("view_location not granted".to_string()))
}
