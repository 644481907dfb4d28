// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Geofence webhook delivery.
//!
//! Deliveries run detached from the ingest path: a slow or dead endpoint
//! can never stall location processing. Failures are logged and dropped.

use std::time::Duration;

use serde::Serialize;
use uuid::Uuid;

use crate::models::GeofenceEventType;

/// JSON body posted to a geofence's webhook URL.
#[derive(Debug, Clone, Serialize)]
pub struct WebhookPayload {
    pub event: GeofenceEventType,
    pub geofence_id: Uuid,
    pub user_id: Uuid,
    pub latitude: f64,
    pub longitude: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_minutes: Option<f64>,
    /// RFC3339, server clock
    pub timestamp: String,
}

/// Fire-and-forget webhook sender with a per-request timeout.
#[derive(Clone)]
pub struct WebhookNotifier {
    http: reqwest::Client,
    timeout: Duration,
}

impl WebhookNotifier {
    pub fn new(timeout_secs: u64) -> Self {
        Self {
            http: reqwest::Client::new(),
            timeout: Duration::from_secs(timeout_secs),
        }
    }

    /// Post the payload on a detached task. Never blocks, never fails the
    /// caller.
    pub fn notify_detached(&self, url: String, payload: WebhookPayload) {
        let http = self.http.clone();
        let timeout = self.timeout;

        tokio::spawn(async move {
            let result = http
                .post(&url)
                .timeout(timeout)
                .json(&payload)
                .send()
                .await;

            match result {
                Ok(response) if response.status().is_success() => {
                    tracing::debug!(url = %url, event = ?payload.event, "Webhook delivered");
                }
                Ok(response) => {
                    tracing::warn!(
                        url = %url,
                        status = %response.status(),
                        "Webhook endpoint rejected delivery"
                    );
                }
                Err(e) => {
                    tracing::warn!(url = %url, error = %e, "Webhook delivery failed");
                }
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payload_shape() {
        let payload = WebhookPayload {
            event: GeofenceEventType::Exit,
            geofence_id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            latitude: 37.0,
            longitude: -122.0,
            duration_minutes: Some(12.5),
            timestamp: "2026-03-14T09:26:53Z".to_string(),
        };
        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(json["event"], "exit");
        assert_eq!(json["duration_minutes"], 12.5);

        let enter = WebhookPayload {
            event: GeofenceEventType::Enter,
            duration_minutes: None,
            ..payload
        };
        let json = serde_json::to_value(&enter).unwrap();
        assert_eq!(json["event"], "enter");
        // Enter payloads carry no duration
        assert!(json.get("duration_minutes").is_none());
    }
}
