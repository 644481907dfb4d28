// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Location share links and watch permissions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
#[serde(rename_all = "snake_case")]
pub enum ShareType {
    #[default]
    RealTime,
    History,
    Route,
}

/// Tokenized share of a user's live location.
///
/// The token alone grants read access while the share is active and
/// unexpired; revocation flips `is_active` rather than deleting the row.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct SharedLocation {
    pub id: Uuid,
    pub user_id: Uuid,
    pub share_token: String,
    pub share_type: ShareType,
    /// Specific user ids the share was addressed to (informational)
    pub shared_with: Vec<Uuid>,
    pub is_active: bool,
    pub expires_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl SharedLocation {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        matches!(self.expires_at, Some(expires) if expires < now)
    }
}

/// Standing grant letting `user_id` watch `target_user_id`'s live location.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ViewPermission {
    pub user_id: Uuid,
    pub target_user_id: Uuid,
    pub granted_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_share_expiry() {
        let now = Utc::now();
        let mut share = SharedLocation {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            share_token: "tok".to_string(),
            share_type: ShareType::RealTime,
            shared_with: vec![],
            is_active: true,
            expires_at: None,
            created_at: now,
        };
        assert!(!share.is_expired(now));

        share.expires_at = Some(now - chrono::Duration::hours(1));
        assert!(share.is_expired(now));

        share.expires_at = Some(now + chrono::Duration::hours(1));
        assert!(!share.is_expired(now));
    }

    #[test]
    fn test_share_type_wire_format() {
        assert_eq!(
            serde_json::to_string(&ShareType::RealTime).unwrap(),
            "\"real_time\""
        );
    }
}
