//! Back-office activity log.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{ActivityAction, ActivityLogId, UserId};

/// One recorded staff action.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivityLog {
    pub id: ActivityLogId,
    pub actor_id: UserId,
    #[serde(default)]
    pub actor_email: Option<String>,
    pub action: ActivityAction,
    pub entity_type: String,
    pub entity_id: String,
    #[serde(default)]
    pub details: serde_json::Value,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

/// Insert payload for the `activity_logs` table.
#[derive(Debug, Clone, Serialize)]
pub struct NewActivityLog {
    pub actor_id: UserId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub actor_email: Option<String>,
    pub action: ActivityAction,
    pub entity_type: String,
    pub entity_id: String,
    pub details: serde_json::Value,
}

impl NewActivityLog {
    /// Start an entry for `entity_type`/`entity_id` with empty details.
    pub fn new(
        actor_id: UserId,
        action: ActivityAction,
        entity_type: impl Into<String>,
        entity_id: impl ToString,
    ) -> Self {
        Self {
            actor_id,
            actor_email: None,
            action,
            entity_type: entity_type.into(),
            entity_id: entity_id.to_string(),
            details: serde_json::Value::Object(serde_json::Map::new()),
        }
    }

    /// Attach the actor's email.
    #[must_use]
    pub fn by(mut self, email: impl Into<String>) -> Self {
        self.actor_email = Some(email.into());
        self
    }

    /// Attach structured details.
    #[must_use]
    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = details;
        self
    }
}
