//! Session-stored staff identity.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use parfumerie_backend::{AuthSession, BackendClient};
use parfumerie_core::UserId;

/// The signed-in staff member and their backend tokens.
///
/// Only written after the `is_staff` check passed at login.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrentStaff {
    pub id: UserId,
    pub email: String,
    pub access_token: String,
    pub refresh_token: String,
    /// Unix timestamp (seconds) when the access token expires.
    #[serde(default)]
    pub expires_at: Option<i64>,
}

impl std::fmt::Debug for CurrentStaff {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CurrentStaff")
            .field("id", &self.id)
            .field("email", &self.email)
            .field("access_token", &"[REDACTED]")
            .field("refresh_token", &"[REDACTED]")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

impl CurrentStaff {
    #[must_use]
    pub fn needs_refresh(&self, now: DateTime<Utc>) -> bool {
        self.expires_at
            .is_some_and(|at| at - AuthSession::REFRESH_MARGIN_SECS <= now.timestamp())
    }

    /// A backend client acting as this staff member.
    #[must_use]
    pub fn client(&self, backend: &BackendClient) -> BackendClient {
        backend.as_user(&self.access_token, self.id)
    }
}

impl From<&AuthSession> for CurrentStaff {
    fn from(session: &AuthSession) -> Self {
        Self {
            id: session.user.id,
            email: session.user.email.clone().unwrap_or_default(),
            access_token: session.access_token.clone(),
            refresh_token: session.refresh_token.clone(),
            expires_at: session.expires_at,
        }
    }
}

/// What `/auth/login` returns.
#[derive(Debug, Clone, Serialize)]
pub struct StaffView {
    pub id: UserId,
    pub email: String,
}

impl From<&CurrentStaff> for StaffView {
    fn from(staff: &CurrentStaff) -> Self {
        Self {
            id: staff.id,
            email: staff.email.clone(),
        }
    }
}

/// Session keys.
pub mod keys {
    pub const CURRENT_STAFF: &str = "current_staff";
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expired_token_needs_refresh() {
        let now = Utc::now();
        let staff = CurrentStaff {
            id: UserId::new(uuid::Uuid::nil()),
            email: "ops@example.com".to_string(),
            access_token: "secret-access".to_string(),
            refresh_token: "secret-refresh".to_string(),
            expires_at: Some(now.timestamp() - 1),
        };
        assert!(staff.needs_refresh(now));
        assert!(
            !CurrentStaff {
                expires_at: None,
                ..staff.clone()
            }
            .needs_refresh(now)
        );
        assert!(!format!("{staff:?}").contains("secret"));
    }
}
