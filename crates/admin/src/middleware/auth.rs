//! Staff authentication extractor.
//!
//! Provides `RequireStaff` for route handlers. Staff status is checked
//! once at login; afterwards the session alone grants access until it
//! expires or the access token can no longer be refreshed.

use axum::{extract::FromRequestParts, http::request::Parts};
use chrono::Utc;
use tower_sessions::Session;

use parfumerie_backend::AuthClient;

use crate::error::{AppError, set_sentry_user};
use crate::models::{CurrentStaff, session_keys};
use crate::state::AppState;

/// Extractor that requires a signed-in staff member.
///
/// # Example
///
/// ```rust,ignore
/// async fn protected_handler(RequireStaff(staff): RequireStaff) -> String {
///     format!("Hello, {}!", staff.email)
/// }
/// ```
pub struct RequireStaff(pub CurrentStaff);

impl FromRequestParts<AppState> for RequireStaff {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let session = parts
            .extensions
            .get::<Session>()
            .cloned()
            .ok_or_else(|| AppError::Internal("session layer missing".to_string()))?;

        let staff = session
            .get::<CurrentStaff>(session_keys::CURRENT_STAFF)
            .await?
            .ok_or_else(|| AppError::Unauthorized("Staff sign in required".to_string()))?;

        if !staff.needs_refresh(Utc::now()) {
            set_sentry_user(&staff.id, Some(&staff.email));
            return Ok(Self(staff));
        }

        match AuthClient::new(state.backend())
            .refresh(&staff.refresh_token)
            .await
        {
            Ok(auth) => {
                let refreshed = CurrentStaff::from(&auth);
                set_current_staff(&session, &refreshed).await?;
                tracing::debug!(staff_id = %refreshed.id, "Staff token refreshed");
                set_sentry_user(&refreshed.id, Some(&refreshed.email));
                Ok(Self(refreshed))
            }
            Err(e) => {
                tracing::info!(staff_id = %staff.id, error = %e, "Staff token refresh failed");
                clear_current_staff(&session).await?;
                Err(AppError::Unauthorized("Session expired".to_string()))
            }
        }
    }
}

/// Helper to set the current staff member in the session.
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn set_current_staff(
    session: &Session,
    staff: &CurrentStaff,
) -> Result<(), tower_sessions::session::Error> {
    session.insert(session_keys::CURRENT_STAFF, staff).await
}

/// Helper to clear the current staff member from the session.
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn clear_current_staff(session: &Session) -> Result<(), tower_sessions::session::Error> {
    session
        .remove::<CurrentStaff>(session_keys::CURRENT_STAFF)
        .await?;
    Ok(())
}
