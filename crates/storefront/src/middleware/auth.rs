//! Authentication extractors.
//!
//! The signed-in user lives in the session. Expired access tokens are
//! refreshed transparently; a failed refresh signs the user out.

use axum::{extract::FromRequestParts, http::request::Parts};
use chrono::Utc;
use tower_sessions::Session;

use parfumerie_backend::AuthClient;

use crate::error::{AppError, set_sentry_user};
use crate::models::{CurrentUser, session_keys};
use crate::state::AppState;

/// Extractor that requires an authenticated user.
///
/// # Example
///
/// ```rust,ignore
/// async fn protected_handler(RequireAuth(user): RequireAuth) -> String {
///     format!("Hello, {}!", user.email)
/// }
/// ```
pub struct RequireAuth(pub CurrentUser);

impl FromRequestParts<AppState> for RequireAuth {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let session = session_from_parts(parts)?;
        load_user(&session, state)
            .await?
            .map(Self)
            .ok_or_else(|| AppError::Unauthorized("Sign in required".to_string()))
    }
}

/// Extractor that optionally gets the current user.
///
/// Unlike `RequireAuth`, this never rejects; session or refresh failures
/// are treated as signed out.
pub struct OptionalAuth(pub Option<CurrentUser>);

impl FromRequestParts<AppState> for OptionalAuth {
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let Ok(session) = session_from_parts(parts) else {
            return Ok(Self(None));
        };
        Ok(Self(load_user(&session, state).await.ok().flatten()))
    }
}

fn session_from_parts(parts: &Parts) -> Result<Session, AppError> {
    parts
        .extensions
        .get::<Session>()
        .cloned()
        .ok_or_else(|| AppError::Internal("session layer missing".to_string()))
}

/// Read the user from the session, refreshing the access token if needed.
async fn load_user(session: &Session, state: &AppState) -> Result<Option<CurrentUser>, AppError> {
    let Some(user) = session
        .get::<CurrentUser>(session_keys::CURRENT_USER)
        .await?
    else {
        return Ok(None);
    };

    if !user.needs_refresh(Utc::now()) {
        set_sentry_user(&user.id, Some(&user.email));
        return Ok(Some(user));
    }

    match AuthClient::new(state.backend())
        .refresh(&user.refresh_token)
        .await
    {
        Ok(auth) => {
            let refreshed = CurrentUser {
                full_name: user.full_name.clone(),
                ..CurrentUser::from(&auth)
            };
            set_current_user(session, &refreshed).await?;
            tracing::debug!(user_id = %refreshed.id, "Access token refreshed");
            set_sentry_user(&refreshed.id, Some(&refreshed.email));
            Ok(Some(refreshed))
        }
        Err(e) => {
            tracing::info!(user_id = %user.id, error = %e, "Token refresh failed, signing out");
            clear_current_user(session).await?;
            Ok(None)
        }
    }
}

/// Helper to set the current user in the session.
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn set_current_user(
    session: &Session,
    user: &CurrentUser,
) -> Result<(), tower_sessions::session::Error> {
    session.insert(session_keys::CURRENT_USER, user).await
}

/// Helper to clear the current user from the session (logout).
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn clear_current_user(session: &Session) -> Result<(), tower_sessions::session::Error> {
    session
        .remove::<CurrentUser>(session_keys::CURRENT_USER)
        .await?;
    Ok(())
}
