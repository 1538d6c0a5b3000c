//! Authentication route handlers.
//!
//! Handles login, registration and logout against the hosted auth service.
//! Tokens are kept in the session; clients only ever see the cookie.

use axum::{
    Json,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use serde_json::json;
use tower_sessions::Session;
use tracing::instrument;

use parfumerie_backend::{AuthClient, BackendError, SignUpOutcome};
use parfumerie_core::Email;

use super::cart::reset_cart;
use crate::error::{AppError, Result, add_breadcrumb, clear_sentry_user, set_sentry_user};
use crate::middleware::{RequireAuth, clear_current_user, set_current_user};
use crate::models::{CurrentUser, UserView, session_keys};
use crate::state::AppState;

/// Shortest password accepted at registration.
pub const MIN_PASSWORD_LENGTH: usize = 8;

// =============================================================================
// Form Types
// =============================================================================

/// Login request.
#[derive(Debug, Deserialize)]
pub struct LoginForm {
    pub email: String,
    pub password: String,
}

/// Registration request.
#[derive(Debug, Deserialize)]
pub struct RegisterForm {
    pub email: String,
    pub password: String,
    pub full_name: Option<String>,
}

// =============================================================================
// Handlers
// =============================================================================

/// Sign in with email and password.
#[instrument(skip_all)]
pub async fn login(
    State(state): State<AppState>,
    session: Session,
    Json(form): Json<LoginForm>,
) -> Result<Json<UserView>> {
    let email = Email::parse(&form.email)?;
    let auth = AuthClient::new(state.backend())
        .sign_in_with_password(&email, &form.password)
        .await
        .map_err(|e| {
            if matches!(e, BackendError::Unauthorized(_)) {
                tracing::info!(email = %email, "Login rejected");
                AppError::Unauthorized("Invalid email or password".to_string())
            } else {
                e.into()
            }
        })?;

    let user = CurrentUser::from(&auth);
    sign_in(&session, &user).await?;
    tracing::info!(user_id = %user.id, "User signed in");
    Ok(Json(UserView::from(&user)))
}

/// Create an account.
///
/// Responds `201` with the user when the account is active immediately,
/// or `202` when the email must be confirmed first.
#[instrument(skip_all)]
pub async fn register(
    State(state): State<AppState>,
    session: Session,
    Json(form): Json<RegisterForm>,
) -> Result<Response> {
    let email = Email::parse(&form.email)?;
    if form.password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(AppError::BadRequest(format!(
            "Password must be at least {MIN_PASSWORD_LENGTH} characters"
        )));
    }
    let full_name = form
        .full_name
        .as_deref()
        .map(str::trim)
        .filter(|name| !name.is_empty());

    let outcome = AuthClient::new(state.backend())
        .sign_up(&email, &form.password, full_name)
        .await
        .map_err(|e| {
            if e.is_conflict() {
                AppError::Conflict("An account with this email already exists".to_string())
            } else {
                e.into()
            }
        })?;

    match outcome {
        SignUpOutcome::SignedIn(auth) => {
            let user = CurrentUser::from(&auth);
            sign_in(&session, &user).await?;
            tracing::info!(user_id = %user.id, "Account created");
            Ok((StatusCode::CREATED, Json(UserView::from(&user))).into_response())
        }
        SignUpOutcome::ConfirmationRequired(pending) => {
            tracing::info!(user_id = %pending.id, "Account created, awaiting confirmation");
            Ok((
                StatusCode::ACCEPTED,
                Json(json!({
                    "message": "Check your email to confirm your account",
                    "email": email.as_str(),
                })),
            )
                .into_response())
        }
    }
}

/// Sign out and drop the cart.
///
/// Revoking the token is best effort; the session is cleared either way.
#[instrument(skip_all)]
pub async fn logout(State(state): State<AppState>, session: Session) -> Result<StatusCode> {
    if let Some(user) = session
        .get::<CurrentUser>(session_keys::CURRENT_USER)
        .await?
        && let Err(e) = AuthClient::new(state.backend())
            .sign_out(&user.access_token)
            .await
    {
        tracing::debug!(error = %e, "Token revocation failed");
    }

    clear_current_user(&session).await?;
    reset_cart(&session).await?;
    clear_sentry_user();
    add_breadcrumb("auth", "Signed out", None);
    Ok(StatusCode::NO_CONTENT)
}

/// The signed-in user.
pub async fn me(RequireAuth(user): RequireAuth) -> Json<UserView> {
    Json(UserView::from(&user))
}

/// Store the user and rotate the session id.
async fn sign_in(session: &Session, user: &CurrentUser) -> Result<()> {
    session.cycle_id().await?;
    set_current_user(session, user).await?;
    set_sentry_user(&user.id, Some(&user.email));
    add_breadcrumb("auth", "Signed in", None);
    Ok(())
}
