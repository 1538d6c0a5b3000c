//! Staff sign-in and sign-out.
//!
//! Staff use the same hosted auth accounts as shoppers; the `is_staff`
//! RPC, called with the fresh token, decides who gets an admin session.

use axum::{Json, extract::State, http::StatusCode};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use parfumerie_backend::repos::StaffRepository;
use parfumerie_backend::{AuthClient, BackendError};
use parfumerie_core::Email;

use crate::error::{AppError, Result, clear_sentry_user, set_sentry_user};
use crate::middleware::set_current_staff;
use crate::models::{CurrentStaff, StaffView, session_keys};
use crate::state::AppState;

/// Login request.
#[derive(Debug, Deserialize)]
pub struct LoginForm {
    pub email: String,
    pub password: String,
}

/// Sign in; only accounts for which `is_staff` holds get a session.
#[instrument(skip_all)]
pub async fn login(
    State(state): State<AppState>,
    session: Session,
    Json(form): Json<LoginForm>,
) -> Result<Json<StaffView>> {
    let email = Email::parse(&form.email)?;
    let auth_client = AuthClient::new(state.backend());
    let auth = auth_client
        .sign_in_with_password(&email, &form.password)
        .await
        .map_err(|e| match e {
            BackendError::Unauthorized(_) => {
                tracing::info!(email = %email, "Admin login rejected");
                AppError::Unauthorized("Invalid email or password".to_string())
            }
            other => other.into(),
        })?;

    let staff = CurrentStaff::from(&auth);
    let is_staff = StaffRepository::new(&staff.client(state.backend()))
        .is_staff()
        .await?;
    if !is_staff {
        if let Err(e) = auth_client.sign_out(&staff.access_token).await {
            tracing::debug!(error = %e, "Token revocation failed");
        }
        tracing::warn!(user_id = %staff.id, "Non-staff account tried to sign in to admin");
        return Err(AppError::Forbidden("Staff access required".to_string()));
    }

    session.cycle_id().await?;
    set_current_staff(&session, &staff).await?;
    set_sentry_user(&staff.id, Some(&staff.email));
    tracing::info!(staff_id = %staff.id, "Staff signed in");
    Ok(Json(StaffView::from(&staff)))
}

/// Sign out and drop the whole session. Revoking the token is best effort.
#[instrument(skip_all)]
pub async fn logout(State(state): State<AppState>, session: Session) -> Result<StatusCode> {
    if let Some(staff) = session
        .get::<CurrentStaff>(session_keys::CURRENT_STAFF)
        .await?
        && let Err(e) = AuthClient::new(state.backend())
            .sign_out(&staff.access_token)
            .await
    {
        tracing::debug!(error = %e, "Token revocation failed");
    }

    session.flush().await?;
    clear_sentry_user();
    Ok(StatusCode::NO_CONTENT)
}
