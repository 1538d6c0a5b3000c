//! Hosted auth API: password sign-in, sign-up, token refresh and sign-out.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use parfumerie_core::{Email, UserId};

use crate::client::{BackendClient, parse_json, read_response, send};
use crate::error::BackendError;

/// Tokens and user returned by a successful sign-in.
///
/// Implements `Debug` manually to redact tokens.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthSession {
    pub access_token: String,
    pub refresh_token: String,
    #[serde(default)]
    pub expires_in: i64,
    /// Unix timestamp (seconds) when the access token expires.
    #[serde(default)]
    pub expires_at: Option<i64>,
    pub user: AuthUser,
}

impl std::fmt::Debug for AuthSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthSession")
            .field("access_token", &"[REDACTED]")
            .field("refresh_token", &"[REDACTED]")
            .field("expires_at", &self.expires_at)
            .field("user", &self.user)
            .finish()
    }
}

impl AuthSession {
    /// Refresh this long before expiry.
    pub const REFRESH_MARGIN_SECS: i64 = 60;

    /// Whether the access token is expired or about to be.
    #[must_use]
    pub fn needs_refresh(&self, now: DateTime<Utc>) -> bool {
        self.expires_at
            .is_some_and(|at| at - Self::REFRESH_MARGIN_SECS <= now.timestamp())
    }
}

/// The authenticated user as known to the auth service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthUser {
    pub id: UserId,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub user_metadata: serde_json::Value,
}

impl AuthUser {
    /// Display name from sign-up metadata, if one was given.
    #[must_use]
    pub fn full_name(&self) -> Option<&str> {
        self.user_metadata.get("full_name").and_then(|v| v.as_str())
    }
}

/// Result of a sign-up.
#[derive(Debug, Clone, PartialEq)]
pub enum SignUpOutcome {
    /// The account is active and signed in.
    SignedIn(AuthSession),
    /// The user must confirm their email before signing in.
    ConfirmationRequired(AuthUser),
}

#[derive(Deserialize)]
#[serde(untagged)]
enum SignUpResponse {
    Session(AuthSession),
    User(AuthUser),
}

#[derive(Serialize)]
struct PasswordCredentials<'a> {
    email: &'a str,
    password: &'a str,
}

#[derive(Serialize)]
struct SignUpRequest<'a> {
    email: &'a str,
    password: &'a str,
    data: serde_json::Value,
}

#[derive(Serialize)]
struct RefreshRequest<'a> {
    refresh_token: &'a str,
}

/// Client for the `/auth/v1` endpoints.
pub struct AuthClient<'a> {
    client: &'a BackendClient,
}

impl<'a> AuthClient<'a> {
    #[must_use]
    pub const fn new(client: &'a BackendClient) -> Self {
        Self { client }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/auth/v1/{path}", self.client.base_url())
    }

    fn request(&self, method: reqwest::Method, path: &str) -> reqwest::RequestBuilder {
        self.client
            .http()
            .request(method, self.url(path))
            .header("apikey", self.client.anon_key())
    }

    /// Sign in with email and password.
    ///
    /// # Errors
    ///
    /// Returns `BackendError::Unauthorized` for bad credentials.
    #[instrument(skip(self, password), fields(email = %email))]
    pub async fn sign_in_with_password(
        &self,
        email: &Email,
        password: &str,
    ) -> Result<AuthSession, BackendError> {
        let request = self
            .request(reqwest::Method::POST, "token?grant_type=password")
            .json(&PasswordCredentials {
                email: email.as_str(),
                password,
            });
        let (_, text) = read_response(send(request, "auth/token").await?, "auth/token")
            .await
            .map_err(credentials_error)?;
        parse_json(&text, "auth/token")
    }

    /// Exchange a refresh token for a new session.
    ///
    /// # Errors
    ///
    /// Returns `BackendError::Unauthorized` if the refresh token is invalid.
    #[instrument(skip_all)]
    pub async fn refresh(&self, refresh_token: &str) -> Result<AuthSession, BackendError> {
        let request = self
            .request(reqwest::Method::POST, "token?grant_type=refresh_token")
            .json(&RefreshRequest { refresh_token });
        let (_, text) = read_response(send(request, "auth/refresh").await?, "auth/refresh")
            .await
            .map_err(credentials_error)?;
        parse_json(&text, "auth/refresh")
    }

    /// Register a new account.
    ///
    /// # Errors
    ///
    /// Returns `BackendError::Conflict` if the email is already registered.
    #[instrument(skip(self, password), fields(email = %email))]
    pub async fn sign_up(
        &self,
        email: &Email,
        password: &str,
        full_name: Option<&str>,
    ) -> Result<SignUpOutcome, BackendError> {
        let data = full_name.map_or_else(
            || serde_json::json!({}),
            |name| serde_json::json!({ "full_name": name }),
        );
        let request = self
            .request(reqwest::Method::POST, "signup")
            .json(&SignUpRequest {
                email: email.as_str(),
                password,
                data,
            });
        let (_, text) = read_response(send(request, "auth/signup").await?, "auth/signup")
            .await
            .map_err(signup_error)?;

        Ok(match parse_json::<SignUpResponse>(&text, "auth/signup")? {
            SignUpResponse::Session(session) => SignUpOutcome::SignedIn(session),
            SignUpResponse::User(user) => SignUpOutcome::ConfirmationRequired(user),
        })
    }

    /// Look up the user behind an access token.
    ///
    /// # Errors
    ///
    /// Returns `BackendError::Unauthorized` if the token is invalid or expired.
    #[instrument(skip_all)]
    pub async fn get_user(&self, access_token: &str) -> Result<AuthUser, BackendError> {
        let request = self
            .request(reqwest::Method::GET, "user")
            .bearer_auth(access_token);
        let (_, text) = read_response(send(request, "auth/user").await?, "auth/user").await?;
        parse_json(&text, "auth/user")
    }

    /// Revoke the session behind an access token.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    #[instrument(skip_all)]
    pub async fn sign_out(&self, access_token: &str) -> Result<(), BackendError> {
        let request = self
            .request(reqwest::Method::POST, "logout")
            .bearer_auth(access_token);
        read_response(send(request, "auth/logout").await?, "auth/logout").await?;
        Ok(())
    }
}

// The token endpoint answers bad credentials with 400 `invalid_grant`.
fn credentials_error(err: BackendError) -> BackendError {
    match err {
        BackendError::Api { status: 400, body } => BackendError::Unauthorized(body.message),
        other => other,
    }
}

fn signup_error(err: BackendError) -> BackendError {
    match err {
        BackendError::Api { status, body }
            if status == 422
                || body.code.as_deref() == Some("user_already_exists")
                || body.message.contains("already registered") =>
        {
            BackendError::Conflict(body.message)
        }
        other => other,
    }
}
