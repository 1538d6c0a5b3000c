//! Unified error handling for admin.

use axum::{
    Json,
    extract::multipart::MultipartError,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

use parfumerie_backend::repos::InventoryError;
use parfumerie_backend::BackendError;
use parfumerie_core::EmailError;
use parfumerie_core::catalog::CatalogError;
use parfumerie_core::stock::StockError;

/// Application-level error type for the admin API.
#[derive(Debug, Error)]
pub enum AppError {
    /// Backend request failed.
    #[error("Backend error: {0}")]
    Backend(#[from] BackendError),

    /// Session store failed.
    #[error("Session error: {0}")]
    Session(#[from] tower_sessions::session::Error),

    /// Stock change rejected before reaching the backend.
    #[error(transparent)]
    Stock(#[from] StockError),

    #[error(transparent)]
    Catalog(#[from] CatalogError),

    #[error(transparent)]
    Email(#[from] EmailError),

    /// Malformed upload.
    #[error("Upload error: {0}")]
    Multipart(#[from] MultipartError),

    /// Input failed a domain rule.
    #[error("Validation failed: {0}")]
    Validation(String),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// User is not authenticated.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// User lacks permission.
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Bad request from client.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<InventoryError> for AppError {
    fn from(err: InventoryError) -> Self {
        match err {
            InventoryError::Stock(err) => Self::Stock(err),
            InventoryError::Backend(err) => Self::Backend(err),
        }
    }
}

impl AppError {
    /// Map a backend not-found onto a named `NotFound`.
    pub fn or_not_found(err: BackendError, what: impl FnOnce() -> String) -> Self {
        if err.is_not_found() {
            Self::NotFound(what())
        } else {
            Self::Backend(err)
        }
    }

    /// HTTP status for this error.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::Backend(err) => match err {
                BackendError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
                BackendError::Forbidden(_) => StatusCode::FORBIDDEN,
                BackendError::Conflict(_) => StatusCode::CONFLICT,
                BackendError::NotFound(_) => StatusCode::NOT_FOUND,
                BackendError::RateLimited(_) => StatusCode::TOO_MANY_REQUESTS,
                _ => StatusCode::BAD_GATEWAY,
            },
            Self::Session(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Stock(_) | Self::Catalog(_) | Self::Email(_) | Self::Validation(_) => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            Self::Multipart(_) | Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        // Log server errors with Sentry
        if status.is_server_error() {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Admin request error"
            );
        }

        // Don't expose internal error details to clients
        let message = match &self {
            Self::Session(_) | Self::Internal(_) => "Internal server error".to_string(),
            Self::Backend(BackendError::Conflict(_)) => "Already exists or still in use".to_string(),
            Self::Backend(_) if status.is_server_error() => "External service error".to_string(),
            Self::Backend(_) => status
                .canonical_reason()
                .unwrap_or("Request failed")
                .to_string(),
            Self::Stock(e) => e.to_string(),
            Self::Catalog(e) => e.to_string(),
            Self::Email(e) => e.to_string(),
            Self::Validation(msg)
            | Self::NotFound(msg)
            | Self::Unauthorized(msg)
            | Self::Forbidden(msg)
            | Self::BadRequest(msg) => msg.clone(),
            Self::Multipart(e) => e.body_text(),
        };

        (status, Json(json!({ "error": message }))).into_response()
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

/// Set the Sentry user context from a staff user ID.
pub fn set_sentry_user(user_id: &impl ToString, email: Option<&str>) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(user_id.to_string()),
            email: email.map(String::from),
            ..Default::default()
        }));
    });
}

/// Clear the Sentry user context.
pub fn clear_sentry_user() {
    sentry::configure_scope(|scope| {
        scope.set_user(None);
    });
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    async fn read(err: AppError) -> (StatusCode, serde_json::Value) {
        let response = err.into_response();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[test]
    fn test_app_error_display() {
        let err = AppError::NotFound("order 123".to_string());
        assert_eq!(err.to_string(), "Not found: order 123");

        let err = AppError::BadRequest("invalid input".to_string());
        assert_eq!(err.to_string(), "Bad request: invalid input");
    }

    #[test]
    fn test_app_error_status_codes() {
        assert_eq!(
            AppError::Forbidden("staff only".into()).status(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            AppError::Stock(StockError::NegativeTarget(-1)).status(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            AppError::Catalog(CatalogError::InvalidSlug).status(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            AppError::Backend(BackendError::Conflict("23505".into())).status(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            AppError::Backend(BackendError::UnfilteredMutation("delete", "orders".into())).status(),
            StatusCode::BAD_GATEWAY
        );
    }

    #[test]
    fn test_inventory_error_conversion() {
        let err = AppError::from(InventoryError::Stock(StockError::WouldGoNegative {
            current: 2,
            delta: -3,
        }));
        assert!(matches!(err, AppError::Stock(_)));
    }

    #[tokio::test]
    async fn test_internal_details_hidden() {
        let (status, body) = read(AppError::Internal("pool exhausted".into())).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"], "Internal server error");

        let (status, body) = read(AppError::Backend(BackendError::RateLimited(3)))
            .await;
        assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(body["error"], "Too Many Requests");

        let (status, body) = read(AppError::Backend(BackendError::UnfilteredMutation(
            "update",
            "orders".into(),
        )))
        .await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert_eq!(body["error"], "External service error");
    }

    #[tokio::test]
    async fn test_validation_message_shown() {
        let (status, body) = read(AppError::Stock(StockError::NegativeTarget(-4))).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["error"], "stock level -4 is negative");
    }
}
