//! Errors returned by the backend client.

use serde::Deserialize;
use thiserror::Error;

/// Postgres error code for a unique constraint violation.
pub const UNIQUE_VIOLATION: &str = "23505";

/// Errors that can occur when talking to the hosted backend.
#[derive(Debug, Error)]
pub enum BackendError {
    /// HTTP request failed before a response arrived.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The service answered with an error body.
    #[error("Backend error ({status}): {}", .body.message)]
    Api { status: u16, body: ApiErrorBody },

    /// JSON parsing failed.
    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// Requested row does not exist.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Missing or expired credentials.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Row-level security or a permission check refused the request.
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// A uniqueness or foreign-key constraint was violated.
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Rate limited by the service.
    #[error("Rate limited, retry after {0} seconds")]
    RateLimited(u64),

    /// An update or delete had no filters and would touch every row.
    #[error("Refusing to {0} every row of `{1}` without a filter")]
    UnfilteredMutation(&'static str, String),
}

impl BackendError {
    /// Build the error for a non-success response.
    #[must_use]
    pub fn from_status(status: reqwest::StatusCode, body: ApiErrorBody) -> Self {
        if body.code.as_deref() == Some(UNIQUE_VIOLATION) || status == reqwest::StatusCode::CONFLICT
        {
            return Self::Conflict(body.message);
        }
        match status {
            reqwest::StatusCode::UNAUTHORIZED => Self::Unauthorized(body.message),
            reqwest::StatusCode::FORBIDDEN => Self::Forbidden(body.message),
            reqwest::StatusCode::NOT_FOUND => Self::NotFound(body.message),
            _ => Self::Api {
                status: status.as_u16(),
                body,
            },
        }
    }

    /// Whether the error is a unique constraint violation.
    #[must_use]
    pub const fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict(_))
    }

    /// Whether the row was missing.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

/// Error payload returned by the REST, auth and storage endpoints.
///
/// The REST API sends `code`/`message`/`details`/`hint`; the auth API uses
/// `msg` or `error_description`; storage uses `error`/`message`. All of them
/// land in `message`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ApiErrorBody {
    #[serde(default, alias = "error_code", deserialize_with = "code_as_string")]
    pub code: Option<String>,
    #[serde(default, alias = "msg", alias = "error_description")]
    pub message: String,
    #[serde(default)]
    pub details: Option<String>,
    #[serde(default)]
    pub hint: Option<String>,
}

impl ApiErrorBody {
    /// Parse an error body, falling back to the raw text.
    #[must_use]
    pub fn parse(text: &str) -> Self {
        match serde_json::from_str::<Self>(text) {
            Ok(body) if !body.message.is_empty() => body,
            Ok(body) => Self {
                message: fallback_message(text),
                ..body
            },
            Err(_) => Self {
                message: fallback_message(text),
                ..Self::default()
            },
        }
    }
}

fn fallback_message(text: &str) -> String {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        "empty response body".to_string()
    } else {
        trimmed.chars().take(200).collect()
    }
}

// The auth API sends numeric codes (`"code": 400`); REST sends strings.
fn code_as_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::String(s)) => Some(s),
        Some(serde_json::Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::StatusCode;

    #[test]
    fn test_parses_rest_error() {
        let body = ApiErrorBody::parse(
            r#"{"code":"23505","message":"duplicate key value","details":"Key (user_id, product_id) exists.","hint":null}"#,
        );
        assert_eq!(body.code.as_deref(), Some("23505"));
        assert_eq!(body.message, "duplicate key value");
        assert!(body.details.is_some());
    }

    #[test]
    fn test_parses_auth_error() {
        let body = ApiErrorBody::parse(
            r#"{"error":"invalid_grant","error_description":"Invalid login credentials"}"#,
        );
        assert_eq!(body.message, "Invalid login credentials");

        let body = ApiErrorBody::parse(r#"{"code":422,"msg":"User already registered"}"#);
        assert_eq!(body.code.as_deref(), Some("422"));
        assert_eq!(body.message, "User already registered");
    }

    #[test]
    fn test_non_json_body_kept_as_message() {
        let body = ApiErrorBody::parse("upstream timeout");
        assert_eq!(body.message, "upstream timeout");
        assert_eq!(ApiErrorBody::parse("").message, "empty response body");
    }

    #[test]
    fn test_status_mapping() {
        let body = |code: Option<&str>| ApiErrorBody {
            code: code.map(str::to_string),
            message: "m".to_string(),
            ..ApiErrorBody::default()
        };

        assert!(matches!(
            BackendError::from_status(StatusCode::BAD_REQUEST, body(Some(UNIQUE_VIOLATION))),
            BackendError::Conflict(_)
        ));
        assert!(matches!(
            BackendError::from_status(StatusCode::UNAUTHORIZED, body(None)),
            BackendError::Unauthorized(_)
        ));
        assert!(matches!(
            BackendError::from_status(StatusCode::FORBIDDEN, body(Some("42501"))),
            BackendError::Forbidden(_)
        ));
        assert!(BackendError::from_status(StatusCode::NOT_FOUND, body(None)).is_not_found());
        assert!(matches!(
            BackendError::from_status(StatusCode::BAD_REQUEST, body(Some("PGRST100"))),
            BackendError::Api { status: 400, .. }
        ));
    }
}
