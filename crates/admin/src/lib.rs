//! Parfumerie admin library.
//!
//! The staff-only JSON API: dashboard, catalog and stock management,
//! orders, discounts, review moderation and the activity log. Every call
//! runs with the signed-in staff member's own token, so row-level
//! policies in the backend still apply.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod activity;
pub mod config;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod state;

use axum::{
    Router,
    extract::Request,
    http::{HeaderValue, header},
    routing::get,
};
use tower_http::set_header::SetResponseHeaderLayer;
use tower_http::trace::TraceLayer;

use crate::state::AppState;

/// Build the full admin router, layers included.
pub fn build_router(state: AppState) -> Router {
    let session_layer = middleware::create_session_layer(state.config());

    Router::new()
        .route("/health", get(health))
        .merge(routes::routes())
        .layer(session_layer)
        .layer(SetResponseHeaderLayer::overriding(
            header::X_CONTENT_TYPE_OPTIONS,
            HeaderValue::from_static("nosniff"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::X_FRAME_OPTIONS,
            HeaderValue::from_static("DENY"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::CACHE_CONTROL,
            HeaderValue::from_static("no-store"),
        ))
        .layer(axum::middleware::from_fn(middleware::request_id_middleware))
        .layer(TraceLayer::new_for_http().make_span_with(|request: &Request| {
            tracing::info_span!(
                "admin_request",
                method = %request.method(),
                uri = %request.uri(),
                request_id = tracing::field::Empty,
            )
        }))
        .with_state(state)
        .layer(sentry_tower::NewSentryLayer::new_from_top())
        .layer(sentry_tower::SentryHttpLayer::new().enable_transaction())
}

/// Liveness health check endpoint.
async fn health() -> &'static str {
    "ok"
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use axum::body::{Body, to_bytes};
    use axum::http::{Method, Request as HttpRequest, StatusCode, header};
    use parfumerie_backend::BackendConfig;
    use tower::ServiceExt;

    use super::*;
    use crate::config::AdminConfig;

    fn app() -> Router {
        let backend = BackendConfig::new("http://127.0.0.1:9", "anon-key");
        build_router(AppState::new(AdminConfig::new(
            backend,
            "http://localhost:3001",
        )))
    }

    fn request(method: Method, uri: &str, body: Option<&str>) -> HttpRequest<Body> {
        let builder = HttpRequest::builder()
            .method(method)
            .uri(uri)
            .header("x-forwarded-for", "198.51.100.20");
        match body {
            Some(json) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        }
    }

    async fn error_message(response: axum::response::Response) -> String {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        body["error"].as_str().unwrap_or_default().to_string()
    }

    #[tokio::test]
    async fn test_health_has_security_headers() {
        let response = app()
            .oneshot(request(Method::GET, "/health", None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let headers = response.headers();
        assert_eq!(headers["x-frame-options"], "DENY");
        assert_eq!(headers["x-content-type-options"], "nosniff");
        assert_eq!(headers["cache-control"], "no-store");
        assert!(headers.contains_key("x-request-id"));
    }

    #[tokio::test]
    async fn test_staff_routes_require_sign_in() {
        for (method, uri, body) in [
            (Method::GET, "/dashboard", None),
            (Method::GET, "/products?page=2", None),
            (Method::POST, "/products", Some(r#"{"name":"Iris"}"#)),
            (Method::POST, "/variants/7/stock/adjust", Some(r#"{"delta":-1}"#)),
            (Method::PUT, "/orders/3/status", Some(r#"{"status":"shipped"}"#)),
            (Method::GET, "/activity", None),
            (Method::DELETE, "/reviews/5", None),
        ] {
            let response = app().oneshot(request(method, uri, body)).await.unwrap();
            assert_eq!(response.status(), StatusCode::UNAUTHORIZED, "{uri}");
            assert_eq!(error_message(response).await, "Staff sign in required");
        }
    }

    #[tokio::test]
    async fn test_login_rejects_malformed_email() {
        let response = app()
            .oneshot(request(
                Method::POST,
                "/auth/login",
                Some(r#"{"email":"not-an-email","password":"hunter22"}"#),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn test_logout_without_session() {
        let response = app()
            .oneshot(request(Method::POST, "/auth/logout", None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
    }

    #[tokio::test]
    async fn test_unknown_route_is_404() {
        let response = app()
            .oneshot(request(Method::GET, "/customers", None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
