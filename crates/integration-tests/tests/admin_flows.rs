//! Admin API flows against the fake backend: staff sign-in, stock changes
//! and the activity trail they leave.

#![allow(clippy::unwrap_used, clippy::indexing_slicing)]

use axum::Router;
use axum::http::{Method, StatusCode};
use serde_json::{Value, json};
use tower::ServiceExt;
use uuid::Uuid;

use parfumerie_admin::build_router;
use parfumerie_admin::config::AdminConfig;
use parfumerie_admin::middleware::session::SESSION_COOKIE_NAME;
use parfumerie_admin::state::AppState;
use parfumerie_integration_tests::{FakeBackend, Scripted, read_json, request, session_cookie};

const STAFF_EMAIL: &str = "staff@parfumerie.test";
const IS_STAFF: &str = "/rest/v1/rpc/is_staff";
const VARIANTS: &str = "/rest/v1/product_variants";
const ADJUST_STOCK: &str = "/rest/v1/rpc/adjust_stock";
const ACTIVITY_LOGS: &str = "/rest/v1/activity_logs";

struct Admin {
    fake: FakeBackend,
    app: Router,
    staff_id: Uuid,
}

impl Admin {
    async fn start(is_staff: bool) -> Self {
        let fake = FakeBackend::start().await;
        let staff_id = Uuid::new_v4();
        fake.sign_in_as(staff_id, STAFF_EMAIL);
        fake.respond(Method::POST, IS_STAFF, Scripted::json(json!(is_staff)));

        let config = AdminConfig::new(fake.config(), "http://localhost:3001");
        let app = build_router(AppState::new(config));
        Self { fake, app, staff_id }
    }

    async fn send(&self, method: Method, uri: &str, cookie: Option<&str>, body: Option<Value>) -> axum::response::Response {
        self.app
            .clone()
            .oneshot(request(method, uri, cookie, body.as_ref()))
            .await
            .unwrap()
    }

    async fn login(&self) -> (StatusCode, Value, Option<String>) {
        let response = self
            .send(
                Method::POST,
                "/auth/login",
                None,
                Some(json!({ "email": STAFF_EMAIL, "password": "correct horse" })),
            )
            .await;
        let cookie = session_cookie(&response, SESSION_COOKIE_NAME);
        let (status, body) = read_json(response).await;
        (status, body, cookie)
    }

    fn stock(&self, level: i32, after: i32) {
        self.fake.respond(
            Method::GET,
            VARIANTS,
            Scripted::json(json!([{ "id": 11, "stock": level }])),
        );
        self.fake
            .respond(Method::POST, ADJUST_STOCK, Scripted::json(json!(after)));
    }
}

#[tokio::test]
async fn staff_login_checks_membership_with_user_token() {
    let admin = Admin::start(true).await;

    let (status, body, cookie) = admin.login().await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["email"], STAFF_EMAIL);
    assert_eq!(body["id"], admin.staff_id.to_string());
    assert!(cookie.is_some());

    let check = &admin.fake.requests_to(&Method::POST, IS_STAFF)[0];
    assert_eq!(
        check.header("authorization"),
        Some(format!("Bearer access-{}", admin.staff_id).as_str())
    );
}

#[tokio::test]
async fn non_staff_login_is_forbidden_and_signed_out() {
    let admin = Admin::start(false).await;

    let (status, body, _) = admin.login().await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "Staff access required");
    assert_eq!(admin.fake.hits(&Method::POST, "/auth/v1/logout"), 1);
}

#[tokio::test]
async fn bad_password_is_unauthorized() {
    let admin = Admin::start(true).await;
    admin.fake.respond(
        Method::POST,
        "/auth/v1/token",
        Scripted::json(json!({ "error": "invalid_grant", "error_description": "Invalid login credentials" }))
            .status(StatusCode::BAD_REQUEST),
    );

    let (status, body, cookie) = admin.login().await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "Invalid email or password");
    assert!(cookie.is_none());
    assert_eq!(admin.fake.hits(&Method::POST, IS_STAFF), 0);
}

#[tokio::test]
async fn stock_adjustment_is_applied_and_logged() {
    let admin = Admin::start(true).await;
    admin.stock(4, 1);
    let (_, _, cookie) = admin.login().await;

    let response = admin
        .send(
            Method::POST,
            "/variants/11/stock/adjust",
            cookie.as_deref(),
            Some(json!({ "delta": -3, "reason": "damaged in transit" })),
        )
        .await;
    let (status, body) = read_json(response).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "variant_id": 11, "stock": 1 }));

    let rpc = &admin.fake.requests_to(&Method::POST, ADJUST_STOCK)[0];
    assert_eq!(rpc.body, json!({ "p_variant_id": 11, "p_delta": -3 }));
    assert_eq!(
        rpc.header("authorization"),
        Some(format!("Bearer access-{}", admin.staff_id).as_str())
    );

    let logged = &admin.fake.requests_to(&Method::POST, ACTIVITY_LOGS)[0];
    assert_eq!(logged.body["action"], "stock_adjusted");
    assert_eq!(logged.body["entity_type"], "variant");
    assert_eq!(logged.body["entity_id"], "11");
    assert_eq!(logged.body["actor_id"], admin.staff_id.to_string());
    assert_eq!(logged.body["details"]["reason"], "damaged in transit");
}

#[tokio::test]
async fn overdrawing_stock_is_rejected_without_a_write() {
    let admin = Admin::start(true).await;
    admin.stock(2, 0);
    let (_, _, cookie) = admin.login().await;

    let response = admin
        .send(
            Method::POST,
            "/variants/11/stock/adjust",
            cookie.as_deref(),
            Some(json!({ "delta": -3 })),
        )
        .await;
    let (status, _) = read_json(response).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(admin.fake.hits(&Method::POST, ADJUST_STOCK), 0);
    assert_eq!(admin.fake.hits(&Method::POST, ACTIVITY_LOGS), 0);
}

#[tokio::test]
async fn zero_adjustment_leaves_no_trace() {
    let admin = Admin::start(true).await;
    admin.stock(4, 4);
    let (_, _, cookie) = admin.login().await;

    let response = admin
        .send(
            Method::POST,
            "/variants/11/stock/adjust",
            cookie.as_deref(),
            Some(json!({ "delta": 0 })),
        )
        .await;
    let (status, body) = read_json(response).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["stock"], 4);
    assert_eq!(admin.fake.hits(&Method::POST, ADJUST_STOCK), 0);
    assert_eq!(admin.fake.hits(&Method::POST, ACTIVITY_LOGS), 0);
}

#[tokio::test]
async fn setting_stock_to_its_current_level_leaves_no_trace() {
    let admin = Admin::start(true).await;
    admin.stock(4, 4);
    let (_, _, cookie) = admin.login().await;

    let response = admin
        .send(
            Method::POST,
            "/variants/11/stock/set",
            cookie.as_deref(),
            Some(json!({ "stock": 4, "reason": "stocktake" })),
        )
        .await;
    let (status, body) = read_json(response).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "variant_id": 11, "stock": 4 }));
    assert_eq!(admin.fake.hits(&Method::POST, ADJUST_STOCK), 0);
    assert_eq!(admin.fake.hits(&Method::POST, ACTIVITY_LOGS), 0);
}

#[tokio::test]
async fn setting_stock_logs_previous_and_new_level() {
    let admin = Admin::start(true).await;
    admin.stock(4, 9);
    let (_, _, cookie) = admin.login().await;

    let response = admin
        .send(
            Method::POST,
            "/variants/11/stock/set",
            cookie.as_deref(),
            Some(json!({ "stock": 9 })),
        )
        .await;
    let (status, body) = read_json(response).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["stock"], 9);

    let rpc = &admin.fake.requests_to(&Method::POST, ADJUST_STOCK)[0];
    assert_eq!(rpc.body["p_delta"], 5);
    let logged = &admin.fake.requests_to(&Method::POST, ACTIVITY_LOGS)[0];
    assert_eq!(logged.body["details"]["previous"], 4);
    assert_eq!(logged.body["details"]["stock"], 9);
}

#[tokio::test]
async fn logout_ends_the_staff_session() {
    let admin = Admin::start(true).await;
    let (_, _, cookie) = admin.login().await;

    let response = admin
        .send(Method::POST, "/auth/logout", cookie.as_deref(), None)
        .await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    assert_eq!(admin.fake.hits(&Method::POST, "/auth/v1/logout"), 1);

    let response = admin
        .send(Method::GET, "/dashboard", cookie.as_deref(), None)
        .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}
