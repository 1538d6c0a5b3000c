//! Integration test support for Parfumerie.
//!
//! [`FakeBackend`] stands in for the hosted REST, RPC and auth service: an
//! axum server on a random local port that records every request and
//! answers from a table of scripted JSON responses. The tests under
//! `tests/` point a real `BackendClient` (or a whole storefront/admin
//! router) at it.
//!
//! ```rust,ignore
//! let fake = FakeBackend::start().await;
//! fake.respond(Method::GET, "/rest/v1/brands", Scripted::json(json!([])));
//! let client = BackendClient::new(&fake.config());
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use axum::{
    Router,
    body::{Body, Bytes},
    extract::State,
    http::{HeaderMap, HeaderName, HeaderValue, Method, Request, StatusCode, Uri, header},
    response::{IntoResponse, Response},
};
use serde_json::{Value, json};
use uuid::Uuid;

use parfumerie_backend::BackendConfig;

/// Anon key the fake expects; any string works.
pub const ANON_KEY: &str = "anon-test-key";

/// Address every routed test request claims to come from.
pub const CLIENT_IP: &str = "203.0.113.7";

/// A canned response.
#[derive(Debug, Clone)]
pub struct Scripted {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Value,
}

impl Scripted {
    /// `200 OK` with a JSON body.
    #[must_use]
    pub fn json(body: Value) -> Self {
        Self {
            status: StatusCode::OK,
            headers: HeaderMap::new(),
            body,
        }
    }

    /// An error status with a REST-style error body.
    #[must_use]
    pub fn error(status: StatusCode, code: &str, message: &str) -> Self {
        Self {
            status,
            headers: HeaderMap::new(),
            body: json!({ "code": code, "message": message }),
        }
    }

    /// Replace the status.
    #[must_use]
    pub const fn status(mut self, status: StatusCode) -> Self {
        self.status = status;
        self
    }

    /// Add a response header.
    ///
    /// # Panics
    ///
    /// Panics if `value` is not a valid header value.
    #[must_use]
    pub fn header(mut self, name: &'static str, value: &str) -> Self {
        self.headers.insert(
            HeaderName::from_static(name),
            HeaderValue::from_str(value).expect("invalid header value"),
        );
        self
    }
}

/// One request as the fake saw it.
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: Method,
    pub path: String,
    pub query: String,
    pub headers: HeaderMap,
    /// Parsed JSON body; `Null` when empty, a string when not JSON.
    pub body: Value,
}

impl RecordedRequest {
    /// A header as text, if present.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }
}

#[derive(Default)]
struct FakeState {
    routes: Mutex<HashMap<(Method, String), Scripted>>,
    requests: Mutex<Vec<RecordedRequest>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// In-process stand-in for the hosted backend.
pub struct FakeBackend {
    addr: SocketAddr,
    state: Arc<FakeState>,
}

impl FakeBackend {
    /// Bind to a random local port and start serving.
    ///
    /// # Panics
    ///
    /// Panics if the listener cannot bind.
    pub async fn start() -> Self {
        let state = Arc::new(FakeState::default());
        let app = Router::new()
            .fallback(handle)
            .with_state(Arc::clone(&state));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind fake backend");
        let addr = listener.local_addr().expect("Fake backend has no address");
        tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        Self { addr, state }
    }

    /// Base URL of the fake.
    #[must_use]
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Backend settings pointing at the fake.
    #[must_use]
    pub fn config(&self) -> BackendConfig {
        BackendConfig::new(&self.url(), ANON_KEY)
    }

    /// Answer `method path` with `response` from now on.
    pub fn respond(&self, method: Method, path: &str, response: Scripted) {
        lock(&self.state.routes).insert((method, path.to_string()), response);
    }

    /// Every request received so far.
    #[must_use]
    pub fn requests(&self) -> Vec<RecordedRequest> {
        lock(&self.state.requests).clone()
    }

    /// Requests received for `method path`.
    #[must_use]
    pub fn requests_to(&self, method: &Method, path: &str) -> Vec<RecordedRequest> {
        lock(&self.state.requests)
            .iter()
            .filter(|r| r.method == *method && r.path == path)
            .cloned()
            .collect()
    }

    /// Number of requests received for `method path`.
    #[must_use]
    pub fn hits(&self, method: &Method, path: &str) -> usize {
        self.requests_to(method, path).len()
    }

    /// Script the password grant and token refresh for one user.
    pub fn sign_in_as(&self, user_id: Uuid, email: &str) {
        let session = Scripted::json(auth_session(user_id, email));
        self.respond(Method::POST, "/auth/v1/token", session);
        self.respond(Method::POST, "/auth/v1/logout", Scripted::json(json!({})));
    }
}

async fn handle(
    State(state): State<Arc<FakeState>>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let body = if body.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&body)
            .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&body).into_owned()))
    };
    let path = uri.path().to_string();
    lock(&state.requests).push(RecordedRequest {
        method: method.clone(),
        path: path.clone(),
        query: uri.query().unwrap_or_default().to_string(),
        headers,
        body,
    });

    let scripted = lock(&state.routes).get(&(method, path.clone())).cloned();
    match scripted {
        Some(scripted) => (
            scripted.status,
            scripted.headers,
            axum::Json(scripted.body),
        )
            .into_response(),
        None => (
            StatusCode::NOT_FOUND,
            axum::Json(json!({ "message": format!("no scripted response for {path}") })),
        )
            .into_response(),
    }
}

/// Token endpoint body for a signed-in user whose token is good for an hour.
#[must_use]
pub fn auth_session(user_id: Uuid, email: &str) -> Value {
    json!({
        "access_token": format!("access-{user_id}"),
        "refresh_token": format!("refresh-{user_id}"),
        "expires_in": 3600,
        "expires_at": 4_102_444_800_i64,
        "user": { "id": user_id, "email": email, "user_metadata": {} }
    })
}

// =============================================================================
// Router helpers
// =============================================================================

/// A JSON request from [`CLIENT_IP`], optionally carrying a session cookie.
///
/// # Panics
///
/// Panics if the request cannot be built.
#[must_use]
pub fn request(method: Method, uri: &str, cookie: Option<&str>, body: Option<&Value>) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("x-forwarded-for", CLIENT_IP);
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    let request = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string())),
        None => builder.body(Body::empty()),
    };
    request.expect("Failed to build request")
}

/// `name=value` of the session cookie set by `response`, if any.
#[must_use]
pub fn session_cookie(response: &Response, name: &str) -> Option<String> {
    let prefix = format!("{name}=");
    response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .find(|v| v.starts_with(&prefix))
        .and_then(|v| v.split(';').next())
        .map(str::to_string)
}

/// Status and JSON body of a response; an empty body reads as `Null`.
///
/// # Panics
///
/// Panics if the body cannot be read or is not JSON.
pub async fn read_json(response: Response) -> (StatusCode, Value) {
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("Failed to read body");
    if bytes.is_empty() {
        return (status, Value::Null);
    }
    (
        status,
        serde_json::from_slice(&bytes).expect("Response body is not JSON"),
    )
}
