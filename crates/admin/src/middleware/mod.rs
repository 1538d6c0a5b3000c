//! HTTP middleware stack for admin.
//!
//! # Middleware Order (bottom to top in Router)
//!
//! 1. Sentry layer (capture errors)
//! 2. `TraceLayer` (request tracing)
//! 3. Request ID (add unique ID to each request)
//! 4. Security headers (`SetResponseHeaderLayer`: nosniff, no framing, no caching)
//! 5. Session layer (tower-sessions with the in-memory store)
//! 6. Login rate limiting (governor)
//! 7. `RequireStaff` extractor on every other route

pub mod auth;
pub mod rate_limit;
pub mod request_id;
pub mod session;

pub use auth::{RequireStaff, clear_current_staff, set_current_staff};
pub use rate_limit::login_rate_limiter;
pub use request_id::request_id_middleware;
pub use session::create_session_layer;
