//! HTTP route handlers for admin.
//!
//! Everything except `/health` and `/auth/login` requires `RequireStaff`.
//!
//! # Route Structure
//!
//! ```text
//! GET  /health                          - Liveness check
//!
//! # Auth
//! POST /auth/login                      - Password sign-in, staff only (rate limited)
//! POST /auth/logout                     - Sign out
//!
//! # Dashboard
//! GET  /dashboard                       - Counts, 30-day revenue, low stock
//!
//! # Products
//! GET    /products                      - Listing (search, brand, category, page)
//! POST   /products                      - Create
//! GET    /products/{id}                 - Detail with variants and images
//! PUT    /products/{id}                 - Update
//! DELETE /products/{id}                 - Delete
//! POST   /products/{id}/variants        - Add a variant
//! POST   /products/{id}/images          - Upload an image (multipart)
//!
//! # Variants and stock
//! PUT  /variants/{id}                   - Update a variant
//! POST /variants/{id}/stock/adjust      - Change stock by a delta
//! POST /variants/{id}/stock/set         - Set stock to a target
//!
//! # Orders
//! GET /orders                           - Listing (status, email, page)
//! GET /orders/{id}                      - Detail with items
//! PUT /orders/{id}/status               - Move to the next status
//!
//! # Brands, categories, discounts
//! GET/POST /brands, PUT/DELETE /brands/{id}
//! GET/POST /categories, PUT/DELETE /categories/{id}
//! GET/POST /discounts, GET/PUT/DELETE /discounts/{id}
//!
//! # Reviews
//! GET    /reviews                       - Moderation queue (?approved=)
//! POST   /reviews/{id}/approve          - Publish
//! DELETE /reviews/{id}                  - Remove
//!
//! # Activity
//! GET /activity                         - Audit log, newest first
//! ```

pub mod activity;
pub mod auth;
pub mod brands;
pub mod categories;
pub mod dashboard;
pub mod discounts;
pub mod orders;
pub mod products;
pub mod reviews;
pub mod variants;

use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{get, post, put},
};
use serde::{Deserialize, Serialize};

use parfumerie_backend::storage::MAX_UPLOAD_BYTES;
use parfumerie_backend::{Page, Pagination};
use parfumerie_core::catalog::{CatalogError, slugify, validate_slug};

use crate::middleware::login_rate_limiter;
use crate::state::AppState;

/// Room for multipart framing around the largest accepted image.
const UPLOAD_BODY_LIMIT: usize = MAX_UPLOAD_BYTES + 64 * 1024;

/// `?page=&per_page=` query parameters.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct PageParams {
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

impl PageParams {
    #[must_use]
    pub fn pagination(self) -> Pagination {
        Pagination::from_params(self.page, self.per_page)
    }
}

/// A page of results as returned to clients.
#[derive(Debug, Serialize)]
pub struct PageResponse<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub page: u32,
    pub per_page: u32,
    pub total_pages: u64,
}

impl<T> PageResponse<T> {
    #[must_use]
    pub fn new(page: Page<T>, pagination: Pagination) -> Self {
        Self {
            total_pages: pagination.total_pages(page.count),
            total: page.count,
            items: page.data,
            page: pagination.page,
            per_page: pagination.per_page,
        }
    }
}

/// Trim `name` and pick the slug: the given one, else one derived from
/// the name. Either way the slug must be valid.
///
/// # Errors
///
/// Returns `CatalogError` for an empty name or an invalid slug.
pub fn name_and_slug(name: &str, slug: Option<&str>) -> Result<(String, String), CatalogError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(CatalogError::EmptyName);
    }
    let slug = slug
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map_or_else(|| slugify(name), String::from);
    validate_slug(&slug)?;
    Ok((name.to_string(), slug))
}

/// Create the auth routes router.
pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/login", post(auth::login))
        .layer(login_rate_limiter())
        .route("/logout", post(auth::logout))
}

/// Create the product routes router.
pub fn product_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(products::index).post(products::create))
        .route(
            "/{id}",
            get(products::show)
                .put(products::update)
                .delete(products::delete),
        )
        .route("/{id}/variants", post(products::create_variant))
        .route(
            "/{id}/images",
            post(products::upload_image).layer(DefaultBodyLimit::max(UPLOAD_BODY_LIMIT)),
        )
}

/// Create the variant and stock routes router.
pub fn variant_routes() -> Router<AppState> {
    Router::new()
        .route("/{id}", put(variants::update))
        .route("/{id}/stock/adjust", post(variants::adjust_stock))
        .route("/{id}/stock/set", post(variants::set_stock))
}

/// Create the order routes router.
pub fn order_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(orders::index))
        .route("/{id}", get(orders::show))
        .route("/{id}/status", put(orders::update_status))
}

/// Create the brand, category and discount routes.
pub fn catalog_routes() -> Router<AppState> {
    Router::new()
        .route("/brands", get(brands::index).post(brands::create))
        .route("/brands/{id}", put(brands::update).delete(brands::delete))
        .route(
            "/categories",
            get(categories::index).post(categories::create),
        )
        .route(
            "/categories/{id}",
            put(categories::update).delete(categories::delete),
        )
        .route("/discounts", get(discounts::index).post(discounts::create))
        .route(
            "/discounts/{id}",
            get(discounts::show)
                .put(discounts::update)
                .delete(discounts::delete),
        )
}

/// Create the review moderation routes router.
pub fn review_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(reviews::index))
        .route("/{id}", axum::routing::delete(reviews::delete))
        .route("/{id}/approve", post(reviews::approve))
}

/// Build the complete admin router.
pub fn routes() -> Router<AppState> {
    Router::new()
        .nest("/auth", auth_routes())
        .route("/dashboard", get(dashboard::index))
        .nest("/products", product_routes())
        .nest("/variants", variant_routes())
        .nest("/orders", order_routes())
        .nest("/reviews", review_routes())
        .route("/activity", get(activity::index))
        .merge(catalog_routes())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slug_derived_from_name() {
        assert_eq!(
            name_and_slug("  Eau de Parfum ", None),
            Ok(("Eau de Parfum".to_string(), "eau-de-parfum".to_string()))
        );
        assert_eq!(
            name_and_slug("Oud", Some(" ")),
            Ok(("Oud".to_string(), "oud".to_string()))
        );
    }

    #[test]
    fn test_explicit_slug_is_checked() {
        assert_eq!(
            name_and_slug("Oud", Some("Oud Wood")),
            Err(CatalogError::InvalidSlug)
        );
        assert_eq!(name_and_slug("   ", None), Err(CatalogError::EmptyName));
    }
}
