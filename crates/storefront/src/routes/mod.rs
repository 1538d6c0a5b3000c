//! HTTP route handlers for storefront.
//!
//! # Route Structure
//!
//! ```text
//! GET  /health                         - Liveness check
//! GET  /health/ready                   - Backend reachability check
//!
//! # Catalog
//! GET  /products                       - Product listing (filters, sort, pagination)
//! GET  /products/{slug}                - Product detail with variants and rating summary
//! GET  /products/{id}/reviews          - Approved reviews
//! POST /products/{id}/reviews          - Submit a review (auth)
//! GET  /brands                         - All brands
//! GET  /categories                     - Category tree
//!
//! # Cart (session)
//! GET    /cart                         - Priced cart with totals
//! DELETE /cart                         - Empty the cart
//! POST   /cart/items                   - Add a variant
//! PUT    /cart/items/{variant_id}      - Set a line quantity
//! DELETE /cart/items/{variant_id}      - Remove a line
//! POST   /cart/discount                - Apply a discount code
//! DELETE /cart/discount                - Remove the discount code
//!
//! # Wishlist (auth)
//! GET  /wishlist                       - Saved products
//! POST /wishlist/{product_id}/toggle   - Save or unsave a product
//!
//! # Checkout (auth)
//! POST /checkout                       - Place an order from the cart
//!
//! # Account (auth)
//! GET    /account/orders               - Order history
//! GET    /account/orders/{id}          - Order detail
//! GET    /account/addresses            - Saved addresses
//! POST   /account/addresses            - Add an address
//! PUT    /account/addresses/{id}       - Update an address
//! DELETE /account/addresses/{id}       - Delete an address
//!
//! # Auth (rate limited)
//! POST /auth/login                     - Email and password sign-in
//! POST /auth/register                  - Create an account
//! POST /auth/logout                    - Sign out
//! GET  /auth/me                        - Current user
//! ```

pub mod account;
pub mod auth;
pub mod cart;
pub mod catalog;
pub mod checkout;
pub mod products;
pub mod reviews;
pub mod wishlist;

use axum::{
    Router,
    routing::{get, post, put},
};
use serde::{Deserialize, Serialize};

use parfumerie_backend::{Page, Pagination};

use crate::middleware::{api_rate_limiter, auth_rate_limiter};
use crate::state::AppState;

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

/// Create the auth routes router.
pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/login", post(auth::login))
        .route("/register", post(auth::register))
        .layer(auth_rate_limiter())
        .route("/logout", post(auth::logout))
        .route("/me", get(auth::me))
}

/// Create the product routes router.
pub fn product_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(products::index))
        // One parameter name per segment: a slug for detail, an id for reviews
        .route("/{product}", get(products::show))
        .route(
            "/{product}/reviews",
            get(reviews::index).post(reviews::create),
        )
}

/// Create the cart routes router.
pub fn cart_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(cart::show).delete(cart::clear))
        .route("/items", post(cart::add))
        .route(
            "/items/{variant_id}",
            put(cart::update).delete(cart::remove),
        )
        .route(
            "/discount",
            post(cart::apply_discount).delete(cart::remove_discount),
        )
}

/// Create the account routes router.
pub fn account_routes() -> Router<AppState> {
    Router::new()
        .route("/orders", get(account::orders))
        .route("/orders/{id}", get(account::order))
        .route(
            "/addresses",
            get(account::addresses).post(account::create_address),
        )
        .route(
            "/addresses/{id}",
            put(account::update_address).delete(account::delete_address),
        )
}

/// Create all routes for the storefront.
pub fn routes() -> Router<AppState> {
    let shopper = Router::new()
        .nest("/cart", cart_routes())
        .route("/wishlist", get(wishlist::index))
        .route("/wishlist/{product_id}/toggle", post(wishlist::toggle))
        .route("/checkout", post(checkout::checkout))
        .nest("/account", account_routes())
        .layer(api_rate_limiter());

    Router::new()
        .nest("/products", product_routes())
        .route("/brands", get(catalog::brands))
        .route("/categories", get(catalog::categories))
        .nest("/auth", auth_routes())
        .merge(shopper)
}
