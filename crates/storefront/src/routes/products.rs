//! Product listing and detail handlers.

use axum::{
    Json,
    extract::{Path, Query, State},
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use parfumerie_backend::{Page, Pagination};
use parfumerie_backend::repos::{
    BrandRepository, CategoryRepository, ProductFilter, ProductRepository, ProductSort,
    ReviewRepository, WishlistRepository,
};
use parfumerie_core::catalog::{descendant_ids, find_by_slug};
use parfumerie_core::models::Product;
use parfumerie_core::reviews::RatingSummary;
use parfumerie_core::{CurrencyCode, Gender};

use super::PageResponse;
use crate::error::{AppError, Result};
use crate::middleware::OptionalAuth;
use crate::state::AppState;

/// Listing query parameters.
#[derive(Debug, Default, Deserialize)]
pub struct ProductListQuery {
    pub search: Option<String>,
    /// Brand slug.
    pub brand: Option<String>,
    /// Category slug; includes subcategories.
    pub category: Option<String>,
    pub gender: Option<Gender>,
    pub featured: Option<bool>,
    pub min_price: Option<Decimal>,
    pub max_price: Option<Decimal>,
    #[serde(default)]
    pub sort: ProductSort,
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

/// Product listing.
#[derive(Debug, Serialize)]
pub struct ProductListResponse {
    #[serde(flatten)]
    pub page: PageResponse<Product>,
    pub currency: CurrencyCode,
}

/// Product detail.
#[derive(Debug, Serialize)]
pub struct ProductDetailResponse {
    pub product: Product,
    pub rating: RatingSummary,
    pub in_stock: bool,
    /// `None` when signed out.
    pub in_wishlist: Option<bool>,
    pub currency: CurrencyCode,
}

/// List active products.
///
/// Unknown brand or category slugs produce an empty page, not a 404.
#[instrument(skip(state))]
pub async fn index(
    State(state): State<AppState>,
    Query(query): Query<ProductListQuery>,
) -> Result<Json<ProductListResponse>> {
    let client = state.backend();
    let pagination = Pagination::from_params(query.page, query.per_page);
    let currency = state.config().currency;

    let mut filter = ProductFilter {
        search: query.search.filter(|s| !s.trim().is_empty()),
        gender: query.gender,
        featured: query.featured,
        min_price: query.min_price,
        max_price: query.max_price,
        sort: query.sort,
        ..ProductFilter::default()
    };

    if let Some(slug) = query.brand.as_deref() {
        match BrandRepository::new(client).find_by_slug(slug).await? {
            Some(brand) => filter.brand_id = Some(brand.id),
            None => return Ok(Json(empty_listing(pagination, currency))),
        }
    }

    if let Some(slug) = query.category.as_deref() {
        let tree = CategoryRepository::new(client).tree().await?;
        match find_by_slug(&tree, slug) {
            Some(node) => filter.category_ids = descendant_ids(&tree, node.category.id),
            None => return Ok(Json(empty_listing(pagination, currency))),
        }
    }

    let page = ProductRepository::new(client)
        .list(&filter, pagination)
        .await?;

    Ok(Json(ProductListResponse {
        page: PageResponse::new(page, pagination),
        currency,
    }))
}

fn empty_listing(pagination: Pagination, currency: CurrencyCode) -> ProductListResponse {
    let page = Page {
        data: Vec::new(),
        count: 0,
    };
    ProductListResponse {
        page: PageResponse::new(page, pagination),
        currency,
    }
}

/// Product detail by slug.
#[instrument(skip(state, user))]
pub async fn show(
    State(state): State<AppState>,
    OptionalAuth(user): OptionalAuth,
    Path(slug): Path<String>,
) -> Result<Json<ProductDetailResponse>> {
    let client = state.backend();
    let product = ProductRepository::new(client)
        .get_by_slug(&slug)
        .await
        .map_err(|e| {
            if e.is_not_found() {
                AppError::NotFound(format!("product {slug}"))
            } else {
                e.into()
            }
        })?;

    let rating = ReviewRepository::new(client).summary(product.id).await?;

    let in_wishlist = match user {
        Some(user) => {
            let user_client = user.client(client);
            let saved = WishlistRepository::new(&user_client)
                .product_ids(user.id)
                .await?;
            Some(saved.contains(product.id))
        }
        None => None,
    };

    Ok(Json(ProductDetailResponse {
        in_stock: product.in_stock(),
        product,
        rating,
        in_wishlist,
        currency: state.config().currency,
    }))
}
