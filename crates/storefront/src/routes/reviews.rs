//! Product review handlers.

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use parfumerie_backend::repos::{ProductRepository, ReviewRepository};
use parfumerie_core::ProductId;
use parfumerie_core::models::{NewReview, Review};
use parfumerie_core::reviews::{self, RatingSummary};

use super::{PageParams, PageResponse};
use crate::error::{AppError, Result, add_breadcrumb};
use crate::middleware::RequireAuth;
use crate::state::AppState;

/// Approved reviews and the rating summary.
#[derive(Debug, Serialize)]
pub struct ReviewListResponse {
    pub summary: RatingSummary,
    #[serde(flatten)]
    pub reviews: PageResponse<Review>,
}

/// Review submission.
#[derive(Debug, Deserialize)]
pub struct ReviewForm {
    pub rating: i16,
    pub title: Option<String>,
    pub body: String,
}

/// Approved reviews of a product, newest first.
#[instrument(skip(state))]
pub async fn index(
    State(state): State<AppState>,
    Path(product_id): Path<ProductId>,
    Query(params): Query<PageParams>,
) -> Result<Json<ReviewListResponse>> {
    let repo = ReviewRepository::new(state.backend());
    let pagination = params.pagination();
    let page = repo.list_approved(product_id, pagination).await?;
    let summary = repo.summary(product_id).await?;

    Ok(Json(ReviewListResponse {
        summary,
        reviews: PageResponse::new(page, pagination),
    }))
}

/// Submit a review. It is hidden until staff approve it.
#[instrument(skip(state, user, form), fields(user_id = %user.id))]
pub async fn create(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(product_id): Path<ProductId>,
    Json(form): Json<ReviewForm>,
) -> Result<(StatusCode, Json<Review>)> {
    let valid = reviews::validate(form.rating, form.title.as_deref(), &form.body)?;

    ProductRepository::new(state.backend())
        .get(product_id)
        .await
        .map_err(|e| {
            if e.is_not_found() {
                AppError::NotFound(format!("product {product_id}"))
            } else {
                e.into()
            }
        })?;

    let client = user.client(state.backend());
    let review = ReviewRepository::new(&client)
        .create(&NewReview {
            product_id,
            user_id: user.id,
            rating: valid.rating,
            title: valid.title,
            body: valid.body,
        })
        .await
        .map_err(|e| {
            if e.is_conflict() {
                AppError::Conflict("You have already reviewed this product".to_string())
            } else {
                e.into()
            }
        })?;

    let product = product_id.to_string();
    add_breadcrumb("review", "Submitted review", Some(&[("product_id", product.as_str())]));
    tracing::info!(review_id = %review.id, "Review submitted");
    Ok((StatusCode::CREATED, Json(review)))
}
