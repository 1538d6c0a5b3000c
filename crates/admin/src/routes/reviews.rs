//! Review moderation.

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use serde::Deserialize;
use serde_json::json;
use tracing::instrument;

use parfumerie_backend::repos::ReviewRepository;
use parfumerie_core::models::Review;
use parfumerie_core::{ActivityAction, ReviewId};

use super::{PageParams, PageResponse};
use crate::activity::{self, entity};
use crate::error::{AppError, Result};
use crate::middleware::RequireStaff;
use crate::state::AppState;

/// `GET /reviews` query parameters. Without `approved`, lists everything.
#[derive(Debug, Default, Deserialize)]
pub struct ReviewQuery {
    pub approved: Option<bool>,
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

pub async fn index(
    State(state): State<AppState>,
    RequireStaff(staff): RequireStaff,
    Query(query): Query<ReviewQuery>,
) -> Result<Json<PageResponse<Review>>> {
    let pagination = PageParams {
        page: query.page,
        per_page: query.per_page,
    }
    .pagination();
    let client = staff.client(state.backend());
    let page = ReviewRepository::new(&client)
        .list_for_moderation(query.approved, pagination)
        .await?;
    Ok(Json(PageResponse::new(page, pagination)))
}

#[instrument(skip_all, fields(staff_id = %staff.id, review_id = %id))]
pub async fn approve(
    State(state): State<AppState>,
    RequireStaff(staff): RequireStaff,
    Path(id): Path<ReviewId>,
) -> Result<Json<Review>> {
    let client = staff.client(state.backend());
    let review = ReviewRepository::new(&client)
        .approve(id)
        .await
        .map_err(|e| AppError::or_not_found(e, || format!("Review {id} not found")))?;

    activity::record(
        &client,
        &staff,
        ActivityAction::Approved,
        entity::REVIEW,
        id,
        json!({ "product_id": review.product_id, "rating": review.rating }),
    )
    .await;
    Ok(Json(review))
}

#[instrument(skip_all, fields(staff_id = %staff.id, review_id = %id))]
pub async fn delete(
    State(state): State<AppState>,
    RequireStaff(staff): RequireStaff,
    Path(id): Path<ReviewId>,
) -> Result<StatusCode> {
    let client = staff.client(state.backend());
    let review = ReviewRepository::new(&client)
        .delete(id)
        .await
        .map_err(|e| AppError::or_not_found(e, || format!("Review {id} not found")))?;

    activity::record(
        &client,
        &staff,
        ActivityAction::Deleted,
        entity::REVIEW,
        id,
        json!({ "product_id": review.product_id, "rating": review.rating }),
    )
    .await;
    Ok(StatusCode::NO_CONTENT)
}
