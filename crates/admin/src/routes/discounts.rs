//! Discount code management.
//!
//! Codes are stored upper-case; definitions are checked before any write.

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use serde::Deserialize;
use serde_json::json;
use tracing::instrument;

use parfumerie_backend::repos::DiscountRepository;
use parfumerie_core::discount::{check_definition, normalize_code};
use parfumerie_core::models::{Discount, DiscountInput};
use parfumerie_core::{ActivityAction, DiscountId};

use super::{PageParams, PageResponse};
use crate::activity::{self, entity};
use crate::error::{AppError, Result};
use crate::middleware::RequireStaff;
use crate::state::AppState;

/// `GET /discounts` query parameters.
#[derive(Debug, Default, Deserialize)]
pub struct DiscountQuery {
    pub active: Option<bool>,
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

fn check_input(input: &DiscountInput) -> Result<()> {
    if normalize_code(&input.code).is_empty() {
        return Err(AppError::Validation("code cannot be empty".to_string()));
    }
    if input.max_uses.is_some_and(|n| n <= 0) {
        return Err(AppError::Validation("max uses must be positive".to_string()));
    }
    if input
        .min_order_amount
        .is_some_and(|min| min.is_sign_negative())
    {
        return Err(AppError::Validation(
            "minimum order amount cannot be negative".to_string(),
        ));
    }
    check_definition(
        input.discount_type,
        input.value,
        input.starts_at,
        input.ends_at,
    )
    .map_err(AppError::Validation)
}

fn discount_not_found(id: DiscountId) -> impl FnOnce(parfumerie_backend::BackendError) -> AppError {
    move |e| AppError::or_not_found(e, || format!("Discount {id} not found"))
}

pub async fn index(
    State(state): State<AppState>,
    RequireStaff(staff): RequireStaff,
    Query(query): Query<DiscountQuery>,
) -> Result<Json<PageResponse<Discount>>> {
    let pagination = PageParams {
        page: query.page,
        per_page: query.per_page,
    }
    .pagination();
    let client = staff.client(state.backend());
    let page = DiscountRepository::new(&client)
        .list(query.active, pagination)
        .await?;
    Ok(Json(PageResponse::new(page, pagination)))
}

pub async fn show(
    State(state): State<AppState>,
    RequireStaff(staff): RequireStaff,
    Path(id): Path<DiscountId>,
) -> Result<Json<Discount>> {
    let client = staff.client(state.backend());
    let discount = DiscountRepository::new(&client)
        .get(id)
        .await
        .map_err(discount_not_found(id))?;
    Ok(Json(discount))
}

#[instrument(skip_all, fields(staff_id = %staff.id))]
pub async fn create(
    State(state): State<AppState>,
    RequireStaff(staff): RequireStaff,
    Json(input): Json<DiscountInput>,
) -> Result<(StatusCode, Json<Discount>)> {
    check_input(&input)?;
    let client = staff.client(state.backend());
    let discount = DiscountRepository::new(&client).create(&input).await?;

    tracing::info!(code = %discount.code, "Discount created");
    activity::record(
        &client,
        &staff,
        ActivityAction::Created,
        entity::DISCOUNT,
        discount.id,
        json!({
            "code": discount.code,
            "type": discount.discount_type,
            "value": discount.value,
        }),
    )
    .await;
    Ok((StatusCode::CREATED, Json(discount)))
}

#[instrument(skip_all, fields(staff_id = %staff.id, discount_id = %id))]
pub async fn update(
    State(state): State<AppState>,
    RequireStaff(staff): RequireStaff,
    Path(id): Path<DiscountId>,
    Json(input): Json<DiscountInput>,
) -> Result<Json<Discount>> {
    check_input(&input)?;
    let client = staff.client(state.backend());
    let discount = DiscountRepository::new(&client)
        .update(id, &input)
        .await
        .map_err(discount_not_found(id))?;

    activity::record(
        &client,
        &staff,
        ActivityAction::Updated,
        entity::DISCOUNT,
        id,
        json!({
            "code": discount.code,
            "value": discount.value,
            "is_active": discount.is_active,
        }),
    )
    .await;
    Ok(Json(discount))
}

#[instrument(skip_all, fields(staff_id = %staff.id, discount_id = %id))]
pub async fn delete(
    State(state): State<AppState>,
    RequireStaff(staff): RequireStaff,
    Path(id): Path<DiscountId>,
) -> Result<StatusCode> {
    let client = staff.client(state.backend());
    let discount = DiscountRepository::new(&client)
        .delete(id)
        .await
        .map_err(discount_not_found(id))?;

    activity::record(
        &client,
        &staff,
        ActivityAction::Deleted,
        entity::DISCOUNT,
        id,
        json!({ "code": discount.code }),
    )
    .await;
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn input(json: &str) -> DiscountInput {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_valid_percentage() {
        assert!(check_input(&input(
            r#"{"code":"spring10","discount_type":"percentage","value":"10","is_active":true}"#
        ))
        .is_ok());
    }

    #[test]
    fn test_percentage_over_100_rejected() {
        let err = check_input(&input(
            r#"{"code":"BIG","discount_type":"percentage","value":"150"}"#,
        ))
        .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[test]
    fn test_blank_code_rejected() {
        let err = check_input(&input(
            r#"{"code":"  ","discount_type":"fixed_amount","value":"5"}"#,
        ))
        .unwrap_err();
        assert_eq!(err.to_string(), "Validation failed: code cannot be empty");
    }

    #[test]
    fn test_dates_must_be_ordered() {
        let err = check_input(&input(
            r#"{"code":"LATE","discount_type":"fixed_amount","value":"5",
                "starts_at":"2026-07-01T00:00:00Z","ends_at":"2026-06-01T00:00:00Z"}"#,
        ))
        .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }
}
