//! Variant edits and stock changes.
//!
//! Stock never goes through the variant update; it only moves through the
//! `adjust_stock` procedure so concurrent changes are applied atomically.

use axum::{
    Json,
    extract::{Path, State},
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::instrument;

use parfumerie_backend::repos::{InventoryRepository, ProductRepository};
use parfumerie_core::models::{ProductVariant, VariantInput};
use parfumerie_core::{ActivityAction, VariantId};

use super::products::check_variant;
use crate::activity::{self, entity};
use crate::error::{AppError, Result};
use crate::middleware::RequireStaff;
use crate::state::AppState;

/// `POST /variants/{id}/stock/adjust` body.
#[derive(Debug, Deserialize)]
pub struct AdjustStockForm {
    pub delta: i32,
    /// Free text kept in the activity log, e.g. "damaged in transit".
    #[serde(default)]
    pub reason: Option<String>,
}

/// `POST /variants/{id}/stock/set` body.
#[derive(Debug, Deserialize)]
pub struct SetStockForm {
    pub stock: i32,
    #[serde(default)]
    pub reason: Option<String>,
}

/// New stock level after a change.
#[derive(Debug, Serialize)]
pub struct StockLevel {
    pub variant_id: VariantId,
    pub stock: i32,
}

#[instrument(skip_all, fields(staff_id = %staff.id, variant_id = %id))]
pub async fn update(
    State(state): State<AppState>,
    RequireStaff(staff): RequireStaff,
    Path(id): Path<VariantId>,
    Json(input): Json<VariantInput>,
) -> Result<Json<ProductVariant>> {
    check_variant(&input)?;
    let client = staff.client(state.backend());
    let variant = ProductRepository::new(&client)
        .update_variant(id, &input)
        .await
        .map_err(|e| AppError::or_not_found(e, || format!("Variant {id} not found")))?;

    activity::record(
        &client,
        &staff,
        ActivityAction::Updated,
        entity::VARIANT,
        id,
        json!({
            "sku": variant.sku,
            "price": variant.price,
            "is_active": variant.is_active,
        }),
    )
    .await;
    Ok(Json(variant))
}

#[instrument(skip_all, fields(staff_id = %staff.id, variant_id = %id, delta = form.delta))]
pub async fn adjust_stock(
    State(state): State<AppState>,
    RequireStaff(staff): RequireStaff,
    Path(id): Path<VariantId>,
    Json(form): Json<AdjustStockForm>,
) -> Result<Json<StockLevel>> {
    let client = staff.client(state.backend());
    let stock = InventoryRepository::new(&client)
        .adjust(id, form.delta)
        .await?;

    if form.delta != 0 {
        activity::record(
            &client,
            &staff,
            ActivityAction::StockAdjusted,
            entity::VARIANT,
            id,
            json!({ "delta": form.delta, "stock": stock, "reason": form.reason }),
        )
        .await;
    }
    Ok(Json(StockLevel {
        variant_id: id,
        stock,
    }))
}

#[instrument(skip_all, fields(staff_id = %staff.id, variant_id = %id, target = form.stock))]
pub async fn set_stock(
    State(state): State<AppState>,
    RequireStaff(staff): RequireStaff,
    Path(id): Path<VariantId>,
    Json(form): Json<SetStockForm>,
) -> Result<Json<StockLevel>> {
    let client = staff.client(state.backend());
    let change = InventoryRepository::new(&client).set(id, form.stock).await?;

    if change.changed() {
        activity::record(
            &client,
            &staff,
            ActivityAction::StockAdjusted,
            entity::VARIANT,
            id,
            json!({
                "previous": change.previous,
                "stock": change.level,
                "reason": form.reason,
            }),
        )
        .await;
    }
    Ok(Json(StockLevel {
        variant_id: id,
        stock: change.level,
    }))
}
