//! Order management route handlers.

use axum::{
    Json,
    extract::{Path, Query, State},
};
use serde::Deserialize;
use serde_json::json;
use tracing::instrument;

use parfumerie_backend::repos::{OrderFilter, OrderRepository};
use parfumerie_core::models::Order;
use parfumerie_core::{ActivityAction, OrderId, OrderStatus};

use super::{PageParams, PageResponse};
use crate::activity::{self, entity};
use crate::error::{AppError, Result};
use crate::middleware::RequireStaff;
use crate::state::AppState;

/// `GET /orders` query parameters.
#[derive(Debug, Default, Deserialize)]
pub struct OrderQuery {
    pub status: Option<OrderStatus>,
    /// Part of the customer email.
    pub email: Option<String>,
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

/// `PUT /orders/{id}/status` body.
#[derive(Debug, Deserialize)]
pub struct StatusForm {
    pub status: OrderStatus,
}

/// Reject a move the order lifecycle does not allow.
fn check_transition(from: OrderStatus, to: OrderStatus) -> Result<()> {
    if from.can_transition_to(to) {
        Ok(())
    } else {
        Err(AppError::Validation(format!(
            "Cannot move an order from {from} to {to}"
        )))
    }
}

#[instrument(skip_all, fields(staff_id = %staff.id))]
pub async fn index(
    State(state): State<AppState>,
    RequireStaff(staff): RequireStaff,
    Query(query): Query<OrderQuery>,
) -> Result<Json<PageResponse<Order>>> {
    let pagination = PageParams {
        page: query.page,
        per_page: query.per_page,
    }
    .pagination();
    let filter = OrderFilter {
        status: query.status,
        email: query.email.filter(|e| !e.trim().is_empty()),
    };

    let client = staff.client(state.backend());
    let page = OrderRepository::new(&client)
        .list(&filter, pagination)
        .await?;
    Ok(Json(PageResponse::new(page, pagination)))
}

pub async fn show(
    State(state): State<AppState>,
    RequireStaff(staff): RequireStaff,
    Path(id): Path<OrderId>,
) -> Result<Json<Order>> {
    let client = staff.client(state.backend());
    let order = OrderRepository::new(&client)
        .get(id)
        .await
        .map_err(|e| AppError::or_not_found(e, || format!("Order {id} not found")))?;
    Ok(Json(order))
}

#[instrument(skip_all, fields(staff_id = %staff.id, order_id = %id, to = %form.status))]
pub async fn update_status(
    State(state): State<AppState>,
    RequireStaff(staff): RequireStaff,
    Path(id): Path<OrderId>,
    Json(form): Json<StatusForm>,
) -> Result<Json<Order>> {
    let client = staff.client(state.backend());
    let orders = OrderRepository::new(&client);
    let current = orders
        .get(id)
        .await
        .map_err(|e| AppError::or_not_found(e, || format!("Order {id} not found")))?;

    check_transition(current.status, form.status)?;
    let order = orders.update_status(id, form.status).await?;

    tracing::info!(from = %current.status, "Order status changed");
    activity::record(
        &client,
        &staff,
        ActivityAction::StatusChanged,
        entity::ORDER,
        id,
        json!({ "from": current.status, "to": order.status }),
    )
    .await;
    Ok(Json(order))
}
