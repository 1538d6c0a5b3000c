//! Account route handlers.
//!
//! These routes require authentication and run with the user's token, so
//! the backend's row policies apply on top of the `user_id` filters.

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use serde::Deserialize;
use tracing::instrument;

use parfumerie_backend::BackendError;
use parfumerie_backend::repos::{AddressRepository, OrderRepository};
use parfumerie_core::models::{Address, NewAddress, Order, ShippingAddress};
use parfumerie_core::{AddressId, OrderId};

use super::{PageParams, PageResponse};
use crate::error::{AppError, Result};
use crate::middleware::RequireAuth;
use crate::state::AppState;

/// Address create/update request.
#[derive(Debug, Deserialize)]
pub struct AddressForm {
    #[serde(flatten)]
    pub fields: ShippingAddress,
    #[serde(default)]
    pub is_default: bool,
}

fn not_found(what: String) -> impl FnOnce(BackendError) -> AppError {
    move |e| {
        if e.is_not_found() {
            AppError::NotFound(what)
        } else {
            e.into()
        }
    }
}

// =============================================================================
// Orders
// =============================================================================

/// Order history, newest first.
#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn orders(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Query(params): Query<PageParams>,
) -> Result<Json<PageResponse<Order>>> {
    let client = user.client(state.backend());
    let pagination = params.pagination();
    let page = OrderRepository::new(&client)
        .list_for_user(user.id, pagination)
        .await?;
    Ok(Json(PageResponse::new(page, pagination)))
}

/// One order with its items.
#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn order(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(id): Path<OrderId>,
) -> Result<Json<Order>> {
    let client = user.client(state.backend());
    let order = OrderRepository::new(&client)
        .get_for_user(user.id, id)
        .await
        .map_err(not_found(format!("order {id}")))?;
    Ok(Json(order))
}

// =============================================================================
// Addresses
// =============================================================================

/// Saved addresses, default first.
#[instrument(skip_all, fields(user_id = %user.id))]
pub async fn addresses(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
) -> Result<Json<Vec<Address>>> {
    let client = user.client(state.backend());
    Ok(Json(AddressRepository::new(&client).list(user.id).await?))
}

/// Save a new address.
#[instrument(skip(state, user, form), fields(user_id = %user.id))]
pub async fn create_address(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Json(form): Json<AddressForm>,
) -> Result<(StatusCode, Json<Address>)> {
    form.fields.validate()?;
    let client = user.client(state.backend());
    let address = AddressRepository::new(&client)
        .create(&NewAddress {
            user_id: user.id,
            fields: form.fields,
            is_default: form.is_default,
        })
        .await?;
    Ok((StatusCode::CREATED, Json(address)))
}

/// Replace an address.
#[instrument(skip(state, user, form), fields(user_id = %user.id))]
pub async fn update_address(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(id): Path<AddressId>,
    Json(form): Json<AddressForm>,
) -> Result<Json<Address>> {
    form.fields.validate()?;
    let client = user.client(state.backend());
    let address = AddressRepository::new(&client)
        .update(user.id, id, &form.fields, form.is_default)
        .await
        .map_err(not_found(format!("address {id}")))?;
    Ok(Json(address))
}

/// Delete an address.
#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn delete_address(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(id): Path<AddressId>,
) -> Result<StatusCode> {
    let client = user.client(state.backend());
    AddressRepository::new(&client)
        .delete(user.id, id)
        .await
        .map_err(not_found(format!("address {id}")))?;
    Ok(StatusCode::NO_CONTENT)
}
