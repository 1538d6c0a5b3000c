//! Wishlist handlers.

use axum::{
    Json,
    extract::{Path, State},
};
use serde::Serialize;
use tracing::instrument;

use parfumerie_backend::repos::WishlistRepository;
use parfumerie_core::ProductId;
use parfumerie_core::models::WishlistItem;
use parfumerie_core::wishlist::WishlistChange;

use crate::error::Result;
use crate::middleware::RequireAuth;
use crate::state::AppState;

/// Outcome of a toggle.
#[derive(Debug, Serialize)]
pub struct ToggleResponse {
    pub product_id: ProductId,
    pub change: WishlistChange,
    pub saved: bool,
}

/// Saved products, newest first.
#[instrument(skip_all, fields(user_id = %user.id))]
pub async fn index(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
) -> Result<Json<Vec<WishlistItem>>> {
    let client = user.client(state.backend());
    Ok(Json(WishlistRepository::new(&client).list(user.id).await?))
}

/// Save the product if it is not saved, unsave it otherwise.
#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn toggle(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(product_id): Path<ProductId>,
) -> Result<Json<ToggleResponse>> {
    let client = user.client(state.backend());
    let change = WishlistRepository::new(&client)
        .toggle(user.id, product_id)
        .await?;
    tracing::info!(product_id = %product_id, ?change, "Wishlist toggled");
    Ok(Json(ToggleResponse {
        product_id,
        saved: change.is_saved(),
        change,
    }))
}
