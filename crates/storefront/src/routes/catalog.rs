//! Brand and category listings.

use axum::{Json, extract::State};

use parfumerie_backend::repos::{BrandRepository, CategoryRepository};
use parfumerie_core::catalog::CategoryNode;
use parfumerie_core::models::Brand;

use crate::error::Result;
use crate::state::AppState;

/// All brands by name.
pub async fn brands(State(state): State<AppState>) -> Result<Json<Vec<Brand>>> {
    Ok(Json(BrandRepository::new(state.backend()).list().await?))
}

/// Categories as a tree.
pub async fn categories(State(state): State<AppState>) -> Result<Json<Vec<CategoryNode>>> {
    Ok(Json(CategoryRepository::new(state.backend()).tree().await?))
}
