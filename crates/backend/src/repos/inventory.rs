//! Stock levels.
//!
//! The `adjust_stock` procedure applies a delta atomically and returns the
//! new level. Two adjustments issued at the same time still race on the
//! client-side negative check; the database has the final say.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, instrument};

use parfumerie_core::VariantId;
use parfumerie_core::stock::{self, StockError};

use super::rpc::ADJUST_STOCK;
use super::tables::{PRODUCT_VARIANTS, PRODUCTS};
use crate::client::BackendClient;
use crate::error::BackendError;
use crate::query::Query;

/// Failure to change a stock level.
#[derive(Debug, Error)]
pub enum InventoryError {
    #[error(transparent)]
    Stock(#[from] StockError),
    #[error(transparent)]
    Backend(#[from] BackendError),
}

#[derive(Serialize)]
struct AdjustParams {
    p_variant_id: VariantId,
    p_delta: i32,
}

#[derive(Deserialize)]
struct StockRow {
    stock: i32,
}

/// Stock of one variant before and after a `set`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StockChange {
    pub previous: i32,
    pub level: i32,
}

impl StockChange {
    /// Whether the level moved.
    #[must_use]
    pub const fn changed(&self) -> bool {
        self.previous != self.level
    }
}

/// Repository for variant stock.
pub struct InventoryRepository<'a> {
    client: &'a BackendClient,
}

impl<'a> InventoryRepository<'a> {
    #[must_use]
    pub const fn new(client: &'a BackendClient) -> Self {
        Self { client }
    }

    /// Current stock of a variant, read fresh.
    ///
    /// # Errors
    ///
    /// Returns `BackendError::NotFound` if the variant does not exist.
    pub async fn current(&self, variant: VariantId) -> Result<i32, BackendError> {
        let query = Query::table(PRODUCT_VARIANTS)
            .select("id, stock")
            .eq("id", variant)
            .with_count(false);
        self.client
            .fetch_fresh::<StockRow>(&query)
            .await?
            .data
            .first()
            .map(|row| row.stock)
            .ok_or_else(|| BackendError::NotFound(format!("variant {variant}")))
    }

    /// Change stock by `delta` and return the new level.
    ///
    /// A zero delta returns the current level without calling the procedure.
    ///
    /// # Errors
    ///
    /// Returns `InventoryError::Stock` if the level would go below zero,
    /// or `InventoryError::Backend` if a request fails.
    #[instrument(skip(self))]
    pub async fn adjust(&self, variant: VariantId, delta: i32) -> Result<i32, InventoryError> {
        let current = self.current(variant).await?;
        stock::apply(current, delta)?;
        if delta == 0 {
            return Ok(current);
        }

        let level = self.call_adjust(variant, delta).await?;
        info!(variant_id = %variant, delta, level, "Stock adjusted");
        Ok(level)
    }

    /// Set stock to `target`, returning the level before and after.
    ///
    /// A target equal to the current level makes no procedure call.
    ///
    /// # Errors
    ///
    /// Returns `InventoryError::Stock` for a negative target, or
    /// `InventoryError::Backend` if a request fails.
    #[instrument(skip(self))]
    pub async fn set(&self, variant: VariantId, target: i32) -> Result<StockChange, InventoryError> {
        let previous = self.current(variant).await?;
        let delta = stock::delta_to_target(previous, target)?;
        if delta == 0 {
            return Ok(StockChange {
                previous,
                level: previous,
            });
        }
        let level = self.call_adjust(variant, delta).await?;
        info!(variant_id = %variant, target, level, "Stock set");
        Ok(StockChange { previous, level })
    }

    async fn call_adjust(&self, variant: VariantId, delta: i32) -> Result<i32, BackendError> {
        self.client
            .rpc_mutation(
                ADJUST_STOCK,
                &AdjustParams {
                    p_variant_id: variant,
                    p_delta: delta,
                },
                &[PRODUCTS, PRODUCT_VARIANTS],
            )
            .await
    }
}
