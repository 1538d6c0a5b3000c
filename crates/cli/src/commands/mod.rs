//! Command implementations. Results go to the given writer; progress and
//! failures go through tracing on stderr.

pub mod categories;
pub mod discount;
pub mod stock;

use thiserror::Error;

use parfumerie_backend::repos::{DiscountError, InventoryError};
use parfumerie_backend::{BackendError, ConfigError};

/// Errors that can end a command.
#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Backend(#[from] BackendError),

    #[error(transparent)]
    Inventory(#[from] InventoryError),

    #[error("discount not applicable: {0}")]
    Discount(#[from] DiscountError),

    #[error("Failed to write output: {0}")]
    Io(#[from] std::io::Error),
}
