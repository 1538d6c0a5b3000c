//! Per-entity repositories over [`BackendClient`](crate::BackendClient).
//!
//! Each repository borrows a client, so the caller decides whose
//! credentials (anonymous, a user, or the service role) a call runs with.

mod activity;
mod addresses;
mod catalog;
mod discounts;
mod inventory;
mod orders;
mod reviews;
mod staff;
mod wishlist;

pub use activity::{ActivityFilter, ActivityRepository};
pub use addresses::AddressRepository;
pub use catalog::{
    BrandRepository, CategoryRepository, NewProductImage, ProductFilter, ProductRepository,
    ProductSort,
};
pub use discounts::{DiscountError, DiscountQuote, DiscountRepository};
pub use inventory::{InventoryError, InventoryRepository, StockChange};
pub use orders::{OrderFilter, OrderRepository};
pub use reviews::ReviewRepository;
pub use staff::StaffRepository;
pub use wishlist::WishlistRepository;

/// Table and RPC names in the external schema.
pub mod tables {
    pub const BRANDS: &str = "brands";
    pub const CATEGORIES: &str = "categories";
    pub const PRODUCTS: &str = "products";
    pub const PRODUCT_VARIANTS: &str = "product_variants";
    pub const PRODUCT_IMAGES: &str = "product_images";
    pub const REVIEWS: &str = "reviews";
    pub const WISHLIST_ITEMS: &str = "wishlist_items";
    pub const DISCOUNTS: &str = "discounts";
    pub const ORDERS: &str = "orders";
    pub const ORDER_ITEMS: &str = "order_items";
    pub const ADDRESSES: &str = "addresses";
    pub const ACTIVITY_LOGS: &str = "activity_logs";
}

/// Remote procedure names.
pub mod rpc {
    pub const ADJUST_STOCK: &str = "adjust_stock";
    pub const IS_STAFF: &str = "is_staff";
    pub const INCREMENT_DISCOUNT_USAGE: &str = "increment_discount_usage";
}

use crate::error::BackendError;

/// First row of a mutation's representation, or `NotFound`.
pub(crate) fn first_row<T>(rows: Vec<T>, what: impl FnOnce() -> String) -> Result<T, BackendError> {
    rows.into_iter()
        .next()
        .ok_or_else(|| BackendError::NotFound(what()))
}
