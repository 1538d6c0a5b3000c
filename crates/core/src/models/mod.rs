//! Records mirrored from the external relational schema.
//!
//! Field names match the column names, so these types deserialize directly
//! from REST responses. Insert payloads (`New*`) and writable field sets
//! (`*Input`) are separate types because ids and timestamps are assigned by
//! the database.

pub mod activity;
pub mod address;
pub mod catalog;
pub mod discount;
pub mod order;
pub mod review;
pub mod wishlist;

pub use activity::{ActivityLog, NewActivityLog};
pub use address::{Address, AddressError, NewAddress, ShippingAddress};
pub use catalog::{
    Brand, BrandInput, Category, CategoryInput, Product, ProductImage, ProductInput,
    ProductVariant, VariantInput, VariantProduct,
};
pub use discount::{Discount, DiscountInput};
pub use order::{NewOrder, NewOrderItem, Order, OrderItem};
pub use review::{NewReview, Review};
pub use wishlist::{NewWishlistItem, WishlistItem};
