//! Shopping cart held in the visitor's session.
//!
//! The cart stores only variant ids and quantities. Prices and stock are
//! always read fresh from the catalog and applied with [`price`].

use std::collections::HashMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::ProductVariant;
use crate::types::{ProductId, VariantId, round_money};

/// Largest quantity a single line may hold.
pub const MAX_LINE_QUANTITY: u32 = 10;

/// Largest number of distinct lines in a cart.
pub const MAX_LINES: usize = 50;

/// Cart operations that cannot be applied.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CartError {
    #[error("cart is full ({MAX_LINES} items)")]
    TooManyLines,
    #[error("item {0} is not in the cart")]
    NotInCart(VariantId),
}

/// One variant and how many of it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartLine {
    pub variant_id: VariantId,
    pub quantity: u32,
}

/// An unpriced cart.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cart {
    lines: Vec<CartLine>,
}

impl Cart {
    /// Empty cart.
    #[must_use]
    pub const fn new() -> Self {
        Self { lines: Vec::new() }
    }

    /// Add `quantity` of `variant`, merging with an existing line.
    ///
    /// The line quantity is capped at [`MAX_LINE_QUANTITY`]. A zero quantity
    /// is a no-op.
    ///
    /// # Errors
    ///
    /// Returns [`CartError::TooManyLines`] when adding a new line to a full cart.
    pub fn add(&mut self, variant: VariantId, quantity: u32) -> Result<(), CartError> {
        if quantity == 0 {
            return Ok(());
        }
        if let Some(line) = self.lines.iter_mut().find(|l| l.variant_id == variant) {
            line.quantity = line.quantity.saturating_add(quantity).min(MAX_LINE_QUANTITY);
            return Ok(());
        }
        if self.lines.len() >= MAX_LINES {
            return Err(CartError::TooManyLines);
        }
        self.lines.push(CartLine {
            variant_id: variant,
            quantity: quantity.min(MAX_LINE_QUANTITY),
        });
        Ok(())
    }

    /// Replace the quantity of an existing line; zero removes it.
    ///
    /// # Errors
    ///
    /// Returns [`CartError::NotInCart`] if the variant has no line.
    pub fn set_quantity(&mut self, variant: VariantId, quantity: u32) -> Result<(), CartError> {
        if quantity == 0 {
            return self.remove(variant);
        }
        let line = self
            .lines
            .iter_mut()
            .find(|l| l.variant_id == variant)
            .ok_or(CartError::NotInCart(variant))?;
        line.quantity = quantity.min(MAX_LINE_QUANTITY);
        Ok(())
    }

    /// Remove a line.
    ///
    /// # Errors
    ///
    /// Returns [`CartError::NotInCart`] if the variant has no line.
    pub fn remove(&mut self, variant: VariantId) -> Result<(), CartError> {
        let before = self.lines.len();
        self.lines.retain(|l| l.variant_id != variant);
        if self.lines.len() == before {
            return Err(CartError::NotInCart(variant));
        }
        Ok(())
    }

    /// Drop every line.
    pub fn clear(&mut self) {
        self.lines.clear();
    }

    /// Lines in insertion order.
    #[must_use]
    pub fn lines(&self) -> &[CartLine] {
        &self.lines
    }

    /// Variant ids in the cart.
    #[must_use]
    pub fn variant_ids(&self) -> Vec<VariantId> {
        self.lines.iter().map(|l| l.variant_id).collect()
    }

    /// Total units.
    #[must_use]
    pub fn item_count(&self) -> u32 {
        self.lines.iter().map(|l| l.quantity).sum()
    }

    /// Whether the cart has no lines.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}

/// A cart line with catalog data applied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PricedLine {
    pub variant_id: VariantId,
    pub product_id: ProductId,
    pub product_name: String,
    pub variant_label: Option<String>,
    pub sku: String,
    pub unit_price: Decimal,
    pub quantity: u32,
    pub line_total: Decimal,
    pub available_stock: i32,
}

/// A line whose quantity exceeds the available stock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StockShortage {
    pub variant_id: VariantId,
    pub requested: u32,
    pub available: i32,
}

/// Result of pricing a cart against current catalog data.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PricedCart {
    pub lines: Vec<PricedLine>,
    pub subtotal: Decimal,
    pub item_count: u32,
    /// Variants that no longer exist or are inactive.
    pub unavailable: Vec<VariantId>,
    /// Lines that ask for more than is in stock.
    pub insufficient_stock: Vec<StockShortage>,
}

impl PricedCart {
    /// Whether every line can be ordered as-is.
    #[must_use]
    pub fn is_orderable(&self) -> bool {
        !self.lines.is_empty() && self.unavailable.is_empty() && self.insufficient_stock.is_empty()
    }
}

/// Apply current variant data to a cart.
///
/// `variants` may be in any order and may contain extra rows. Unavailable
/// lines are excluded from the subtotal; short-stocked lines are included
/// so the visitor sees the full price, but make the cart unorderable.
#[must_use]
pub fn price(cart: &Cart, variants: &[ProductVariant]) -> PricedCart {
    let by_id: HashMap<VariantId, &ProductVariant> =
        variants.iter().map(|v| (v.id, v)).collect();
    let mut priced = PricedCart::default();

    for line in cart.lines() {
        let Some(variant) = by_id.get(&line.variant_id).filter(|v| v.is_active) else {
            priced.unavailable.push(line.variant_id);
            continue;
        };

        if i64::from(line.quantity) > i64::from(variant.stock) {
            priced.insufficient_stock.push(StockShortage {
                variant_id: line.variant_id,
                requested: line.quantity,
                available: variant.stock.max(0),
            });
        }

        let line_total = round_money(variant.price * Decimal::from(line.quantity));
        priced.subtotal += line_total;
        priced.item_count += line.quantity;
        priced.lines.push(PricedLine {
            variant_id: variant.id,
            product_id: variant.product_id,
            product_name: variant
                .product
                .as_ref()
                .map_or_else(|| variant.sku.clone(), |p| p.name.clone()),
            variant_label: variant.label(),
            sku: variant.sku.clone(),
            unit_price: variant.price,
            quantity: line.quantity,
            line_total,
            available_stock: variant.stock,
        });
    }

    priced
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use crate::models::VariantProduct;

    fn variant(id: i64, price_cents: i64, stock: i32) -> ProductVariant {
        ProductVariant {
            id: VariantId::new(id),
            product_id: ProductId::new(100 + id),
            sku: format!("SKU-{id}"),
            size_ml: Some(50),
            price: Decimal::new(price_cents, 2),
            compare_at_price: None,
            stock,
            is_active: true,
            product: Some(VariantProduct {
                name: format!("Product {id}"),
                slug: None,
            }),
        }
    }

    #[test]
    fn test_add_merges_and_caps() {
        let mut cart = Cart::new();
        cart.add(VariantId::new(1), 4).unwrap();
        cart.add(VariantId::new(1), 9).unwrap();
        assert_eq!(cart.lines().len(), 1);
        assert_eq!(cart.lines()[0].quantity, MAX_LINE_QUANTITY);
    }

    #[test]
    fn test_add_zero_is_noop() {
        let mut cart = Cart::new();
        cart.add(VariantId::new(1), 0).unwrap();
        assert!(cart.is_empty());
    }

    #[test]
    fn test_set_quantity_zero_removes() {
        let mut cart = Cart::new();
        cart.add(VariantId::new(1), 2).unwrap();
        cart.set_quantity(VariantId::new(1), 0).unwrap();
        assert!(cart.is_empty());
        assert_eq!(
            cart.set_quantity(VariantId::new(1), 3),
            Err(CartError::NotInCart(VariantId::new(1)))
        );
    }

    #[test]
    fn test_cart_full() {
        let mut cart = Cart::new();
        for id in 0..MAX_LINES {
            cart.add(VariantId::new(i64::try_from(id).unwrap()), 1).unwrap();
        }
        assert_eq!(
            cart.add(VariantId::new(9_999), 1),
            Err(CartError::TooManyLines)
        );
    }

    #[test]
    fn test_price_computes_subtotal() {
        let mut cart = Cart::new();
        cart.add(VariantId::new(1), 2).unwrap();
        cart.add(VariantId::new(2), 1).unwrap();
        let priced = price(&cart, &[variant(2, 4_500, 10), variant(1, 1_999, 10)]);

        assert_eq!(priced.subtotal, Decimal::new(8_498, 2));
        assert_eq!(priced.item_count, 3);
        assert_eq!(priced.lines[0].product_name, "Product 1");
        assert_eq!(priced.lines[0].variant_label.as_deref(), Some("50 ml"));
        assert!(priced.is_orderable());
    }

    #[test]
    fn test_price_flags_missing_and_short_stock() {
        let mut cart = Cart::new();
        cart.add(VariantId::new(1), 3).unwrap();
        cart.add(VariantId::new(2), 1).unwrap();
        cart.add(VariantId::new(3), 1).unwrap();
        let mut inactive = variant(3, 1_000, 5);
        inactive.is_active = false;

        let priced = price(&cart, &[variant(1, 1_000, 2), inactive]);
        assert_eq!(priced.unavailable, vec![VariantId::new(2), VariantId::new(3)]);
        assert_eq!(
            priced.insufficient_stock,
            vec![StockShortage {
                variant_id: VariantId::new(1),
                requested: 3,
                available: 2
            }]
        );
        assert_eq!(priced.subtotal, Decimal::new(3_000, 2));
        assert!(!priced.is_orderable());
    }

    #[test]
    fn test_empty_cart_not_orderable() {
        assert!(!price(&Cart::new(), &[]).is_orderable());
    }
}
