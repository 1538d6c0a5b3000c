//! Wishlist membership.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::types::ProductId;

/// Outcome of toggling a product.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WishlistChange {
    Added,
    Removed,
}

impl WishlistChange {
    /// Whether the product is in the wishlist after the change.
    #[must_use]
    pub const fn is_saved(&self) -> bool {
        matches!(self, Self::Added)
    }
}

/// The set of products a user has saved.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Wishlist(BTreeSet<ProductId>);

impl Wishlist {
    /// Empty wishlist.
    #[must_use]
    pub const fn new() -> Self {
        Self(BTreeSet::new())
    }

    /// Flip membership of `product`.
    pub fn toggle(&mut self, product: ProductId) -> WishlistChange {
        if self.0.remove(&product) {
            WishlistChange::Removed
        } else {
            self.0.insert(product);
            WishlistChange::Added
        }
    }

    /// Whether `product` is saved.
    #[must_use]
    pub fn contains(&self, product: ProductId) -> bool {
        self.0.contains(&product)
    }

    /// Number of saved products.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether nothing is saved.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Saved products in id order.
    pub fn iter(&self) -> impl Iterator<Item = ProductId> + '_ {
        self.0.iter().copied()
    }
}

impl FromIterator<ProductId> for Wishlist {
    fn from_iter<T: IntoIterator<Item = ProductId>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_toggle_twice_restores_state() {
        let original: Wishlist = [ProductId::new(1), ProductId::new(5)].into_iter().collect();
        for product in [ProductId::new(1), ProductId::new(9)] {
            let mut wishlist = original.clone();
            let first = wishlist.toggle(product);
            let second = wishlist.toggle(product);
            assert_ne!(first, second);
            assert_eq!(wishlist, original);
        }
    }

    #[test]
    fn test_toggle_reports_change() {
        let mut wishlist = Wishlist::new();
        assert_eq!(wishlist.toggle(ProductId::new(3)), WishlistChange::Added);
        assert!(wishlist.contains(ProductId::new(3)));
        assert_eq!(wishlist.toggle(ProductId::new(3)), WishlistChange::Removed);
        assert!(wishlist.is_empty());
    }
}
