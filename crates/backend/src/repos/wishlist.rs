//! Saved products.

use tracing::{debug, instrument};

use parfumerie_core::models::{NewWishlistItem, WishlistItem};
use parfumerie_core::wishlist::{Wishlist, WishlistChange};
use parfumerie_core::{ProductId, UserId};

use super::tables::WISHLIST_ITEMS;
use crate::client::BackendClient;
use crate::error::BackendError;
use crate::query::Query;

const ITEM_SELECT: &str = "*, product:products(*, images:product_images(*))";

/// Repository for wishlist rows. Needs a user-scoped client.
pub struct WishlistRepository<'a> {
    client: &'a BackendClient,
}

impl<'a> WishlistRepository<'a> {
    #[must_use]
    pub const fn new(client: &'a BackendClient) -> Self {
        Self { client }
    }

    /// Saved items with their products, newest first.
    ///
    /// # Errors
    ///
    /// Returns `BackendError` if the query fails.
    pub async fn list(&self, user: UserId) -> Result<Vec<WishlistItem>, BackendError> {
        let query = Query::table(WISHLIST_ITEMS)
            .select(ITEM_SELECT)
            .eq("user_id", user)
            .order("created_at", false)
            .with_count(false);
        Ok(self.client.fetch(&query).await?.data)
    }

    /// Saved product ids.
    ///
    /// # Errors
    ///
    /// Returns `BackendError` if the query fails.
    pub async fn product_ids(&self, user: UserId) -> Result<Wishlist, BackendError> {
        let query = Query::table(WISHLIST_ITEMS)
            .eq("user_id", user)
            .with_count(false);
        let items: Vec<WishlistItem> = self.client.fetch(&query).await?.data;
        Ok(items.into_iter().map(|item| item.product_id).collect())
    }

    /// Add the product if absent, remove it if present.
    ///
    /// # Errors
    ///
    /// Returns `BackendError` if the lookup or the write fails.
    #[instrument(skip(self))]
    pub async fn toggle(
        &self,
        user: UserId,
        product: ProductId,
    ) -> Result<WishlistChange, BackendError> {
        let existing = Query::table(WISHLIST_ITEMS)
            .eq("user_id", user)
            .eq("product_id", product)
            .limit(1)
            .with_count(false);
        let current: Vec<WishlistItem> = self.client.fetch_fresh(&existing).await?.data;

        if let Some(item) = current.first() {
            let _: Vec<WishlistItem> = self
                .client
                .delete(&Query::table(WISHLIST_ITEMS).eq("id", item.id), &[])
                .await?;
            return Ok(WishlistChange::Removed);
        }

        let row = NewWishlistItem {
            user_id: user,
            product_id: product,
        };
        match self
            .client
            .insert::<_, WishlistItem>(WISHLIST_ITEMS, &row, &[])
            .await
        {
            Ok(_) => Ok(WishlistChange::Added),
            // A concurrent toggle inserted the same row first.
            Err(e) if e.is_conflict() => {
                debug!("Wishlist row already present");
                self.client.invalidate(WISHLIST_ITEMS);
                Ok(WishlistChange::Added)
            }
            Err(e) => Err(e),
        }
    }
}
