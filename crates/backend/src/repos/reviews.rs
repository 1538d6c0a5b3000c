//! Product reviews.

use serde::{Deserialize, Serialize};
use tracing::instrument;

use parfumerie_core::models::{NewReview, Review};
use parfumerie_core::reviews::RatingSummary;
use parfumerie_core::{ProductId, ReviewId};

use super::first_row;
use super::tables::{PRODUCTS, REVIEWS};
use crate::client::{BackendClient, Page};
use crate::error::BackendError;
use crate::query::{Pagination, Query};

#[derive(Deserialize)]
struct RatingRow {
    rating: i16,
}

#[derive(Serialize)]
struct ApprovalPatch {
    is_approved: bool,
}

/// Repository for reviews.
pub struct ReviewRepository<'a> {
    client: &'a BackendClient,
}

impl<'a> ReviewRepository<'a> {
    #[must_use]
    pub const fn new(client: &'a BackendClient) -> Self {
        Self { client }
    }

    /// Approved reviews of a product, newest first.
    ///
    /// # Errors
    ///
    /// Returns `BackendError` if the query fails.
    #[instrument(skip(self))]
    pub async fn list_approved(
        &self,
        product_id: ProductId,
        pagination: Pagination,
    ) -> Result<Page<Review>, BackendError> {
        let query = Query::table(REVIEWS)
            .eq("product_id", product_id)
            .eq("is_approved", true)
            .order("created_at", false)
            .paginate(pagination);
        self.client.fetch(&query).await
    }

    /// Rating summary over a product's approved reviews.
    ///
    /// # Errors
    ///
    /// Returns `BackendError` if the query fails.
    pub async fn summary(&self, product_id: ProductId) -> Result<RatingSummary, BackendError> {
        let query = Query::table(REVIEWS)
            .select("rating")
            .eq("product_id", product_id)
            .eq("is_approved", true)
            .with_count(false);
        let rows: Page<RatingRow> = self.client.fetch(&query).await?;
        Ok(RatingSummary::from_ratings(
            rows.data.into_iter().map(|r| r.rating),
        ))
    }

    /// Submit a review. It stays hidden until approved.
    ///
    /// # Errors
    ///
    /// Returns `BackendError::Conflict` if the user already reviewed the product.
    #[instrument(skip(self, review), fields(product_id = %review.product_id))]
    pub async fn create(&self, review: &NewReview) -> Result<Review, BackendError> {
        let rows = self.client.insert(REVIEWS, review, &[]).await?;
        first_row(rows, || "created review".to_string())
    }

    /// Reviews for moderation, filtered by approval state.
    ///
    /// # Errors
    ///
    /// Returns `BackendError` if the query fails.
    pub async fn list_for_moderation(
        &self,
        approved: Option<bool>,
        pagination: Pagination,
    ) -> Result<Page<Review>, BackendError> {
        let mut query = Query::table(REVIEWS);
        if let Some(approved) = approved {
            query = query.eq("is_approved", approved);
        }
        self.client
            .fetch(&query.order("created_at", false).paginate(pagination))
            .await
    }

    /// Make a review visible.
    ///
    /// # Errors
    ///
    /// Returns `BackendError::NotFound` if the review does not exist.
    #[instrument(skip(self))]
    pub async fn approve(&self, id: ReviewId) -> Result<Review, BackendError> {
        let rows = self
            .client
            .update(
                &Query::table(REVIEWS).eq("id", id),
                &ApprovalPatch { is_approved: true },
                &[PRODUCTS],
            )
            .await?;
        first_row(rows, || format!("review {id}"))
    }

    /// # Errors
    ///
    /// Returns `BackendError::NotFound` if the review does not exist.
    #[instrument(skip(self))]
    pub async fn delete(&self, id: ReviewId) -> Result<Review, BackendError> {
        let rows = self
            .client
            .delete(&Query::table(REVIEWS).eq("id", id), &[PRODUCTS])
            .await?;
        first_row(rows, || format!("review {id}"))
    }
}
