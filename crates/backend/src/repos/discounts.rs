//! Discount codes.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use thiserror::Error;
use tracing::instrument;

use parfumerie_core::DiscountId;
use parfumerie_core::discount::{self, DiscountRejection, normalize_code};
use parfumerie_core::models::{Discount, DiscountInput};

use super::first_row;
use super::rpc::INCREMENT_DISCOUNT_USAGE;
use super::tables::DISCOUNTS;
use crate::client::{BackendClient, Page};
use crate::error::BackendError;
use crate::query::{Pagination, Query};

/// A code that passed validation and the amount it takes off.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DiscountQuote {
    pub code: String,
    pub amount: Decimal,
    #[serde(skip)]
    pub discount: Discount,
}

/// Failure to apply a code.
#[derive(Debug, Error)]
pub enum DiscountError {
    #[error(transparent)]
    Rejected(#[from] DiscountRejection),
    #[error(transparent)]
    Backend(#[from] BackendError),
}

#[derive(Serialize)]
struct IncrementParams<'a> {
    p_code: &'a str,
}

/// Repository for discounts.
pub struct DiscountRepository<'a> {
    client: &'a BackendClient,
}

impl<'a> DiscountRepository<'a> {
    #[must_use]
    pub const fn new(client: &'a BackendClient) -> Self {
        Self { client }
    }

    /// Look up a code after normalising it. Always reads fresh so usage
    /// counts are current.
    ///
    /// # Errors
    ///
    /// Returns `BackendError` if the query fails.
    #[instrument(skip(self))]
    pub async fn find_by_code(&self, code: &str) -> Result<Option<Discount>, BackendError> {
        let code = normalize_code(code);
        if code.is_empty() {
            return Ok(None);
        }
        let query = Query::table(DISCOUNTS)
            .eq("code", &code)
            .limit(1)
            .with_count(false);
        Ok(self.client.fetch_fresh(&query).await?.data.into_iter().next())
    }

    /// Look up and validate `code` for an order of `subtotal`.
    ///
    /// # Errors
    ///
    /// Returns `DiscountError::Rejected` with the first failed rule
    /// (`NotFound` for unknown codes), or `DiscountError::Backend`.
    pub async fn quote(
        &self,
        code: &str,
        subtotal: Decimal,
        now: DateTime<Utc>,
    ) -> Result<DiscountQuote, DiscountError> {
        let discount = self
            .find_by_code(code)
            .await?
            .ok_or(DiscountRejection::NotFound)?;
        let amount = discount::apply(&discount, subtotal, now)?;
        Ok(DiscountQuote {
            code: discount.code.clone(),
            amount,
            discount,
        })
    }

    /// Record one use of a code.
    ///
    /// # Errors
    ///
    /// Returns `BackendError` if the call fails.
    #[instrument(skip(self))]
    pub async fn increment_usage(&self, code: &str) -> Result<(), BackendError> {
        let code = normalize_code(code);
        self.client
            .rpc_mutation::<_, serde_json::Value>(
                INCREMENT_DISCOUNT_USAGE,
                &IncrementParams { p_code: &code },
                &[DISCOUNTS],
            )
            .await
            .map(|_| ())
    }

    /// All discounts, newest first.
    ///
    /// # Errors
    ///
    /// Returns `BackendError` if the query fails.
    pub async fn list(
        &self,
        active: Option<bool>,
        pagination: Pagination,
    ) -> Result<Page<Discount>, BackendError> {
        let mut query = Query::table(DISCOUNTS);
        if let Some(active) = active {
            query = query.eq("is_active", active);
        }
        self.client
            .fetch(&query.order("created_at", false).paginate(pagination))
            .await
    }

    /// # Errors
    ///
    /// Returns `BackendError::NotFound` if the discount does not exist.
    pub async fn get(&self, id: DiscountId) -> Result<Discount, BackendError> {
        self.client
            .fetch_one(&Query::table(DISCOUNTS).eq("id", id))
            .await?
            .ok_or_else(|| BackendError::NotFound(format!("discount {id}")))
    }

    /// Create a discount; the code is stored upper-case.
    ///
    /// # Errors
    ///
    /// Returns `BackendError::Conflict` if the code exists.
    #[instrument(skip(self, input), fields(code = %input.code))]
    pub async fn create(&self, input: &DiscountInput) -> Result<Discount, BackendError> {
        let input = normalized(input);
        let rows = self.client.insert(DISCOUNTS, &input, &[]).await?;
        first_row(rows, || "created discount".to_string())
    }

    /// # Errors
    ///
    /// Returns `BackendError::NotFound` if the discount does not exist.
    #[instrument(skip(self, input))]
    pub async fn update(
        &self,
        id: DiscountId,
        input: &DiscountInput,
    ) -> Result<Discount, BackendError> {
        let input = normalized(input);
        let rows = self
            .client
            .update(&Query::table(DISCOUNTS).eq("id", id), &input, &[])
            .await?;
        first_row(rows, || format!("discount {id}"))
    }

    /// # Errors
    ///
    /// Returns `BackendError::NotFound` if the discount does not exist.
    pub async fn delete(&self, id: DiscountId) -> Result<Discount, BackendError> {
        let rows = self
            .client
            .delete(&Query::table(DISCOUNTS).eq("id", id), &[])
            .await?;
        first_row(rows, || format!("discount {id}"))
    }
}

fn normalized(input: &DiscountInput) -> DiscountInput {
    DiscountInput {
        code: normalize_code(&input.code),
        ..input.clone()
    }
}
