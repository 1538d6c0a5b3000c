//! Orders and order items.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use parfumerie_core::models::{NewOrder, NewOrderItem, Order, OrderItem};
use parfumerie_core::{OrderId, OrderStatus, UserId};

use super::first_row;
use super::tables::{ORDER_ITEMS, ORDERS};
use crate::client::{BackendClient, Page};
use crate::error::BackendError;
use crate::query::{Pagination, Query};

const ORDER_SELECT: &str = "*, items:order_items(*)";

/// Admin order listing filters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct OrderFilter {
    pub status: Option<OrderStatus>,
    /// Substring of the customer email.
    pub email: Option<String>,
}

#[derive(Serialize)]
struct StatusPatch {
    status: OrderStatus,
}

#[derive(Deserialize)]
struct RevenueRow {
    total: Decimal,
}

/// Repository for orders.
pub struct OrderRepository<'a> {
    client: &'a BackendClient,
}

impl<'a> OrderRepository<'a> {
    #[must_use]
    pub const fn new(client: &'a BackendClient) -> Self {
        Self { client }
    }

    /// Insert an order header.
    ///
    /// # Errors
    ///
    /// Returns `BackendError` if the insert fails.
    #[instrument(skip(self, order), fields(user_id = %order.user_id, total = %order.total))]
    pub async fn create(&self, order: &NewOrder) -> Result<Order, BackendError> {
        let rows = self.client.insert(ORDERS, order, &[]).await?;
        first_row(rows, || "created order".to_string())
    }

    /// Insert the lines of an order in one request.
    ///
    /// # Errors
    ///
    /// Returns `BackendError` if the insert fails.
    #[instrument(skip(self, items), fields(count = items.len()))]
    pub async fn add_items(&self, items: &[NewOrderItem]) -> Result<Vec<OrderItem>, BackendError> {
        if items.is_empty() {
            return Ok(Vec::new());
        }
        self.client.insert(ORDER_ITEMS, items, &[ORDERS]).await
    }

    /// A user's orders, newest first.
    ///
    /// # Errors
    ///
    /// Returns `BackendError` if the query fails.
    pub async fn list_for_user(
        &self,
        user: UserId,
        pagination: Pagination,
    ) -> Result<Page<Order>, BackendError> {
        let query = Query::table(ORDERS)
            .select(ORDER_SELECT)
            .eq("user_id", user)
            .order("created_at", false)
            .paginate(pagination);
        self.client.fetch(&query).await
    }

    /// One of a user's orders.
    ///
    /// # Errors
    ///
    /// Returns `BackendError::NotFound` if the order does not exist or
    /// belongs to someone else.
    pub async fn get_for_user(&self, user: UserId, id: OrderId) -> Result<Order, BackendError> {
        let query = Query::table(ORDERS)
            .select(ORDER_SELECT)
            .eq("id", id)
            .eq("user_id", user);
        self.client
            .fetch_one(&query)
            .await?
            .ok_or_else(|| BackendError::NotFound(format!("order {id}")))
    }

    /// All orders matching `filter`, newest first.
    ///
    /// # Errors
    ///
    /// Returns `BackendError` if the query fails.
    pub async fn list(
        &self,
        filter: &OrderFilter,
        pagination: Pagination,
    ) -> Result<Page<Order>, BackendError> {
        let mut query = Query::table(ORDERS).select(ORDER_SELECT);
        if let Some(status) = filter.status {
            query = query.eq("status", status);
        }
        if let Some(email) = filter.email.as_deref() {
            query = query.search(email, &["email"]);
        }
        self.client
            .fetch(&query.order("created_at", false).paginate(pagination))
            .await
    }

    /// # Errors
    ///
    /// Returns `BackendError::NotFound` if the order does not exist.
    pub async fn get(&self, id: OrderId) -> Result<Order, BackendError> {
        let query = Query::table(ORDERS).select(ORDER_SELECT).eq("id", id);
        self.client
            .fetch_one(&query)
            .await?
            .ok_or_else(|| BackendError::NotFound(format!("order {id}")))
    }

    /// Set an order's status. Transition rules are checked by the caller.
    ///
    /// # Errors
    ///
    /// Returns `BackendError::NotFound` if the order does not exist.
    #[instrument(skip(self))]
    pub async fn update_status(
        &self,
        id: OrderId,
        status: OrderStatus,
    ) -> Result<Order, BackendError> {
        let rows = self
            .client
            .update(
                &Query::table(ORDERS).eq("id", id).select(ORDER_SELECT),
                &StatusPatch { status },
                &[],
            )
            .await?;
        first_row(rows, || format!("order {id}"))
    }

    /// Number of orders, optionally with one status.
    ///
    /// # Errors
    ///
    /// Returns `BackendError` if the query fails.
    pub async fn count(&self, status: Option<OrderStatus>) -> Result<u64, BackendError> {
        let mut query = Query::table(ORDERS);
        if let Some(status) = status {
            query = query.eq("status", status);
        }
        self.client.count(&query).await
    }

    /// Sum of non-cancelled order totals placed at or after `since`.
    ///
    /// # Errors
    ///
    /// Returns `BackendError` if the query fails.
    pub async fn revenue_since(&self, since: DateTime<Utc>) -> Result<Decimal, BackendError> {
        let query = Query::table(ORDERS)
            .select("total")
            .gte("created_at", since.to_rfc3339())
            .neq("status", OrderStatus::Cancelled)
            .with_count(false);
        let rows: Page<RevenueRow> = self.client.fetch(&query).await?;
        Ok(rows.data.iter().map(|r| r.total).sum())
    }
}
