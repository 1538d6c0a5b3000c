//! Dashboard route handler.

use axum::{Json, extract::State};
use chrono::{Duration, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::instrument;

use parfumerie_backend::repos::{OrderRepository, ProductRepository};
use parfumerie_core::OrderStatus;
use parfumerie_core::models::ProductVariant;

use crate::error::Result;
use crate::middleware::RequireStaff;
use crate::state::AppState;

/// Most low-stock variants shown.
const LOW_STOCK_LIMIT: u32 = 20;

/// Revenue window in days.
const REVENUE_WINDOW_DAYS: i64 = 30;

/// Dashboard metrics.
#[derive(Debug, Serialize)]
pub struct Dashboard {
    pub product_count: u64,
    pub order_count: u64,
    pub pending_order_count: u64,
    /// Non-cancelled order totals over the last 30 days.
    pub revenue_30d: Decimal,
    pub low_stock_threshold: i32,
    pub low_stock: Vec<ProductVariant>,
}

#[instrument(skip_all, fields(staff_id = %staff.id))]
pub async fn index(
    State(state): State<AppState>,
    RequireStaff(staff): RequireStaff,
) -> Result<Json<Dashboard>> {
    let client = staff.client(state.backend());
    let products = ProductRepository::new(&client);
    let orders = OrderRepository::new(&client);
    let threshold = state.config().low_stock_threshold;
    let since = Utc::now() - Duration::days(REVENUE_WINDOW_DAYS);

    let (product_count, order_count, pending_order_count, revenue_30d, low_stock) = tokio::try_join!(
        products.count(),
        orders.count(None),
        orders.count(Some(OrderStatus::Pending)),
        orders.revenue_since(since),
        products.low_stock(threshold, LOW_STOCK_LIMIT),
    )?;

    Ok(Json(Dashboard {
        product_count,
        order_count,
        pending_order_count,
        revenue_30d,
        low_stock_threshold: threshold,
        low_stock,
    }))
}
