//! Checkout.
//!
//! Placing an order is a sequence of backend writes with no surrounding
//! transaction: the order header, its items, one stock adjustment per line
//! and finally the discount usage. Once the header exists the order stands;
//! later failures are logged and reported back in `warnings`.

use axum::{Json, extract::State, http::StatusCode};
use chrono::Utc;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tower_sessions::Session;
use tracing::{error, info, instrument};

use parfumerie_backend::BackendClient;
use parfumerie_backend::repos::{
    AddressRepository, DiscountQuote, DiscountRepository, InventoryRepository, OrderRepository,
};
use parfumerie_core::cart::{PricedCart, PricedLine};
use parfumerie_core::models::{NewOrder, NewOrderItem, Order, ShippingAddress};
use parfumerie_core::{AddressId, OrderId, OrderStatus};

use super::cart::{load_cart, price_cart, reset_cart, saved_discount_code};
use crate::error::{AppError, Result, add_breadcrumb};
use crate::middleware::RequireAuth;
use crate::models::CurrentUser;
use crate::state::AppState;

/// Checkout request.
///
/// The shipping address is taken from `shipping_address`, then
/// `address_id`, then the user's default address.
#[derive(Debug, Default, Deserialize)]
pub struct CheckoutForm {
    pub address_id: Option<AddressId>,
    pub shipping_address: Option<ShippingAddress>,
    /// Overrides the code saved on the cart.
    pub discount_code: Option<String>,
    pub notes: Option<String>,
}

/// A placed order.
#[derive(Debug, Serialize)]
pub struct CheckoutResponse {
    pub order: Order,
    /// Follow-up steps that failed after the order was recorded.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

/// Place an order from the session cart.
#[instrument(skip(state, session, user, form), fields(user_id = %user.id))]
pub async fn checkout(
    State(state): State<AppState>,
    session: Session,
    RequireAuth(user): RequireAuth,
    Json(form): Json<CheckoutForm>,
) -> Result<(StatusCode, Json<CheckoutResponse>)> {
    let cart = load_cart(&session).await?;
    if cart.is_empty() {
        return Err(AppError::BadRequest("Cart is empty".to_string()));
    }

    let client = user.client(state.backend());
    let priced = price_cart(&client, &cart).await?;
    if !priced.is_orderable() {
        return Err(AppError::Conflict(
            "Some items are unavailable or out of stock".to_string(),
        ));
    }

    let code = match form.discount_code.filter(|c| !c.trim().is_empty()) {
        Some(code) => Some(code),
        None => saved_discount_code(&session).await?,
    };
    let discount = match code {
        Some(code) => Some(
            DiscountRepository::new(&client)
                .quote(&code, priced.subtotal, Utc::now())
                .await?,
        ),
        None => None,
    };

    let shipping_address = resolve_address(&client, &user, form.shipping_address, form.address_id)
        .await?;
    shipping_address.validate()?;

    let discount_amount = discount.as_ref().map_or(Decimal::ZERO, |q| q.amount);
    let totals = state
        .config()
        .shipping
        .totals(priced.subtotal, discount_amount);

    let orders = OrderRepository::new(&client);
    let mut order = orders
        .create(&NewOrder {
            user_id: user.id,
            status: OrderStatus::Pending,
            email: user.email.clone(),
            subtotal: totals.subtotal,
            discount_amount: totals.discount,
            shipping_fee: totals.shipping,
            total: totals.total,
            discount_code: discount.as_ref().map(|q| q.code.clone()),
            shipping_address,
            notes: form.notes.filter(|n| !n.trim().is_empty()),
        })
        .await?;
    info!(order_id = %order.id, total = %order.total, "Order created");

    let warnings = fulfil(&client, &mut order, &priced, discount.as_ref()).await;

    reset_cart(&session).await?;

    let order_id = order.id.to_string();
    add_breadcrumb("checkout", "Order placed", Some(&[("order_id", order_id.as_str())]));
    Ok((StatusCode::CREATED, Json(CheckoutResponse { order, warnings })))
}

async fn resolve_address(
    client: &BackendClient,
    user: &CurrentUser,
    given: Option<ShippingAddress>,
    address_id: Option<AddressId>,
) -> Result<ShippingAddress> {
    if let Some(address) = given {
        return Ok(address);
    }
    let addresses = AddressRepository::new(client);
    let saved = match address_id {
        Some(id) => Some(addresses.get(user.id, id).await.map_err(|e| {
            if e.is_not_found() {
                AppError::NotFound(format!("address {id}"))
            } else {
                e.into()
            }
        })?),
        None => addresses.default_for(user.id).await?,
    };
    saved
        .as_ref()
        .map(ShippingAddress::from)
        .ok_or_else(|| AppError::BadRequest("Shipping address is required".to_string()))
}

/// Steps after the order header. Each failure becomes a warning.
async fn fulfil(
    client: &BackendClient,
    order: &mut Order,
    priced: &PricedCart,
    discount: Option<&DiscountQuote>,
) -> Vec<String> {
    let mut warnings = Vec::new();

    let items: Vec<NewOrderItem> = priced
        .lines
        .iter()
        .map(|line| order_item(order.id, line))
        .collect();
    match OrderRepository::new(client).add_items(&items).await {
        Ok(saved) => order.items = saved,
        Err(e) => {
            error!(order_id = %order.id, error = %e, "Failed to record order items");
            warnings.push("Order items could not be recorded".to_string());
        }
    }

    let inventory = InventoryRepository::new(client);
    for line in &priced.lines {
        let delta = -i32::try_from(line.quantity).unwrap_or(i32::MAX);
        if let Err(e) = inventory.adjust(line.variant_id, delta).await {
            error!(
                order_id = %order.id,
                variant_id = %line.variant_id,
                delta,
                error = %e,
                "Failed to deduct stock"
            );
            warnings.push(format!("Stock for {} was not updated", line.sku));
        }
    }

    if let Some(quote) = discount
        && let Err(e) = DiscountRepository::new(client)
            .increment_usage(&quote.code)
            .await
    {
        error!(order_id = %order.id, code = %quote.code, error = %e, "Failed to record discount use");
        warnings.push("Discount usage was not recorded".to_string());
    }

    warnings
}

fn order_item(order_id: OrderId, line: &PricedLine) -> NewOrderItem {
    NewOrderItem {
        order_id,
        product_id: line.product_id,
        variant_id: line.variant_id,
        product_name: line.product_name.clone(),
        variant_label: line.variant_label.clone(),
        unit_price: line.unit_price,
        quantity: i32::try_from(line.quantity).unwrap_or(i32::MAX),
        line_total: line.line_total,
    }
}
