//! Cart route handlers.
//!
//! The cart lives in the session as variant ids and quantities. Every
//! response prices it against fresh variant rows.

use axum::{
    Json,
    extract::{Path, State},
};
use chrono::Utc;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tower_sessions::Session;
use tracing::instrument;

use parfumerie_backend::repos::{DiscountQuote, DiscountRepository, ProductRepository};
use parfumerie_backend::BackendClient;
use parfumerie_core::cart::{Cart, PricedCart, PricedLine, StockShortage, price};
use parfumerie_core::discount::normalize_code;
use parfumerie_core::pricing::OrderTotals;
use parfumerie_core::{CurrencyCode, VariantId};

use crate::error::{AppError, Result, add_breadcrumb};
use crate::models::session_keys;
use crate::state::AppState;

/// Add-to-cart request.
#[derive(Debug, Deserialize)]
pub struct AddItemForm {
    pub variant_id: VariantId,
    #[serde(default = "default_quantity")]
    pub quantity: u32,
}

const fn default_quantity() -> u32 {
    1
}

/// Quantity update request.
#[derive(Debug, Deserialize)]
pub struct UpdateItemForm {
    pub quantity: u32,
}

/// Discount code request.
#[derive(Debug, Deserialize)]
pub struct DiscountForm {
    pub code: String,
}

/// Priced cart as returned to clients.
#[derive(Debug, Serialize)]
pub struct CartResponse {
    pub lines: Vec<PricedLine>,
    pub item_count: u32,
    pub unavailable: Vec<VariantId>,
    pub insufficient_stock: Vec<StockShortage>,
    pub discount: Option<DiscountQuote>,
    /// Why the saved code does not currently apply.
    pub discount_error: Option<String>,
    pub totals: OrderTotals,
    pub orderable: bool,
    pub currency: CurrencyCode,
}

// =============================================================================
// Session Helpers
// =============================================================================

/// Read the cart from the session; a missing cart is empty.
///
/// # Errors
///
/// Returns an error if the session store fails.
pub async fn load_cart(session: &Session) -> Result<Cart> {
    Ok(session
        .get::<Cart>(session_keys::CART)
        .await?
        .unwrap_or_default())
}

/// Write the cart back to the session.
///
/// # Errors
///
/// Returns an error if the session store fails.
pub async fn save_cart(session: &Session, cart: &Cart) -> Result<()> {
    session.insert(session_keys::CART, cart).await?;
    Ok(())
}

/// Discount code saved on the cart, if any.
///
/// # Errors
///
/// Returns an error if the session store fails.
pub async fn saved_discount_code(session: &Session) -> Result<Option<String>> {
    Ok(session.get::<String>(session_keys::DISCOUNT_CODE).await?)
}

/// Empty the cart and forget the discount code.
///
/// # Errors
///
/// Returns an error if the session store fails.
pub async fn reset_cart(session: &Session) -> Result<()> {
    session.remove::<Cart>(session_keys::CART).await?;
    session
        .remove::<String>(session_keys::DISCOUNT_CODE)
        .await?;
    Ok(())
}

/// Price `cart` against current variant rows.
///
/// # Errors
///
/// Returns an error if the variant lookup fails.
pub async fn price_cart(client: &BackendClient, cart: &Cart) -> Result<PricedCart> {
    let variants = ProductRepository::new(client)
        .variants_by_ids(&cart.variant_ids())
        .await?;
    Ok(price(cart, &variants))
}

async fn cart_response(state: &AppState, session: &Session, cart: &Cart) -> Result<CartResponse> {
    let priced = price_cart(state.backend(), cart).await?;

    let (discount, discount_error) = match saved_discount_code(session).await? {
        Some(code) if !priced.lines.is_empty() => {
            match DiscountRepository::new(state.backend())
                .quote(&code, priced.subtotal, Utc::now())
                .await
            {
                Ok(quote) => (Some(quote), None),
                Err(e) => match AppError::from(e) {
                    AppError::Discount(rejection) => (None, Some(rejection.to_string())),
                    other => return Err(other),
                },
            }
        }
        _ => (None, None),
    };

    let discount_amount = discount.as_ref().map_or(Decimal::ZERO, |q| q.amount);
    let totals = state
        .config()
        .shipping
        .totals(priced.subtotal, discount_amount);

    Ok(CartResponse {
        orderable: priced.is_orderable(),
        lines: priced.lines,
        item_count: priced.item_count,
        unavailable: priced.unavailable,
        insufficient_stock: priced.insufficient_stock,
        discount,
        discount_error,
        totals,
        currency: state.config().currency,
    })
}

// =============================================================================
// Handlers
// =============================================================================

/// Show the priced cart.
#[instrument(skip_all)]
pub async fn show(State(state): State<AppState>, session: Session) -> Result<Json<CartResponse>> {
    let cart = load_cart(&session).await?;
    Ok(Json(cart_response(&state, &session, &cart).await?))
}

/// Add a variant to the cart.
///
/// Only active variants can be added. Stock is checked when the cart is
/// priced, not here.
#[instrument(skip(state, session))]
pub async fn add(
    State(state): State<AppState>,
    session: Session,
    Json(form): Json<AddItemForm>,
) -> Result<Json<CartResponse>> {
    let variant = ProductRepository::new(state.backend())
        .get_variant(form.variant_id)
        .await
        .map_err(|e| {
            if e.is_not_found() {
                AppError::NotFound(format!("variant {}", form.variant_id))
            } else {
                e.into()
            }
        })?;
    if !variant.is_active {
        return Err(AppError::NotFound(format!("variant {}", form.variant_id)));
    }

    let mut cart = load_cart(&session).await?;
    cart.add(variant.id, form.quantity)?;
    save_cart(&session, &cart).await?;

    let variant_id = variant.id.to_string();
    add_breadcrumb("cart", "Added item", Some(&[("variant_id", variant_id.as_str())]));
    Ok(Json(cart_response(&state, &session, &cart).await?))
}

/// Set a line's quantity; zero removes the line.
#[instrument(skip(state, session))]
pub async fn update(
    State(state): State<AppState>,
    session: Session,
    Path(variant_id): Path<VariantId>,
    Json(form): Json<UpdateItemForm>,
) -> Result<Json<CartResponse>> {
    let mut cart = load_cart(&session).await?;
    cart.set_quantity(variant_id, form.quantity)?;
    save_cart(&session, &cart).await?;
    Ok(Json(cart_response(&state, &session, &cart).await?))
}

/// Remove a line.
#[instrument(skip(state, session))]
pub async fn remove(
    State(state): State<AppState>,
    session: Session,
    Path(variant_id): Path<VariantId>,
) -> Result<Json<CartResponse>> {
    let mut cart = load_cart(&session).await?;
    cart.remove(variant_id)?;
    save_cart(&session, &cart).await?;
    Ok(Json(cart_response(&state, &session, &cart).await?))
}

/// Empty the cart.
#[instrument(skip_all)]
pub async fn clear(State(state): State<AppState>, session: Session) -> Result<Json<CartResponse>> {
    reset_cart(&session).await?;
    Ok(Json(cart_response(&state, &session, &Cart::new()).await?))
}

/// Validate a discount code against the cart and remember it.
#[instrument(skip(state, session))]
pub async fn apply_discount(
    State(state): State<AppState>,
    session: Session,
    Json(form): Json<DiscountForm>,
) -> Result<Json<CartResponse>> {
    let code = normalize_code(&form.code);
    if code.is_empty() {
        return Err(AppError::BadRequest("Discount code is required".to_string()));
    }

    let cart = load_cart(&session).await?;
    if cart.is_empty() {
        return Err(AppError::BadRequest("Cart is empty".to_string()));
    }
    let priced = price_cart(state.backend(), &cart).await?;
    DiscountRepository::new(state.backend())
        .quote(&code, priced.subtotal, Utc::now())
        .await?;

    session.insert(session_keys::DISCOUNT_CODE, &code).await?;
    add_breadcrumb("cart", "Applied discount", Some(&[("code", code.as_str())]));
    Ok(Json(cart_response(&state, &session, &cart).await?))
}

/// Forget the discount code.
#[instrument(skip_all)]
pub async fn remove_discount(
    State(state): State<AppState>,
    session: Session,
) -> Result<Json<CartResponse>> {
    session
        .remove::<String>(session_keys::DISCOUNT_CODE)
        .await?;
    let cart = load_cart(&session).await?;
    Ok(Json(cart_response(&state, &session, &cart).await?))
}
