//! Storefront cart and checkout against the fake backend.

#![allow(clippy::unwrap_used, clippy::indexing_slicing)]

use axum::Router;
use axum::http::{Method, StatusCode};
use axum::response::Response;
use rust_decimal::Decimal;
use serde_json::{Value, json};
use tower::ServiceExt;
use uuid::Uuid;

use parfumerie_integration_tests::{FakeBackend, Scripted, read_json, request, session_cookie};
use parfumerie_storefront::build_router;
use parfumerie_storefront::config::StorefrontConfig;
use parfumerie_storefront::middleware::session::SESSION_COOKIE_NAME;
use parfumerie_storefront::state::AppState;

const SHOPPER_EMAIL: &str = "ines@example.test";
const VARIANTS: &str = "/rest/v1/product_variants";
const ORDERS: &str = "/rest/v1/orders";
const ORDER_ITEMS: &str = "/rest/v1/order_items";
const ADJUST_STOCK: &str = "/rest/v1/rpc/adjust_stock";

fn variant_row(stock: i32) -> Value {
    json!([{
        "id": 11,
        "product_id": 3,
        "sku": "VN-50",
        "size_ml": 50,
        "price": "89.00",
        "stock": stock,
        "is_active": true,
        "product": { "name": "Vetiver Noir", "slug": "vetiver-noir" }
    }])
}

fn address() -> Value {
    json!({
        "full_name": "Inès Moreau",
        "line1": "12 Rue des Fleurs",
        "city": "Grasse",
        "postal_code": "06130",
        "country": "FR"
    })
}

fn order_row(user_id: Uuid) -> Value {
    json!([{
        "id": 501,
        "user_id": user_id,
        "status": "pending",
        "email": SHOPPER_EMAIL,
        "subtotal": "178.00",
        "discount_amount": "0",
        "shipping_fee": "0",
        "total": "178.00",
        "shipping_address": address()
    }])
}

fn decimal(value: &Value) -> Decimal {
    value.as_str().unwrap().parse().unwrap()
}

struct Shop {
    fake: FakeBackend,
    app: Router,
    user_id: Uuid,
}

impl Shop {
    async fn start(stock: i32) -> Self {
        let fake = FakeBackend::start().await;
        let user_id = Uuid::new_v4();
        fake.sign_in_as(user_id, SHOPPER_EMAIL);
        fake.respond(Method::GET, VARIANTS, Scripted::json(variant_row(stock)));
        fake.respond(
            Method::POST,
            ORDERS,
            Scripted::json(order_row(user_id)).status(StatusCode::CREATED),
        );
        fake.respond(
            Method::POST,
            ORDER_ITEMS,
            Scripted::json(json!([{
                "id": 9001,
                "order_id": 501,
                "product_id": 3,
                "variant_id": 11,
                "product_name": "Vetiver Noir",
                "variant_label": "50 ml",
                "unit_price": "89.00",
                "quantity": 2,
                "line_total": "178.00"
            }]))
            .status(StatusCode::CREATED),
        );
        fake.respond(Method::POST, ADJUST_STOCK, Scripted::json(json!(stock - 2)));

        let config = StorefrontConfig::new(fake.config(), "http://localhost:3000");
        let app = build_router(AppState::new(config));
        Self { fake, app, user_id }
    }

    async fn send(&self, method: Method, uri: &str, cookie: Option<&str>, body: Option<Value>) -> Response {
        self.app
            .clone()
            .oneshot(request(method, uri, cookie, body.as_ref()))
            .await
            .unwrap()
    }

    async fn login(&self) -> String {
        let response = self
            .send(
                Method::POST,
                "/auth/login",
                None,
                Some(json!({ "email": SHOPPER_EMAIL, "password": "correct horse" })),
            )
            .await;
        assert_eq!(response.status(), StatusCode::OK);
        session_cookie(&response, SESSION_COOKIE_NAME).unwrap()
    }

    async fn add_two(&self, cookie: &str) -> Value {
        let response = self
            .send(
                Method::POST,
                "/cart/items",
                Some(cookie),
                Some(json!({ "variant_id": 11, "quantity": 2 })),
            )
            .await;
        let (status, body) = read_json(response).await;
        assert_eq!(status, StatusCode::OK);
        body
    }

    async fn checkout(&self, cookie: &str) -> (StatusCode, Value) {
        let response = self
            .send(
                Method::POST,
                "/checkout",
                Some(cookie),
                Some(json!({ "shipping_address": address(), "notes": "Gift wrap please" })),
            )
            .await;
        read_json(response).await
    }
}

#[tokio::test]
async fn cart_is_priced_from_variant_rows() {
    let shop = Shop::start(4).await;
    let cookie = shop.login().await;

    let cart = shop.add_two(&cookie).await;
    assert_eq!(cart["item_count"], 2);
    assert_eq!(cart["lines"][0]["product_name"], "Vetiver Noir");
    assert_eq!(cart["lines"][0]["variant_label"], "50 ml");
    assert_eq!(decimal(&cart["totals"]["subtotal"]), Decimal::new(17800, 2));
    // Over the free shipping threshold
    assert_eq!(decimal(&cart["totals"]["shipping"]), Decimal::ZERO);
    assert_eq!(cart["orderable"], true);
}

#[tokio::test]
async fn checkout_records_order_items_and_stock() {
    let shop = Shop::start(4).await;
    let cookie = shop.login().await;
    shop.add_two(&cookie).await;

    let (status, body) = shop.checkout(&cookie).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["order"]["id"], 501);
    assert_eq!(body["order"]["items"][0]["quantity"], 2);
    assert!(body.get("warnings").is_none());

    let order = &shop.fake.requests_to(&Method::POST, ORDERS)[0];
    assert_eq!(order.body["user_id"], shop.user_id.to_string());
    assert_eq!(order.body["status"], "pending");
    assert_eq!(order.body["email"], SHOPPER_EMAIL);
    assert_eq!(order.body["notes"], "Gift wrap please");
    assert_eq!(decimal(&order.body["total"]), Decimal::new(17800, 2));
    assert_eq!(order.body["shipping_address"]["city"], "Grasse");
    assert_eq!(
        order.header("authorization"),
        Some(format!("Bearer access-{}", shop.user_id).as_str())
    );

    let items = &shop.fake.requests_to(&Method::POST, ORDER_ITEMS)[0];
    assert_eq!(items.body[0]["order_id"], 501);
    assert_eq!(items.body[0]["variant_id"], 11);
    assert_eq!(items.body[0]["quantity"], 2);

    let stock = &shop.fake.requests_to(&Method::POST, ADJUST_STOCK)[0];
    assert_eq!(stock.body, json!({ "p_variant_id": 11, "p_delta": -2 }));

    // The cart is emptied once the order stands
    let response = shop.send(Method::GET, "/cart", Some(&cookie), None).await;
    let (_, cart) = read_json(response).await;
    assert_eq!(cart["lines"], json!([]));
}

#[tokio::test]
async fn failed_stock_deduction_becomes_a_warning() {
    let shop = Shop::start(4).await;
    shop.fake.respond(
        Method::POST,
        ADJUST_STOCK,
        Scripted::error(StatusCode::INTERNAL_SERVER_ERROR, "XX000", "deadlock detected"),
    );
    let cookie = shop.login().await;
    shop.add_two(&cookie).await;

    let (status, body) = shop.checkout(&cookie).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["order"]["id"], 501);
    assert_eq!(body["warnings"], json!(["Stock for VN-50 was not updated"]));
}

#[tokio::test]
async fn short_stock_blocks_checkout() {
    let shop = Shop::start(1).await;
    let cookie = shop.login().await;

    let cart = shop.add_two(&cookie).await;
    assert_eq!(cart["orderable"], false);
    assert_eq!(cart["insufficient_stock"][0]["available"], 1);

    let (status, _) = shop.checkout(&cookie).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(shop.fake.hits(&Method::POST, ORDERS), 0);
}

#[tokio::test]
async fn empty_cart_cannot_check_out() {
    let shop = Shop::start(4).await;
    let cookie = shop.login().await;

    let (status, body) = shop.checkout(&cookie).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Cart is empty");
}

#[tokio::test]
async fn checkout_requires_sign_in() {
    let shop = Shop::start(4).await;

    let response = shop
        .send(Method::POST, "/checkout", None, Some(json!({})))
        .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert!(shop.fake.requests().is_empty());
}
