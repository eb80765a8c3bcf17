//! Router-level tests: requests go through the full middleware stack
//! against an in-memory database.

use std::time::Duration;

use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use axum::routing::get;
use axum::Router;
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;

use storefront_api::{build_router, with_request_timeout, AppConfig, AppState};
use storefront_db::{Database, DbConfig};

// =============================================================================
// Helpers
// =============================================================================

async fn app() -> Router {
    let db = Database::new(DbConfig::in_memory()).await.unwrap();
    build_router(AppState::new(db, AppConfig::default()))
}

async fn send(
    app: &Router,
    method: Method,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }

    let request = match body {
        Some(json) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };

    (status, json)
}

/// Registers an account and returns its token. The first account on a
/// fresh database is the admin.
async fn register(app: &Router, email: &str) -> String {
    let (status, body) = send(
        app,
        Method::POST,
        "/api/auth/register",
        None,
        Some(json!({"email": email, "name": "Reader", "password": "correct-horse"})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    body["data"]["token"].as_str().unwrap().to_string()
}

async fn create_item(app: &Router, admin: &str, name: &str, price_cents: i64, discount: u8, stock: i64) -> String {
    let (status, body) = send(
        app,
        Method::POST,
        "/api/items",
        Some(admin),
        Some(json!({
            "name": name,
            "category": "books",
            "priceCents": price_cents,
            "discountPercent": discount,
            "stock": stock,
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    body["data"]["id"].as_str().unwrap().to_string()
}

async fn add_to_cart(app: &Router, token: &str, item_id: &str, quantity: i64) -> (StatusCode, Value) {
    send(
        app,
        Method::POST,
        "/api/cart",
        Some(token),
        Some(json!({"itemId": item_id, "quantity": quantity})),
    )
    .await
}

fn order_request() -> Value {
    json!({
        "shippingAddress": {
            "street": "1 Main St",
            "city": "Springfield",
            "state": "IL",
            "zip": "62701",
            "country": "US"
        },
        "paymentMethod": "card"
    })
}

async fn place_order(app: &Router, token: &str) -> (StatusCode, Value) {
    send(app, Method::POST, "/api/orders", Some(token), Some(order_request())).await
}

// =============================================================================
// Health
// =============================================================================

#[tokio::test]
async fn health_reports_database_and_migrations() {
    let app = app().await;
    let (status, body) = send(&app, Method::GET, "/health", None, None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["status"], "healthy");
    assert_eq!(body["data"]["database"], true);
    assert_eq!(body["data"]["migrationsApplied"], body["data"]["migrationsTotal"]);
}

#[tokio::test]
async fn health_is_503_when_database_is_gone() {
    let db = Database::new(DbConfig::in_memory()).await.unwrap();
    let app = build_router(AppState::new(db.clone(), AppConfig::default()));
    db.close().await;

    let (status, body) = send(&app, Method::GET, "/health", None, None).await;

    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["success"], false);
    assert_eq!(body["data"]["status"], "degraded");
    assert_eq!(body["data"]["database"], false);
}

// =============================================================================
// Auth
// =============================================================================

#[tokio::test]
async fn first_account_is_admin_and_later_ones_are_customers() {
    let app = app().await;
    let admin = register(&app, "boss@example.com").await;
    let customer = register(&app, "reader@example.com").await;

    let (_, me) = send(&app, Method::GET, "/api/auth/me", Some(&admin), None).await;
    assert_eq!(me["data"]["role"], "admin");

    let (status, me) = send(&app, Method::GET, "/api/auth/me", Some(&customer), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(me["data"]["role"], "customer");
    assert_eq!(me["data"]["email"], "reader@example.com");
    assert!(me["data"].get("passwordHash").is_none());
}

#[tokio::test]
async fn login_checks_password() {
    let app = app().await;
    register(&app, "reader@example.com").await;

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/auth/login",
        None,
        Some(json!({"email": "Reader@Example.com", "password": "correct-horse"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["data"]["token"].is_string());

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/auth/login",
        None,
        Some(json!({"email": "reader@example.com", "password": "wrong-horse"})),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn duplicate_email_is_conflict() {
    let app = app().await;
    register(&app, "reader@example.com").await;

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/auth/register",
        None,
        Some(json!({"email": "READER@example.com", "name": "Again", "password": "correct-horse"})),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn protected_routes_need_a_valid_token() {
    let app = app().await;

    let (status, body) = send(&app, Method::GET, "/api/cart", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["success"], false);

    let (status, _) = send(&app, Method::GET, "/api/cart", Some("not-a-jwt"), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn customers_cannot_use_admin_routes() {
    let app = app().await;
    let _admin = register(&app, "boss@example.com").await;
    let customer = register(&app, "reader@example.com").await;

    let (status, _) = send(
        &app,
        Method::POST,
        "/api/items",
        Some(&customer),
        Some(json!({"name": "Dune", "priceCents": 1000})),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = send(&app, Method::GET, "/api/orders", Some(&customer), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

// =============================================================================
// Catalog
// =============================================================================

#[tokio::test]
async fn catalog_crud_and_soft_delete() {
    let app = app().await;
    let admin = register(&app, "boss@example.com").await;
    let id = create_item(&app, &admin, "Dune", 1_500, 0, 2).await;

    let (status, body) = send(
        &app,
        Method::PUT,
        &format!("/api/items/{}", id),
        Some(&admin),
        Some(json!({"priceCents": 2_000, "discountPercent": 25})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["priceCents"], 2_000);
    assert_eq!(body["data"]["discountPercent"], 25);

    let (status, body) = send(
        &app,
        Method::POST,
        &format!("/api/items/{}/restock", id),
        Some(&admin),
        Some(json!({"quantity": 3})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["stock"], 5);

    let (_, list) = send(&app, Method::GET, "/api/items?category=books", None, None).await;
    assert_eq!(list["data"].as_array().unwrap().len(), 1);

    let (status, _) = send(&app, Method::DELETE, &format!("/api/items/{}", id), Some(&admin), None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = send(&app, Method::GET, &format!("/api/items/{}", id), None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["success"], false);

    let (_, list) = send(&app, Method::GET, "/api/items", None, None).await;
    assert!(list["data"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn invalid_item_is_rejected() {
    let app = app().await;
    let admin = register(&app, "boss@example.com").await;

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/items",
        Some(&admin),
        Some(json!({"name": "Dune", "priceCents": -1})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn malformed_json_gets_the_envelope() {
    let app = app().await;
    let token = register(&app, "reader@example.com").await;

    let request = Request::builder()
        .method(Method::POST)
        .uri("/api/cart")
        .header(header::AUTHORIZATION, format!("Bearer {}", token))
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{not json"))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["success"], false);
    assert!(body["message"].is_string());
}

// =============================================================================
// Cart & Checkout
// =============================================================================

#[tokio::test]
async fn checkout_happy_path() {
    let app = app().await;
    let admin = register(&app, "boss@example.com").await;
    let customer = register(&app, "reader@example.com").await;
    let item = create_item(&app, &admin, "Dune", 10_000, 10, 5).await;

    let (status, cart) = add_to_cart(&app, &customer, &item, 2).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(cart["data"]["purchasable"], true);
    assert_eq!(cart["data"]["pricing"]["total"], 19_800);

    let (status, order) = place_order(&app, &customer).await;
    assert_eq!(status, StatusCode::CREATED, "{order}");
    let order = &order["data"];
    assert_eq!(order["subtotalCents"], 18_000);
    assert_eq!(order["shippingCents"], 0);
    assert_eq!(order["taxCents"], 1_800);
    assert_eq!(order["totalCents"], 19_800);
    assert_eq!(order["orderStatus"], "pending");
    assert_eq!(order["paymentStatus"], "pending");
    assert_eq!(order["lines"][0]["unitPriceCents"], 10_000);
    assert_eq!(order["lines"][0]["lineTotalCents"], 18_000);

    let (_, stored) = send(&app, Method::GET, &format!("/api/items/{}", item), None, None).await;
    assert_eq!(stored["data"]["stock"], 3);

    let (_, cart) = send(&app, Method::GET, "/api/cart", Some(&customer), None).await;
    assert!(cart["data"]["lines"].as_array().unwrap().is_empty());
    assert_eq!(cart["data"]["purchasable"], false);

    let (_, mine) = send(&app, Method::GET, "/api/orders/mine", Some(&customer), None).await;
    assert_eq!(mine["data"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn shipping_is_charged_at_exactly_fifty_dollars() {
    let app = app().await;
    let admin = register(&app, "boss@example.com").await;
    let customer = register(&app, "reader@example.com").await;
    let item = create_item(&app, &admin, "Emma", 5_000, 0, 5).await;

    add_to_cart(&app, &customer, &item, 1).await;
    let (status, order) = place_order(&app, &customer).await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(order["data"]["shippingCents"], 500);
    assert_eq!(order["data"]["taxCents"], 500);
    assert_eq!(order["data"]["totalCents"], 6_000);
}

#[tokio::test]
async fn empty_cart_cannot_be_checked_out() {
    let app = app().await;
    let customer = register(&app, "reader@example.com").await;

    let (status, body) = place_order(&app, &customer).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Cart is empty");

    let (_, mine) = send(&app, Method::GET, "/api/orders/mine", Some(&customer), None).await;
    assert!(mine["data"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn insufficient_stock_leaves_everything_unchanged() {
    let app = app().await;
    let admin = register(&app, "boss@example.com").await;
    let customer = register(&app, "reader@example.com").await;
    let item = create_item(&app, &admin, "Dune", 1_000, 0, 3).await;

    let (status, body) = add_to_cart(&app, &customer, &item, 10).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["message"].as_str().unwrap().contains("Dune"));

    // Stock drops after the item is already in the cart.
    add_to_cart(&app, &customer, &item, 3).await;
    send(
        &app,
        Method::PUT,
        &format!("/api/items/{}", item),
        Some(&admin),
        Some(json!({"stock": 1})),
    )
    .await;

    let (_, cart) = send(&app, Method::GET, "/api/cart", Some(&customer), None).await;
    assert_eq!(cart["data"]["purchasable"], false);
    assert_eq!(cart["data"]["lines"][0]["inStock"], false);

    let (status, body) = place_order(&app, &customer).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["message"].as_str().unwrap().contains("Dune"));

    let (_, stored) = send(&app, Method::GET, &format!("/api/items/{}", item), None, None).await;
    assert_eq!(stored["data"]["stock"], 1);

    let (_, cart) = send(&app, Method::GET, "/api/cart", Some(&customer), None).await;
    assert_eq!(cart["data"]["lines"][0]["quantity"], 3);
}

#[tokio::test]
async fn cart_line_update_remove_and_clear() {
    let app = app().await;
    let admin = register(&app, "boss@example.com").await;
    let customer = register(&app, "reader@example.com").await;
    let dune = create_item(&app, &admin, "Dune", 1_000, 0, 5).await;
    let emma = create_item(&app, &admin, "Emma", 2_000, 0, 5).await;

    add_to_cart(&app, &customer, &dune, 1).await;
    let (_, cart) = add_to_cart(&app, &customer, &emma, 1).await;
    let line_id = cart["data"]["lines"][0]["lineId"].as_str().unwrap().to_string();

    let (status, cart) = send(
        &app,
        Method::PUT,
        &format!("/api/cart/{}", line_id),
        Some(&customer),
        Some(json!({"quantity": 4})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(cart["data"]["lines"][0]["quantity"], 4);

    let (status, cart) = send(&app, Method::DELETE, &format!("/api/cart/{}", line_id), Some(&customer), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(cart["data"]["lines"].as_array().unwrap().len(), 1);

    let (status, _) = send(&app, Method::DELETE, &format!("/api/cart/{}", line_id), Some(&customer), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, cart) = send(&app, Method::DELETE, "/api/cart", Some(&customer), None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(cart["data"]["lines"].as_array().unwrap().is_empty());

    // Clearing an empty cart still succeeds.
    let (status, _) = send(&app, Method::DELETE, "/api/cart", Some(&customer), None).await;
    assert_eq!(status, StatusCode::OK);
}

// =============================================================================
// Orders
// =============================================================================

#[tokio::test]
async fn orders_are_visible_to_owner_and_admin_only() {
    let app = app().await;
    let admin = register(&app, "boss@example.com").await;
    let owner = register(&app, "reader@example.com").await;
    let stranger = register(&app, "other@example.com").await;
    let item = create_item(&app, &admin, "Dune", 1_000, 0, 5).await;

    add_to_cart(&app, &owner, &item, 1).await;
    let (_, order) = place_order(&app, &owner).await;
    let uri = format!("/api/orders/{}", order["data"]["id"].as_str().unwrap());

    let (status, _) = send(&app, Method::GET, &uri, Some(&owner), None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = send(&app, Method::GET, &uri, Some(&stranger), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["success"], false);

    let (status, _) = send(&app, Method::GET, &uri, Some(&admin), None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = send(&app, Method::GET, "/api/orders/missing", Some(&admin), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn admin_status_update_stamps_delivery() {
    let app = app().await;
    let admin = register(&app, "boss@example.com").await;
    let customer = register(&app, "reader@example.com").await;
    let item = create_item(&app, &admin, "Dune", 1_000, 0, 5).await;

    add_to_cart(&app, &customer, &item, 1).await;
    let (_, order) = place_order(&app, &customer).await;
    let uri = format!("/api/orders/{}/status", order["data"]["id"].as_str().unwrap());

    let (status, body) = send(&app, Method::PUT, &uri, Some(&admin), Some(json!({"orderStatus": "shipped"}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["orderStatus"], "shipped");
    assert!(body["data"]["deliveredAt"].is_null());

    let (status, body) = send(
        &app,
        Method::PUT,
        &uri,
        Some(&admin),
        Some(json!({"orderStatus": "delivered", "paymentStatus": "paid"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["orderStatus"], "delivered");
    assert!(body["data"]["deliveredAt"].is_string());
    assert!(body["data"]["paidAt"].is_string());
    assert_eq!(body["data"]["totalCents"], 1_600);

    let (status, _) = send(&app, Method::PUT, &uri, Some(&admin), Some(json!({}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(&app, Method::PUT, &uri, Some(&customer), Some(json!({"orderStatus": "cancelled"}))).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (_, delivered) = send(&app, Method::GET, "/api/orders?status=delivered", Some(&admin), None).await;
    assert_eq!(delivered["data"].as_array().unwrap().len(), 1);
    let (_, pending) = send(&app, Method::GET, "/api/orders?status=pending", Some(&admin), None).await;
    assert!(pending["data"].as_array().unwrap().is_empty());
}

// =============================================================================
// Timeout
// =============================================================================

#[tokio::test]
async fn slow_request_times_out_with_408() {
    let slow: Router = Router::new().route(
        "/slow",
        get(|| async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            "late"
        }),
    );
    let app = with_request_timeout(slow, Duration::from_millis(20));

    let (status, body) = send(&app, Method::GET, "/slow", None, None).await;
    assert_eq!(status, StatusCode::REQUEST_TIMEOUT);
    assert_eq!(body["success"], false);
    assert_eq!(body["message"], "Request timed out");
}
