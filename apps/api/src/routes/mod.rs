//! # HTTP Routes
//!
//! ```text
//! GET    /health                      database ping
//!
//! POST   /api/auth/register           {email, name, password} → {token, user}
//! POST   /api/auth/login              {email, password}       → {token, user}
//! GET    /api/auth/me                 [auth]
//!
//! GET    /api/items                   ?category=&limit=
//! GET    /api/items/{id}
//! POST   /api/items                   [admin]
//! PUT    /api/items/{id}              [admin]
//! DELETE /api/items/{id}              [admin] soft delete
//! POST   /api/items/{id}/restock      [admin] {quantity}
//!
//! GET    /api/cart                    [auth]
//! POST   /api/cart                    [auth] {itemId, quantity}
//! DELETE /api/cart                    [auth]
//! PUT    /api/cart/{lineId}           [auth] {quantity}
//! DELETE /api/cart/{lineId}           [auth]
//!
//! POST   /api/orders                  [auth] {shippingAddress, paymentMethod} → 201
//! GET    /api/orders                  [admin] ?status=
//! GET    /api/orders/mine             [auth]
//! GET    /api/orders/{id}             [auth] owner or admin
//! PUT    /api/orders/{id}/status      [admin] {orderStatus?, paymentStatus?}
//! ```

pub mod auth;
pub mod cart;
pub mod health;
pub mod items;
pub mod orders;

use axum::routing::{get, post, put};
use axum::Router;

use crate::state::AppState;

/// All routes, without state or middleware.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/health", get(health::health))
        // Auth
        .route("/api/auth/register", post(auth::register))
        .route("/api/auth/login", post(auth::login))
        .route("/api/auth/me", get(auth::me))
        // Catalog
        .route("/api/items", get(items::list_items).post(items::create_item))
        .route(
            "/api/items/{id}",
            get(items::get_item).put(items::update_item).delete(items::delete_item),
        )
        .route("/api/items/{id}/restock", post(items::restock_item))
        // Cart
        .route(
            "/api/cart",
            get(cart::get_cart).post(cart::add_to_cart).delete(cart::clear_cart),
        )
        .route(
            "/api/cart/{line_id}",
            put(cart::update_line).delete(cart::remove_line),
        )
        // Orders
        .route("/api/orders", post(orders::place_order).get(orders::list_orders))
        .route("/api/orders/mine", get(orders::my_orders))
        .route("/api/orders/{id}", get(orders::get_order))
        .route("/api/orders/{id}/status", put(orders::update_status))
}
