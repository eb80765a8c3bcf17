//! Checkout and order administration.
//!
//! ## Checkout
//! ```text
//! POST /api/orders
//!      │
//!      ▼
//! CheckoutService::place_order (one transaction)
//!      │
//!      ├── Ok(order)             → 201 {success, data: order}
//!      ├── EmptyCart             → 400
//!      ├── InsufficientStock     → 400 "Insufficient stock for <name> ..."
//!      └── database failure      → 500, nothing written
//! ```

use axum::extract::rejection::QueryRejection;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde::Deserialize;
use tracing::info;

use storefront_core::{CoreError, Order, OrderStatus, OrderStatusUpdate, PaymentMethod, ShippingAddress};

use crate::auth::{AdminUser, AuthUser};
use crate::error::{ApiError, ApiResult};
use crate::response::{ApiJson, ApiResponse};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaceOrderRequest {
    pub shipping_address: ShippingAddress,
    pub payment_method: PaymentMethod,
}

#[derive(Debug, Deserialize)]
pub struct ListOrdersQuery {
    pub status: Option<OrderStatus>,
}

pub async fn place_order(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiJson(req): ApiJson<PlaceOrderRequest>,
) -> ApiResult<impl IntoResponse> {
    let order = state
        .checkout()
        .place_order(&auth.user_id, req.shipping_address, req.payment_method)
        .await?;

    Ok((StatusCode::CREATED, ApiResponse::ok(order)))
}

pub async fn my_orders(State(state): State<AppState>, auth: AuthUser) -> ApiResult<ApiResponse<Vec<Order>>> {
    let orders = state.db.orders().list_for_user(&auth.user_id).await?;
    Ok(ApiResponse::ok(orders))
}

pub async fn get_order(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<String>,
) -> ApiResult<ApiResponse<Order>> {
    let order = state
        .db
        .orders()
        .get_by_id(&id)
        .await?
        .ok_or_else(|| CoreError::OrderNotFound(id.clone()))?;

    order.ensure_visible_to(&auth.user_id, auth.role)?;
    Ok(ApiResponse::ok(order))
}

pub async fn list_orders(
    State(state): State<AppState>,
    _admin: AdminUser,
    query: Result<Query<ListOrdersQuery>, QueryRejection>,
) -> ApiResult<ApiResponse<Vec<Order>>> {
    let Query(query) = query?;
    let orders = state.db.orders().list_all(query.status).await?;
    Ok(ApiResponse::ok(orders))
}

pub async fn update_status(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    Path(id): Path<String>,
    ApiJson(update): ApiJson<OrderStatusUpdate>,
) -> ApiResult<ApiResponse<Order>> {
    if update.is_empty() {
        return Err(ApiError::bad_request(
            "Provide orderStatus and/or paymentStatus",
        ));
    }

    let order = state.db.orders().update_status(&id, update).await?;

    info!(
        order_id = %order.id,
        order_status = %order.order_status,
        payment_status = %order.payment_status,
        by = %admin.user_id,
        "Order status updated"
    );
    Ok(ApiResponse::ok(order))
}
