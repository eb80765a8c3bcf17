//! The caller's cart. Every mutation answers with the refreshed cart.

use axum::extract::{Path, State};
use serde::Deserialize;

use storefront_core::CartSummary;

use crate::auth::AuthUser;
use crate::error::ApiResult;
use crate::response::{ApiJson, ApiResponse};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddToCartRequest {
    pub item_id: String,
    #[serde(default = "default_quantity")]
    pub quantity: i64,
}

fn default_quantity() -> i64 {
    1
}

#[derive(Debug, Deserialize)]
pub struct UpdateLineRequest {
    pub quantity: i64,
}

async fn summary(state: &AppState, user_id: &str) -> ApiResult<ApiResponse<CartSummary>> {
    let lines = state.db.carts().get_cart(user_id).await?;
    let summary = CartSummary::build(lines, &state.pricing)?;
    Ok(ApiResponse::ok(summary))
}

pub async fn get_cart(State(state): State<AppState>, auth: AuthUser) -> ApiResult<ApiResponse<CartSummary>> {
    summary(&state, &auth.user_id).await
}

pub async fn add_to_cart(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiJson(req): ApiJson<AddToCartRequest>,
) -> ApiResult<ApiResponse<CartSummary>> {
    state
        .db
        .carts()
        .add_item(&auth.user_id, &req.item_id, req.quantity)
        .await?;
    summary(&state, &auth.user_id).await
}

pub async fn update_line(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(line_id): Path<String>,
    ApiJson(req): ApiJson<UpdateLineRequest>,
) -> ApiResult<ApiResponse<CartSummary>> {
    state
        .db
        .carts()
        .update_line(&auth.user_id, &line_id, req.quantity)
        .await?;
    summary(&state, &auth.user_id).await
}

pub async fn remove_line(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(line_id): Path<String>,
) -> ApiResult<ApiResponse<CartSummary>> {
    state.db.carts().remove_line(&auth.user_id, &line_id).await?;
    summary(&state, &auth.user_id).await
}

pub async fn clear_cart(State(state): State<AppState>, auth: AuthUser) -> ApiResult<ApiResponse<CartSummary>> {
    state.db.carts().clear(&auth.user_id).await?;
    summary(&state, &auth.user_id).await
}
