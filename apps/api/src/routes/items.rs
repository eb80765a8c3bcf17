//! Catalog routes. Reads are public, writes need an admin token.

use axum::extract::rejection::QueryRejection;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use chrono::Utc;
use serde::Deserialize;
use tracing::info;

use storefront_core::validation::{validate_category, validate_quantity};
use storefront_core::{CatalogItem, CatalogItemUpdate, CoreError, NewCatalogItem};

use crate::auth::AdminUser;
use crate::error::ApiResult;
use crate::response::{ApiJson, ApiResponse};
use crate::state::AppState;

const DEFAULT_LIMIT: u32 = 50;
const MAX_LIMIT: u32 = 200;

#[derive(Debug, Deserialize)]
pub struct ListItemsQuery {
    pub category: Option<String>,
    pub limit: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub struct RestockRequest {
    pub quantity: i64,
}

pub async fn list_items(
    State(state): State<AppState>,
    query: Result<Query<ListItemsQuery>, QueryRejection>,
) -> ApiResult<ApiResponse<Vec<CatalogItem>>> {
    let Query(query) = query?;

    let category = query
        .category
        .as_deref()
        .map(str::trim)
        .filter(|c| !c.is_empty());
    if let Some(category) = category {
        validate_category(category)?;
    }
    let limit = query.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT);

    let items = state.db.catalog().list_active(category, limit).await?;
    Ok(ApiResponse::ok(items))
}

pub async fn get_item(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<ApiResponse<CatalogItem>> {
    let item = state
        .db
        .catalog()
        .get_active(&id)
        .await?
        .ok_or_else(|| CoreError::ItemNotFound(id.clone()))?;

    Ok(ApiResponse::ok(item))
}

pub async fn create_item(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    ApiJson(input): ApiJson<NewCatalogItem>,
) -> ApiResult<impl IntoResponse> {
    let item = CatalogItem::create(input, Utc::now())?;
    state.db.catalog().insert(&item).await?;

    info!(item_id = %item.id, name = %item.name, by = %admin.user_id, "Catalog item created");
    Ok((StatusCode::CREATED, ApiResponse::ok(item)))
}

pub async fn update_item(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    Path(id): Path<String>,
    ApiJson(update): ApiJson<CatalogItemUpdate>,
) -> ApiResult<ApiResponse<CatalogItem>> {
    let catalog = state.db.catalog();

    let mut item = catalog
        .get_active(&id)
        .await?
        .ok_or_else(|| CoreError::ItemNotFound(id.clone()))?;

    item.apply_update(update, Utc::now())?;
    catalog.update(&item).await?;

    info!(item_id = %item.id, by = %admin.user_id, "Catalog item updated");
    Ok(ApiResponse::ok(item))
}

pub async fn delete_item(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    Path(id): Path<String>,
) -> ApiResult<ApiResponse<()>> {
    state.db.catalog().soft_delete(&id).await?;

    info!(item_id = %id, by = %admin.user_id, "Catalog item deleted");
    Ok(ApiResponse::message("Item deleted"))
}

pub async fn restock_item(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    Path(id): Path<String>,
    ApiJson(req): ApiJson<RestockRequest>,
) -> ApiResult<ApiResponse<CatalogItem>> {
    validate_quantity(req.quantity)?;

    let item = state.db.catalog().restock(&id, req.quantity).await?;

    info!(item_id = %item.id, added = req.quantity, stock = item.stock, by = %admin.user_id, "Item restocked");
    Ok(ApiResponse::ok(item))
}
