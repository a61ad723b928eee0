//! HTTP handlers for items and the inventory ledger

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use shared::{InventoryRecord, InventoryView, Item, ItemInput, StockLimitsInput};

use crate::error::AppResult;
use crate::services::{InventoryService, ItemService};
use crate::AppState;

pub async fn list_items(State(state): State<AppState>) -> AppResult<Json<Vec<Item>>> {
    let service = ItemService::new(state.store);
    Ok(Json(service.list().await?))
}

pub async fn create_item(
    State(state): State<AppState>,
    Json(input): Json<ItemInput>,
) -> AppResult<(StatusCode, Json<Item>)> {
    let service = ItemService::new(state.store);
    let item = service.create(input).await?;
    Ok((StatusCode::CREATED, Json(item)))
}

pub async fn get_item(State(state): State<AppState>, Path(id): Path<i64>) -> AppResult<Json<Item>> {
    let service = ItemService::new(state.store);
    Ok(Json(service.get(id).await?))
}

pub async fn update_item(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(input): Json<ItemInput>,
) -> AppResult<Json<Item>> {
    let service = ItemService::new(state.store);
    Ok(Json(service.update(id, input).await?))
}

/// Delete an unreferenced item
pub async fn delete_item(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> AppResult<StatusCode> {
    let service = ItemService::new(state.store);
    service.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Inventory of all active items with stock status
pub async fn list_inventory(State(state): State<AppState>) -> AppResult<Json<Vec<InventoryView>>> {
    let service = InventoryService::new(state.store);
    Ok(Json(service.list().await?))
}

pub async fn get_item_inventory(
    State(state): State<AppState>,
    Path(item_id): Path<i64>,
) -> AppResult<Json<InventoryView>> {
    let service = InventoryService::new(state.store);
    Ok(Json(service.for_item(item_id).await?))
}

/// Update reorder thresholds of an item
pub async fn update_stock_limits(
    State(state): State<AppState>,
    Path(item_id): Path<i64>,
    Json(input): Json<StockLimitsInput>,
) -> AppResult<Json<InventoryRecord>> {
    let service = InventoryService::new(state.store);
    Ok(Json(service.set_limits(item_id, input).await?))
}
