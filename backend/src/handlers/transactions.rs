//! HTTP handlers for sales, purchases and the dashboard

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use shared::{Purchase, PurchaseFilter, PurchaseInput, Sale, SaleFilter, SaleInput, SalesSummary};

use crate::error::AppResult;
use crate::services::{PurchaseService, ReportingService, SaleService, StatsQuery};
use crate::AppState;

/// List sales, newest first
pub async fn list_sales(
    State(state): State<AppState>,
    Query(filter): Query<SaleFilter>,
) -> AppResult<Json<Vec<Sale>>> {
    let service = SaleService::new(state.store);
    Ok(Json(service.list(filter).await?))
}

/// Record a sale
pub async fn create_sale(
    State(state): State<AppState>,
    Json(input): Json<SaleInput>,
) -> AppResult<(StatusCode, Json<Sale>)> {
    let service = SaleService::new(state.store);
    let sale = service.create(input).await?;
    Ok((StatusCode::CREATED, Json(sale)))
}

pub async fn get_sale(State(state): State<AppState>, Path(id): Path<i64>) -> AppResult<Json<Sale>> {
    let service = SaleService::new(state.store);
    Ok(Json(service.get(id).await?))
}

pub async fn update_sale(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(input): Json<SaleInput>,
) -> AppResult<Json<Sale>> {
    let service = SaleService::new(state.store);
    Ok(Json(service.update(id, input).await?))
}

pub async fn delete_sale(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> AppResult<StatusCode> {
    let service = SaleService::new(state.store);
    service.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// List purchases, newest first
pub async fn list_purchases(
    State(state): State<AppState>,
    Query(filter): Query<PurchaseFilter>,
) -> AppResult<Json<Vec<Purchase>>> {
    let service = PurchaseService::new(state.store);
    Ok(Json(service.list(filter).await?))
}

/// Record a purchase and update the inventory ledger
pub async fn create_purchase(
    State(state): State<AppState>,
    Json(input): Json<PurchaseInput>,
) -> AppResult<(StatusCode, Json<Purchase>)> {
    let service = PurchaseService::new(state.store);
    let purchase = service.create(input).await?;
    Ok((StatusCode::CREATED, Json(purchase)))
}

pub async fn get_purchase(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> AppResult<Json<Purchase>> {
    let service = PurchaseService::new(state.store);
    Ok(Json(service.get(id).await?))
}

pub async fn update_purchase(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(input): Json<PurchaseInput>,
) -> AppResult<Json<Purchase>> {
    let service = PurchaseService::new(state.store);
    Ok(Json(service.update(id, input).await?))
}

pub async fn delete_purchase(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> AppResult<StatusCode> {
    let service = PurchaseService::new(state.store);
    service.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Sales summary for a year, a month, or all time
pub async fn dashboard_stats(
    State(state): State<AppState>,
    Query(query): Query<StatsQuery>,
) -> AppResult<Json<SalesSummary>> {
    let service = ReportingService::new(state.store);
    Ok(Json(service.sales_summary(query).await?))
}
