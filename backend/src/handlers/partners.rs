//! HTTP handlers for customers and suppliers

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use shared::{Customer, CustomerInput, Supplier, SupplierInput};

use crate::error::AppResult;
use crate::services::{CustomerService, SupplierService};
use crate::AppState;

/// List customers
pub async fn list_customers(State(state): State<AppState>) -> AppResult<Json<Vec<Customer>>> {
    let service = CustomerService::new(state.store);
    Ok(Json(service.list().await?))
}

/// Create a customer
pub async fn create_customer(
    State(state): State<AppState>,
    Json(input): Json<CustomerInput>,
) -> AppResult<(StatusCode, Json<Customer>)> {
    let service = CustomerService::new(state.store);
    let customer = service.create(input).await?;
    Ok((StatusCode::CREATED, Json(customer)))
}

pub async fn get_customer(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> AppResult<Json<Customer>> {
    let service = CustomerService::new(state.store);
    Ok(Json(service.get(id).await?))
}

pub async fn update_customer(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(input): Json<CustomerInput>,
) -> AppResult<Json<Customer>> {
    let service = CustomerService::new(state.store);
    Ok(Json(service.update(id, input).await?))
}

/// Delete a customer without sales
pub async fn delete_customer(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> AppResult<StatusCode> {
    let service = CustomerService::new(state.store);
    service.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// List active suppliers
pub async fn list_suppliers(State(state): State<AppState>) -> AppResult<Json<Vec<Supplier>>> {
    let service = SupplierService::new(state.store);
    Ok(Json(service.list().await?))
}

pub async fn create_supplier(
    State(state): State<AppState>,
    Json(input): Json<SupplierInput>,
) -> AppResult<(StatusCode, Json<Supplier>)> {
    let service = SupplierService::new(state.store);
    let supplier = service.create(input).await?;
    Ok((StatusCode::CREATED, Json(supplier)))
}

pub async fn get_supplier(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> AppResult<Json<Supplier>> {
    let service = SupplierService::new(state.store);
    Ok(Json(service.get(id).await?))
}

pub async fn update_supplier(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(input): Json<SupplierInput>,
) -> AppResult<Json<Supplier>> {
    let service = SupplierService::new(state.store);
    Ok(Json(service.update(id, input).await?))
}

/// Deactivate a supplier
pub async fn delete_supplier(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> AppResult<StatusCode> {
    let service = SupplierService::new(state.store);
    service.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
