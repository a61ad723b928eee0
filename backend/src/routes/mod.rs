//! Route definitions for the ERP API

use axum::{
    routing::{get, post, put},
    Router,
};

use crate::{handlers, AppState};

/// Create API routes
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .nest("/customers", customer_routes())
        .nest("/suppliers", supplier_routes())
        .nest("/items", item_routes())
        .nest("/inventory", inventory_routes())
        .nest("/sales", sale_routes())
        .nest("/purchases", purchase_routes())
        .route("/dashboard/stats", get(handlers::dashboard_stats))
        .route("/import", post(handlers::import_sheet))
}

fn customer_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(handlers::list_customers).post(handlers::create_customer),
        )
        .route(
            "/:id",
            get(handlers::get_customer)
                .put(handlers::update_customer)
                .delete(handlers::delete_customer),
        )
}

fn supplier_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(handlers::list_suppliers).post(handlers::create_supplier),
        )
        .route(
            "/:id",
            get(handlers::get_supplier)
                .put(handlers::update_supplier)
                .delete(handlers::delete_supplier),
        )
}

fn item_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_items).post(handlers::create_item))
        .route(
            "/:id",
            get(handlers::get_item)
                .put(handlers::update_item)
                .delete(handlers::delete_item),
        )
}

/// Inventory ledger routes
fn inventory_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_inventory))
        .route("/item/:item_id", get(handlers::get_item_inventory))
        .route("/:item_id/limits", put(handlers::update_stock_limits))
}

fn sale_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_sales).post(handlers::create_sale))
        .route(
            "/:id",
            get(handlers::get_sale)
                .put(handlers::update_sale)
                .delete(handlers::delete_sale),
        )
}

fn purchase_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(handlers::list_purchases).post(handlers::create_purchase),
        )
        .route(
            "/:id",
            get(handlers::get_purchase)
                .put(handlers::update_purchase)
                .delete(handlers::delete_purchase),
        )
}
