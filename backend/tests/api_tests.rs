//! HTTP API tests
//!
//! Drives the full router against an in-memory SQLite database.

use axum::{
    body::{to_bytes, Body},
    http::{Method, Request, StatusCode},
    Router,
};
use erp_backend::{create_app, AppState, Config, SqliteStore};
use serde_json::{json, Value};
use tower::ServiceExt;

async fn app() -> Router {
    let store = SqliteStore::in_memory().await.unwrap();
    create_app(AppState::new(store, Config::default()))
}

async fn send(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let request = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => request
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => request.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, value)
}

fn ledger_rows() -> Value {
    json!([
        ["No", "거래처", "일자", "품목", "수량", "공급가액", "부가세", "합계금액", "비고", "원화단가"],
        [1, "ACME", "2024-02-01", "Widget", 2, 2000, 200, 2200, null, 600],
        [2, "ACME", 45324, "Widget", 3, 3000, 300, 3300, null, 600],
        [null, "합계", null, null, 5, 5000, 500, 5500, null, null]
    ])
}

// ============================================================================
// Health
// ============================================================================

#[tokio::test]
async fn test_health_reports_database() {
    let app = app().await;
    let (status, body) = send(&app, Method::GET, "/health", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["database"], "connected");
}

// ============================================================================
// Master data
// ============================================================================

#[tokio::test]
async fn test_customer_lifecycle() {
    let app = app().await;

    let (status, created) = send(
        &app,
        Method::POST,
        "/api/v1/customers",
        Some(json!({ "name": "ACME", "phone": "02-123-4567" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let id = created["id"].as_i64().unwrap();

    let (status, error) = send(
        &app,
        Method::POST,
        "/api/v1/customers",
        Some(json!({ "name": "ACME" })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(error["error"]["code"], "DUPLICATE_ENTRY");
    assert_eq!(error["error"]["field"], "name");

    let (status, updated) = send(
        &app,
        Method::PUT,
        &format!("/api/v1/customers/{}", id),
        Some(json!({ "name": "ACME Corp" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["name"], "ACME Corp");

    let (status, _) = send(&app, Method::DELETE, &format!("/api/v1/customers/{}", id), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, error) = send(&app, Method::GET, &format!("/api/v1/customers/{}", id), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(error["error"]["code"], "NOT_FOUND");
}

#[tokio::test]
async fn test_invalid_item_code_rejected() {
    let app = app().await;
    let (status, error) = send(
        &app,
        Method::POST,
        "/api/v1/items",
        Some(json!({ "name": "Widget", "code": "W 1" })),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error["error"]["code"], "VALIDATION_ERROR");
    assert_eq!(error["error"]["field"], "code");
}

// ============================================================================
// Transactions
// ============================================================================

#[tokio::test]
async fn test_purchase_then_sale() {
    let app = app().await;
    let (_, supplier) = send(&app, Method::POST, "/api/v1/suppliers", Some(json!({ "name": "PartsCo" }))).await;
    let (_, customer) = send(&app, Method::POST, "/api/v1/customers", Some(json!({ "name": "ACME" }))).await;
    let (_, item) = send(&app, Method::POST, "/api/v1/items", Some(json!({ "name": "Widget" }))).await;
    let item_id = item["id"].as_i64().unwrap();

    let (status, purchase) = send(
        &app,
        Method::POST,
        "/api/v1/purchases",
        Some(json!({
            "supplier_id": supplier["id"],
            "item_id": item_id,
            "purchase_date": "2024-01-10",
            "quantity": 10,
            "unit_cost": 800,
            "status": "received"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(purchase["supply_amount"], 8000);

    let (status, inventory) =
        send(&app, Method::GET, &format!("/api/v1/inventory/item/{}", item_id), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(inventory["current_stock"], 10);
    assert_eq!(inventory["avg_purchase_cost"], 800);
    assert_eq!(inventory["stock_status"], "NORMAL");

    let (status, sale) = send(
        &app,
        Method::POST,
        "/api/v1/sales",
        Some(json!({
            "customer_id": customer["id"],
            "item_id": item_id,
            "sale_date": "2024-02-01",
            "quantity": 5,
            "unit_price": 1000,
            "vat_amount": 500
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(sale["total_amount"], 5500);
    assert_eq!(sale["purchase_price"], 800);
    assert_eq!(sale["profit_amount"], 1500);

    let (status, limits) = send(
        &app,
        Method::PUT,
        &format!("/api/v1/inventory/{}/limits", item_id),
        Some(json!({ "min_stock": 10, "max_stock": 100 })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(limits["min_stock"], 10);

    // Referenced items cannot be deleted
    let (status, error) = send(&app, Method::DELETE, &format!("/api/v1/items/{}", item_id), None).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(error["error"]["code"], "CONFLICT");
}

#[tokio::test]
async fn test_sale_with_unknown_customer() {
    let app = app().await;
    let (_, item) = send(&app, Method::POST, "/api/v1/items", Some(json!({ "name": "Widget" }))).await;

    let (status, _) = send(
        &app,
        Method::POST,
        "/api/v1/sales",
        Some(json!({
            "customer_id": 404,
            "item_id": item["id"],
            "sale_date": "2024-02-01",
            "quantity": 1,
            "unit_price": 1000
        })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

// ============================================================================
// Import
// ============================================================================

#[tokio::test]
async fn test_import_and_dashboard() {
    let app = app().await;

    let (status, report) = send(
        &app,
        Method::POST,
        "/api/v1/import",
        Some(json!({ "layout": "sales_ledger", "rows": ledger_rows() })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(report["state"], "DONE");
    assert_eq!(report["customers"]["success"], 1);
    assert_eq!(report["items"]["success"], 1);
    assert_eq!(report["sales"]["success"], 2);
    assert_eq!(report["totals"]["errors"], 0);

    let (_, sales) = send(&app, Method::GET, "/api/v1/sales?customer_id=1", None).await;
    let sales = sales.as_array().unwrap();
    assert_eq!(sales.len(), 2);
    // Serial 45324 is 2024-02-02; newest first
    assert_eq!(sales[0]["sale_date"], "2024-02-02");

    let (status, stats) = send(&app, Method::GET, "/api/v1/dashboard/stats?year=2024&month=2", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(stats["total_transactions"], 2);
    assert_eq!(stats["total_sales"], 5500);
    assert_eq!(stats["total_profit"], 2500);
    assert_eq!(stats["total_customers"], 1);

    let (_, stats) = send(&app, Method::GET, "/api/v1/dashboard/stats?year=2023", None).await;
    assert_eq!(stats["total_transactions"], 0);
}

#[tokio::test]
async fn test_import_rejects_empty_rows() {
    let app = app().await;
    let (status, error) = send(
        &app,
        Method::POST,
        "/api/v1/import",
        Some(json!({ "layout": "sales_ledger", "rows": [] })),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error["error"]["field"], "rows");
}

#[tokio::test]
async fn test_import_strict_dates_lists_rejected_rows() {
    let app = app().await;
    let rows = json!([
        ["No", "거래처", "일자", "품목", "수량", "공급가액", "부가세", "합계금액"],
        [1, "ACME", "someday", "Widget", 1, 1000, 100, 1100]
    ]);

    let (status, report) = send(
        &app,
        Method::POST,
        "/api/v1/import",
        Some(json!({ "layout": "sales_ledger", "rows": rows, "date_policy": "reject" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(report["sales"]["total"], 0);
    assert_eq!(report["rejected_rows"][0]["row"], 2);
}

#[tokio::test]
async fn test_invalid_dashboard_month() {
    let app = app().await;
    let (status, error) = send(&app, Method::GET, "/api/v1/dashboard/stats?year=2024&month=13", None).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error["error"]["code"], "VALIDATION_ERROR");
}
