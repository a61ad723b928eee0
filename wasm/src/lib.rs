//! WebAssembly module for the small-business ERP
//!
//! Lets the front end compute the same derived amounts as the server while
//! a sale or purchase form is being edited:
//! - Sale and purchase figures (supply, total, profit, margins)
//! - Weighted-average cost preview
//! - Stock status and input validation

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::Serialize;
use wasm_bindgen::prelude::*;

// Re-export shared types for use in JavaScript
pub use shared::models::*;
pub use shared::money::*;
pub use shared::validation::*;

fn rate_to_f64(rate: Decimal) -> f64 {
    rate.to_f64().unwrap_or(0.0)
}

fn to_json<T: Serialize>(value: &T) -> Result<String, JsValue> {
    serde_json::to_string(value).map_err(|e| JsValue::from_str(&format!("Serialization failed: {}", e)))
}

/// All derived amounts of a sale, as JSON
#[wasm_bindgen]
pub fn calculate_sale_figures(
    unit_price: i64,
    quantity: i64,
    vat_amount: i64,
    purchase_price: i64,
) -> Result<String, JsValue> {
    to_json(&SaleFigures::compute(unit_price, quantity, vat_amount, purchase_price))
}

/// All derived amounts of a purchase, as JSON
#[wasm_bindgen]
pub fn calculate_purchase_figures(
    unit_cost: i64,
    quantity: i64,
    vat_amount: i64,
    expected_sale_price: i64,
) -> Result<String, JsValue> {
    to_json(&PurchaseFigures::compute(unit_cost, quantity, vat_amount, expected_sale_price))
}

/// Margin rate in percent, one fractional digit
#[wasm_bindgen]
pub fn calculate_margin_rate(profit_amount: i64, total: i64) -> f64 {
    rate_to_f64(margin_rate(profit_amount, total))
}

#[wasm_bindgen]
pub fn calculate_expected_margin(expected_sale_price: i64, unit_cost: i64) -> f64 {
    rate_to_f64(expected_margin(expected_sale_price, unit_cost))
}

#[derive(Serialize)]
struct BlendPreview {
    current_stock: i64,
    avg_unit_cost: i64,
}

/// Stock and average cost after receiving a purchase, as JSON
#[wasm_bindgen]
pub fn preview_average_cost(
    current_stock: i64,
    current_avg_cost: i64,
    quantity: i64,
    unit_cost: i64,
) -> Result<String, JsValue> {
    let (current_stock, avg_unit_cost) =
        blend_average_cost(current_stock, current_avg_cost, quantity, unit_cost);
    to_json(&BlendPreview {
        current_stock,
        avg_unit_cost,
    })
}

/// `LOW`, `NORMAL` or `HIGH`
#[wasm_bindgen]
pub fn classify_stock(current_stock: i64, min_stock: i64, max_stock: i64) -> String {
    StockStatus::classify(current_stock, min_stock, max_stock).to_string()
}

/// Validation message for an item code, or `None` when it is acceptable
#[wasm_bindgen]
pub fn check_item_code(code: &str) -> Option<String> {
    validate_item_code(code).err().map(str::to_string)
}

#[wasm_bindgen]
pub fn check_stock_limits(min_stock: i64, max_stock: i64) -> Option<String> {
    validate_stock_limits(min_stock, max_stock).err().map(str::to_string)
}
