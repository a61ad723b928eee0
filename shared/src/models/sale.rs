//! Sales models

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::money::{SaleFigures, Won};

/// A recorded sale with its derived amounts
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sale {
    pub id: i64,
    pub customer_id: i64,
    pub customer_name: String,
    pub item_id: i64,
    pub item_name: String,
    pub item_code: Option<String>,
    pub sale_date: NaiveDate,
    pub quantity: i64,
    pub unit_price: Won,
    pub supply_price: Won,
    pub vat_amount: Won,
    pub total_amount: Won,
    /// Unit cost basis at the time of sale
    pub purchase_price: Won,
    pub profit_amount: Won,
    pub margin_rate: Decimal,
    pub invoice_number: Option<String>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Input for creating or updating a sale
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SaleInput {
    pub customer_id: i64,
    pub item_id: i64,
    pub sale_date: NaiveDate,
    pub quantity: i64,
    pub unit_price: Won,
    pub vat_amount: Option<Won>,
    /// Unit cost basis; when absent or zero the latest received purchase cost is used
    pub purchase_price: Option<Won>,
    pub invoice_number: Option<String>,
    pub notes: Option<String>,
}

/// A sale row ready to be written, derived fields included
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewSale {
    pub customer_id: i64,
    pub item_id: i64,
    pub sale_date: NaiveDate,
    pub figures: SaleFigures,
    pub invoice_number: Option<String>,
    pub notes: Option<String>,
}

impl NewSale {
    pub fn from_input(input: &SaleInput, cost_basis: Won) -> Self {
        Self {
            customer_id: input.customer_id,
            item_id: input.item_id,
            sale_date: input.sale_date,
            figures: SaleFigures::compute(
                input.unit_price,
                input.quantity,
                input.vat_amount.unwrap_or(0),
                cost_basis,
            ),
            invoice_number: input.invoice_number.clone(),
            notes: input.notes.clone(),
        }
    }
}

/// Filters for listing sales
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SaleFilter {
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub customer_id: Option<i64>,
    pub item_id: Option<i64>,
    #[serde(default = "default_limit")]
    pub limit: u32,
    #[serde(default)]
    pub offset: u32,
}

impl Default for SaleFilter {
    fn default() -> Self {
        Self {
            start_date: None,
            end_date: None,
            customer_id: None,
            item_id: None,
            limit: default_limit(),
            offset: 0,
        }
    }
}

impl SaleFilter {
    pub fn matches(&self, sale: &Sale) -> bool {
        self.start_date.map_or(true, |d| sale.sale_date >= d)
            && self.end_date.map_or(true, |d| sale.sale_date <= d)
            && self.customer_id.map_or(true, |id| sale.customer_id == id)
            && self.item_id.map_or(true, |id| sale.item_id == id)
    }
}

pub(crate) fn default_limit() -> u32 {
    1000
}

/// Sales summary for the dashboard
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SalesSummary {
    pub total_transactions: i64,
    pub total_sales: Won,
    pub total_profit: Won,
    pub avg_margin_rate: Decimal,
    pub total_customers: i64,
    pub total_items: i64,
}
