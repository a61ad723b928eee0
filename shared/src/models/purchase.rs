//! Purchase models

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::sale::default_limit;
use crate::money::{PurchaseFigures, Won};
use crate::types::UnknownVariant;

/// Purchase order status
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PurchaseStatus {
    #[default]
    Ordered,
    Received,
    Cancelled,
}

impl PurchaseStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PurchaseStatus::Ordered => "ordered",
            PurchaseStatus::Received => "received",
            PurchaseStatus::Cancelled => "cancelled",
        }
    }
}

impl std::fmt::Display for PurchaseStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for PurchaseStatus {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ordered" => Ok(PurchaseStatus::Ordered),
            "received" => Ok(PurchaseStatus::Received),
            "cancelled" => Ok(PurchaseStatus::Cancelled),
            other => Err(UnknownVariant::new("purchase status", other)),
        }
    }
}

/// A recorded purchase with its derived amounts
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Purchase {
    pub id: i64,
    pub supplier_id: i64,
    pub supplier_name: String,
    pub item_id: i64,
    pub item_name: String,
    pub item_code: Option<String>,
    pub purchase_date: NaiveDate,
    pub quantity: i64,
    pub unit_cost: Won,
    pub supply_amount: Won,
    pub vat_amount: Won,
    pub total_amount: Won,
    pub expected_sale_price: Won,
    pub expected_margin: Decimal,
    pub invoice_number: Option<String>,
    pub status: PurchaseStatus,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Input for creating or updating a purchase
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PurchaseInput {
    pub supplier_id: i64,
    pub item_id: i64,
    pub purchase_date: NaiveDate,
    pub quantity: i64,
    pub unit_cost: Won,
    pub vat_amount: Option<Won>,
    pub expected_sale_price: Option<Won>,
    pub invoice_number: Option<String>,
    pub status: Option<PurchaseStatus>,
    pub notes: Option<String>,
}

/// A purchase row ready to be written, derived fields included
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewPurchase {
    pub supplier_id: i64,
    pub item_id: i64,
    pub purchase_date: NaiveDate,
    pub figures: PurchaseFigures,
    pub invoice_number: Option<String>,
    pub status: PurchaseStatus,
    pub notes: Option<String>,
}

impl From<&PurchaseInput> for NewPurchase {
    fn from(input: &PurchaseInput) -> Self {
        Self {
            supplier_id: input.supplier_id,
            item_id: input.item_id,
            purchase_date: input.purchase_date,
            figures: PurchaseFigures::compute(
                input.unit_cost,
                input.quantity,
                input.vat_amount.unwrap_or(0),
                input.expected_sale_price.unwrap_or(0),
            ),
            invoice_number: input.invoice_number.clone(),
            status: input.status.unwrap_or_default(),
            notes: input.notes.clone(),
        }
    }
}

/// Filters for listing purchases
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PurchaseFilter {
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub supplier_id: Option<i64>,
    pub item_id: Option<i64>,
    pub status: Option<PurchaseStatus>,
    #[serde(default = "default_limit")]
    pub limit: u32,
    #[serde(default)]
    pub offset: u32,
}

impl Default for PurchaseFilter {
    fn default() -> Self {
        Self {
            start_date: None,
            end_date: None,
            supplier_id: None,
            item_id: None,
            status: None,
            limit: default_limit(),
            offset: 0,
        }
    }
}

impl PurchaseFilter {
    pub fn matches(&self, purchase: &Purchase) -> bool {
        self.start_date.map_or(true, |d| purchase.purchase_date >= d)
            && self.end_date.map_or(true, |d| purchase.purchase_date <= d)
            && self.supplier_id.map_or(true, |id| purchase.supplier_id == id)
            && self.item_id.map_or(true, |id| purchase.item_id == id)
            && self.status.map_or(true, |s| purchase.status == s)
    }
}
