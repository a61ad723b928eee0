//! Inventory ledger models

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::money::Won;

/// Minimum stock given to a new inventory record
pub const DEFAULT_MIN_STOCK: i64 = 0;

/// Maximum stock given to a new inventory record
pub const DEFAULT_MAX_STOCK: i64 = 1000;

/// Per-item stock and weighted-average purchase cost
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryRecord {
    pub item_id: i64,
    /// Running sum of purchased quantities
    pub current_stock: i64,
    pub avg_purchase_cost: Won,
    pub min_stock: i64,
    pub max_stock: i64,
    pub last_purchase_date: Option<NaiveDate>,
}

impl InventoryRecord {
    /// First record for an item, opened by its first purchase
    pub fn opened(item_id: i64, quantity: i64, unit_cost: Won, date: NaiveDate) -> Self {
        Self {
            item_id,
            current_stock: quantity,
            avg_purchase_cost: unit_cost,
            min_stock: DEFAULT_MIN_STOCK,
            max_stock: DEFAULT_MAX_STOCK,
            last_purchase_date: Some(date),
        }
    }

    pub fn status(&self) -> StockStatus {
        StockStatus::classify(self.current_stock, self.min_stock, self.max_stock)
    }
}

/// Stock level relative to the reorder thresholds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum StockStatus {
    Low,
    Normal,
    High,
}

impl StockStatus {
    /// `LOW` wins over `HIGH` when the thresholds overlap
    pub fn classify(current_stock: i64, min_stock: i64, max_stock: i64) -> Self {
        if current_stock <= min_stock {
            StockStatus::Low
        } else if current_stock >= max_stock {
            StockStatus::High
        } else {
            StockStatus::Normal
        }
    }
}

impl std::fmt::Display for StockStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StockStatus::Low => write!(f, "LOW"),
            StockStatus::Normal => write!(f, "NORMAL"),
            StockStatus::High => write!(f, "HIGH"),
        }
    }
}

/// Inventory record joined with its item, as listed to users
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryView {
    #[serde(flatten)]
    pub record: InventoryRecord,
    pub item_name: String,
    pub item_code: Option<String>,
    pub item_category: String,
    pub standard_price: Won,
    pub stock_status: StockStatus,
}

/// Input for updating reorder thresholds
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct StockLimitsInput {
    pub min_stock: i64,
    pub max_stock: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stock_status_thresholds() {
        assert_eq!(StockStatus::classify(5, 5, 100), StockStatus::Low);
        assert_eq!(StockStatus::classify(50, 5, 100), StockStatus::Normal);
        assert_eq!(StockStatus::classify(100, 5, 100), StockStatus::High);
        assert_eq!(StockStatus::classify(10, 10, 10), StockStatus::Low);
    }

    #[test]
    fn test_opened_record_defaults() {
        let date = NaiveDate::from_ymd_opt(2024, 2, 1).unwrap();
        let record = InventoryRecord::opened(7, 12, 350, date);
        assert_eq!(record.min_stock, DEFAULT_MIN_STOCK);
        assert_eq!(record.max_stock, DEFAULT_MAX_STOCK);
        assert_eq!(record.status(), StockStatus::Normal);
    }

    #[test]
    fn test_view_serializes_flat_with_status() {
        let view = InventoryView {
            record: InventoryRecord::opened(1, 0, 100, NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()),
            item_name: "저항 10K".to_string(),
            item_code: None,
            item_category: "전자부품".to_string(),
            standard_price: 0,
            stock_status: StockStatus::Low,
        };
        let json = serde_json::to_value(&view).unwrap();
        assert_eq!(json["item_id"], 1);
        assert_eq!(json["stock_status"], "LOW");
    }
}
