//! Import run report models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::UnknownVariant;

/// Historical spreadsheet layouts accepted by the importer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SheetLayout {
    /// Sales ledger sheet: one sale per row with a unit purchase price column
    SalesLedger,
    /// Quotation sheet where each row holds a sale and the matching purchase
    SalesAndPurchases,
}

impl SheetLayout {
    pub fn as_str(&self) -> &'static str {
        match self {
            SheetLayout::SalesLedger => "sales_ledger",
            SheetLayout::SalesAndPurchases => "sales_and_purchases",
        }
    }
}

impl std::fmt::Display for SheetLayout {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for SheetLayout {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.replace('-', "_").as_str() {
            "sales_ledger" => Ok(SheetLayout::SalesLedger),
            "sales_and_purchases" => Ok(SheetLayout::SalesAndPurchases),
            _ => Err(UnknownVariant::new("sheet layout", s)),
        }
    }
}

/// What to do with a date cell that cannot be parsed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DatePolicy {
    /// Use the current date and log a warning
    #[default]
    FallbackToToday,
    /// Leave the row out and list it as rejected
    Reject,
}

/// Stages of an import run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ImportState {
    Init,
    ReadSource,
    MigrateCustomers,
    MigrateSuppliers,
    MigrateItems,
    MigratePurchases,
    MigrateSales,
    Report,
    Done,
    Failed,
}

impl std::fmt::Display for ImportState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ImportState::Init => "INIT",
            ImportState::ReadSource => "READ_SOURCE",
            ImportState::MigrateCustomers => "MIGRATE_CUSTOMERS",
            ImportState::MigrateSuppliers => "MIGRATE_SUPPLIERS",
            ImportState::MigrateItems => "MIGRATE_ITEMS",
            ImportState::MigratePurchases => "MIGRATE_PURCHASES",
            ImportState::MigrateSales => "MIGRATE_SALES",
            ImportState::Report => "REPORT",
            ImportState::Done => "DONE",
            ImportState::Failed => "FAILED",
        };
        f.write_str(name)
    }
}

/// Per-entity counters of an import run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageCounts {
    pub total: u64,
    pub success: u64,
    pub errors: u64,
}

impl StageCounts {
    pub fn merge(&self, other: &StageCounts) -> StageCounts {
        StageCounts {
            total: self.total + other.total,
            success: self.success + other.success,
            errors: self.errors + other.errors,
        }
    }

    /// Share of `part` in `total`, rounded to a whole percent
    pub fn percent(part: u64, total: u64) -> u64 {
        if total == 0 {
            return 0;
        }
        (part * 100 + total / 2) / total
    }
}

/// Counters for every entity type of an import run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportStats {
    pub customers: StageCounts,
    pub suppliers: StageCounts,
    pub items: StageCounts,
    pub purchases: StageCounts,
    pub sales: StageCounts,
}

impl ImportStats {
    pub fn totals(&self) -> StageCounts {
        [self.suppliers, self.items, self.purchases, self.sales]
            .iter()
            .fold(self.customers, |acc, c| acc.merge(c))
    }
}

/// A row the parser left out, with the reason
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RejectedRow {
    /// One-based row number in the sheet
    pub row: usize,
    pub reason: String,
}

/// Reconciliation report of one import run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportReport {
    pub run_id: String,
    pub layout: Option<SheetLayout>,
    pub state: ImportState,
    pub failure: Option<String>,
    #[serde(flatten)]
    pub stats: ImportStats,
    pub totals: StageCounts,
    pub success_percent: u64,
    pub error_percent: u64,
    pub rejected_rows: Vec<RejectedRow>,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl ImportReport {
    pub fn is_failed(&self) -> bool {
        self.state == ImportState::Failed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layout_from_str() {
        assert_eq!("sales-ledger".parse::<SheetLayout>().unwrap(), SheetLayout::SalesLedger);
        assert_eq!(
            "sales_and_purchases".parse::<SheetLayout>().unwrap(),
            SheetLayout::SalesAndPurchases
        );
        assert!("ledger".parse::<SheetLayout>().is_err());
    }

    #[test]
    fn test_totals_sum_every_stage() {
        let counts = StageCounts { total: 3, success: 2, errors: 1 };
        let stats = ImportStats {
            customers: counts,
            suppliers: counts,
            items: counts,
            purchases: counts,
            sales: counts,
        };
        assert_eq!(stats.totals(), StageCounts { total: 15, success: 10, errors: 5 });
    }

    #[test]
    fn test_percent() {
        assert_eq!(StageCounts::percent(2, 3), 67);
        assert_eq!(StageCounts::percent(0, 0), 0);
        assert_eq!(StageCounts::percent(99, 100), 99);
    }

    #[test]
    fn test_state_serializes_screaming_snake_case() {
        let json = serde_json::to_string(&ImportState::MigratePurchases).unwrap();
        assert_eq!(json, "\"MIGRATE_PURCHASES\"");
        assert_eq!(ImportState::MigratePurchases.to_string(), "MIGRATE_PURCHASES");
    }
}
