//! Inventory ledger: per-item stock and weighted-average purchase cost
//!
//! The ledger is only ever written from inside a purchase transaction via
//! [`record_purchase`]; [`InventoryService`] covers the read side and the
//! reorder thresholds.

use chrono::NaiveDate;
use shared::{
    blend_average_cost, validate_stock_limits, InventoryRecord, InventoryView, StockLimitsInput,
    Won,
};

use crate::error::{AppError, AppResult};
use crate::store::{Store, StoreTx};

/// Blend a purchase into the item's inventory record, creating it if needed
pub async fn record_purchase<T: StoreTx>(
    tx: &mut T,
    item_id: i64,
    quantity: i64,
    unit_cost: Won,
    today: NaiveDate,
) -> AppResult<InventoryRecord> {
    let record = match tx.get_inventory(item_id).await? {
        None => InventoryRecord::opened(item_id, quantity, unit_cost, today),
        Some(mut record) => {
            let (stock, avg) =
                blend_average_cost(record.current_stock, record.avg_purchase_cost, quantity, unit_cost);
            record.current_stock = stock;
            record.avg_purchase_cost = avg;
            record.last_purchase_date = Some(today);
            record
        }
    };

    tx.put_inventory(&record).await?;
    tracing::debug!(
        item_id,
        current_stock = record.current_stock,
        avg_purchase_cost = record.avg_purchase_cost,
        "Inventory updated"
    );
    Ok(record)
}

/// Inventory service for ledger reads and thresholds
#[derive(Clone)]
pub struct InventoryService<S> {
    store: S,
}

impl<S: Store> InventoryService<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// All records of active items, lowest stock first
    pub async fn list(&self) -> AppResult<Vec<InventoryView>> {
        let mut tx = self.store.begin().await?;
        let views = tx.list_inventory().await?;
        tx.commit().await?;
        Ok(views)
    }

    pub async fn for_item(&self, item_id: i64) -> AppResult<InventoryView> {
        let mut tx = self.store.begin().await?;
        let views = tx.list_inventory().await?;
        tx.commit().await?;

        views
            .into_iter()
            .find(|v| v.record.item_id == item_id)
            .ok_or_else(|| AppError::NotFound("Inventory record".to_string()))
    }

    /// Update reorder thresholds; stock and cost are left alone
    pub async fn set_limits(
        &self,
        item_id: i64,
        limits: StockLimitsInput,
    ) -> AppResult<InventoryRecord> {
        validate_stock_limits(limits.min_stock, limits.max_stock)
            .map_err(|e| AppError::validation("min_stock", e))?;

        let mut tx = self.store.begin().await?;
        let mut record = tx
            .get_inventory(item_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Inventory record".to_string()))?;

        record.min_stock = limits.min_stock;
        record.max_stock = limits.max_stock;
        tx.put_inventory(&record).await?;
        tx.commit().await?;

        Ok(record)
    }
}
