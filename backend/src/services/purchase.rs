//! Purchase service
//!
//! Creating a purchase also blends it into the inventory ledger inside the
//! same transaction.

use chrono::{Local, NaiveDate};
use shared::{
    validate_amount, validate_quantity, NewPurchase, Purchase, PurchaseFilter, PurchaseInput,
};

use super::inventory::record_purchase;
use crate::error::{AppError, AppResult};
use crate::store::{Store, StoreTx};

#[derive(Clone)]
pub struct PurchaseService<S> {
    store: S,
    today: NaiveDate,
}

impl<S: Store> PurchaseService<S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            today: Local::now().date_naive(),
        }
    }

    /// Use a fixed date as "today" for the ledger's last purchase date
    pub fn with_today(mut self, today: NaiveDate) -> Self {
        self.today = today;
        self
    }

    pub async fn create(&self, input: PurchaseInput) -> AppResult<Purchase> {
        validate(&input)?;
        let purchase = NewPurchase::from(&input);

        let mut tx = self.store.begin().await?;
        ensure_refs(&mut tx, &purchase).await?;
        let id = tx.insert_purchase(&purchase).await?;
        record_purchase(
            &mut tx,
            purchase.item_id,
            purchase.figures.quantity,
            purchase.figures.unit_cost,
            self.today,
        )
        .await?;
        let created = tx
            .get_purchase(id)
            .await?
            .ok_or_else(|| AppError::Internal("Inserted purchase vanished".to_string()))?;
        tx.commit().await?;

        tracing::info!(
            purchase_id = id,
            item_id = created.item_id,
            total_amount = created.total_amount,
            "Purchase recorded"
        );
        Ok(created)
    }

    pub async fn list(&self, filter: PurchaseFilter) -> AppResult<Vec<Purchase>> {
        let mut tx = self.store.begin().await?;
        let purchases = tx.list_purchases(&filter).await?;
        tx.commit().await?;
        Ok(purchases)
    }

    pub async fn get(&self, id: i64) -> AppResult<Purchase> {
        let mut tx = self.store.begin().await?;
        let purchase = tx.get_purchase(id).await?;
        tx.commit().await?;
        purchase.ok_or_else(|| AppError::NotFound("Purchase".to_string()))
    }

    /// Replace a purchase, recomputing its derived amounts. The ledger is not
    /// re-blended.
    pub async fn update(&self, id: i64, input: PurchaseInput) -> AppResult<Purchase> {
        validate(&input)?;
        let purchase = NewPurchase::from(&input);

        let mut tx = self.store.begin().await?;
        ensure_refs(&mut tx, &purchase).await?;
        if !tx.update_purchase(id, &purchase).await? {
            return Err(AppError::NotFound("Purchase".to_string()));
        }
        let updated = tx
            .get_purchase(id)
            .await?
            .ok_or_else(|| AppError::NotFound("Purchase".to_string()))?;
        tx.commit().await?;
        Ok(updated)
    }

    pub async fn delete(&self, id: i64) -> AppResult<()> {
        let mut tx = self.store.begin().await?;
        if !tx.delete_purchase(id).await? {
            return Err(AppError::NotFound("Purchase".to_string()));
        }
        tx.commit().await?;
        Ok(())
    }
}

fn validate(input: &PurchaseInput) -> AppResult<()> {
    validate_quantity(input.quantity).map_err(|e| AppError::validation("quantity", e))?;
    validate_amount(input.unit_cost).map_err(|e| AppError::validation("unit_cost", e))?;
    if let Some(vat) = input.vat_amount {
        validate_amount(vat).map_err(|e| AppError::validation("vat_amount", e))?;
    }
    if let Some(price) = input.expected_sale_price {
        validate_amount(price).map_err(|e| AppError::validation("expected_sale_price", e))?;
    }
    Ok(())
}

async fn ensure_refs<T: StoreTx>(tx: &mut T, purchase: &NewPurchase) -> AppResult<()> {
    if tx.get_supplier(purchase.supplier_id).await?.is_none() {
        return Err(AppError::NotFound("Supplier".to_string()));
    }
    if tx.get_item(purchase.item_id).await?.is_none() {
        return Err(AppError::NotFound("Item".to_string()));
    }
    Ok(())
}
