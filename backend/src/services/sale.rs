//! Sales service

use shared::{validate_amount, validate_quantity, NewSale, Sale, SaleFilter, SaleInput, Won};

use crate::error::{AppError, AppResult};
use crate::store::{Store, StoreTx};

#[derive(Clone)]
pub struct SaleService<S> {
    store: S,
}

impl<S: Store> SaleService<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Record a sale. Without an explicit purchase price the cost basis is
    /// the item's latest received purchase cost.
    pub async fn create(&self, input: SaleInput) -> AppResult<Sale> {
        validate(&input)?;

        let mut tx = self.store.begin().await?;
        let sale = prepare(&mut tx, &input).await?;
        let id = tx.insert_sale(&sale).await?;
        let created = tx
            .get_sale(id)
            .await?
            .ok_or_else(|| AppError::Internal("Inserted sale vanished".to_string()))?;
        tx.commit().await?;

        tracing::info!(
            sale_id = id,
            total_amount = created.total_amount,
            profit_amount = created.profit_amount,
            "Sale recorded"
        );
        Ok(created)
    }

    pub async fn list(&self, filter: SaleFilter) -> AppResult<Vec<Sale>> {
        let mut tx = self.store.begin().await?;
        let sales = tx.list_sales(&filter).await?;
        tx.commit().await?;
        Ok(sales)
    }

    pub async fn get(&self, id: i64) -> AppResult<Sale> {
        let mut tx = self.store.begin().await?;
        let sale = tx.get_sale(id).await?;
        tx.commit().await?;
        sale.ok_or_else(|| AppError::NotFound("Sale".to_string()))
    }

    /// Replace a sale, recomputing supply, total, profit and margin
    pub async fn update(&self, id: i64, input: SaleInput) -> AppResult<Sale> {
        validate(&input)?;

        let mut tx = self.store.begin().await?;
        let sale = prepare(&mut tx, &input).await?;
        if !tx.update_sale(id, &sale).await? {
            return Err(AppError::NotFound("Sale".to_string()));
        }
        let updated = tx
            .get_sale(id)
            .await?
            .ok_or_else(|| AppError::NotFound("Sale".to_string()))?;
        tx.commit().await?;
        Ok(updated)
    }

    pub async fn delete(&self, id: i64) -> AppResult<()> {
        let mut tx = self.store.begin().await?;
        if !tx.delete_sale(id).await? {
            return Err(AppError::NotFound("Sale".to_string()));
        }
        tx.commit().await?;
        Ok(())
    }
}

fn validate(input: &SaleInput) -> AppResult<()> {
    validate_quantity(input.quantity).map_err(|e| AppError::validation("quantity", e))?;
    validate_amount(input.unit_price).map_err(|e| AppError::validation("unit_price", e))?;
    if let Some(vat) = input.vat_amount {
        validate_amount(vat).map_err(|e| AppError::validation("vat_amount", e))?;
    }
    if let Some(price) = input.purchase_price {
        validate_amount(price).map_err(|e| AppError::validation("purchase_price", e))?;
    }
    Ok(())
}

/// Check references and derive every amount of the sale
async fn prepare<T: StoreTx>(tx: &mut T, input: &SaleInput) -> AppResult<NewSale> {
    if tx.get_customer(input.customer_id).await?.is_none() {
        return Err(AppError::NotFound("Customer".to_string()));
    }
    if tx.get_item(input.item_id).await?.is_none() {
        return Err(AppError::NotFound("Item".to_string()));
    }

    let cost_basis = cost_basis(tx, input.item_id, input.purchase_price).await?;
    Ok(NewSale::from_input(input, cost_basis))
}

/// Explicit purchase price, else the latest received purchase cost, else 0
pub async fn cost_basis<T: StoreTx>(
    tx: &mut T,
    item_id: i64,
    purchase_price: Option<Won>,
) -> AppResult<Won> {
    match purchase_price {
        Some(price) if price != 0 => Ok(price),
        _ => Ok(tx.latest_received_unit_cost(item_id).await?.unwrap_or(0)),
    }
}
