//! Item management service

use shared::{validate_amount, validate_item_code, validate_name, Item, ItemInput};

use crate::error::{AppError, AppResult};
use crate::store::{Store, StoreTx};

#[derive(Clone)]
pub struct ItemService<S> {
    store: S,
}

impl<S: Store> ItemService<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub async fn create(&self, input: ItemInput) -> AppResult<Item> {
        let input = normalize(input)?;

        let mut tx = self.store.begin().await?;
        let id = tx.insert_item(&input).await?;
        let item = tx
            .get_item(id)
            .await?
            .ok_or_else(|| AppError::Internal("Inserted item vanished".to_string()))?;
        tx.commit().await?;

        tracing::info!(item_id = id, name = %item.name, "Item created");
        Ok(item)
    }

    /// Active items by name
    pub async fn list(&self) -> AppResult<Vec<Item>> {
        let mut tx = self.store.begin().await?;
        let items = tx.list_items().await?;
        tx.commit().await?;
        Ok(items)
    }

    pub async fn get(&self, id: i64) -> AppResult<Item> {
        let mut tx = self.store.begin().await?;
        let item = tx.get_item(id).await?;
        tx.commit().await?;
        item.ok_or_else(|| AppError::NotFound("Item".to_string()))
    }

    pub async fn update(&self, id: i64, input: ItemInput) -> AppResult<Item> {
        let input = normalize(input)?;

        let mut tx = self.store.begin().await?;
        if !tx.update_item(id, &input).await? {
            return Err(AppError::NotFound("Item".to_string()));
        }
        let item = tx
            .get_item(id)
            .await?
            .ok_or_else(|| AppError::NotFound("Item".to_string()))?;
        tx.commit().await?;
        Ok(item)
    }

    /// Delete an item no sale or purchase references, with its inventory record
    pub async fn delete(&self, id: i64) -> AppResult<()> {
        let mut tx = self.store.begin().await?;
        if tx.get_item(id).await?.is_none() {
            return Err(AppError::NotFound("Item".to_string()));
        }

        let references = tx.count_item_references(id).await?;
        if references > 0 {
            return Err(AppError::Conflict {
                resource: "item".to_string(),
                message: format!("Item is referenced by {} sales or purchases", references),
            });
        }

        tx.delete_item(id).await?;
        tx.commit().await?;
        Ok(())
    }
}

fn normalize(mut input: ItemInput) -> AppResult<ItemInput> {
    input.name = input.name.trim().to_string();
    validate_name(&input.name).map_err(|e| AppError::validation("name", e))?;

    input.code = input
        .code
        .map(|c| c.trim().to_string())
        .filter(|c| !c.is_empty());
    if let Some(code) = &input.code {
        validate_item_code(code).map_err(|e| AppError::validation("code", e))?;
    }
    if let Some(price) = input.standard_price {
        validate_amount(price).map_err(|e| AppError::validation("standard_price", e))?;
    }
    Ok(input)
}
