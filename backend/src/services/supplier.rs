//! Supplier management service

use shared::{
    validate_business_number, validate_email, validate_korean_phone, validate_name, Supplier,
    SupplierInput, DEFAULT_PAYMENT_TERMS,
};

use crate::error::{AppError, AppResult};
use crate::store::{Store, StoreTx};

/// Supplier service; deletion only deactivates
#[derive(Clone)]
pub struct SupplierService<S> {
    store: S,
}

impl<S: Store> SupplierService<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub async fn create(&self, input: SupplierInput) -> AppResult<Supplier> {
        let input = normalize(input)?;

        let mut tx = self.store.begin().await?;
        let id = tx.insert_supplier(&input).await?;
        let supplier = tx
            .get_supplier(id)
            .await?
            .ok_or_else(|| AppError::Internal("Inserted supplier vanished".to_string()))?;
        tx.commit().await?;

        tracing::info!(supplier_id = id, name = %supplier.name, "Supplier created");
        Ok(supplier)
    }

    /// Active suppliers by name
    pub async fn list(&self) -> AppResult<Vec<Supplier>> {
        let mut tx = self.store.begin().await?;
        let suppliers = tx.list_suppliers().await?;
        tx.commit().await?;
        Ok(suppliers)
    }

    pub async fn get(&self, id: i64) -> AppResult<Supplier> {
        let mut tx = self.store.begin().await?;
        let supplier = tx.get_supplier(id).await?;
        tx.commit().await?;
        supplier.ok_or_else(|| AppError::NotFound("Supplier".to_string()))
    }

    pub async fn update(&self, id: i64, input: SupplierInput) -> AppResult<Supplier> {
        let input = normalize(input)?;

        let mut tx = self.store.begin().await?;
        if !tx.update_supplier(id, &input).await? {
            return Err(AppError::NotFound("Supplier".to_string()));
        }
        let supplier = tx
            .get_supplier(id)
            .await?
            .ok_or_else(|| AppError::NotFound("Supplier".to_string()))?;
        tx.commit().await?;
        Ok(supplier)
    }

    /// Soft delete: the supplier stays referenced by its purchases
    pub async fn delete(&self, id: i64) -> AppResult<()> {
        let mut tx = self.store.begin().await?;
        if !tx.deactivate_supplier(id).await? {
            return Err(AppError::NotFound("Supplier".to_string()));
        }
        tx.commit().await?;

        tracing::info!(supplier_id = id, "Supplier deactivated");
        Ok(())
    }
}

fn normalize(mut input: SupplierInput) -> AppResult<SupplierInput> {
    input.name = input.name.trim().to_string();
    validate_name(&input.name).map_err(|e| AppError::validation("name", e))?;

    if let Some(email) = input.email.as_deref().filter(|e| !e.is_empty()) {
        validate_email(email).map_err(|e| AppError::validation("email", e))?;
    }
    if let Some(number) = input.business_number.as_deref().filter(|n| !n.is_empty()) {
        validate_business_number(number)
            .map_err(|e| AppError::validation("business_number", e))?;
    }
    if let Some(phone) = input.phone.as_deref().filter(|p| !p.is_empty()) {
        validate_korean_phone(phone).map_err(|e| AppError::validation("phone", e))?;
    }
    if input.payment_terms.as_deref().map_or(true, str::is_empty) {
        input.payment_terms = Some(DEFAULT_PAYMENT_TERMS.to_string());
    }
    Ok(input)
}
