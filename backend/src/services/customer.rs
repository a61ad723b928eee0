//! Customer management service

use shared::{
    validate_business_number, validate_email, validate_korean_phone, validate_name, Customer,
    CustomerInput,
};

use crate::error::{AppError, AppResult};
use crate::store::{Store, StoreTx};

/// Customer service for CRUD over customers
#[derive(Clone)]
pub struct CustomerService<S> {
    store: S,
}

impl<S: Store> CustomerService<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Create a customer
    pub async fn create(&self, input: CustomerInput) -> AppResult<Customer> {
        let input = normalize(input)?;

        let mut tx = self.store.begin().await?;
        let id = tx.insert_customer(&input).await?;
        let customer = tx
            .get_customer(id)
            .await?
            .ok_or_else(|| AppError::Internal("Inserted customer vanished".to_string()))?;
        tx.commit().await?;

        tracing::info!(customer_id = id, name = %customer.name, "Customer created");
        Ok(customer)
    }

    /// List all customers by name
    pub async fn list(&self) -> AppResult<Vec<Customer>> {
        let mut tx = self.store.begin().await?;
        let customers = tx.list_customers().await?;
        tx.commit().await?;
        Ok(customers)
    }

    /// Get a customer by ID
    pub async fn get(&self, id: i64) -> AppResult<Customer> {
        let mut tx = self.store.begin().await?;
        let customer = tx.get_customer(id).await?;
        tx.commit().await?;
        customer.ok_or_else(|| AppError::NotFound("Customer".to_string()))
    }

    /// Replace a customer's fields
    pub async fn update(&self, id: i64, input: CustomerInput) -> AppResult<Customer> {
        let input = normalize(input)?;

        let mut tx = self.store.begin().await?;
        if !tx.update_customer(id, &input).await? {
            return Err(AppError::NotFound("Customer".to_string()));
        }
        let customer = tx
            .get_customer(id)
            .await?
            .ok_or_else(|| AppError::NotFound("Customer".to_string()))?;
        tx.commit().await?;
        Ok(customer)
    }

    /// Delete a customer that no sale references
    pub async fn delete(&self, id: i64) -> AppResult<()> {
        let mut tx = self.store.begin().await?;
        if tx.get_customer(id).await?.is_none() {
            return Err(AppError::NotFound("Customer".to_string()));
        }

        let sales = tx.count_customer_sales(id).await?;
        if sales > 0 {
            return Err(AppError::Conflict {
                resource: "customer".to_string(),
                message: format!("Customer is referenced by {} sales", sales),
            });
        }

        tx.delete_customer(id).await?;
        tx.commit().await?;
        Ok(())
    }
}

fn normalize(mut input: CustomerInput) -> AppResult<CustomerInput> {
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
    Ok(input)
}
