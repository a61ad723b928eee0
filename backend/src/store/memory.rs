//! In-memory store
//!
//! A transaction takes the store lock for its whole lifetime and works on a
//! copy of the tables; commit writes the copy back, anything else discards
//! it. Savepoints are snapshots of that copy. Commit and inventory-write
//! failures can be injected to exercise rollback paths.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use shared::{
    Customer, CustomerInput, InventoryRecord, InventoryView, Item, ItemInput, NewPurchase,
    NewSale, Purchase, PurchaseFilter, PurchaseStatus, Sale, SaleFilter, Supplier,
    SupplierInput, Won,
};
use tokio::sync::{Mutex, OwnedMutexGuard};

use super::{Store, StoreTx};
use crate::error::{AppError, AppResult};

#[derive(Debug, Clone)]
struct StoredSale {
    sale: NewSale,
    created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
struct StoredPurchase {
    purchase: NewPurchase,
    created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default)]
struct LastIds {
    customer: i64,
    supplier: i64,
    item: i64,
    sale: i64,
    purchase: i64,
}

#[derive(Debug, Clone, Default)]
struct Tables {
    customers: BTreeMap<i64, Customer>,
    suppliers: BTreeMap<i64, Supplier>,
    items: BTreeMap<i64, Item>,
    sales: BTreeMap<i64, StoredSale>,
    purchases: BTreeMap<i64, StoredPurchase>,
    inventory: BTreeMap<i64, InventoryRecord>,
    last_ids: LastIds,
}

/// Store that keeps everything in process memory
#[derive(Clone, Default)]
pub struct MemoryStore {
    tables: Arc<Mutex<Tables>>,
    commits: Arc<AtomicUsize>,
    fail_commit_at: Arc<AtomicUsize>,
    fail_inventory_writes: Arc<AtomicBool>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the `n`-th commit from now fail (1 = the next one)
    pub fn fail_commit_at(&self, n: usize) {
        let done = self.commits.load(Ordering::SeqCst);
        self.fail_commit_at.store(done + n, Ordering::SeqCst);
    }

    /// Make every inventory write fail until switched off
    pub fn fail_inventory_writes(&self, fail: bool) {
        self.fail_inventory_writes.store(fail, Ordering::SeqCst);
    }

    /// Number of committed or attempted commits so far
    pub fn commit_count(&self) -> usize {
        self.commits.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Store for MemoryStore {
    type Tx = MemoryTx;

    async fn begin(&self) -> AppResult<MemoryTx> {
        let guard = self.tables.clone().lock_owned().await;
        let working = guard.clone();
        Ok(MemoryTx {
            guard,
            working,
            savepoints: Vec::new(),
            commits: self.commits.clone(),
            fail_commit_at: self.fail_commit_at.clone(),
            fail_inventory_writes: self.fail_inventory_writes.clone(),
        })
    }
}

/// Transaction over a [`MemoryStore`]
pub struct MemoryTx {
    guard: OwnedMutexGuard<Tables>,
    working: Tables,
    savepoints: Vec<Tables>,
    commits: Arc<AtomicUsize>,
    fail_commit_at: Arc<AtomicUsize>,
    fail_inventory_writes: Arc<AtomicBool>,
}

fn missing_reference() -> AppError {
    AppError::validation("foreign_key", "Referenced record does not exist")
}

impl MemoryTx {
    fn customer_name_taken(&self, name: &str, except: Option<i64>) -> bool {
        self.working
            .customers
            .values()
            .any(|c| c.name == name && Some(c.id) != except)
    }

    fn supplier_name_taken(&self, name: &str, except: Option<i64>) -> bool {
        self.working
            .suppliers
            .values()
            .any(|s| s.name == name && Some(s.id) != except)
    }

    fn check_item_unique(&self, input: &ItemInput, except: Option<i64>) -> AppResult<()> {
        for item in self.working.items.values() {
            if Some(item.id) == except {
                continue;
            }
            if item.name == input.name {
                return Err(AppError::DuplicateEntry("name".to_string()));
            }
            if input.code.is_some() && item.code == input.code {
                return Err(AppError::DuplicateEntry("code".to_string()));
            }
        }
        Ok(())
    }

    fn check_sale_refs(&self, sale: &NewSale) -> AppResult<()> {
        if !self.working.customers.contains_key(&sale.customer_id)
            || !self.working.items.contains_key(&sale.item_id)
        {
            return Err(missing_reference());
        }
        if sale.figures.quantity <= 0 {
            return Err(AppError::validation("check", "quantity must be positive"));
        }
        Ok(())
    }

    fn check_purchase_refs(&self, purchase: &NewPurchase) -> AppResult<()> {
        if !self.working.suppliers.contains_key(&purchase.supplier_id)
            || !self.working.items.contains_key(&purchase.item_id)
        {
            return Err(missing_reference());
        }
        if purchase.figures.quantity <= 0 {
            return Err(AppError::validation("check", "quantity must be positive"));
        }
        Ok(())
    }

    fn sale_view(&self, id: i64, stored: &StoredSale) -> Option<Sale> {
        let customer = self.working.customers.get(&stored.sale.customer_id)?;
        let item = self.working.items.get(&stored.sale.item_id)?;
        let sale = &stored.sale;
        let f = &sale.figures;
        Some(Sale {
            id,
            customer_id: sale.customer_id,
            customer_name: customer.name.clone(),
            item_id: sale.item_id,
            item_name: item.name.clone(),
            item_code: item.code.clone(),
            sale_date: sale.sale_date,
            quantity: f.quantity,
            unit_price: f.unit_price,
            supply_price: f.supply_price,
            vat_amount: f.vat_amount,
            total_amount: f.total_amount,
            purchase_price: f.purchase_price,
            profit_amount: f.profit_amount,
            margin_rate: f.margin_rate,
            invoice_number: sale.invoice_number.clone(),
            notes: sale.notes.clone(),
            created_at: stored.created_at,
        })
    }

    fn purchase_view(&self, id: i64, stored: &StoredPurchase) -> Option<Purchase> {
        let supplier = self.working.suppliers.get(&stored.purchase.supplier_id)?;
        let item = self.working.items.get(&stored.purchase.item_id)?;
        let purchase = &stored.purchase;
        let f = &purchase.figures;
        Some(Purchase {
            id,
            supplier_id: purchase.supplier_id,
            supplier_name: supplier.name.clone(),
            item_id: purchase.item_id,
            item_name: item.name.clone(),
            item_code: item.code.clone(),
            purchase_date: purchase.purchase_date,
            quantity: f.quantity,
            unit_cost: f.unit_cost,
            supply_amount: f.supply_amount,
            vat_amount: f.vat_amount,
            total_amount: f.total_amount,
            expected_sale_price: f.expected_sale_price,
            expected_margin: f.expected_margin,
            invoice_number: purchase.invoice_number.clone(),
            status: purchase.status,
            notes: purchase.notes.clone(),
            created_at: stored.created_at,
        })
    }
}

#[async_trait]
impl StoreTx for MemoryTx {
    async fn insert_customer(&mut self, input: &CustomerInput) -> AppResult<i64> {
        if self.customer_name_taken(&input.name, None) {
            return Err(AppError::DuplicateEntry("name".to_string()));
        }
        self.working.last_ids.customer += 1;
        let id = self.working.last_ids.customer;
        self.working.customers.insert(
            id,
            Customer {
                id,
                name: input.name.clone(),
                business_number: input.business_number.clone(),
                contact_person: input.contact_person.clone(),
                phone: input.phone.clone(),
                email: input.email.clone(),
                address: input.address.clone(),
                is_active: true,
                created_at: Utc::now(),
            },
        );
        Ok(id)
    }

    async fn update_customer(&mut self, id: i64, input: &CustomerInput) -> AppResult<bool> {
        if !self.working.customers.contains_key(&id) {
            return Ok(false);
        }
        if self.customer_name_taken(&input.name, Some(id)) {
            return Err(AppError::DuplicateEntry("name".to_string()));
        }
        if let Some(customer) = self.working.customers.get_mut(&id) {
            customer.name = input.name.clone();
            customer.business_number = input.business_number.clone();
            customer.contact_person = input.contact_person.clone();
            customer.phone = input.phone.clone();
            customer.email = input.email.clone();
            customer.address = input.address.clone();
        }
        Ok(true)
    }

    async fn get_customer(&mut self, id: i64) -> AppResult<Option<Customer>> {
        Ok(self.working.customers.get(&id).cloned())
    }

    async fn find_customer_by_name(&mut self, name: &str) -> AppResult<Option<Customer>> {
        Ok(self
            .working
            .customers
            .values()
            .find(|c| c.name == name)
            .cloned())
    }

    async fn list_customers(&mut self) -> AppResult<Vec<Customer>> {
        let mut customers: Vec<Customer> = self.working.customers.values().cloned().collect();
        customers.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(customers)
    }

    async fn delete_customer(&mut self, id: i64) -> AppResult<bool> {
        if self.working.sales.values().any(|s| s.sale.customer_id == id) {
            return Err(missing_reference());
        }
        Ok(self.working.customers.remove(&id).is_some())
    }

    async fn count_customer_sales(&mut self, customer_id: i64) -> AppResult<i64> {
        Ok(self
            .working
            .sales
            .values()
            .filter(|s| s.sale.customer_id == customer_id)
            .count() as i64)
    }

    async fn insert_supplier(&mut self, input: &SupplierInput) -> AppResult<i64> {
        if self.supplier_name_taken(&input.name, None) {
            return Err(AppError::DuplicateEntry("name".to_string()));
        }
        self.working.last_ids.supplier += 1;
        let id = self.working.last_ids.supplier;
        self.working.suppliers.insert(
            id,
            Supplier {
                id,
                name: input.name.clone(),
                business_number: input.business_number.clone(),
                contact_person: input.contact_person.clone(),
                phone: input.phone.clone(),
                email: input.email.clone(),
                address: input.address.clone(),
                payment_terms: input.payment_terms.clone(),
                notes: input.notes.clone(),
                is_active: true,
                created_at: Utc::now(),
            },
        );
        Ok(id)
    }

    async fn update_supplier(&mut self, id: i64, input: &SupplierInput) -> AppResult<bool> {
        if !self.working.suppliers.contains_key(&id) {
            return Ok(false);
        }
        if self.supplier_name_taken(&input.name, Some(id)) {
            return Err(AppError::DuplicateEntry("name".to_string()));
        }
        if let Some(supplier) = self.working.suppliers.get_mut(&id) {
            supplier.name = input.name.clone();
            supplier.business_number = input.business_number.clone();
            supplier.contact_person = input.contact_person.clone();
            supplier.phone = input.phone.clone();
            supplier.email = input.email.clone();
            supplier.address = input.address.clone();
            supplier.payment_terms = input.payment_terms.clone();
            supplier.notes = input.notes.clone();
        }
        Ok(true)
    }

    async fn get_supplier(&mut self, id: i64) -> AppResult<Option<Supplier>> {
        Ok(self.working.suppliers.get(&id).cloned())
    }

    async fn find_supplier_by_name(&mut self, name: &str) -> AppResult<Option<Supplier>> {
        Ok(self
            .working
            .suppliers
            .values()
            .find(|s| s.name == name)
            .cloned())
    }

    async fn list_suppliers(&mut self) -> AppResult<Vec<Supplier>> {
        let mut suppliers: Vec<Supplier> = self
            .working
            .suppliers
            .values()
            .filter(|s| s.is_active)
            .cloned()
            .collect();
        suppliers.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(suppliers)
    }

    async fn deactivate_supplier(&mut self, id: i64) -> AppResult<bool> {
        match self.working.suppliers.get_mut(&id) {
            Some(supplier) => {
                supplier.is_active = false;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn insert_item(&mut self, input: &ItemInput) -> AppResult<i64> {
        self.check_item_unique(input, None)?;
        self.working.last_ids.item += 1;
        let id = self.working.last_ids.item;
        self.working.items.insert(
            id,
            Item {
                id,
                code: input.code.clone(),
                name: input.name.clone(),
                category: input.category_or_default().to_string(),
                unit: input.unit_or_default().to_string(),
                standard_price: input.standard_price.unwrap_or(0),
                description: input.description.clone(),
                is_active: true,
                created_at: Utc::now(),
            },
        );
        Ok(id)
    }

    async fn update_item(&mut self, id: i64, input: &ItemInput) -> AppResult<bool> {
        if !self.working.items.contains_key(&id) {
            return Ok(false);
        }
        self.check_item_unique(input, Some(id))?;
        if let Some(item) = self.working.items.get_mut(&id) {
            item.code = input.code.clone();
            item.name = input.name.clone();
            item.category = input.category_or_default().to_string();
            item.unit = input.unit_or_default().to_string();
            item.standard_price = input.standard_price.unwrap_or(0);
            item.description = input.description.clone();
        }
        Ok(true)
    }

    async fn get_item(&mut self, id: i64) -> AppResult<Option<Item>> {
        Ok(self.working.items.get(&id).cloned())
    }

    async fn find_item_by_name(&mut self, name: &str) -> AppResult<Option<Item>> {
        Ok(self.working.items.values().find(|i| i.name == name).cloned())
    }

    async fn list_items(&mut self) -> AppResult<Vec<Item>> {
        let mut items: Vec<Item> = self
            .working
            .items
            .values()
            .filter(|i| i.is_active)
            .cloned()
            .collect();
        items.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(items)
    }

    async fn delete_item(&mut self, id: i64) -> AppResult<bool> {
        if self.count_item_references(id).await? > 0 {
            return Err(missing_reference());
        }
        self.working.inventory.remove(&id);
        Ok(self.working.items.remove(&id).is_some())
    }

    async fn count_item_references(&mut self, item_id: i64) -> AppResult<i64> {
        let sales = self
            .working
            .sales
            .values()
            .filter(|s| s.sale.item_id == item_id)
            .count();
        let purchases = self
            .working
            .purchases
            .values()
            .filter(|p| p.purchase.item_id == item_id)
            .count();
        Ok((sales + purchases) as i64)
    }

    async fn insert_sale(&mut self, sale: &NewSale) -> AppResult<i64> {
        self.check_sale_refs(sale)?;
        self.working.last_ids.sale += 1;
        let id = self.working.last_ids.sale;
        self.working.sales.insert(
            id,
            StoredSale {
                sale: sale.clone(),
                created_at: Utc::now(),
            },
        );
        Ok(id)
    }

    async fn update_sale(&mut self, id: i64, sale: &NewSale) -> AppResult<bool> {
        self.check_sale_refs(sale)?;
        match self.working.sales.get_mut(&id) {
            Some(stored) => {
                stored.sale = sale.clone();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn get_sale(&mut self, id: i64) -> AppResult<Option<Sale>> {
        Ok(self
            .working
            .sales
            .get(&id)
            .and_then(|stored| self.sale_view(id, stored)))
    }

    async fn list_sales(&mut self, filter: &SaleFilter) -> AppResult<Vec<Sale>> {
        let mut sales: Vec<Sale> = self
            .working
            .sales
            .iter()
            .filter_map(|(id, stored)| self.sale_view(*id, stored))
            .filter(|sale| filter.matches(sale))
            .collect();
        sales.sort_by(|a, b| b.sale_date.cmp(&a.sale_date).then(b.id.cmp(&a.id)));
        Ok(sales
            .into_iter()
            .skip(filter.offset as usize)
            .take(filter.limit as usize)
            .collect())
    }

    async fn delete_sale(&mut self, id: i64) -> AppResult<bool> {
        Ok(self.working.sales.remove(&id).is_some())
    }

    async fn insert_purchase(&mut self, purchase: &NewPurchase) -> AppResult<i64> {
        self.check_purchase_refs(purchase)?;
        self.working.last_ids.purchase += 1;
        let id = self.working.last_ids.purchase;
        self.working.purchases.insert(
            id,
            StoredPurchase {
                purchase: purchase.clone(),
                created_at: Utc::now(),
            },
        );
        Ok(id)
    }

    async fn update_purchase(&mut self, id: i64, purchase: &NewPurchase) -> AppResult<bool> {
        self.check_purchase_refs(purchase)?;
        match self.working.purchases.get_mut(&id) {
            Some(stored) => {
                stored.purchase = purchase.clone();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn get_purchase(&mut self, id: i64) -> AppResult<Option<Purchase>> {
        Ok(self
            .working
            .purchases
            .get(&id)
            .and_then(|stored| self.purchase_view(id, stored)))
    }

    async fn list_purchases(&mut self, filter: &PurchaseFilter) -> AppResult<Vec<Purchase>> {
        let mut purchases: Vec<Purchase> = self
            .working
            .purchases
            .iter()
            .filter_map(|(id, stored)| self.purchase_view(*id, stored))
            .filter(|purchase| filter.matches(purchase))
            .collect();
        purchases.sort_by(|a, b| {
            b.purchase_date
                .cmp(&a.purchase_date)
                .then(b.id.cmp(&a.id))
        });
        Ok(purchases
            .into_iter()
            .skip(filter.offset as usize)
            .take(filter.limit as usize)
            .collect())
    }

    async fn delete_purchase(&mut self, id: i64) -> AppResult<bool> {
        Ok(self.working.purchases.remove(&id).is_some())
    }

    async fn latest_received_unit_cost(&mut self, item_id: i64) -> AppResult<Option<Won>> {
        Ok(self
            .working
            .purchases
            .iter()
            .filter(|(_, p)| {
                p.purchase.item_id == item_id && p.purchase.status == PurchaseStatus::Received
            })
            .max_by(|(a_id, a), (b_id, b)| {
                a.purchase
                    .purchase_date
                    .cmp(&b.purchase.purchase_date)
                    .then(a_id.cmp(b_id))
            })
            .map(|(_, p)| p.purchase.figures.unit_cost))
    }

    async fn get_inventory(&mut self, item_id: i64) -> AppResult<Option<InventoryRecord>> {
        Ok(self.working.inventory.get(&item_id).cloned())
    }

    async fn put_inventory(&mut self, record: &InventoryRecord) -> AppResult<()> {
        if self.fail_inventory_writes.load(Ordering::SeqCst) {
            return Err(AppError::Internal("injected inventory write failure".to_string()));
        }
        if !self.working.items.contains_key(&record.item_id) {
            return Err(missing_reference());
        }
        self.working.inventory.insert(record.item_id, record.clone());
        Ok(())
    }

    async fn list_inventory(&mut self) -> AppResult<Vec<InventoryView>> {
        let mut views: Vec<InventoryView> = self
            .working
            .inventory
            .values()
            .filter_map(|record| {
                let item = self.working.items.get(&record.item_id)?;
                if !item.is_active {
                    return None;
                }
                Some(InventoryView {
                    stock_status: record.status(),
                    record: record.clone(),
                    item_name: item.name.clone(),
                    item_code: item.code.clone(),
                    item_category: item.category.clone(),
                    standard_price: item.standard_price,
                })
            })
            .collect();
        views.sort_by(|a, b| {
            a.record
                .current_stock
                .cmp(&b.record.current_stock)
                .then_with(|| a.item_name.cmp(&b.item_name))
        });
        Ok(views)
    }

    async fn clear_all(&mut self) -> AppResult<()> {
        let last_ids = self.working.last_ids.clone();
        self.working = Tables {
            last_ids,
            ..Tables::default()
        };
        Ok(())
    }

    async fn savepoint(&mut self) -> AppResult<()> {
        self.savepoints.push(self.working.clone());
        Ok(())
    }

    async fn release_savepoint(&mut self) -> AppResult<()> {
        self.savepoints
            .pop()
            .map(|_| ())
            .ok_or_else(|| AppError::Transaction("no savepoint to release".to_string()))
    }

    async fn rollback_to_savepoint(&mut self) -> AppResult<()> {
        let snapshot = self
            .savepoints
            .pop()
            .ok_or_else(|| AppError::Transaction("no savepoint to roll back to".to_string()))?;
        self.working = snapshot;
        Ok(())
    }

    async fn commit(self) -> AppResult<()> {
        let MemoryTx {
            mut guard,
            working,
            commits,
            fail_commit_at,
            ..
        } = self;

        let attempt = commits.fetch_add(1, Ordering::SeqCst) + 1;
        if fail_commit_at.load(Ordering::SeqCst) == attempt {
            return Err(AppError::Transaction(format!(
                "injected failure on commit #{}",
                attempt
            )));
        }
        *guard = working;
        Ok(())
    }

    async fn rollback(self) -> AppResult<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_uncommitted_changes_are_discarded() {
        let store = MemoryStore::new();

        let mut tx = store.begin().await.unwrap();
        tx.insert_customer(&CustomerInput::named("대한전자")).await.unwrap();
        drop(tx);

        let mut tx = store.begin().await.unwrap();
        assert!(tx.list_customers().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_injected_commit_failure_rolls_back() {
        let store = MemoryStore::new();
        store.fail_commit_at(1);

        let mut tx = store.begin().await.unwrap();
        tx.insert_supplier(&SupplierInput::named("삼성부품")).await.unwrap();
        assert!(matches!(tx.commit().await, Err(AppError::Transaction(_))));

        let mut tx = store.begin().await.unwrap();
        assert!(tx.find_supplier_by_name("삼성부품").await.unwrap().is_none());
        tx.insert_supplier(&SupplierInput::named("삼성부품")).await.unwrap();
        tx.commit().await.unwrap();
        assert_eq!(store.commit_count(), 2);
    }

    #[tokio::test]
    async fn test_duplicate_item_code_reports_column() {
        let store = MemoryStore::new();
        let mut tx = store.begin().await.unwrap();

        let mut first = ItemInput::named("저항 10K");
        first.code = Some("ITEM-001".to_string());
        tx.insert_item(&first).await.unwrap();

        let mut second = ItemInput::named("콘덴서");
        second.code = Some("ITEM-001".to_string());
        match tx.insert_item(&second).await {
            Err(AppError::DuplicateEntry(field)) => assert_eq!(field, "code"),
            other => panic!("expected duplicate code, got {:?}", other),
        }
    }
}
