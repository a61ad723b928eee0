//! Persistence interface
//!
//! Services and the importer only talk to a [`Store`]: every unit of work
//! opens a [`StoreTx`], issues its reads and writes through it, and commits
//! or rolls back. Two implementations exist: [`SqliteStore`] for the server
//! and CLI, and [`MemoryStore`], an in-memory fake with the same
//! transactional behaviour for tests.

use async_trait::async_trait;
use shared::{
    Customer, CustomerInput, InventoryRecord, InventoryView, Item, ItemInput, NewPurchase,
    NewSale, Purchase, PurchaseFilter, Sale, SaleFilter, Supplier, SupplierInput, Won,
};

use crate::error::AppResult;

pub mod memory;
pub mod sqlite;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

/// A transactional data store
#[async_trait]
pub trait Store: Send + Sync + 'static {
    type Tx: StoreTx;

    /// Open a transaction
    async fn begin(&self) -> AppResult<Self::Tx>;
}

/// Reads and writes inside one open transaction.
///
/// Uniqueness violations are reported as `AppError::DuplicateEntry` carrying
/// the offending column name (`"name"`, `"code"`). Dropping a transaction
/// without committing rolls it back.
#[async_trait]
pub trait StoreTx: Send {
    // Customers
    async fn insert_customer(&mut self, input: &CustomerInput) -> AppResult<i64>;
    async fn update_customer(&mut self, id: i64, input: &CustomerInput) -> AppResult<bool>;
    async fn get_customer(&mut self, id: i64) -> AppResult<Option<Customer>>;
    async fn find_customer_by_name(&mut self, name: &str) -> AppResult<Option<Customer>>;
    async fn list_customers(&mut self) -> AppResult<Vec<Customer>>;
    async fn delete_customer(&mut self, id: i64) -> AppResult<bool>;
    async fn count_customer_sales(&mut self, customer_id: i64) -> AppResult<i64>;

    // Suppliers
    async fn insert_supplier(&mut self, input: &SupplierInput) -> AppResult<i64>;
    async fn update_supplier(&mut self, id: i64, input: &SupplierInput) -> AppResult<bool>;
    async fn get_supplier(&mut self, id: i64) -> AppResult<Option<Supplier>>;
    async fn find_supplier_by_name(&mut self, name: &str) -> AppResult<Option<Supplier>>;
    /// Active suppliers only
    async fn list_suppliers(&mut self) -> AppResult<Vec<Supplier>>;
    async fn deactivate_supplier(&mut self, id: i64) -> AppResult<bool>;

    // Items
    async fn insert_item(&mut self, input: &ItemInput) -> AppResult<i64>;
    async fn update_item(&mut self, id: i64, input: &ItemInput) -> AppResult<bool>;
    async fn get_item(&mut self, id: i64) -> AppResult<Option<Item>>;
    async fn find_item_by_name(&mut self, name: &str) -> AppResult<Option<Item>>;
    /// Active items only
    async fn list_items(&mut self) -> AppResult<Vec<Item>>;
    async fn delete_item(&mut self, id: i64) -> AppResult<bool>;
    /// Sales plus purchases referencing the item
    async fn count_item_references(&mut self, item_id: i64) -> AppResult<i64>;

    // Sales
    async fn insert_sale(&mut self, sale: &NewSale) -> AppResult<i64>;
    async fn update_sale(&mut self, id: i64, sale: &NewSale) -> AppResult<bool>;
    async fn get_sale(&mut self, id: i64) -> AppResult<Option<Sale>>;
    /// Newest first (sale date, then insertion order)
    async fn list_sales(&mut self, filter: &SaleFilter) -> AppResult<Vec<Sale>>;
    async fn delete_sale(&mut self, id: i64) -> AppResult<bool>;

    // Purchases
    async fn insert_purchase(&mut self, purchase: &NewPurchase) -> AppResult<i64>;
    async fn update_purchase(&mut self, id: i64, purchase: &NewPurchase) -> AppResult<bool>;
    async fn get_purchase(&mut self, id: i64) -> AppResult<Option<Purchase>>;
    /// Newest first (purchase date, then insertion order)
    async fn list_purchases(&mut self, filter: &PurchaseFilter) -> AppResult<Vec<Purchase>>;
    async fn delete_purchase(&mut self, id: i64) -> AppResult<bool>;
    /// Unit cost of the item's most recent received purchase
    async fn latest_received_unit_cost(&mut self, item_id: i64) -> AppResult<Option<Won>>;

    // Inventory
    async fn get_inventory(&mut self, item_id: i64) -> AppResult<Option<InventoryRecord>>;
    /// Insert or replace the record for `record.item_id`
    async fn put_inventory(&mut self, record: &InventoryRecord) -> AppResult<()>;
    /// Records of active items, lowest stock first
    async fn list_inventory(&mut self) -> AppResult<Vec<InventoryView>>;

    /// Delete all sales, purchases, inventory and master data
    async fn clear_all(&mut self) -> AppResult<()>;

    /// Mark a point inside the transaction that later writes can be undone to
    async fn savepoint(&mut self) -> AppResult<()>;
    /// Keep the writes made since the latest savepoint
    async fn release_savepoint(&mut self) -> AppResult<()>;
    /// Undo the writes made since the latest savepoint and drop it
    async fn rollback_to_savepoint(&mut self) -> AppResult<()>;

    async fn commit(self) -> AppResult<()>;
    async fn rollback(self) -> AppResult<()>;
}
