//! SQLite implementation of the persistence interface

use std::{str::FromStr, sync::Arc, time::Duration};

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::Decimal;
use shared::{
    round_rate, Customer, CustomerInput, InventoryRecord, InventoryView, Item, ItemInput,
    NewPurchase, NewSale, Purchase, PurchaseFigures, PurchaseFilter, SaleFigures, Sale,
    SaleFilter, Supplier, SupplierInput, Won,
};
use sqlx::sqlite::{SqliteArguments, SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use sqlx::{FromRow, QueryBuilder, Sqlite, Transaction};
use tokio::sync::{Mutex, OwnedMutexGuard};

use super::{Store, StoreTx};
use crate::config::DatabaseConfig;
use crate::error::{AppError, AppResult};

/// Store backed by a SQLite connection pool.
///
/// SQLite allows one writer at a time and a deferred transaction that reads
/// before it writes fails with `SQLITE_BUSY` when another writer got there
/// first. Units of work are therefore serialized through `unit_lock`, so a
/// transaction never has to upgrade its lock against a sibling.
#[derive(Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
    unit_lock: Arc<Mutex<()>>,
}

impl SqliteStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self {
            pool,
            unit_lock: Arc::new(Mutex::new(())),
        }
    }

    /// Connect using the database section of the configuration
    pub async fn connect(config: &DatabaseConfig) -> AppResult<Self> {
        let options = SqliteConnectOptions::from_str(&config.url)
            .map_err(|e| AppError::Configuration(format!("database.url: {}", e)))?
            .create_if_missing(true)
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(Duration::from_secs(30))
            .connect_with(options)
            .await?;

        Ok(Self::new(pool))
    }

    /// Private in-memory database on a single pinned connection
    pub async fn in_memory() -> AppResult<Self> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")?.foreign_keys(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await?;

        let store = Self::new(pool);
        store.migrate().await?;
        Ok(store)
    }

    /// Apply the embedded schema migrations
    pub async fn migrate(&self) -> AppResult<()> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

#[async_trait]
impl Store for SqliteStore {
    type Tx = SqliteTx;

    async fn begin(&self) -> AppResult<SqliteTx> {
        let guard = self.unit_lock.clone().lock_owned().await;
        Ok(SqliteTx {
            tx: self.pool.begin().await?,
            _guard: guard,
        })
    }
}

/// An open SQLite transaction
pub struct SqliteTx {
    tx: Transaction<'static, Sqlite>,
    // Declared after `tx` so the lock is released once the transaction is gone
    _guard: OwnedMutexGuard<()>,
}

/// Map constraint violations to domain errors
fn map_write_error(err: sqlx::Error) -> AppError {
    if let sqlx::Error::Database(db) = &err {
        if db.is_unique_violation() {
            return AppError::DuplicateEntry(unique_column(db.message()));
        }
        if db.is_foreign_key_violation() {
            return AppError::validation("foreign_key", "Referenced record does not exist");
        }
        if db.is_check_violation() {
            return AppError::validation("check", db.message().to_string());
        }
    }
    AppError::DatabaseError(err)
}

/// Column named by a message like "UNIQUE constraint failed: customers.name"
fn unique_column(message: &str) -> String {
    message
        .rsplit('.')
        .next()
        .map(|column| column.trim().to_string())
        .filter(|column| !column.is_empty())
        .unwrap_or_else(|| "name".to_string())
}

fn rate_to_db(rate: Decimal) -> f64 {
    rate.to_f64().unwrap_or(0.0)
}

fn rate_from_db(value: f64) -> Decimal {
    Decimal::from_f64(value).map(round_rate).unwrap_or_default()
}

// ============================================================================
// Row types
// ============================================================================

#[derive(Debug, FromRow)]
struct CustomerRow {
    id: i64,
    name: String,
    business_number: Option<String>,
    contact_person: Option<String>,
    phone: Option<String>,
    email: Option<String>,
    address: Option<String>,
    is_active: bool,
    created_at: DateTime<Utc>,
}

impl From<CustomerRow> for Customer {
    fn from(r: CustomerRow) -> Self {
        Customer {
            id: r.id,
            name: r.name,
            business_number: r.business_number,
            contact_person: r.contact_person,
            phone: r.phone,
            email: r.email,
            address: r.address,
            is_active: r.is_active,
            created_at: r.created_at,
        }
    }
}

#[derive(Debug, FromRow)]
struct SupplierRow {
    id: i64,
    name: String,
    business_number: Option<String>,
    contact_person: Option<String>,
    phone: Option<String>,
    email: Option<String>,
    address: Option<String>,
    payment_terms: Option<String>,
    notes: Option<String>,
    is_active: bool,
    created_at: DateTime<Utc>,
}

impl From<SupplierRow> for Supplier {
    fn from(r: SupplierRow) -> Self {
        Supplier {
            id: r.id,
            name: r.name,
            business_number: r.business_number,
            contact_person: r.contact_person,
            phone: r.phone,
            email: r.email,
            address: r.address,
            payment_terms: r.payment_terms,
            notes: r.notes,
            is_active: r.is_active,
            created_at: r.created_at,
        }
    }
}

#[derive(Debug, FromRow)]
struct ItemRow {
    id: i64,
    code: Option<String>,
    name: String,
    category: String,
    unit: String,
    standard_price: i64,
    description: Option<String>,
    is_active: bool,
    created_at: DateTime<Utc>,
}

impl From<ItemRow> for Item {
    fn from(r: ItemRow) -> Self {
        Item {
            id: r.id,
            code: r.code,
            name: r.name,
            category: r.category,
            unit: r.unit,
            standard_price: r.standard_price,
            description: r.description,
            is_active: r.is_active,
            created_at: r.created_at,
        }
    }
}

#[derive(Debug, FromRow)]
struct SaleRow {
    id: i64,
    customer_id: i64,
    customer_name: String,
    item_id: i64,
    item_name: String,
    item_code: Option<String>,
    sale_date: NaiveDate,
    quantity: i64,
    unit_price: i64,
    supply_price: i64,
    vat_amount: i64,
    total_amount: i64,
    purchase_price: i64,
    profit_amount: i64,
    margin_rate: f64,
    invoice_number: Option<String>,
    notes: Option<String>,
    created_at: DateTime<Utc>,
}

impl From<SaleRow> for Sale {
    fn from(r: SaleRow) -> Self {
        Sale {
            id: r.id,
            customer_id: r.customer_id,
            customer_name: r.customer_name,
            item_id: r.item_id,
            item_name: r.item_name,
            item_code: r.item_code,
            sale_date: r.sale_date,
            quantity: r.quantity,
            unit_price: r.unit_price,
            supply_price: r.supply_price,
            vat_amount: r.vat_amount,
            total_amount: r.total_amount,
            purchase_price: r.purchase_price,
            profit_amount: r.profit_amount,
            margin_rate: rate_from_db(r.margin_rate),
            invoice_number: r.invoice_number,
            notes: r.notes,
            created_at: r.created_at,
        }
    }
}

#[derive(Debug, FromRow)]
struct PurchaseRow {
    id: i64,
    supplier_id: i64,
    supplier_name: String,
    item_id: i64,
    item_name: String,
    item_code: Option<String>,
    purchase_date: NaiveDate,
    quantity: i64,
    unit_cost: i64,
    supply_amount: i64,
    vat_amount: i64,
    total_amount: i64,
    expected_sale_price: i64,
    expected_margin: f64,
    invoice_number: Option<String>,
    status: String,
    notes: Option<String>,
    created_at: DateTime<Utc>,
}

impl TryFrom<PurchaseRow> for Purchase {
    type Error = AppError;

    fn try_from(r: PurchaseRow) -> Result<Self, Self::Error> {
        Ok(Purchase {
            id: r.id,
            supplier_id: r.supplier_id,
            supplier_name: r.supplier_name,
            item_id: r.item_id,
            item_name: r.item_name,
            item_code: r.item_code,
            purchase_date: r.purchase_date,
            quantity: r.quantity,
            unit_cost: r.unit_cost,
            supply_amount: r.supply_amount,
            vat_amount: r.vat_amount,
            total_amount: r.total_amount,
            expected_sale_price: r.expected_sale_price,
            expected_margin: rate_from_db(r.expected_margin),
            invoice_number: r.invoice_number,
            status: r
                .status
                .parse()
                .map_err(|e: shared::UnknownVariant| AppError::Internal(e.to_string()))?,
            notes: r.notes,
            created_at: r.created_at,
        })
    }
}

#[derive(Debug, FromRow)]
struct InventoryRow {
    item_id: i64,
    current_stock: i64,
    avg_purchase_cost: i64,
    min_stock: i64,
    max_stock: i64,
    last_purchase_date: Option<NaiveDate>,
}

impl From<InventoryRow> for InventoryRecord {
    fn from(r: InventoryRow) -> Self {
        InventoryRecord {
            item_id: r.item_id,
            current_stock: r.current_stock,
            avg_purchase_cost: r.avg_purchase_cost,
            min_stock: r.min_stock,
            max_stock: r.max_stock,
            last_purchase_date: r.last_purchase_date,
        }
    }
}

#[derive(Debug, FromRow)]
struct InventoryViewRow {
    #[sqlx(flatten)]
    record: InventoryRow,
    item_name: String,
    item_code: Option<String>,
    item_category: String,
    standard_price: i64,
}

impl From<InventoryViewRow> for InventoryView {
    fn from(r: InventoryViewRow) -> Self {
        let record = InventoryRecord::from(r.record);
        InventoryView {
            stock_status: record.status(),
            record,
            item_name: r.item_name,
            item_code: r.item_code,
            item_category: r.item_category,
            standard_price: r.standard_price,
        }
    }
}

const CUSTOMER_COLUMNS: &str = "id, name, business_number, contact_person, phone, email, address, is_active, created_at";

const SUPPLIER_COLUMNS: &str = "id, name, business_number, contact_person, phone, email, address, payment_terms, notes, is_active, created_at";

const ITEM_COLUMNS: &str =
    "id, code, name, category, unit, standard_price, description, is_active, created_at";

const SALE_SELECT: &str = r#"
    SELECT s.id, s.customer_id, c.name AS customer_name, s.item_id, i.name AS item_name,
           i.code AS item_code, s.sale_date, s.quantity, s.unit_price, s.supply_price,
           s.vat_amount, s.total_amount, s.purchase_price, s.profit_amount, s.margin_rate,
           s.invoice_number, s.notes, s.created_at
    FROM sales s
    JOIN customers c ON s.customer_id = c.id
    JOIN items i ON s.item_id = i.id
"#;

const PURCHASE_SELECT: &str = r#"
    SELECT p.id, p.supplier_id, sup.name AS supplier_name, p.item_id, i.name AS item_name,
           i.code AS item_code, p.purchase_date, p.quantity, p.unit_cost, p.supply_amount,
           p.vat_amount, p.total_amount, p.expected_sale_price, p.expected_margin,
           p.invoice_number, p.status, p.notes, p.created_at
    FROM purchases p
    JOIN suppliers sup ON p.supplier_id = sup.id
    JOIN items i ON p.item_id = i.id
"#;

type SqliteQuery<'q> = sqlx::query::Query<'q, Sqlite, SqliteArguments<'q>>;

fn sale_binds<'q>(query: SqliteQuery<'q>, sale: &NewSale) -> SqliteQuery<'q> {
    let f: &SaleFigures = &sale.figures;
    query
        .bind(sale.customer_id)
        .bind(sale.item_id)
        .bind(sale.sale_date)
        .bind(f.quantity)
        .bind(f.unit_price)
        .bind(f.supply_price)
        .bind(f.vat_amount)
        .bind(f.total_amount)
        .bind(f.purchase_price)
        .bind(f.profit_amount)
        .bind(rate_to_db(f.margin_rate))
        .bind(sale.invoice_number.clone())
        .bind(sale.notes.clone())
}

fn purchase_binds<'q>(query: SqliteQuery<'q>, purchase: &NewPurchase) -> SqliteQuery<'q> {
    let f: &PurchaseFigures = &purchase.figures;
    query
        .bind(purchase.supplier_id)
        .bind(purchase.item_id)
        .bind(purchase.purchase_date)
        .bind(f.quantity)
        .bind(f.unit_cost)
        .bind(f.supply_amount)
        .bind(f.vat_amount)
        .bind(f.total_amount)
        .bind(f.expected_sale_price)
        .bind(rate_to_db(f.expected_margin))
        .bind(purchase.invoice_number.clone())
        .bind(purchase.status.as_str())
        .bind(purchase.notes.clone())
}

#[async_trait]
impl StoreTx for SqliteTx {
    // ========================================================================
    // Customers
    // ========================================================================

    async fn insert_customer(&mut self, input: &CustomerInput) -> AppResult<i64> {
        let result = sqlx::query(
            r#"
            INSERT INTO customers (name, business_number, contact_person, phone, email, address, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&input.name)
        .bind(&input.business_number)
        .bind(&input.contact_person)
        .bind(&input.phone)
        .bind(&input.email)
        .bind(&input.address)
        .bind(Utc::now())
        .execute(&mut *self.tx)
        .await
        .map_err(map_write_error)?;

        Ok(result.last_insert_rowid())
    }

    async fn update_customer(&mut self, id: i64, input: &CustomerInput) -> AppResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE customers
            SET name = ?, business_number = ?, contact_person = ?, phone = ?, email = ?, address = ?
            WHERE id = ?
            "#,
        )
        .bind(&input.name)
        .bind(&input.business_number)
        .bind(&input.contact_person)
        .bind(&input.phone)
        .bind(&input.email)
        .bind(&input.address)
        .bind(id)
        .execute(&mut *self.tx)
        .await
        .map_err(map_write_error)?;

        Ok(result.rows_affected() > 0)
    }

    async fn get_customer(&mut self, id: i64) -> AppResult<Option<Customer>> {
        let row = sqlx::query_as::<_, CustomerRow>(&format!(
            "SELECT {} FROM customers WHERE id = ?",
            CUSTOMER_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&mut *self.tx)
        .await?;

        Ok(row.map(Customer::from))
    }

    async fn find_customer_by_name(&mut self, name: &str) -> AppResult<Option<Customer>> {
        let row = sqlx::query_as::<_, CustomerRow>(&format!(
            "SELECT {} FROM customers WHERE name = ?",
            CUSTOMER_COLUMNS
        ))
        .bind(name)
        .fetch_optional(&mut *self.tx)
        .await?;

        Ok(row.map(Customer::from))
    }

    async fn list_customers(&mut self) -> AppResult<Vec<Customer>> {
        let rows = sqlx::query_as::<_, CustomerRow>(&format!(
            "SELECT {} FROM customers ORDER BY name",
            CUSTOMER_COLUMNS
        ))
        .fetch_all(&mut *self.tx)
        .await?;

        Ok(rows.into_iter().map(Customer::from).collect())
    }

    async fn delete_customer(&mut self, id: i64) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM customers WHERE id = ?")
            .bind(id)
            .execute(&mut *self.tx)
            .await
            .map_err(map_write_error)?;

        Ok(result.rows_affected() > 0)
    }

    async fn count_customer_sales(&mut self, customer_id: i64) -> AppResult<i64> {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM sales WHERE customer_id = ?")
            .bind(customer_id)
            .fetch_one(&mut *self.tx)
            .await?;

        Ok(count)
    }

    // ========================================================================
    // Suppliers
    // ========================================================================

    async fn insert_supplier(&mut self, input: &SupplierInput) -> AppResult<i64> {
        let result = sqlx::query(
            r#"
            INSERT INTO suppliers (name, business_number, contact_person, phone, email, address,
                                   payment_terms, notes, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&input.name)
        .bind(&input.business_number)
        .bind(&input.contact_person)
        .bind(&input.phone)
        .bind(&input.email)
        .bind(&input.address)
        .bind(&input.payment_terms)
        .bind(&input.notes)
        .bind(Utc::now())
        .execute(&mut *self.tx)
        .await
        .map_err(map_write_error)?;

        Ok(result.last_insert_rowid())
    }

    async fn update_supplier(&mut self, id: i64, input: &SupplierInput) -> AppResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE suppliers
            SET name = ?, business_number = ?, contact_person = ?, phone = ?, email = ?,
                address = ?, payment_terms = ?, notes = ?
            WHERE id = ?
            "#,
        )
        .bind(&input.name)
        .bind(&input.business_number)
        .bind(&input.contact_person)
        .bind(&input.phone)
        .bind(&input.email)
        .bind(&input.address)
        .bind(&input.payment_terms)
        .bind(&input.notes)
        .bind(id)
        .execute(&mut *self.tx)
        .await
        .map_err(map_write_error)?;

        Ok(result.rows_affected() > 0)
    }

    async fn get_supplier(&mut self, id: i64) -> AppResult<Option<Supplier>> {
        let row = sqlx::query_as::<_, SupplierRow>(&format!(
            "SELECT {} FROM suppliers WHERE id = ?",
            SUPPLIER_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&mut *self.tx)
        .await?;

        Ok(row.map(Supplier::from))
    }

    async fn find_supplier_by_name(&mut self, name: &str) -> AppResult<Option<Supplier>> {
        let row = sqlx::query_as::<_, SupplierRow>(&format!(
            "SELECT {} FROM suppliers WHERE name = ?",
            SUPPLIER_COLUMNS
        ))
        .bind(name)
        .fetch_optional(&mut *self.tx)
        .await?;

        Ok(row.map(Supplier::from))
    }

    async fn list_suppliers(&mut self) -> AppResult<Vec<Supplier>> {
        let rows = sqlx::query_as::<_, SupplierRow>(&format!(
            "SELECT {} FROM suppliers WHERE is_active = 1 ORDER BY name",
            SUPPLIER_COLUMNS
        ))
        .fetch_all(&mut *self.tx)
        .await?;

        Ok(rows.into_iter().map(Supplier::from).collect())
    }

    async fn deactivate_supplier(&mut self, id: i64) -> AppResult<bool> {
        let result = sqlx::query("UPDATE suppliers SET is_active = 0 WHERE id = ?")
            .bind(id)
            .execute(&mut *self.tx)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    // ========================================================================
    // Items
    // ========================================================================

    async fn insert_item(&mut self, input: &ItemInput) -> AppResult<i64> {
        let result = sqlx::query(
            r#"
            INSERT INTO items (code, name, category, unit, standard_price, description, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&input.code)
        .bind(&input.name)
        .bind(input.category_or_default())
        .bind(input.unit_or_default())
        .bind(input.standard_price.unwrap_or(0))
        .bind(&input.description)
        .bind(Utc::now())
        .execute(&mut *self.tx)
        .await
        .map_err(map_write_error)?;

        Ok(result.last_insert_rowid())
    }

    async fn update_item(&mut self, id: i64, input: &ItemInput) -> AppResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE items
            SET code = ?, name = ?, category = ?, unit = ?, standard_price = ?, description = ?
            WHERE id = ?
            "#,
        )
        .bind(&input.code)
        .bind(&input.name)
        .bind(input.category_or_default())
        .bind(input.unit_or_default())
        .bind(input.standard_price.unwrap_or(0))
        .bind(&input.description)
        .bind(id)
        .execute(&mut *self.tx)
        .await
        .map_err(map_write_error)?;

        Ok(result.rows_affected() > 0)
    }

    async fn get_item(&mut self, id: i64) -> AppResult<Option<Item>> {
        let row = sqlx::query_as::<_, ItemRow>(&format!(
            "SELECT {} FROM items WHERE id = ?",
            ITEM_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&mut *self.tx)
        .await?;

        Ok(row.map(Item::from))
    }

    async fn find_item_by_name(&mut self, name: &str) -> AppResult<Option<Item>> {
        let row = sqlx::query_as::<_, ItemRow>(&format!(
            "SELECT {} FROM items WHERE name = ?",
            ITEM_COLUMNS
        ))
        .bind(name)
        .fetch_optional(&mut *self.tx)
        .await?;

        Ok(row.map(Item::from))
    }

    async fn list_items(&mut self) -> AppResult<Vec<Item>> {
        let rows = sqlx::query_as::<_, ItemRow>(&format!(
            "SELECT {} FROM items WHERE is_active = 1 ORDER BY name",
            ITEM_COLUMNS
        ))
        .fetch_all(&mut *self.tx)
        .await?;

        Ok(rows.into_iter().map(Item::from).collect())
    }

    async fn delete_item(&mut self, id: i64) -> AppResult<bool> {
        sqlx::query("DELETE FROM inventory WHERE item_id = ?")
            .bind(id)
            .execute(&mut *self.tx)
            .await?;

        let result = sqlx::query("DELETE FROM items WHERE id = ?")
            .bind(id)
            .execute(&mut *self.tx)
            .await
            .map_err(map_write_error)?;

        Ok(result.rows_affected() > 0)
    }

    async fn count_item_references(&mut self, item_id: i64) -> AppResult<i64> {
        let count = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT (SELECT COUNT(*) FROM sales WHERE item_id = ?)
                 + (SELECT COUNT(*) FROM purchases WHERE item_id = ?)
            "#,
        )
        .bind(item_id)
        .bind(item_id)
        .fetch_one(&mut *self.tx)
        .await?;

        Ok(count)
    }

    // ========================================================================
    // Sales
    // ========================================================================

    async fn insert_sale(&mut self, sale: &NewSale) -> AppResult<i64> {
        let query = sqlx::query(
            r#"
            INSERT INTO sales (
                customer_id, item_id, sale_date, quantity, unit_price, supply_price, vat_amount,
                total_amount, purchase_price, profit_amount, margin_rate, invoice_number, notes,
                created_at
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        );
        let result = sale_binds(query, sale)
            .bind(Utc::now())
            .execute(&mut *self.tx)
            .await
            .map_err(map_write_error)?;

        Ok(result.last_insert_rowid())
    }

    async fn update_sale(&mut self, id: i64, sale: &NewSale) -> AppResult<bool> {
        let query = sqlx::query(
            r#"
            UPDATE sales
            SET customer_id = ?, item_id = ?, sale_date = ?, quantity = ?, unit_price = ?,
                supply_price = ?, vat_amount = ?, total_amount = ?, purchase_price = ?,
                profit_amount = ?, margin_rate = ?, invoice_number = ?, notes = ?
            WHERE id = ?
            "#,
        );
        let result = sale_binds(query, sale)
            .bind(id)
            .execute(&mut *self.tx)
            .await
            .map_err(map_write_error)?;

        Ok(result.rows_affected() > 0)
    }

    async fn get_sale(&mut self, id: i64) -> AppResult<Option<Sale>> {
        let row = sqlx::query_as::<_, SaleRow>(&format!("{} WHERE s.id = ?", SALE_SELECT))
            .bind(id)
            .fetch_optional(&mut *self.tx)
            .await?;

        Ok(row.map(Sale::from))
    }

    async fn list_sales(&mut self, filter: &SaleFilter) -> AppResult<Vec<Sale>> {
        let mut query = QueryBuilder::<Sqlite>::new(SALE_SELECT);
        query.push(" WHERE 1=1");
        if let Some(start) = filter.start_date {
            query.push(" AND s.sale_date >= ").push_bind(start);
        }
        if let Some(end) = filter.end_date {
            query.push(" AND s.sale_date <= ").push_bind(end);
        }
        if let Some(customer_id) = filter.customer_id {
            query.push(" AND s.customer_id = ").push_bind(customer_id);
        }
        if let Some(item_id) = filter.item_id {
            query.push(" AND s.item_id = ").push_bind(item_id);
        }
        query
            .push(" ORDER BY s.sale_date DESC, s.id DESC LIMIT ")
            .push_bind(i64::from(filter.limit))
            .push(" OFFSET ")
            .push_bind(i64::from(filter.offset));

        let rows = query
            .build_query_as::<SaleRow>()
            .fetch_all(&mut *self.tx)
            .await?;

        Ok(rows.into_iter().map(Sale::from).collect())
    }

    async fn delete_sale(&mut self, id: i64) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM sales WHERE id = ?")
            .bind(id)
            .execute(&mut *self.tx)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    // ========================================================================
    // Purchases
    // ========================================================================

    async fn insert_purchase(&mut self, purchase: &NewPurchase) -> AppResult<i64> {
        let query = sqlx::query(
            r#"
            INSERT INTO purchases (
                supplier_id, item_id, purchase_date, quantity, unit_cost, supply_amount,
                vat_amount, total_amount, expected_sale_price, expected_margin, invoice_number,
                status, notes, created_at
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        );
        let result = purchase_binds(query, purchase)
            .bind(Utc::now())
            .execute(&mut *self.tx)
            .await
            .map_err(map_write_error)?;

        Ok(result.last_insert_rowid())
    }

    async fn update_purchase(&mut self, id: i64, purchase: &NewPurchase) -> AppResult<bool> {
        let query = sqlx::query(
            r#"
            UPDATE purchases
            SET supplier_id = ?, item_id = ?, purchase_date = ?, quantity = ?, unit_cost = ?,
                supply_amount = ?, vat_amount = ?, total_amount = ?, expected_sale_price = ?,
                expected_margin = ?, invoice_number = ?, status = ?, notes = ?
            WHERE id = ?
            "#,
        );
        let result = purchase_binds(query, purchase)
            .bind(id)
            .execute(&mut *self.tx)
            .await
            .map_err(map_write_error)?;

        Ok(result.rows_affected() > 0)
    }

    async fn get_purchase(&mut self, id: i64) -> AppResult<Option<Purchase>> {
        let row = sqlx::query_as::<_, PurchaseRow>(&format!("{} WHERE p.id = ?", PURCHASE_SELECT))
            .bind(id)
            .fetch_optional(&mut *self.tx)
            .await?;

        row.map(Purchase::try_from).transpose()
    }

    async fn list_purchases(&mut self, filter: &PurchaseFilter) -> AppResult<Vec<Purchase>> {
        let mut query = QueryBuilder::<Sqlite>::new(PURCHASE_SELECT);
        query.push(" WHERE 1=1");
        if let Some(start) = filter.start_date {
            query.push(" AND p.purchase_date >= ").push_bind(start);
        }
        if let Some(end) = filter.end_date {
            query.push(" AND p.purchase_date <= ").push_bind(end);
        }
        if let Some(supplier_id) = filter.supplier_id {
            query.push(" AND p.supplier_id = ").push_bind(supplier_id);
        }
        if let Some(item_id) = filter.item_id {
            query.push(" AND p.item_id = ").push_bind(item_id);
        }
        if let Some(status) = filter.status {
            query.push(" AND p.status = ").push_bind(status.as_str());
        }
        query
            .push(" ORDER BY p.purchase_date DESC, p.id DESC LIMIT ")
            .push_bind(i64::from(filter.limit))
            .push(" OFFSET ")
            .push_bind(i64::from(filter.offset));

        let rows = query
            .build_query_as::<PurchaseRow>()
            .fetch_all(&mut *self.tx)
            .await?;

        rows.into_iter().map(Purchase::try_from).collect()
    }

    async fn delete_purchase(&mut self, id: i64) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM purchases WHERE id = ?")
            .bind(id)
            .execute(&mut *self.tx)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn latest_received_unit_cost(&mut self, item_id: i64) -> AppResult<Option<Won>> {
        let cost = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT unit_cost
            FROM purchases
            WHERE item_id = ? AND status = 'received'
            ORDER BY purchase_date DESC, id DESC
            LIMIT 1
            "#,
        )
        .bind(item_id)
        .fetch_optional(&mut *self.tx)
        .await?;

        Ok(cost)
    }

    // ========================================================================
    // Inventory
    // ========================================================================

    async fn get_inventory(&mut self, item_id: i64) -> AppResult<Option<InventoryRecord>> {
        let row = sqlx::query_as::<_, InventoryRow>(
            r#"
            SELECT item_id, current_stock, avg_purchase_cost, min_stock, max_stock, last_purchase_date
            FROM inventory
            WHERE item_id = ?
            "#,
        )
        .bind(item_id)
        .fetch_optional(&mut *self.tx)
        .await?;

        Ok(row.map(InventoryRecord::from))
    }

    async fn put_inventory(&mut self, record: &InventoryRecord) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO inventory (item_id, current_stock, avg_purchase_cost, min_stock, max_stock, last_purchase_date)
            VALUES (?, ?, ?, ?, ?, ?)
            ON CONFLICT(item_id) DO UPDATE SET
                current_stock = excluded.current_stock,
                avg_purchase_cost = excluded.avg_purchase_cost,
                min_stock = excluded.min_stock,
                max_stock = excluded.max_stock,
                last_purchase_date = excluded.last_purchase_date
            "#,
        )
        .bind(record.item_id)
        .bind(record.current_stock)
        .bind(record.avg_purchase_cost)
        .bind(record.min_stock)
        .bind(record.max_stock)
        .bind(record.last_purchase_date)
        .execute(&mut *self.tx)
        .await
        .map_err(map_write_error)?;

        Ok(())
    }

    async fn list_inventory(&mut self) -> AppResult<Vec<InventoryView>> {
        let rows = sqlx::query_as::<_, InventoryViewRow>(
            r#"
            SELECT inv.item_id, inv.current_stock, inv.avg_purchase_cost, inv.min_stock,
                   inv.max_stock, inv.last_purchase_date,
                   i.name AS item_name, i.code AS item_code, i.category AS item_category,
                   i.standard_price
            FROM inventory inv
            JOIN items i ON inv.item_id = i.id
            WHERE i.is_active = 1
            ORDER BY inv.current_stock ASC, i.name
            "#,
        )
        .fetch_all(&mut *self.tx)
        .await?;

        Ok(rows.into_iter().map(InventoryView::from).collect())
    }

    async fn clear_all(&mut self) -> AppResult<()> {
        for table in ["sales", "purchases", "inventory", "items", "customers", "suppliers"] {
            sqlx::query(&format!("DELETE FROM {}", table))
                .execute(&mut *self.tx)
                .await?;
        }
        Ok(())
    }

    async fn savepoint(&mut self) -> AppResult<()> {
        sqlx::query("SAVEPOINT unit").execute(&mut *self.tx).await?;
        Ok(())
    }

    async fn release_savepoint(&mut self) -> AppResult<()> {
        sqlx::query("RELEASE SAVEPOINT unit")
            .execute(&mut *self.tx)
            .await?;
        Ok(())
    }

    async fn rollback_to_savepoint(&mut self) -> AppResult<()> {
        // ROLLBACK TO keeps the savepoint open, so release it as well
        sqlx::query("ROLLBACK TO SAVEPOINT unit")
            .execute(&mut *self.tx)
            .await?;
        sqlx::query("RELEASE SAVEPOINT unit")
            .execute(&mut *self.tx)
            .await?;
        Ok(())
    }

    async fn commit(self) -> AppResult<()> {
        self.tx
            .commit()
            .await
            .map_err(|e| AppError::Transaction(e.to_string()))
    }

    async fn rollback(self) -> AppResult<()> {
        self.tx
            .rollback()
            .await
            .map_err(|e| AppError::Transaction(e.to_string()))
    }
}
