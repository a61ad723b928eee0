//! Import orchestrator
//!
//! Drives one import run through its stages:
//!
//! ```text
//! INIT -> READ_SOURCE -> MIGRATE_CUSTOMERS -> MIGRATE_SUPPLIERS -> MIGRATE_ITEMS
//!      -> MIGRATE_PURCHASES -> MIGRATE_SALES -> REPORT -> DONE
//! ```
//!
//! Any stage may end the run in `FAILED`. Entity stages run in one
//! transaction each; purchases and sales run in batches with one transaction
//! per batch. A row that fails is counted and skipped, and a savepoint
//! undoes whatever it wrote; a transaction that fails aborts the run. The report is produced either way.

use async_trait::async_trait;
use chrono::{DateTime, Local, NaiveDate, Utc};
use shared::{
    DatePolicy, EntityKind, ImportReport, ImportState, ImportStats, NewPurchase, NewSale,
    PurchaseFigures, PurchaseStatus, RejectedRow, SaleFigures, SheetLayout, StageCounts,
};
use tracing::Instrument;
use uuid::Uuid;

use super::parser::{parse_sheet, ParsedItem, ParsedPurchase, ParsedSale, ParsedSheet, ParserOptions};
use super::resolver::EntityResolver;
use super::source::SheetSource;
use crate::config::ImportConfig;
use crate::error::{AppError, AppResult};
use crate::services::inventory::record_purchase;
use crate::services::sale::cost_basis;
use crate::store::{Store, StoreTx};

/// Rows per purchase or sale transaction unless configured otherwise
pub const DEFAULT_BATCH_SIZE: usize = 100;

/// Settings of one import run
#[derive(Debug, Clone, Copy)]
pub struct ImportOptions {
    pub layout: SheetLayout,
    pub batch_size: usize,
    /// Delete all existing business data before importing
    pub clear_existing: bool,
    pub date_policy: DatePolicy,
    /// Date used for unparseable dates and as the ledger's purchase date
    pub today: NaiveDate,
}

impl ImportOptions {
    pub fn new(layout: SheetLayout) -> Self {
        Self {
            layout,
            batch_size: DEFAULT_BATCH_SIZE,
            clear_existing: false,
            date_policy: DatePolicy::default(),
            today: Local::now().date_naive(),
        }
    }

    pub fn from_config(layout: SheetLayout, config: &ImportConfig) -> Self {
        Self {
            batch_size: config.batch_size,
            date_policy: config.date_policy,
            ..Self::new(layout)
        }
    }
}

/// Runs imports against a store
pub struct Importer<S> {
    store: S,
    options: ImportOptions,
}

impl<S: Store> Importer<S> {
    pub fn new(store: S, options: ImportOptions) -> Self {
        Self { store, options }
    }

    pub fn options(&self) -> &ImportOptions {
        &self.options
    }

    /// Read, parse and import a sheet
    pub async fn run(&self, source: &dyn SheetSource) -> ImportReport {
        let mut run = Run::new(Some(self.options.layout));
        let span = tracing::info_span!("import", run_id = %run.run_id, layout = %self.options.layout);

        async move {
            tracing::info!(source = %source.describe(), "Import started");
            run.enter(ImportState::ReadSource);
            let rows = match source.read_rows() {
                Ok(rows) => rows,
                Err(e) => return run.fail(e),
            };
            tracing::info!(rows = rows.len(), "Source read");

            let parsed = parse_sheet(
                &rows,
                &ParserOptions {
                    layout: self.options.layout,
                    date_policy: self.options.date_policy,
                    today: self.options.today,
                },
            );
            self.migrate(run, parsed).await
        }
        .instrument(span)
        .await
    }

    /// Import rows that were already parsed
    pub async fn run_parsed(&self, parsed: ParsedSheet) -> ImportReport {
        let run = Run::new(parsed.layout);
        let span = tracing::info_span!("import", run_id = %run.run_id, layout = ?parsed.layout);

        async move {
            tracing::info!("Import of parsed rows started");
            self.migrate(run, parsed).await
        }
        .instrument(span)
        .await
    }

    async fn migrate(&self, mut run: Run, parsed: ParsedSheet) -> ImportReport {
        run.rejected = parsed.rejected_rows;

        if self.options.clear_existing {
            if let Err(e) = self.clear_existing().await {
                return run.fail(e);
            }
        }

        let mut resolver = EntityResolver::new();

        run.enter(ImportState::MigrateCustomers);
        if let Err(e) = self
            .migrate_names(&mut resolver, EntityKind::Customer, &parsed.customers, &mut run.stats.customers)
            .await
        {
            return run.fail(e);
        }

        run.enter(ImportState::MigrateSuppliers);
        if let Err(e) = self
            .migrate_names(&mut resolver, EntityKind::Supplier, &parsed.suppliers, &mut run.stats.suppliers)
            .await
        {
            return run.fail(e);
        }

        run.enter(ImportState::MigrateItems);
        if let Err(e) = self
            .migrate_items(&mut resolver, &parsed.items, &mut run.stats.items)
            .await
        {
            return run.fail(e);
        }

        run.enter(ImportState::MigratePurchases);
        if let Err(e) = self
            .migrate_batched(&resolver, &parsed.purchases, &mut run.stats.purchases)
            .await
        {
            return run.fail(e);
        }

        run.enter(ImportState::MigrateSales);
        if let Err(e) = self
            .migrate_batched(&resolver, &parsed.sales, &mut run.stats.sales)
            .await
        {
            return run.fail(e);
        }

        run.finish()
    }

    async fn clear_existing(&self) -> AppResult<()> {
        tracing::warn!("Clearing existing sales, purchases, inventory and master data");
        let mut tx = self.store.begin().await?;
        tx.clear_all().await?;
        tx.commit().await
    }

    async fn migrate_names(
        &self,
        resolver: &mut EntityResolver,
        kind: EntityKind,
        names: &[String],
        counts: &mut StageCounts,
    ) -> AppResult<()> {
        counts.total += names.len() as u64;
        let mut tx = self.store.begin().await?;

        let mut success = 0;
        for name in names {
            match resolver.resolve(&mut tx, kind, name).await {
                Ok(_) => success += 1,
                Err(e) => {
                    counts.errors += 1;
                    tracing::warn!(%kind, %name, error = %e, "Entity not resolved");
                }
            }
        }

        self.commit_stage(tx, resolver, kind, success, counts).await
    }

    async fn migrate_items(
        &self,
        resolver: &mut EntityResolver,
        items: &[ParsedItem],
        counts: &mut StageCounts,
    ) -> AppResult<()> {
        counts.total += items.len() as u64;
        let mut tx = self.store.begin().await?;

        let mut success = 0;
        for item in items {
            match resolver
                .resolve_item(&mut tx, &item.name, item.code.as_deref())
                .await
            {
                Ok(_) => success += 1,
                Err(e) => {
                    counts.errors += 1;
                    tracing::warn!(name = %item.name, error = %e, "Item not resolved");
                }
            }
        }

        self.commit_stage(tx, resolver, EntityKind::Item, success, counts)
            .await
    }

    async fn commit_stage(
        &self,
        tx: S::Tx,
        resolver: &mut EntityResolver,
        kind: EntityKind,
        success: u64,
        counts: &mut StageCounts,
    ) -> AppResult<()> {
        if let Err(e) = tx.commit().await {
            counts.errors += success;
            resolver.forget(kind);
            return Err(e);
        }
        counts.success += success;
        tracing::info!(
            %kind,
            success = counts.success,
            errors = counts.errors,
            total = counts.total,
            cached = resolver.resolved(kind),
            "Stage committed"
        );
        Ok(())
    }

    async fn migrate_batched<R: StagedRow>(
        &self,
        resolver: &EntityResolver,
        rows: &[R],
        counts: &mut StageCounts,
    ) -> AppResult<()> {
        let total = rows.len();
        counts.total += total as u64;

        let mut processed = 0;
        for (batch_no, batch) in rows.chunks(self.options.batch_size.max(1)).enumerate() {
            let mut tx = self.store.begin().await?;

            let mut success = 0;
            for row in batch {
                tx.savepoint().await?;
                match row.import(&mut tx, resolver, self.options.today).await {
                    Ok(id) => {
                        tx.release_savepoint().await?;
                        success += 1;
                        tracing::debug!(stage = R::STAGE, row = row.row_number(), id, "Row imported");
                    }
                    Err(e) => {
                        tx.rollback_to_savepoint().await?;
                        counts.errors += 1;
                        tracing::warn!(stage = R::STAGE, row = row.row_number(), error = %e, "Row skipped");
                    }
                }
            }

            if let Err(e) = tx.commit().await {
                counts.errors += success;
                tracing::error!(stage = R::STAGE, batch = batch_no + 1, error = %e, "Batch commit failed");
                return Err(e);
            }
            counts.success += success;
            processed += batch.len();
            tracing::info!(stage = R::STAGE, processed, total, "Batch committed");
        }

        Ok(())
    }
}

/// A transactional row imported in batches
#[async_trait]
trait StagedRow: Sync {
    const STAGE: &'static str;

    fn row_number(&self) -> usize;

    /// Write the row, returning the new record id
    async fn import<T: StoreTx>(
        &self,
        tx: &mut T,
        resolver: &EntityResolver,
        today: NaiveDate,
    ) -> AppResult<i64>;
}

#[async_trait]
impl StagedRow for ParsedPurchase {
    const STAGE: &'static str = "purchases";

    fn row_number(&self) -> usize {
        self.raw_row_index
    }

    async fn import<T: StoreTx>(
        &self,
        tx: &mut T,
        resolver: &EntityResolver,
        today: NaiveDate,
    ) -> AppResult<i64> {
        let supplier_id = resolver.id_of(EntityKind::Supplier, &self.supplier_name)?;
        let item_id = resolver.id_of(EntityKind::Item, &self.item_name)?;

        let parsed = &self.figures;
        let figures = PurchaseFigures::compute(
            parsed.unit_cost,
            parsed.quantity,
            parsed.vat_amount,
            parsed.expected_sale_price,
        );

        let purchase = NewPurchase {
            supplier_id,
            item_id,
            purchase_date: self.purchase_date,
            figures,
            invoice_number: None,
            status: PurchaseStatus::Received,
            notes: None,
        };
        let id = tx.insert_purchase(&purchase).await?;
        record_purchase(tx, item_id, figures.quantity, figures.unit_cost, today).await?;
        Ok(id)
    }
}

#[async_trait]
impl StagedRow for ParsedSale {
    const STAGE: &'static str = "sales";

    fn row_number(&self) -> usize {
        self.raw_row_index
    }

    async fn import<T: StoreTx>(
        &self,
        tx: &mut T,
        resolver: &EntityResolver,
        _today: NaiveDate,
    ) -> AppResult<i64> {
        let customer_id = resolver.id_of(EntityKind::Customer, &self.customer_name)?;
        let item_id = resolver.id_of(EntityKind::Item, &self.item_name)?;

        // Rows without a purchase price take the latest received cost
        let parsed = &self.figures;
        let basis = cost_basis(tx, item_id, Some(parsed.purchase_price)).await?;
        let figures =
            SaleFigures::compute(parsed.unit_price, parsed.quantity, parsed.vat_amount, basis);

        let sale = NewSale {
            customer_id,
            item_id,
            sale_date: self.sale_date,
            figures,
            invoice_number: None,
            notes: None,
        };
        tx.insert_sale(&sale).await
    }
}

/// Mutable state of a run in progress
struct Run {
    run_id: Uuid,
    layout: Option<SheetLayout>,
    state: ImportState,
    stats: ImportStats,
    rejected: Vec<RejectedRow>,
    started_at: DateTime<Utc>,
}

impl Run {
    fn new(layout: Option<SheetLayout>) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            layout,
            state: ImportState::Init,
            stats: ImportStats::default(),
            rejected: Vec::new(),
            started_at: Utc::now(),
        }
    }

    fn enter(&mut self, state: ImportState) {
        self.state = state;
        tracing::info!(state = %state, "Stage started");
    }

    fn fail(mut self, error: AppError) -> ImportReport {
        let stage = self.state;
        tracing::error!(state = %stage, error = %error, "Import failed");
        self.state = ImportState::Failed;
        self.report(Some(format!("{}: {}", stage, error)))
    }

    fn finish(mut self) -> ImportReport {
        self.enter(ImportState::Report);
        self.state = ImportState::Done;
        self.report(None)
    }

    fn report(self, failure: Option<String>) -> ImportReport {
        let totals = self.stats.totals();
        let report = ImportReport {
            run_id: self.run_id.to_string(),
            layout: self.layout,
            state: self.state,
            failure,
            stats: self.stats,
            totals,
            success_percent: StageCounts::percent(totals.success, totals.total),
            error_percent: StageCounts::percent(totals.errors, totals.total),
            rejected_rows: self.rejected,
            started_at: self.started_at,
            finished_at: Some(Utc::now()),
        };
        tracing::info!(
            state = %report.state,
            total = totals.total,
            success = totals.success,
            errors = totals.errors,
            rejected = report.rejected_rows.len(),
            "Import finished"
        );
        report
    }
}
