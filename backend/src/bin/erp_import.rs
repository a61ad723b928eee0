//! Command-line spreadsheet import
//!
//! Reads one sheet exported as CSV and imports it into the configured
//! database, then prints the reconciliation report.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{ArgAction, Parser};
use erp_backend::import::{CsvSheet, ImportOptions, Importer};
use erp_backend::{Config, SqliteStore};
use shared::{DatePolicy, ImportReport, SheetLayout, StageCounts};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "erp-import", about = "Import a historical sales sheet", version)]
struct Cli {
    /// Sheet exported as CSV
    csv: PathBuf,

    /// Sheet layout: sales-ledger or sales-and-purchases
    #[arg(long)]
    layout: SheetLayout,

    /// Rows per purchase or sale transaction
    #[arg(long)]
    batch_size: Option<usize>,

    /// Delete existing business data first
    #[arg(long, action = ArgAction::SetTrue)]
    clear: bool,

    /// Reject rows with unparseable dates instead of using today
    #[arg(long, action = ArgAction::SetTrue)]
    strict_dates: bool,

    #[arg(long, action = ArgAction::SetTrue, help = "Print the report as pretty JSON")]
    json: bool,
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "erp_import=info,erp_backend=info,sqlx=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    dotenvy::dotenv().ok();
    let config = Config::load().context("failed to load configuration")?;

    let mut options = ImportOptions::from_config(cli.layout, &config.import);
    if let Some(batch_size) = cli.batch_size {
        anyhow::ensure!(batch_size > 0, "--batch-size must be at least 1");
        options.batch_size = batch_size;
    }
    options.clear_existing = cli.clear;
    if cli.strict_dates {
        options.date_policy = DatePolicy::Reject;
    }

    let store = SqliteStore::connect(&config.database)
        .await
        .context("failed to open database")?;
    store.migrate().await.context("failed to run migrations")?;

    let report = Importer::new(store, options)
        .run(&CsvSheet::new(&cli.csv))
        .await;

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report);
    }

    Ok(if report.is_failed() {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    })
}

fn print_report(report: &ImportReport) {
    println!("Import run {}", report.run_id);
    if let Some(layout) = report.layout {
        println!("Layout:   {}", layout);
    }
    println!("State:    {}", report.state);
    if let Some(failure) = &report.failure {
        println!("Failure:  {}", failure);
    }
    println!();
    println!("{:<12} {:>8} {:>8} {:>8}", "entity", "total", "success", "errors");
    let rows = [
        ("customers", report.stats.customers),
        ("suppliers", report.stats.suppliers),
        ("items", report.stats.items),
        ("purchases", report.stats.purchases),
        ("sales", report.stats.sales),
        ("all", report.totals),
    ];
    for (name, counts) in rows {
        print_counts(name, &counts);
    }
    println!();
    println!(
        "Success {}%, errors {}%",
        report.success_percent, report.error_percent
    );

    if !report.rejected_rows.is_empty() {
        println!();
        println!("Rejected rows:");
        for rejected in &report.rejected_rows {
            println!("  row {:>5}: {}", rejected.row, rejected.reason);
        }
    }
}

fn print_counts(name: &str, counts: &StageCounts) {
    println!(
        "{:<12} {:>8} {:>8} {:>8}",
        name, counts.total, counts.success, counts.errors
    );
}
