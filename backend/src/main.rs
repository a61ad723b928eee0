//! Small-business ERP - Backend Server
//!
//! Serves the sales, purchase, inventory and import API over HTTP.

use std::{net::SocketAddr, path::Path};

use erp_backend::{create_app, AppState, Config, SqliteStore};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "erp_server=debug,erp_backend=debug,tower_http=debug,sqlx=warn".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    dotenvy::dotenv().ok();
    let config = Config::load()?;

    tracing::info!("Starting ERP server");
    tracing::info!("Environment: {}", config.environment);

    if let Some(dir) = database_dir(&config.database.url) {
        std::fs::create_dir_all(dir)?;
    }

    tracing::info!("Connecting to database...");
    let store = SqliteStore::connect(&config.database).await?;
    tracing::info!("Database connection established");

    tracing::info!("Running database migrations...");
    store.migrate().await?;
    tracing::info!("Migrations completed");

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;
    let app = create_app(AppState::new(store, config));

    tracing::info!("Listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Parent directory of a file-backed SQLite url
fn database_dir(url: &str) -> Option<&Path> {
    let path = url
        .strip_prefix("sqlite://")
        .or_else(|| url.strip_prefix("sqlite:"))?;
    let path = path.split('?').next()?;
    if path.is_empty() || path.starts_with(":memory:") {
        return None;
    }
    Path::new(path).parent().filter(|p| !p.as_os_str().is_empty())
}
