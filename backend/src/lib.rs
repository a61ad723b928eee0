//! Small-business ERP backend
//!
//! Sales, purchases, inventory and master data over SQLite, plus the
//! spreadsheet import pipeline that reconciles historical sheets into them.

use std::sync::Arc;

use axum::{routing::get, Router};
use tokio::sync::Mutex;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

pub mod config;
pub mod error;
pub mod handlers;
pub mod import;
pub mod routes;
pub mod services;
pub mod store;

pub use config::Config;
pub use error::{AppError, AppResult};
pub use store::{MemoryStore, SqliteStore, Store, StoreTx};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub store: SqliteStore,
    pub config: Arc<Config>,
    /// Import runs must not overlap
    pub import_lock: Arc<Mutex<()>>,
}

impl AppState {
    pub fn new(store: SqliteStore, config: Config) -> Self {
        Self {
            store,
            config: Arc::new(config),
            import_lock: Arc::new(Mutex::new(())),
        }
    }
}

/// Create the application router with all routes and middleware
pub fn create_app(state: AppState) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(root))
        .route("/health", get(handlers::health_check))
        .nest("/api/v1", routes::api_routes())
        .layer(TraceLayer::new_for_http())
        .layer(CompressionLayer::new())
        .layer(cors)
        .with_state(state)
}

/// Root endpoint
async fn root() -> &'static str {
    "Small Business ERP API v1.0"
}
