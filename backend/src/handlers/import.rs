//! HTTP handler for spreadsheet imports

use axum::{extract::State, Json};
use serde::Deserialize;
use shared::{DatePolicy, ImportReport, SheetLayout};

use crate::error::{AppError, AppResult};
use crate::import::{Cell, ImportOptions, Importer, Workbook};
use crate::AppState;

const UPLOAD_SHEET: &str = "upload";

/// Rows of one sheet, already extracted by the client
#[derive(Debug, Deserialize)]
pub struct ImportRequest {
    pub layout: SheetLayout,
    pub rows: Vec<Vec<Cell>>,
    pub date_policy: Option<DatePolicy>,
    #[serde(default)]
    pub clear_existing: bool,
}

/// Run an import; runs are serialized
pub async fn import_sheet(
    State(state): State<AppState>,
    Json(request): Json<ImportRequest>,
) -> AppResult<Json<ImportReport>> {
    if request.rows.is_empty() {
        return Err(AppError::validation("rows", "No rows to import"));
    }

    let _running = state.import_lock.lock().await;

    let mut options = ImportOptions::from_config(request.layout, &state.config.import);
    if let Some(policy) = request.date_policy {
        options.date_policy = policy;
    }
    options.clear_existing = request.clear_existing;

    let source = Workbook::new(UPLOAD_SHEET).with_sheet(UPLOAD_SHEET, request.rows);
    let report = Importer::new(state.store.clone(), options).run(&source).await;
    Ok(Json(report))
}
