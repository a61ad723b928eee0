//! Sources of raw sheet rows

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use super::cell::Cell;
use crate::error::{AppError, AppResult};

/// Something that yields the raw rows of one sheet
pub trait SheetSource: Send + Sync {
    /// Human-readable name for logs and errors
    fn describe(&self) -> String;

    fn read_rows(&self) -> AppResult<Vec<Vec<Cell>>>;
}

/// In-memory workbook of named sheets, read one sheet at a time
#[derive(Debug, Clone, Default)]
pub struct Workbook {
    sheets: HashMap<String, Vec<Vec<Cell>>>,
    selected: String,
}

impl Workbook {
    /// Workbook that reads the sheet called `selected`
    pub fn new(selected: impl Into<String>) -> Self {
        Self {
            sheets: HashMap::new(),
            selected: selected.into(),
        }
    }

    pub fn with_sheet(mut self, name: impl Into<String>, rows: Vec<Vec<Cell>>) -> Self {
        self.sheets.insert(name.into(), rows);
        self
    }

    pub fn sheet_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.sheets.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

impl SheetSource for Workbook {
    fn describe(&self) -> String {
        format!("sheet '{}'", self.selected)
    }

    fn read_rows(&self) -> AppResult<Vec<Vec<Cell>>> {
        self.sheets.get(&self.selected).cloned().ok_or_else(|| {
            tracing::error!(sheet = %self.selected, available = ?self.sheet_names(), "Sheet not found");
            AppError::SourceNotFound(format!("sheet '{}'", self.selected))
        })
    }
}

/// A sheet exported as CSV
#[derive(Debug, Clone)]
pub struct CsvSheet {
    path: PathBuf,
}

impl CsvSheet {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }
}

impl SheetSource for CsvSheet {
    fn describe(&self) -> String {
        self.path.display().to_string()
    }

    fn read_rows(&self) -> AppResult<Vec<Vec<Cell>>> {
        if !self.path.is_file() {
            return Err(AppError::SourceNotFound(self.describe()));
        }

        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_path(&self.path)
            .map_err(|e| AppError::SourceUnreadable(format!("{}: {}", self.describe(), e)))?;

        let mut rows = Vec::new();
        for record in reader.records() {
            let record = record
                .map_err(|e| AppError::SourceUnreadable(format!("{}: {}", self.describe(), e)))?;
            rows.push(record.iter().map(csv_cell).collect());
        }
        Ok(rows)
    }
}

/// Numeric-looking fields become numbers; everything else stays text
fn csv_cell(field: &str) -> Cell {
    let trimmed = field.trim();
    if trimmed.is_empty() {
        return Cell::Empty;
    }
    if looks_numeric(trimmed) {
        if let Ok(n) = trimmed.replace(',', "").parse::<f64>() {
            return Cell::Number(n);
        }
    }
    Cell::text(trimmed)
}

fn looks_numeric(field: &str) -> bool {
    let body = field.strip_prefix(|c: char| c == '-' || c == '+').unwrap_or(field);
    body.starts_with(|c: char| c.is_ascii_digit())
        && body.chars().all(|c| c.is_ascii_digit() || c == '.' || c == ',')
        && body.matches('.').count() <= 1
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_csv_cells() {
        assert_eq!(csv_cell(""), Cell::Empty);
        assert_eq!(csv_cell("1,200"), Cell::Number(1200.0));
        assert_eq!(csv_cell("-3.5"), Cell::Number(-3.5));
        assert_eq!(csv_cell("2024-02-01"), Cell::text("2024-02-01"));
        assert_eq!(csv_cell(" ACME "), Cell::text("ACME"));
        assert_eq!(csv_cell("1.2.3"), Cell::text("1.2.3"));
    }

    #[test]
    fn test_missing_sheet_is_source_not_found() {
        let workbook = Workbook::new("견적서").with_sheet("매출장", vec![]);
        assert!(matches!(workbook.read_rows(), Err(AppError::SourceNotFound(_))));
    }

    #[test]
    fn test_missing_csv_is_source_not_found() {
        let sheet = CsvSheet::new("/nonexistent/erp-import.csv");
        assert!(matches!(sheet.read_rows(), Err(AppError::SourceNotFound(_))));
    }
}
