//! Raw spreadsheet cells

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// One cell of a raw sheet row. Rows are sparse: a missing cell and an
/// empty one read the same.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Cell {
    Empty,
    Number(f64),
    Text(String),
    Date(NaiveDate),
}

pub(crate) static EMPTY: Cell = Cell::Empty;

impl Cell {
    pub fn text(value: impl Into<String>) -> Self {
        Cell::Text(value.into())
    }

    /// Trimmed content when the cell holds non-blank text
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Cell::Text(s) if !s.trim().is_empty() => Some(s.trim()),
            _ => None,
        }
    }

    /// Trimmed content of any non-blank cell rendered as text
    pub fn display(&self) -> Option<String> {
        match self {
            Cell::Empty => None,
            Cell::Text(s) => Some(s.trim().to_string()).filter(|s| !s.is_empty()),
            Cell::Number(n) => Some(format_number(*n)),
            Cell::Date(d) => Some(d.format("%Y-%m-%d").to_string()),
        }
    }

    /// Integer value of the cell, truncating fractions.
    ///
    /// Text is read from its leading digits after an optional sign, with
    /// thousands separators and a leading `₩` ignored, so `"1,200원"` reads
    /// as 1200 and `"abc"` as nothing.
    pub fn parse_int(&self) -> Option<i64> {
        match self {
            Cell::Number(n) if n.is_finite() => Some(n.trunc() as i64),
            Cell::Text(s) => parse_leading_int(s),
            _ => None,
        }
    }

    /// Integer value, with zero and unreadable cells replaced by `default`
    pub fn int_or(&self, default: i64) -> i64 {
        self.parse_int().filter(|v| *v != 0).unwrap_or(default)
    }
}

impl From<&str> for Cell {
    fn from(value: &str) -> Self {
        Cell::Text(value.to_string())
    }
}

impl From<f64> for Cell {
    fn from(value: f64) -> Self {
        Cell::Number(value)
    }
}

impl From<i64> for Cell {
    fn from(value: i64) -> Self {
        Cell::Number(value as f64)
    }
}

impl From<NaiveDate> for Cell {
    fn from(value: NaiveDate) -> Self {
        Cell::Date(value)
    }
}

fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        n.to_string()
    }
}

fn parse_leading_int(text: &str) -> Option<i64> {
    let mut chars = text.trim().trim_start_matches('₩').chars().peekable();
    let negative = match chars.peek() {
        Some('-') => {
            chars.next();
            true
        }
        Some('+') => {
            chars.next();
            false
        }
        _ => false,
    };

    let mut value: i64 = 0;
    let mut seen_digit = false;
    for c in chars {
        match c {
            '0'..='9' => {
                seen_digit = true;
                value = value
                    .saturating_mul(10)
                    .saturating_add(i64::from(c as u8 - b'0'));
            }
            ',' if seen_digit => continue,
            _ => break,
        }
    }

    if !seen_digit {
        return None;
    }
    Some(if negative { -value } else { value })
}
