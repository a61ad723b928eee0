//! Date cells in the shapes found in historical sheets

use chrono::{Duration, NaiveDate};

use super::cell::Cell;

/// Largest serial Excel can display (9999-12-31)
const MAX_EXCEL_SERIAL: f64 = 2_958_465.0;

/// Parse a date cell.
///
/// Tried in order: native dates, `YYYY-MM-DD` text with `/` or `.` also
/// accepted as separators and any time part dropped, Korean dates such as
/// `2024년 2월 1일`, and Excel 1900-system serial numbers (as numbers or
/// numeric text).
pub fn parse_date(cell: &Cell) -> Option<NaiveDate> {
    match cell {
        Cell::Empty => None,
        Cell::Date(d) => Some(*d),
        Cell::Number(n) => excel_serial_to_date(*n),
        Cell::Text(s) => parse_date_text(s),
    }
}

fn parse_date_text(text: &str) -> Option<NaiveDate> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return None;
    }

    parse_separated(trimmed)
        .or_else(|| parse_korean(trimmed))
        .or_else(|| {
            trimmed
                .parse::<f64>()
                .ok()
                .filter(|n| n.is_finite())
                .and_then(excel_serial_to_date)
        })
}

/// `2024-02-01`, `2024/2/1`, `2024.02.01 13:45`, `2024-02-01T09:00:00`
fn parse_separated(text: &str) -> Option<NaiveDate> {
    let date_part = text.split(|c: char| c == ' ' || c == 'T').next()?;
    let normalized = date_part.replace(|c: char| c == '/' || c == '.', "-");
    let mut parts = normalized.trim_end_matches('-').split('-');

    let year = parts.next()?;
    let month = parts.next()?;
    let day = parts.next()?;
    if parts.next().is_some() || year.len() != 4 {
        return None;
    }

    NaiveDate::from_ymd_opt(
        year.parse().ok()?,
        month.parse().ok()?,
        day.parse().ok()?,
    )
}

/// `2024년 2월 1일`, spaces optional
fn parse_korean(text: &str) -> Option<NaiveDate> {
    let compact: String = text.chars().filter(|c| !c.is_whitespace()).collect();
    let (year, rest) = compact.split_once('년')?;
    let (month, rest) = rest.split_once('월')?;
    let day = rest.strip_suffix('일')?;

    if year.len() != 4 || !(1..=2).contains(&month.len()) || !(1..=2).contains(&day.len()) {
        return None;
    }

    NaiveDate::from_ymd_opt(year.parse().ok()?, month.parse().ok()?, day.parse().ok()?)
}

/// Convert an Excel 1900-system serial to a date.
///
/// Serial 1 is 1900-01-01. Excel counts a 1900-02-29 that never existed, so
/// one day is taken off serials after 59. The time-of-day fraction is
/// dropped; serials below 1 are not dates.
pub fn excel_serial_to_date(serial: f64) -> Option<NaiveDate> {
    if !serial.is_finite() || serial < 1.0 || serial > MAX_EXCEL_SERIAL {
        return None;
    }

    let mut days = serial.trunc() as i64;
    if days > 59 {
        days -= 1;
    }

    let epoch = NaiveDate::from_ymd_opt(1899, 12, 31)?;
    epoch.checked_add_signed(Duration::days(days))
}
