//! Calendar-date normalisation for the enrollment `fecha` column.
//!
//! Dates reach the cache in whatever shape the spreadsheet held them: ISO
//! text, date-times, slash separated text, or raw spreadsheet serial numbers.
//! Before a table is written back every date is coerced to `YYYY-MM-DD`;
//! values that cannot be read as a date become blank instead of failing the
//! write-back.

use chrono::{DateTime, Days, NaiveDate, NaiveDateTime};
use tracing::warn;

use crate::model::{CellValue, DATE_COLUMN, Record};

/// Output format written back to the spreadsheet.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

const DATE_FORMATS: [&str; 5] = [DATE_FORMAT, "%Y/%m/%d", "%m/%d/%Y", "%d/%m/%Y", "%d-%m-%Y"];

const DATE_TIME_FORMATS: [&str; 13] = [
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
    "%Y/%m/%d %H:%M:%S",
    "%Y/%m/%d %H:%M",
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M",
    "%d/%m/%Y %H:%M:%S",
    "%d/%m/%Y %H:%M",
    "%d-%m-%Y %H:%M:%S",
];

/// Renders a date in the write-back format.
pub fn format_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

/// Parses date text, with or without a time of day. Slash separated dates
/// are read month first and fall back to day first when the month would be
/// out of range.
pub fn parse_date(text: &str) -> Option<NaiveDate> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }

    if let Some(date) = DATE_FORMATS
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(text, format).ok())
    {
        return Some(date);
    }

    if let Some(date_time) = DATE_TIME_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(text, format).ok())
    {
        return Some(date_time.date());
    }

    DateTime::parse_from_rfc3339(text)
        .ok()
        .map(|date_time| date_time.date_naive())
}

/// Converts a spreadsheet serial day number (days since 1899-12-30, with the
/// time of day as the fractional part) into a date.
pub fn serial_to_date(serial: f64) -> Option<NaiveDate> {
    if !serial.is_finite() || serial < 0.0 {
        return None;
    }
    let epoch = NaiveDate::from_ymd_opt(1899, 12, 30)?;
    epoch.checked_add_days(Days::new(serial.floor() as u64))
}

/// Reads any cell value as a date.
pub fn cell_to_date(value: &CellValue) -> Option<NaiveDate> {
    match value {
        CellValue::Null => None,
        CellValue::Integer(serial) => serial_to_date(*serial as f64),
        CellValue::Real(serial) => serial_to_date(*serial),
        CellValue::Text(text) => parse_date(text),
    }
}

/// Normalises a single cell to `YYYY-MM-DD` text, or null when it holds no
/// readable date.
pub fn normalize_date(value: &CellValue) -> CellValue {
    cell_to_date(value)
        .map(|date| CellValue::Text(format_date(date)))
        .unwrap_or(CellValue::Null)
}

/// Rewrites the date column of every record in place and returns how many
/// non-blank values had to be blanked because they were not dates.
pub fn normalize_date_column(records: &mut [Record]) -> usize {
    let mut coerced = 0;
    for (row_idx, record) in records.iter_mut().enumerate() {
        let Some(value) = record.get(DATE_COLUMN) else {
            continue;
        };

        let normalized = normalize_date(value);
        if normalized.is_null() && !is_blank(value) {
            warn!(row = row_idx, value = %value, "unparseable date coerced to blank");
            coerced += 1;
        }
        record.set(DATE_COLUMN, normalized);
    }
    coerced
}

fn is_blank(value: &CellValue) -> bool {
    match value {
        CellValue::Null => true,
        CellValue::Text(text) => text.trim().is_empty(),
        _ => false,
    }
}
