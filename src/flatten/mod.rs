use crate::error::{Result, SyncError};
use crate::model::{CellValue, Record};

/// Longest sheet name the workbook format accepts.
const MAX_SHEET_NAME: usize = 31;

/// A table materialised as a worksheet: a header row followed by data rows.
#[derive(Debug, Clone, PartialEq)]
pub struct SheetTable {
    pub sheet_name: String,
    pub columns: Vec<String>,
    pub rows: Vec<Vec<CellValue>>,
}

impl SheetTable {
    /// Creates a sheet with neither header nor rows.
    pub fn empty(sheet_name: impl Into<String>) -> Self {
        Self {
            sheet_name: sheet_name.into(),
            columns: Vec::new(),
            rows: Vec::new(),
        }
    }
}

/// Represents every worksheet of a workbook, in tab order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WorkbookData {
    pub tables: Vec<SheetTable>,
}

impl WorkbookData {
    pub fn table(&self, sheet_name: &str) -> Option<&SheetTable> {
        self.tables
            .iter()
            .find(|table| table.sheet_name == sheet_name)
    }

    /// Swaps the sheet with the same name for `table`, or appends it as the
    /// last tab when no such sheet exists yet.
    pub fn replace(&mut self, table: SheetTable) {
        match self
            .tables
            .iter_mut()
            .find(|existing| existing.sheet_name == table.sheet_name)
        {
            Some(existing) => *existing = table,
            None => self.tables.push(table),
        }
    }
}

/// Flattens records into a sheet. The header is taken from the first
/// record's field names; later records are laid out under that header and
/// fields they lack become blank cells.
pub fn records_to_table(sheet_name: &str, records: &[Record]) -> SheetTable {
    let sheet_name = sanitize_sheet_name(sheet_name);
    let Some(first) = records.first() else {
        return SheetTable::empty(sheet_name);
    };

    let columns: Vec<String> = first.field_names().map(str::to_string).collect();
    let rows = records
        .iter()
        .map(|record| {
            columns
                .iter()
                .map(|column| record.get(column).cloned().unwrap_or(CellValue::Null))
                .collect()
        })
        .collect();

    SheetTable {
        sheet_name,
        columns,
        rows,
    }
}

/// Expands a sheet back into records keyed by the header row. Columns with a
/// blank header are dropped and rows without any value are skipped. A header
/// that names two columns is rejected.
pub fn table_to_records(table: &SheetTable) -> Result<Vec<Record>> {
    let mut named_columns: Vec<(usize, &str)> = Vec::with_capacity(table.columns.len());
    for (idx, header) in table.columns.iter().enumerate() {
        let header = header.trim();
        if header.is_empty() {
            continue;
        }
        if named_columns.iter().any(|(_, seen)| *seen == header) {
            return Err(SyncError::InvalidWorkbook(format!(
                "duplicate header '{header}' in sheet '{}'",
                table.sheet_name
            )));
        }
        named_columns.push((idx, header));
    }

    let mut records = Vec::with_capacity(table.rows.len());
    for row in &table.rows {
        if row.iter().all(CellValue::is_null) {
            continue;
        }

        let mut record = Record::new();
        for (idx, header) in &named_columns {
            let value = row.get(*idx).cloned().unwrap_or(CellValue::Null);
            record.push(*header, value);
        }
        records.push(record);
    }

    Ok(records)
}

/// Makes a string acceptable as a worksheet name.
pub fn sanitize_sheet_name(raw: &str) -> String {
    let invalid = [':', '\\', '/', '?', '*', '[', ']'];
    let mut sanitized: String = raw
        .chars()
        .map(|ch| {
            if invalid.contains(&ch) || ch.is_control() {
                '_'
            } else {
                ch
            }
        })
        .collect();

    sanitized = sanitized.trim().trim_matches('\'').to_string();
    if sanitized.is_empty() {
        sanitized = "Sheet".to_string();
    }

    if sanitized.chars().count() > MAX_SHEET_NAME {
        sanitized = sanitized.chars().take(MAX_SHEET_NAME).collect();
    }

    sanitized
}
