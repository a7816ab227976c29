use std::path::Path;

use calamine::{DataType, Reader, Xlsx, open_workbook};

use crate::dates::{format_date, serial_to_date};
use crate::error::{Result, SyncError};
use crate::flatten::{SheetTable, WorkbookData};
use crate::model::CellValue;

/// Reads every worksheet of the workbook, preserving tab order.
pub fn read_workbook(path: &Path) -> Result<WorkbookData> {
    let mut workbook: Xlsx<_> = open_workbook(path)?;
    let sheet_names: Vec<String> = workbook.sheet_names().iter().cloned().collect();

    let mut tables = Vec::with_capacity(sheet_names.len());
    for sheet_name in sheet_names {
        let range = read_required_sheet(&mut workbook, &sheet_name)?;
        tables.push(range_to_table(&sheet_name, &range));
    }

    Ok(WorkbookData { tables })
}

/// Reads a single worksheet. A missing sheet is reported as
/// [`SyncError::MissingTable`].
pub fn read_table(path: &Path, sheet_name: &str) -> Result<SheetTable> {
    let mut workbook: Xlsx<_> = open_workbook(path)?;
    let range = read_required_sheet(&mut workbook, sheet_name)?;
    Ok(range_to_table(sheet_name, &range))
}

fn read_required_sheet<R: std::io::Read + std::io::Seek>(
    workbook: &mut Xlsx<R>,
    name: &str,
) -> Result<calamine::Range<DataType>> {
    let range_result = workbook
        .worksheet_range(name)
        .ok_or_else(|| SyncError::MissingTable(name.to_string()))?;
    let range = range_result.map_err(SyncError::from)?;
    Ok(range)
}

fn range_to_table(sheet_name: &str, range: &calamine::Range<DataType>) -> SheetTable {
    let columns: Vec<String> = match range.rows().next() {
        Some(first_row) => first_row
            .iter()
            .map(|cell| cell_to_value(cell).to_string())
            .collect(),
        None => Vec::new(),
    };

    if columns.is_empty() {
        return SheetTable::empty(sheet_name);
    }

    let rows = range
        .rows()
        .skip(1)
        .map(|row| row.iter().map(cell_to_value).collect())
        .collect();

    SheetTable {
        sheet_name: sheet_name.to_string(),
        columns,
        rows,
    }
}

/// Converts a worksheet cell, numericising integral floats the way the
/// spreadsheet service reports record values.
fn cell_to_value(cell: &DataType) -> CellValue {
    match cell {
        DataType::Empty | DataType::Error(_) => CellValue::Null,
        DataType::String(value) if value.trim().is_empty() => CellValue::Null,
        DataType::String(value) => CellValue::Text(value.clone()),
        DataType::Int(value) => CellValue::Integer(*value),
        DataType::Float(value) => float_to_value(*value),
        DataType::Bool(value) => CellValue::Text(value.to_string()),
        DataType::DateTime(serial) => serial_to_date(*serial)
            .map(|date| CellValue::Text(format_date(date)))
            .unwrap_or(CellValue::Null),
        other => CellValue::Text(other.to_string()),
    }
}

fn float_to_value(value: f64) -> CellValue {
    if value.fract() == 0.0 && value.abs() < i64::MAX as f64 {
        CellValue::Integer(value as i64)
    } else {
        CellValue::Real(value)
    }
}
