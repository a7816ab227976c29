use std::path::Path;

use rust_xlsxwriter::{Format, Workbook, Worksheet};

use crate::error::Result;
use crate::flatten::{SheetTable, WorkbookData};
use crate::model::CellValue;

/// Writes the provided workbook data to the given path, replacing any file
/// already there.
pub fn write_workbook(path: &Path, workbook: &WorkbookData) -> Result<()> {
    let mut workbook_writer = Workbook::new();
    let header_format = Format::new().set_bold();

    for table in &workbook.tables {
        let worksheet = workbook_writer.add_worksheet();
        worksheet.set_name(&table.sheet_name)?;
        write_table(worksheet, table, &header_format)?;
    }

    workbook_writer.save(path)?;
    Ok(())
}

fn write_table(
    worksheet: &mut Worksheet,
    table: &SheetTable,
    header_format: &Format,
) -> Result<()> {
    if table.columns.is_empty() {
        return Ok(());
    }

    for (col_idx, header) in table.columns.iter().enumerate() {
        worksheet.write_string_with_format(0, col_idx as u16, header, header_format)?;
    }

    for (row_idx, row) in table.rows.iter().enumerate() {
        let sheet_row = (row_idx + 1) as u32;
        for (col_idx, cell) in row.iter().enumerate() {
            let sheet_col = col_idx as u16;
            match cell {
                CellValue::Null => {}
                CellValue::Integer(value) => {
                    worksheet.write_number(sheet_row, sheet_col, *value as f64)?;
                }
                CellValue::Real(value) => {
                    worksheet.write_number(sheet_row, sheet_col, *value)?;
                }
                CellValue::Text(value) => {
                    worksheet.write_string(sheet_row, sheet_col, value)?;
                }
            }
        }
    }

    let col_end = (table.columns.len() as u16).saturating_sub(1);
    let row_end = table.rows.len() as u32;
    worksheet.autofilter(0, 0, row_end, col_end)?;
    Ok(())
}
