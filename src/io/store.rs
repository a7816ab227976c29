//! Adapters for the remote tabular store.
//!
//! The store is a set of named, header-row tables that can only be read in
//! full or overwritten in full. [`WorkbookStore`] keeps them as worksheets
//! of an `.xlsx` file; [`MemoryStore`] keeps them in process.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use tracing::{debug, info, instrument};

use crate::error::{Result, SyncError};
use crate::flatten::{
    SheetTable, WorkbookData, records_to_table, sanitize_sheet_name, table_to_records,
};
use crate::io::{excel_read, excel_write};
use crate::model::Record;

/// Read/replace access to named tables.
pub trait TabularStore {
    /// Returns every record of the named table in sheet order.
    fn fetch_table(&self, name: &str) -> Result<Vec<Record>>;

    /// Clears the named table and rewrites it from `records`, taking the
    /// header from the first record's field names. Never merges.
    fn replace_table(&mut self, name: &str, records: &[Record]) -> Result<()>;
}

/// Tables stored as worksheets of a single workbook file.
#[derive(Debug, Clone)]
pub struct WorkbookStore {
    path: PathBuf,
}

impl WorkbookStore {
    /// Uses the workbook at `path`; the file is only touched on fetch or replace.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Writes a fresh workbook holding one sheet per `(name, records)` pair
    /// and returns a store over it.
    pub fn create<'a>(
        path: impl Into<PathBuf>,
        tables: impl IntoIterator<Item = (&'a str, &'a [Record])>,
    ) -> Result<Self> {
        let store = Self::new(path);
        let workbook = WorkbookData {
            tables: tables
                .into_iter()
                .map(|(name, records)| records_to_table(name, records))
                .collect(),
        };
        excel_write::write_workbook(&store.path, &workbook)?;
        Ok(store)
    }

    /// Location of the workbook file.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl TabularStore for WorkbookStore {
    #[instrument(level = "debug", skip(self), fields(workbook = %self.path.display()))]
    fn fetch_table(&self, name: &str) -> Result<Vec<Record>> {
        if !self.path.exists() {
            return Err(SyncError::MissingInput(self.path.clone()));
        }
        let table = excel_read::read_table(&self.path, &sanitize_sheet_name(name))?;
        let records = table_to_records(&table)?;
        debug!(record_count = records.len(), "worksheet read");
        Ok(records)
    }

    #[instrument(
        level = "info",
        skip(self, records),
        fields(workbook = %self.path.display(), record_count = records.len())
    )]
    fn replace_table(&mut self, name: &str, records: &[Record]) -> Result<()> {
        // The writer cannot patch a file in place, so every other sheet is
        // carried over and the whole workbook is rewritten.
        let mut workbook = if self.path.exists() {
            excel_read::read_workbook(&self.path)?
        } else {
            WorkbookData::default()
        };
        workbook.replace(records_to_table(name, records));
        excel_write::write_workbook(&self.path, &workbook)?;
        info!(sheet_count = workbook.tables.len(), "workbook rewritten");
        Ok(())
    }
}

/// Tables held in memory with the same header/row semantics as a workbook.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    tables: BTreeMap<String, SheetTable>,
}

impl MemoryStore {
    /// Creates a store without tables.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces a table, builder style.
    pub fn with_table(mut self, name: &str, records: &[Record]) -> Self {
        self.tables
            .insert(sanitize_sheet_name(name), records_to_table(name, records));
        self
    }

    /// Returns the raw sheet, including its header row.
    pub fn sheet(&self, name: &str) -> Option<&SheetTable> {
        self.tables.get(&sanitize_sheet_name(name))
    }
}

impl TabularStore for MemoryStore {
    fn fetch_table(&self, name: &str) -> Result<Vec<Record>> {
        let sheet = self
            .sheet(name)
            .ok_or_else(|| SyncError::MissingTable(name.to_string()))?;
        table_to_records(sheet)
    }

    fn replace_table(&mut self, name: &str, records: &[Record]) -> Result<()> {
        self.tables
            .insert(sanitize_sheet_name(name), records_to_table(name, records));
        Ok(())
    }
}
