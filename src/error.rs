use std::path::PathBuf;

use thiserror::Error;

/// Convenient alias for fallible results returned throughout the crate.
pub type Result<T> = std::result::Result<T, SyncError>;

/// Error type covering the failures that can occur while mirroring the
/// spreadsheet tables into the local cache and pushing mutations back.
#[derive(Debug, Error)]
pub enum SyncError {
    /// Wrapper for IO failures such as reading or writing files.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Raised when JSON parsing or serialization fails.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Errors bubbled up from the Excel writer implementation.
    #[error("Excel write error: {0}")]
    ExcelWrite(#[from] rust_xlsxwriter::XlsxError),

    /// Errors bubbled up from the Excel reader implementation.
    #[error("Excel read error: {0}")]
    ExcelRead(#[from] calamine::XlsxError),

    /// Errors bubbled up from the local SQLite cache.
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Raised when a sheet does not follow the expected conventions.
    #[error("invalid workbook structure: {0}")]
    InvalidWorkbook(String),

    /// Raised when the remote store has no table with the requested name.
    #[error("remote table '{0}' does not exist")]
    MissingTable(String),

    /// Raised when a table snapshot cannot be pulled from the remote store.
    #[error("failed to fetch remote table '{table}': {reason}")]
    RemoteFetch { table: String, reason: String },

    /// Raised when the local cache schema cannot be recreated or populated.
    #[error("failed to rebuild local cache: {0}")]
    SchemaRebuild(String),

    /// Raised when the remote overwrite fails after the local insert was
    /// committed. The local row with `row_id` persists.
    #[error("row {row_id} committed locally but write-back of '{table}' failed: {source}")]
    WriteBack {
        table: String,
        row_id: i64,
        #[source]
        source: Box<SyncError>,
    },

    /// Raised when a caller names a table outside the fixed schema.
    #[error("unknown table '{0}'")]
    UnknownTable(String),

    /// Raised when a record carries a field the target table does not declare.
    #[error("table '{table}' has no column '{column}'")]
    UnknownColumn { table: String, column: String },

    /// Raised when a session operation is attempted in the wrong state.
    #[error("session is {actual}, expected {expected}")]
    InvalidState {
        expected: &'static str,
        actual: &'static str,
    },

    /// Raised when the user provides a path that does not exist.
    #[error("input file not found: {0}")]
    MissingInput(PathBuf),

    /// Raised when the tracing subscriber fails to initialise.
    #[error("failed to initialise logging: {0}")]
    Logging(String),
}
