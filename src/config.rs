use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::cache::{DEFAULT_CACHE_FILE, RelationalCache};
use crate::error::{Result, SyncError};
use crate::io::WorkbookStore;
use crate::sync::Session;

/// Locations of the spreadsheet store and the local cache.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SyncConfig {
    /// Workbook acting as the remote tabular store.
    pub workbook: PathBuf,
    /// SQLite file rebuilt at every session start.
    #[serde(default = "default_cache")]
    pub cache: PathBuf,
}

fn default_cache() -> PathBuf {
    PathBuf::from(DEFAULT_CACHE_FILE)
}

impl SyncConfig {
    /// Uses `workbook` with the default cache location.
    pub fn new(workbook: impl Into<PathBuf>) -> Self {
        Self {
            workbook: workbook.into(),
            cache: default_cache(),
        }
    }

    /// Loads the configuration from a JSON file.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(SyncError::MissingInput(path.to_path_buf()));
        }
        let data = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&data)?)
    }

    /// Applies command line overrides on top of the loaded values.
    pub fn with_overrides(mut self, workbook: Option<PathBuf>, cache: Option<PathBuf>) -> Self {
        if let Some(workbook) = workbook {
            self.workbook = workbook;
        }
        if let Some(cache) = cache {
            self.cache = cache;
        }
        self
    }

    /// Checks the workbook exists and opens an unstarted session over it.
    pub fn open_session(&self) -> Result<Session<WorkbookStore>> {
        if !self.workbook.exists() {
            return Err(SyncError::MissingInput(self.workbook.clone()));
        }
        Ok(Session::new(
            WorkbookStore::new(&self.workbook),
            RelationalCache::new(&self.cache),
        ))
    }
}
