//! Synchronisation between the remote tabular store and the local cache.
//!
//! A [`Session`] owns one store and one cache. Starting it pulls a full
//! snapshot of the three tables and rebuilds the cache from scratch. Inserts
//! land in the cache first and are then pushed back by overwriting the whole
//! remote table with the cache's view of it; the last writer wins.

use std::fmt;

use chrono::NaiveDate;
use tracing::{error, info, instrument, warn};

use crate::cache::RelationalCache;
use crate::dates::{format_date, normalize_date_column};
use crate::error::{Result, SyncError};
use crate::io::TabularStore;
use crate::model::{NewStudent, Record, TableName};
use crate::query::QueryService;

/// Where a session is in its synchronisation cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Created, nothing fetched yet.
    Idle,
    /// Start requested; the cache no longer reflects the remote store.
    CacheStale,
    /// Snapshot fetched and loaded into the cache.
    CacheRebuilt,
    /// Queries and inserts are accepted.
    Serving,
    /// A row was committed locally but not yet pushed back.
    LocalMutation,
    /// The mutated table was pushed back.
    RemoteSynced,
    /// A fetch, rebuild or write-back failed; only a new start is accepted.
    Failed,
}

impl SessionState {
    /// Short name used in state errors.
    pub fn as_str(self) -> &'static str {
        match self {
            SessionState::Idle => "idle",
            SessionState::CacheStale => "cache-stale",
            SessionState::CacheRebuilt => "cache-rebuilt",
            SessionState::Serving => "serving",
            SessionState::LocalMutation => "local-mutation",
            SessionState::RemoteSynced => "remote-synced",
            SessionState::Failed => "failed",
        }
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Explicit session context handed to every screen or command.
#[derive(Debug)]
pub struct Session<S> {
    store: S,
    cache: RelationalCache,
    state: SessionState,
}

impl<S: TabularStore> Session<S> {
    /// Creates an idle session; call [`Session::start`] before querying.
    pub fn new(store: S, cache: RelationalCache) -> Self {
        Self {
            store,
            cache,
            state: SessionState::Idle,
        }
    }

    /// Current position in the synchronisation cycle.
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// The remote store this session pushes to.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// The local cache this session serves from.
    pub fn cache(&self) -> &RelationalCache {
        &self.cache
    }

    /// Fetches all three tables and rebuilds the cache from them. Accepted in
    /// any state; rows inserted locally but never pushed back are lost.
    #[instrument(level = "info", skip(self), fields(cache = %self.cache.path().display()))]
    pub fn start(&mut self) -> Result<()> {
        self.state = SessionState::CacheStale;

        let snapshot = match self.fetch_snapshot() {
            Ok(snapshot) => snapshot,
            Err(err) => {
                error!(error = %err, "remote fetch failed");
                self.state = SessionState::Failed;
                return Err(err);
            }
        };

        let [students, courses, enrollments] = &snapshot;
        if let Err(err) = self.cache.rebuild(students, courses, enrollments) {
            error!(error = %err, "cache rebuild failed");
            self.state = SessionState::Failed;
            return Err(err);
        }
        self.state = SessionState::CacheRebuilt;

        info!(
            students = students.len(),
            courses = courses.len(),
            enrollments = enrollments.len(),
            "session started"
        );
        self.state = SessionState::Serving;
        Ok(())
    }

    /// Query access to the cache; only while serving.
    pub fn queries(&self) -> Result<QueryService<'_>> {
        self.expect_serving()?;
        Ok(QueryService::new(&self.cache))
    }

    /// Inserts a student locally, then overwrites the remote `alumno` table.
    /// Returns the assigned id.
    #[instrument(level = "info", skip(self, student))]
    pub fn insert_student(&mut self, student: &NewStudent) -> Result<i64> {
        self.expect_serving()?;
        let row_id = self.cache.insert_student(student)?;
        self.state = SessionState::LocalMutation;
        info!(row_id, "student committed locally");
        self.write_back(TableName::Alumno, row_id)?;
        Ok(row_id)
    }

    /// Inserts an enrollment locally, then overwrites the remote `matricula`
    /// table. Returns the assigned id.
    #[instrument(level = "info", skip(self))]
    pub fn insert_enrollment(
        &mut self,
        student_id: i64,
        date: NaiveDate,
        course_id: i64,
    ) -> Result<i64> {
        self.expect_serving()?;
        let row_id = self
            .cache
            .insert_enrollment(student_id, &format_date(date), course_id)?;
        self.state = SessionState::LocalMutation;
        info!(row_id, "enrollment committed locally");
        self.write_back(TableName::Matricula, row_id)?;
        Ok(row_id)
    }

    fn fetch_snapshot(&self) -> Result<[Vec<Record>; 3]> {
        let fetch = |table: TableName| {
            self.store
                .fetch_table(table.as_str())
                .map_err(|err| SyncError::RemoteFetch {
                    table: table.to_string(),
                    reason: err.to_string(),
                })
        };
        Ok([
            fetch(TableName::Alumno)?,
            fetch(TableName::Curso)?,
            fetch(TableName::Matricula)?,
        ])
    }

    /// Pushes the full local table to the store. The local row stays
    /// committed whatever happens here.
    fn write_back(&mut self, table: TableName, row_id: i64) -> Result<()> {
        match self.push_table(table) {
            Ok(record_count) => {
                self.state = SessionState::RemoteSynced;
                info!(%table, record_count, "remote table overwritten");
                self.state = SessionState::Serving;
                Ok(())
            }
            Err(err) => {
                error!(%table, row_id, error = %err, "write-back failed; remote table is stale");
                self.state = SessionState::Failed;
                Err(SyncError::WriteBack {
                    table: table.to_string(),
                    row_id,
                    source: Box::new(err),
                })
            }
        }
    }

    fn push_table(&mut self, table: TableName) -> Result<usize> {
        let mut records = QueryService::new(&self.cache).fetch_all(table)?;
        let coerced = normalize_date_column(&mut records);
        if coerced > 0 {
            warn!(%table, coerced, "dates blanked during write-back");
        }
        self.store.replace_table(table.as_str(), &records)?;
        Ok(records.len())
    }

    fn expect_serving(&self) -> Result<()> {
        if self.state == SessionState::Serving {
            Ok(())
        } else {
            Err(SyncError::InvalidState {
                expected: SessionState::Serving.as_str(),
                actual: self.state.as_str(),
            })
        }
    }
}
