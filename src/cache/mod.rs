//! SQLite-backed relational cache of the spreadsheet tables.
//!
//! The cache is disposable: [`RelationalCache::rebuild`] drops and recreates
//! the whole schema from a snapshot of the remote store. Every operation
//! opens its own connection and closes it when the operation returns, on
//! both the success and the error path.
//!
//! Foreign keys are declared for documentation only. SQLite leaves them
//! unenforced unless `PRAGMA foreign_keys` is switched on, and it never is
//! here, so enrollments pointing at missing students or courses load fine.

use std::path::{Path, PathBuf};

use rusqlite::types::{Value, ValueRef};
use rusqlite::{Connection, Row, params, params_from_iter};
use tracing::{debug, info, instrument};

use crate::error::{Result, SyncError};
use crate::model::{CellValue, NewStudent, Record, TableName};

/// Default location of the cache database.
pub const DEFAULT_CACHE_FILE: &str = "inscripciones.db";

const DROP_SCHEMA: &str = "
    DROP TABLE IF EXISTS matricula;
    DROP TABLE IF EXISTS alumno;
    DROP TABLE IF EXISTS curso;
";

const CREATE_SCHEMA: &str = "
    CREATE TABLE alumno (
        id INTEGER PRIMARY KEY,
        nombre TEXT,
        apellido TEXT,
        correo TEXT,
        celular TEXT
    );

    CREATE TABLE curso (
        id INTEGER PRIMARY KEY,
        curso TEXT
    );

    CREATE TABLE matricula (
        id INTEGER PRIMARY KEY,
        id_alumno INTEGER,
        fecha TEXT,
        id_curso INTEGER,
        FOREIGN KEY(id_alumno) REFERENCES alumno(id),
        FOREIGN KEY(id_curso) REFERENCES curso(id)
    );
";

/// Handle on the cache database file.
#[derive(Debug, Clone)]
pub struct RelationalCache {
    path: PathBuf,
}

impl RelationalCache {
    /// Points the cache at a database file; nothing is opened yet.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Location of the database file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Opens a fresh connection scoped to the caller.
    pub(crate) fn connect(&self) -> Result<Connection> {
        Ok(Connection::open(&self.path)?)
    }

    /// Drops and recreates the three tables, then appends the snapshot rows
    /// in the order students, courses, enrollments. Any failure is reported
    /// as [`SyncError::SchemaRebuild`] and leaves the previous cache intact.
    #[instrument(
        level = "info",
        skip_all,
        fields(
            cache = %self.path.display(),
            students = students.len(),
            courses = courses.len(),
            enrollments = enrollments.len()
        )
    )]
    pub fn rebuild(
        &self,
        students: &[Record],
        courses: &[Record],
        enrollments: &[Record],
    ) -> Result<()> {
        self.rebuild_tables(students, courses, enrollments)
            .map_err(|err| SyncError::SchemaRebuild(err.to_string()))?;
        info!("local cache rebuilt");
        Ok(())
    }

    fn rebuild_tables(
        &self,
        students: &[Record],
        courses: &[Record],
        enrollments: &[Record],
    ) -> Result<()> {
        let mut conn = self.connect()?;
        let tx = conn.transaction()?;
        tx.execute_batch(DROP_SCHEMA)?;
        tx.execute_batch(CREATE_SCHEMA)?;

        let snapshot = [
            (TableName::Alumno, students),
            (TableName::Curso, courses),
            (TableName::Matricula, enrollments),
        ];
        for (table, records) in snapshot {
            let inserted = append_records(&tx, table, records)?;
            debug!(%table, inserted, "table populated");
        }

        tx.commit()?;
        Ok(())
    }

    /// Inserts a student and returns the id SQLite assigned to it.
    #[instrument(level = "debug", skip(self, student), fields(cache = %self.path.display()))]
    pub fn insert_student(&self, student: &NewStudent) -> Result<i64> {
        let conn = self.connect()?;
        conn.execute(
            "INSERT INTO alumno (nombre, apellido, correo, celular) VALUES (?1, ?2, ?3, ?4)",
            params![
                student.first_name,
                student.last_name,
                student.email,
                student.phone
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }

    /// Inserts an enrollment and returns the id SQLite assigned to it. The
    /// referenced student and course are not checked.
    #[instrument(level = "debug", skip(self), fields(cache = %self.path.display()))]
    pub fn insert_enrollment(&self, student_id: i64, date: &str, course_id: i64) -> Result<i64> {
        let conn = self.connect()?;
        conn.execute(
            "INSERT INTO matricula (id_alumno, fecha, id_curso) VALUES (?1, ?2, ?3)",
            params![student_id, date, course_id],
        )?;
        Ok(conn.last_insert_rowid())
    }
}

fn append_records(conn: &Connection, table: TableName, records: &[Record]) -> Result<usize> {
    for record in records {
        if let Some(column) = record.field_names().find(|name| !table.has_column(name)) {
            return Err(SyncError::UnknownColumn {
                table: table.to_string(),
                column: column.to_string(),
            });
        }

        if record.is_empty() {
            conn.execute(&format!("INSERT INTO {table} DEFAULT VALUES"), [])?;
            continue;
        }

        let columns = record.field_names().collect::<Vec<_>>().join(", ");
        let placeholders = (1..=record.len())
            .map(|idx| format!("?{idx}"))
            .collect::<Vec<_>>()
            .join(", ");
        let sql = format!("INSERT INTO {table} ({columns}) VALUES ({placeholders})");

        let mut statement = conn.prepare_cached(&sql)?;
        statement.execute(params_from_iter(record.iter().map(|(_, value)| Value::from(value))))?;
    }

    Ok(records.len())
}

impl From<&CellValue> for Value {
    fn from(value: &CellValue) -> Self {
        match value {
            CellValue::Null => Value::Null,
            CellValue::Integer(value) => Value::Integer(*value),
            CellValue::Real(value) => Value::Real(*value),
            CellValue::Text(value) => Value::Text(value.clone()),
        }
    }
}

impl From<ValueRef<'_>> for CellValue {
    fn from(value: ValueRef<'_>) -> Self {
        match value {
            ValueRef::Null => CellValue::Null,
            ValueRef::Integer(value) => CellValue::Integer(value),
            ValueRef::Real(value) => CellValue::Real(value),
            ValueRef::Text(bytes) | ValueRef::Blob(bytes) => {
                CellValue::Text(String::from_utf8_lossy(bytes).into_owned())
            }
        }
    }
}

/// Reads a column of any storage class as a cell value.
pub(crate) fn cell_column(row: &Row<'_>, idx: usize) -> rusqlite::Result<CellValue> {
    Ok(CellValue::from(row.get_ref(idx)?))
}

/// Reads a column as optional text, whatever its storage class.
pub(crate) fn text_column(row: &Row<'_>, idx: usize) -> rusqlite::Result<Option<String>> {
    Ok(match cell_column(row, idx)? {
        CellValue::Null => None,
        other => Some(other.to_string()),
    })
}

/// Reads a column as an optional integer; non-numeric values read as absent.
pub(crate) fn integer_column(row: &Row<'_>, idx: usize) -> rusqlite::Result<Option<i64>> {
    Ok(cell_column(row, idx)?.as_i64())
}
