use rusqlite::params;
use tracing::{debug, instrument};

use crate::cache::{RelationalCache, cell_column, integer_column, text_column};
use crate::error::Result;
use crate::model::{
    Course, CourseEnrollment, DashboardTotals, Enrollment, Record, Student, StudentCourse,
    TableName,
};

const ENROLLMENTS_FOR_COURSE: &str = "
    SELECT a.nombre, a.apellido, a.correo, a.celular, m.fecha
    FROM matricula m
    JOIN alumno a ON m.id_alumno = a.id
    WHERE m.id_curso = ?1
";

const COURSES_FOR_STUDENT: &str = "
    SELECT c.curso, m.fecha
    FROM matricula m
    JOIN curso c ON m.id_curso = c.id
    WHERE m.id_alumno = ?1
";

/// Read-only queries over the relational cache.
#[derive(Debug, Clone, Copy)]
pub struct QueryService<'a> {
    cache: &'a RelationalCache,
}

impl<'a> QueryService<'a> {
    /// Wraps the cache for querying.
    pub fn new(cache: &'a RelationalCache) -> Self {
        Self { cache }
    }

    /// Number of rows in the table.
    #[instrument(level = "debug", skip(self))]
    pub fn count_all(&self, table: TableName) -> Result<i64> {
        let conn = self.cache.connect()?;
        let count = conn.query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |row| {
            row.get(0)
        })?;
        Ok(count)
    }

    /// Row counts for the dashboard.
    pub fn totals(&self) -> Result<DashboardTotals> {
        Ok(DashboardTotals {
            students: self.count_all(TableName::Alumno)?,
            enrollments: self.count_all(TableName::Matricula)?,
            courses: self.count_all(TableName::Curso)?,
        })
    }

    /// Every row of the table, fields in schema order.
    #[instrument(level = "debug", skip(self))]
    pub fn fetch_all(&self, table: TableName) -> Result<Vec<Record>> {
        let conn = self.cache.connect()?;
        let mut statement = conn.prepare(&format!("SELECT * FROM {table} ORDER BY rowid"))?;
        let columns: Vec<String> = statement
            .column_names()
            .into_iter()
            .map(str::to_string)
            .collect();

        let records = statement
            .query_map([], |row| {
                let mut record = Record::new();
                for (idx, column) in columns.iter().enumerate() {
                    record.push(column.as_str(), cell_column(row, idx)?);
                }
                Ok(record)
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        debug!(record_count = records.len(), "table scanned");
        Ok(records)
    }

    /// Every student as a typed row.
    pub fn fetch_students(&self) -> Result<Vec<Student>> {
        let conn = self.cache.connect()?;
        let mut statement = conn.prepare(
            "SELECT id, nombre, apellido, correo, celular FROM alumno ORDER BY rowid",
        )?;
        let students = statement
            .query_map([], |row| {
                Ok(Student {
                    id: row.get(0)?,
                    first_name: text_column(row, 1)?,
                    last_name: text_column(row, 2)?,
                    email: text_column(row, 3)?,
                    phone: text_column(row, 4)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(students)
    }

    /// Every course as a typed row.
    pub fn fetch_courses(&self) -> Result<Vec<Course>> {
        let conn = self.cache.connect()?;
        let mut statement = conn.prepare("SELECT id, curso FROM curso ORDER BY rowid")?;
        let courses = statement
            .query_map([], |row| {
                Ok(Course {
                    id: row.get(0)?,
                    name: text_column(row, 1)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(courses)
    }

    /// Every enrollment as a typed row; ids that are not numbers read as absent.
    pub fn fetch_enrollments(&self) -> Result<Vec<Enrollment>> {
        let conn = self.cache.connect()?;
        let mut statement = conn.prepare(
            "SELECT id, id_alumno, fecha, id_curso FROM matricula ORDER BY rowid",
        )?;
        let enrollments = statement
            .query_map([], |row| {
                Ok(Enrollment {
                    id: row.get(0)?,
                    student_id: integer_column(row, 1)?,
                    date: text_column(row, 2)?,
                    course_id: integer_column(row, 3)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(enrollments)
    }

    /// Students enrolled in the course, with the enrollment date. Rows come
    /// back in whatever order SQLite produces the join; enrollments whose
    /// student is missing are left out.
    #[instrument(level = "debug", skip(self))]
    pub fn enrollments_for_course(&self, course_id: i64) -> Result<Vec<CourseEnrollment>> {
        let conn = self.cache.connect()?;
        let mut statement = conn.prepare(ENROLLMENTS_FOR_COURSE)?;
        let rows = statement
            .query_map(params![course_id], |row| {
                Ok(CourseEnrollment {
                    first_name: text_column(row, 0)?,
                    last_name: text_column(row, 1)?,
                    email: text_column(row, 2)?,
                    phone: text_column(row, 3)?,
                    date: text_column(row, 4)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    /// Courses the student is enrolled in, with the enrollment date.
    #[instrument(level = "debug", skip(self))]
    pub fn courses_for_student(&self, student_id: i64) -> Result<Vec<StudentCourse>> {
        let conn = self.cache.connect()?;
        let mut statement = conn.prepare(COURSES_FOR_STUDENT)?;
        let rows = statement
            .query_map(params![student_id], |row| {
                Ok(StudentCourse {
                    course_name: text_column(row, 0)?,
                    date: text_column(row, 1)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }
}
