use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::SyncError;

/// Column holding enrollment dates; normalised to `YYYY-MM-DD` on write-back.
pub const DATE_COLUMN: &str = "fecha";

/// Represents a single cell value shared by the spreadsheet and the cache.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value")]
pub enum CellValue {
    /// Blank cell or SQL `NULL`.
    Null,
    /// Whole number.
    Integer(i64),
    /// Floating point number with a fractional part.
    Real(f64),
    /// Text literal.
    Text(String),
}

impl CellValue {
    /// Converts the value into the JSON representation used for listings.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            CellValue::Null => serde_json::Value::Null,
            CellValue::Integer(value) => serde_json::Value::from(*value),
            CellValue::Real(value) => serde_json::Number::from_f64(*value)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            CellValue::Text(value) => serde_json::Value::String(value.clone()),
        }
    }

    /// Returns the value as an integer when it holds one, accepting integral
    /// reals and numeric text the way spreadsheet ids often arrive.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            CellValue::Integer(value) => Some(*value),
            CellValue::Real(value) if value.fract() == 0.0 => Some(*value as i64),
            CellValue::Text(value) => value.trim().parse().ok(),
            _ => None,
        }
    }

    /// Whether the cell is blank.
    pub fn is_null(&self) -> bool {
        matches!(self, CellValue::Null)
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Null => Ok(()),
            CellValue::Integer(value) => write!(f, "{value}"),
            CellValue::Real(value) => write!(f, "{value}"),
            CellValue::Text(value) => f.write_str(value),
        }
    }
}

impl From<&str> for CellValue {
    fn from(value: &str) -> Self {
        CellValue::Text(value.to_string())
    }
}

impl From<String> for CellValue {
    fn from(value: String) -> Self {
        CellValue::Text(value)
    }
}

impl From<i64> for CellValue {
    fn from(value: i64) -> Self {
        CellValue::Integer(value)
    }
}

/// A table row as an ordered field name → value mapping. Field order is
/// significant: the first record of a table decides the header row written
/// back to the spreadsheet.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Record {
    fields: Vec<(String, CellValue)>,
}

impl Record {
    /// Creates a record without fields.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a record from `(field, value)` pairs, keeping their order.
    pub fn from_pairs<K, V>(pairs: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<CellValue>,
    {
        let mut record = Self::new();
        for (field, value) in pairs {
            record.set(field, value);
        }
        record
    }

    /// Appends a field without checking for duplicates.
    pub fn push(&mut self, field: impl Into<String>, value: impl Into<CellValue>) {
        self.fields.push((field.into(), value.into()));
    }

    /// Inserts or replaces a field value, keeping the original position of
    /// an existing field.
    pub fn set(&mut self, field: impl Into<String>, value: impl Into<CellValue>) {
        let field = field.into();
        let value = value.into();
        match self.fields.iter_mut().find(|(name, _)| *name == field) {
            Some((_, existing)) => *existing = value,
            None => self.fields.push((field, value)),
        }
    }

    /// Looks up a field value by name.
    pub fn get(&self, field: &str) -> Option<&CellValue> {
        self.fields
            .iter()
            .find(|(name, _)| name == field)
            .map(|(_, value)| value)
    }

    /// Field names in record order.
    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(name, _)| name.as_str())
    }

    /// `(field, value)` pairs in record order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &CellValue)> {
        self.fields.iter().map(|(name, value)| (name.as_str(), value))
    }

    /// Number of fields.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Whether the record has no fields.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Converts the record into a JSON object.
    pub fn to_json(&self) -> serde_json::Value {
        let object = self
            .fields
            .iter()
            .map(|(name, value)| (name.clone(), value.to_json()))
            .collect::<serde_json::Map<_, _>>();
        serde_json::Value::Object(object)
    }
}

/// The three tables mirrored between the spreadsheet and the cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TableName {
    /// Students.
    Alumno,
    /// Courses.
    Curso,
    /// Enrollments linking students to courses.
    Matricula,
}

impl TableName {
    /// Dashboard order: students, enrollments, courses.
    pub const ALL: [TableName; 3] = [TableName::Alumno, TableName::Matricula, TableName::Curso];

    /// Order in which the cache is populated so referenced rows come first.
    pub const LOAD_ORDER: [TableName; 3] =
        [TableName::Alumno, TableName::Curso, TableName::Matricula];

    /// Sheet and SQL table name.
    pub fn as_str(self) -> &'static str {
        match self {
            TableName::Alumno => "alumno",
            TableName::Curso => "curso",
            TableName::Matricula => "matricula",
        }
    }

    /// Column names in schema order; `id` always comes first.
    pub fn columns(self) -> &'static [&'static str] {
        match self {
            TableName::Alumno => &["id", "nombre", "apellido", "correo", "celular"],
            TableName::Curso => &["id", "curso"],
            TableName::Matricula => &["id", "id_alumno", DATE_COLUMN, "id_curso"],
        }
    }

    /// Whether the schema declares `column`.
    pub fn has_column(self, column: &str) -> bool {
        self.columns().iter().any(|name| *name == column)
    }
}

impl fmt::Display for TableName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TableName {
    type Err = SyncError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "alumno" => Ok(TableName::Alumno),
            "curso" => Ok(TableName::Curso),
            "matricula" => Ok(TableName::Matricula),
            _ => Err(SyncError::UnknownTable(value.to_string())),
        }
    }
}

/// A registered student.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Student {
    pub id: i64,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
}

/// Field values for a student that has not been assigned an id yet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewStudent {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: String,
}

/// A course offered for enrollment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Course {
    pub id: i64,
    pub name: Option<String>,
}

/// A student's enrollment in a course. Ids are not checked against the
/// referenced tables.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Enrollment {
    pub id: i64,
    pub student_id: Option<i64>,
    pub date: Option<String>,
    pub course_id: Option<i64>,
}

/// One student enrolled in a given course, as listed on the course screen.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CourseEnrollment {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub date: Option<String>,
}

/// One course a given student is enrolled in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StudentCourse {
    pub course_name: Option<String>,
    pub date: Option<String>,
}

/// Row counts shown on the dashboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DashboardTotals {
    pub students: i64,
    pub enrollments: i64,
    pub courses: i64,
}
