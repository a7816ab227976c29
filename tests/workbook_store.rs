use chrono::NaiveDate;
use enrollment_sync::SyncError;
use enrollment_sync::cache::RelationalCache;
use enrollment_sync::flatten::{SheetTable, WorkbookData};
use enrollment_sync::io::{TabularStore, WorkbookStore, excel_read, excel_write};
use enrollment_sync::model::{CellValue, NewStudent, Record, TableName};
use enrollment_sync::sync::{Session, SessionState};
use rust_xlsxwriter::{ExcelDateTime, Format, Workbook};
use tempfile::tempdir;

fn students() -> Vec<Record> {
    vec![
        Record::from_pairs([
            ("id", CellValue::Integer(1)),
            ("nombre", "Ana".into()),
            ("apellido", "Rojas".into()),
            ("correo", "ana@example.com".into()),
            ("celular", CellValue::Integer(987654321)),
        ]),
        Record::from_pairs([
            ("id", CellValue::Integer(2)),
            ("nombre", "Luis".into()),
            ("apellido", "Vega".into()),
            ("correo", "luis@example.com".into()),
            ("celular", CellValue::Null),
        ]),
    ]
}

fn courses() -> Vec<Record> {
    vec![Record::from_pairs([
        ("id", CellValue::Integer(7)),
        ("curso", "Bases de datos".into()),
    ])]
}

fn enrollments() -> Vec<Record> {
    vec![Record::from_pairs([
        ("id", CellValue::Integer(1)),
        ("id_alumno", CellValue::Integer(1)),
        ("fecha", "2024-02-01".into()),
        ("id_curso", CellValue::Integer(7)),
    ])]
}

fn seeded_workbook(path: &std::path::Path) -> WorkbookStore {
    let students = students();
    let courses = courses();
    let enrollments = enrollments();
    WorkbookStore::create(
        path,
        [
            ("alumno", students.as_slice()),
            ("curso", courses.as_slice()),
            ("matricula", enrollments.as_slice()),
        ],
    )
    .expect("workbook written")
}

#[test]
fn fetch_reads_header_row_as_field_names() {
    let temp_dir = tempdir().expect("temporary directory");
    let store = seeded_workbook(&temp_dir.path().join("inscripciones.xlsx"));

    let restored = store.fetch_table("alumno").expect("students read");
    assert_eq!(restored, students());

    let names: Vec<&str> = restored[0].field_names().collect();
    assert_eq!(names, TableName::Alumno.columns());
}

#[test]
fn fetch_of_missing_sheet_fails() {
    let temp_dir = tempdir().expect("temporary directory");
    let store = seeded_workbook(&temp_dir.path().join("inscripciones.xlsx"));

    let err = store.fetch_table("profesor").expect_err("missing sheet");
    assert!(matches!(err, SyncError::MissingTable(name) if name == "profesor"));
}

#[test]
fn replace_overwrites_one_sheet_and_keeps_the_rest() {
    let temp_dir = tempdir().expect("temporary directory");
    let mut store = seeded_workbook(&temp_dir.path().join("inscripciones.xlsx"));

    let replacement = vec![
        Record::from_pairs([("id", CellValue::Integer(7)), ("curso", "Rust".into())]),
        Record::from_pairs([("id", CellValue::Integer(8)), ("curso", "SQL".into())]),
    ];
    store
        .replace_table("curso", &replacement)
        .expect("courses replaced");

    assert_eq!(store.fetch_table("curso").expect("courses read"), replacement);
    assert_eq!(store.fetch_table("alumno").expect("students read"), students());
    assert_eq!(
        store.fetch_table("matricula").expect("enrollments read"),
        enrollments()
    );

    let workbook = excel_read::read_workbook(store.path()).expect("workbook read");
    let sheet_names: Vec<&str> = workbook
        .tables
        .iter()
        .map(|table| table.sheet_name.as_str())
        .collect();
    assert_eq!(sheet_names, vec!["alumno", "curso", "matricula"]);
}

#[test]
fn replace_with_no_records_clears_the_sheet() {
    let temp_dir = tempdir().expect("temporary directory");
    let mut store = seeded_workbook(&temp_dir.path().join("inscripciones.xlsx"));

    store.replace_table("matricula", &[]).expect("sheet cleared");
    assert!(store.fetch_table("matricula").expect("read").is_empty());
}

#[test]
fn blank_rows_and_unnamed_columns_are_ignored() {
    let temp_dir = tempdir().expect("temporary directory");
    let path = temp_dir.path().join("loose.xlsx");
    let workbook = WorkbookData {
        tables: vec![SheetTable {
            sheet_name: "curso".into(),
            columns: vec!["id".into(), "curso".into(), String::new()],
            rows: vec![
                vec![
                    CellValue::Integer(1),
                    "Rust".into(),
                    "scratch note".into(),
                ],
                vec![CellValue::Null, CellValue::Null, CellValue::Null],
                vec![CellValue::Integer(2), "SQL".into(), CellValue::Null],
            ],
        }],
    };
    excel_write::write_workbook(&path, &workbook).expect("workbook written");

    let records = WorkbookStore::new(&path)
        .fetch_table("curso")
        .expect("courses read");
    assert_eq!(
        records,
        vec![
            Record::from_pairs([("id", CellValue::Integer(1)), ("curso", "Rust".into())]),
            Record::from_pairs([("id", CellValue::Integer(2)), ("curso", "SQL".into())]),
        ]
    );
}

#[test]
fn session_over_workbook_pushes_new_student() {
    let temp_dir = tempdir().expect("temporary directory");
    let store = seeded_workbook(&temp_dir.path().join("inscripciones.xlsx"));
    let cache = RelationalCache::new(temp_dir.path().join("inscripciones.db"));
    let mut session = Session::new(store, cache);
    session.start().expect("session started");

    let new_student = NewStudent {
        first_name: "Rosa".into(),
        last_name: "Paz".into(),
        email: "rosa@example.com".into(),
        phone: "900111222".into(),
    };
    let row_id = session.insert_student(&new_student).expect("student inserted");

    let remote = session.store().fetch_table("alumno").expect("students read");
    assert_eq!(remote.len(), 3);
    let pushed = remote.last().expect("pushed row");
    assert_eq!(pushed.get("id"), Some(&CellValue::Integer(row_id)));
    assert_eq!(pushed.get("nombre"), Some(&CellValue::Text("Rosa".into())));
    assert_eq!(
        pushed.get("celular"),
        Some(&CellValue::Text("900111222".into()))
    );

    // Numeric phone numbers come back as text once they pass through the cache.
    assert_eq!(
        remote[0].get("celular"),
        Some(&CellValue::Text("987654321".into()))
    );
    assert_eq!(remote[1].get("celular"), Some(&CellValue::Null));
}

/// Writes the three sheets by hand so `matricula.fecha` holds a real date
/// cell rather than text.
fn write_dated_workbook(path: &std::path::Path) {
    let mut workbook = Workbook::new();
    let date_format = Format::new().set_num_format("yyyy-mm-dd");
    let date = ExcelDateTime::from_ymd(2024, 3, 15).expect("valid date");

    let sheet = workbook.add_worksheet();
    sheet.set_name("alumno").expect("sheet named");
    for (col, header) in TableName::Alumno.columns().iter().enumerate() {
        sheet.write_string(0, col as u16, *header).expect("header written");
    }
    sheet.write_number(1, 0, 1.0).expect("id written");
    sheet.write_string(1, 1, "Ana").expect("name written");
    sheet.write_string(1, 2, "Rojas").expect("surname written");
    sheet.write_string(1, 3, "ana@example.com").expect("email written");
    sheet.write_string(1, 4, "987654321").expect("phone written");

    let sheet = workbook.add_worksheet();
    sheet.set_name("curso").expect("sheet named");
    sheet.write_string(0, 0, "id").expect("header written");
    sheet.write_string(0, 1, "curso").expect("header written");
    sheet.write_number(1, 0, 7.0).expect("id written");
    sheet.write_string(1, 1, "Rust").expect("course written");

    let sheet = workbook.add_worksheet();
    sheet.set_name("matricula").expect("sheet named");
    for (col, header) in TableName::Matricula.columns().iter().enumerate() {
        sheet.write_string(0, col as u16, *header).expect("header written");
    }
    sheet.write_number(1, 0, 1.0).expect("id written");
    sheet.write_number(1, 1, 1.0).expect("student written");
    sheet
        .write_datetime_with_format(1, 2, &date, &date_format)
        .expect("date written");
    sheet.write_number(1, 3, 7.0).expect("course written");

    workbook.save(path).expect("workbook saved");
}

#[test]
fn date_cells_read_as_iso_text_and_survive_write_back() {
    let temp_dir = tempdir().expect("temporary directory");
    let path = temp_dir.path().join("fechas.xlsx");
    write_dated_workbook(&path);

    let store = WorkbookStore::new(&path);
    let enrollments = store.fetch_table("matricula").expect("enrollments read");
    assert_eq!(
        enrollments[0].get("fecha"),
        Some(&CellValue::Text("2024-03-15".into()))
    );

    let cache = RelationalCache::new(temp_dir.path().join("fechas.db"));
    let mut session = Session::new(store, cache);
    session.start().expect("session started");
    let date = NaiveDate::from_ymd_opt(2024, 4, 1).expect("valid date");
    session
        .insert_enrollment(1, date, 7)
        .expect("enrollment inserted");

    let pushed = session
        .store()
        .fetch_table("matricula")
        .expect("enrollments read");
    let dates: Vec<_> = pushed.iter().map(|record| record.get("fecha")).collect();
    assert_eq!(
        dates,
        vec![
            Some(&CellValue::Text("2024-03-15".into())),
            Some(&CellValue::Text("2024-04-01".into())),
        ]
    );
}

#[test]
fn duplicate_headers_are_rejected() {
    let temp_dir = tempdir().expect("temporary directory");
    let path = temp_dir.path().join("duplicado.xlsx");
    let students = students();
    let enrollments = enrollments();
    let mut workbook = WorkbookData {
        tables: vec![
            enrollment_sync::flatten::records_to_table("alumno", &students),
            enrollment_sync::flatten::records_to_table("matricula", &enrollments),
        ],
    };
    workbook.replace(SheetTable {
        sheet_name: "curso".into(),
        columns: vec!["id".into(), "curso".into(), " curso ".into()],
        rows: vec![vec![CellValue::Integer(7), "Rust".into(), "SQL".into()]],
    });
    excel_write::write_workbook(&path, &workbook).expect("workbook written");

    let store = WorkbookStore::new(&path);
    let err = store.fetch_table("curso").expect_err("duplicate header");
    assert!(
        matches!(err, SyncError::InvalidWorkbook(ref reason) if reason.contains("duplicate header 'curso'"))
    );

    let cache = RelationalCache::new(temp_dir.path().join("duplicado.db"));
    let mut session = Session::new(store, cache);
    let err = session.start().expect_err("start fails");
    assert!(matches!(err, SyncError::RemoteFetch { ref table, .. } if table == "curso"));
    assert_eq!(session.state(), SessionState::Failed);
}
