use chrono::NaiveDate;
use enrollment_sync::dates::{normalize_date, normalize_date_column, parse_date, serial_to_date};
use enrollment_sync::model::{CellValue, Record};

fn ymd(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).expect("valid date")
}

#[test]
fn parses_common_date_shapes() {
    assert_eq!(parse_date("2024-03-15"), Some(ymd(2024, 3, 15)));
    assert_eq!(parse_date("2024/03/15"), Some(ymd(2024, 3, 15)));
    assert_eq!(parse_date("03/15/2024"), Some(ymd(2024, 3, 15)));
    assert_eq!(parse_date("15/03/2024"), Some(ymd(2024, 3, 15)));
    assert_eq!(parse_date("2024-03-15T10:20:30"), Some(ymd(2024, 3, 15)));
    assert_eq!(parse_date("2024-03-15T10:20:30-05:00"), Some(ymd(2024, 3, 15)));
    assert_eq!(parse_date(" 2024-03-15 "), Some(ymd(2024, 3, 15)));
    assert_eq!(parse_date("2024-03-15 10:20"), Some(ymd(2024, 3, 15)));
    assert_eq!(parse_date("2024/03/15 10:20:00"), Some(ymd(2024, 3, 15)));
    assert_eq!(parse_date("3/15/2024 10:20:00"), Some(ymd(2024, 3, 15)));
    assert_eq!(parse_date("3/15/2024 10:20"), Some(ymd(2024, 3, 15)));
    assert_eq!(parse_date("15/03/2024 10:20:00"), Some(ymd(2024, 3, 15)));
    assert_eq!(parse_date("15/03/2024 10:20"), Some(ymd(2024, 3, 15)));
    assert_eq!(parse_date("mañana"), None);
    assert_eq!(parse_date(""), None);
}

#[test]
fn spreadsheet_serials_count_from_1899_12_30() {
    assert_eq!(serial_to_date(45366.0), Some(ymd(2024, 3, 15)));
    assert_eq!(serial_to_date(45366.75), Some(ymd(2024, 3, 15)));
    assert_eq!(serial_to_date(-1.0), None);
    assert_eq!(
        normalize_date(&CellValue::Integer(45366)),
        CellValue::Text("2024-03-15".into())
    );
}

#[test]
fn column_normalization_blanks_unreadable_values() {
    let mut records = vec![
        Record::from_pairs([("id", CellValue::Integer(1)), ("fecha", "15/03/2024".into())]),
        Record::from_pairs([("id", CellValue::Integer(2)), ("fecha", "pronto".into())]),
        Record::from_pairs([("id", CellValue::Integer(3)), ("fecha", CellValue::Null)]),
        Record::from_pairs([
            ("id", CellValue::Integer(4)),
            ("fecha", "3/15/2024 10:20:00".into()),
        ]),
        Record::from_pairs([("id", CellValue::Integer(5))]),
    ];

    let coerced = normalize_date_column(&mut records);
    assert_eq!(coerced, 1);
    assert_eq!(
        records[0].get("fecha"),
        Some(&CellValue::Text("2024-03-15".into()))
    );
    assert_eq!(records[1].get("fecha"), Some(&CellValue::Null));
    assert_eq!(records[2].get("fecha"), Some(&CellValue::Null));
    assert_eq!(
        records[3].get("fecha"),
        Some(&CellValue::Text("2024-03-15".into()))
    );
    assert_eq!(records[4].get("fecha"), None);
}
