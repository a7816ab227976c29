use std::path::PathBuf;

use chrono::{Local, NaiveDate};
use clap::{Parser, Subcommand};
use enrollment_sync::config::SyncConfig;
use enrollment_sync::io::WorkbookStore;
use enrollment_sync::model::{NewStudent, Record, TableName};
use enrollment_sync::sync::Session;
use enrollment_sync::{Result, SyncError};
use tracing_subscriber::EnvFilter;

fn main() {
    let cli = Cli::parse();
    if let Err(error) = init_logging().and_then(|()| run(cli)) {
        eprintln!("error: {error}");
        std::process::exit(1);
    }
}

fn init_logging() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|err| SyncError::Logging(err.to_string()))
}

fn run(cli: Cli) -> Result<()> {
    let config = match &cli.config {
        Some(path) => SyncConfig::load(path)?.with_overrides(cli.workbook, cli.cache),
        None => {
            let workbook = cli
                .workbook
                .ok_or_else(|| SyncError::MissingInput(PathBuf::from("--workbook")))?;
            SyncConfig::new(workbook).with_overrides(None, cli.cache)
        }
    };

    // Every command works on a freshly rebuilt cache.
    let mut session = config.open_session()?;
    session.start()?;

    match cli.command {
        Command::Totals => show_totals(&session),
        Command::List { table, json } => list_table(&session, table.parse()?, json),
        Command::Course { id } => show_course(&session, id),
        Command::Student { id } => show_student(&session, id),
        Command::Enroll {
            student,
            course,
            date,
        } => {
            let date = date.unwrap_or_else(|| Local::now().date_naive());
            let row_id = session.insert_enrollment(student, date, course)?;
            println!("enrollment {row_id} registered");
            Ok(())
        }
        Command::AddStudent {
            first,
            last,
            email,
            phone,
        } => {
            let student = NewStudent {
                first_name: first,
                last_name: last,
                email,
                phone,
            };
            let row_id = session.insert_student(&student)?;
            println!("student {row_id} added");
            Ok(())
        }
    }
}

fn show_totals(session: &Session<WorkbookStore>) -> Result<()> {
    let totals = session.queries()?.totals()?;
    println!("students\t{}", totals.students);
    println!("enrollments\t{}", totals.enrollments);
    println!("courses\t{}", totals.courses);
    Ok(())
}

fn list_table(session: &Session<WorkbookStore>, table: TableName, json: bool) -> Result<()> {
    let records = session.queries()?.fetch_all(table)?;
    if json {
        let values: Vec<serde_json::Value> = records.iter().map(Record::to_json).collect();
        println!("{}", serde_json::to_string_pretty(&values)?);
        return Ok(());
    }

    println!("{}", table.columns().join("\t"));
    for record in &records {
        let cells: Vec<String> = record.iter().map(|(_, value)| value.to_string()).collect();
        println!("{}", cells.join("\t"));
    }
    Ok(())
}

fn show_course(session: &Session<WorkbookStore>, course_id: i64) -> Result<()> {
    for row in session.queries()?.enrollments_for_course(course_id)? {
        println!(
            "{}\t{}\t{}\t{}\t{}",
            row.first_name.unwrap_or_default(),
            row.last_name.unwrap_or_default(),
            row.email.unwrap_or_default(),
            row.phone.unwrap_or_default(),
            row.date.unwrap_or_default(),
        );
    }
    Ok(())
}

fn show_student(session: &Session<WorkbookStore>, student_id: i64) -> Result<()> {
    for row in session.queries()?.courses_for_student(student_id)? {
        println!(
            "{}\t{}",
            row.course_name.unwrap_or_default(),
            row.date.unwrap_or_default(),
        );
    }
    Ok(())
}

#[derive(Parser)]
#[command(
    author,
    version,
    about = "Mirror student enrollments between a workbook and a local SQLite cache."
)]
struct Cli {
    /// JSON file with `workbook` and optional `cache` paths.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Workbook holding the alumno, curso and matricula sheets.
    #[arg(long, global = true, required_unless_present = "config")]
    workbook: Option<PathBuf>,

    /// SQLite cache file, recreated on every run.
    #[arg(long, global = true)]
    cache: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Show row counts for students, enrollments and courses.
    Totals,
    /// Print every row of a table.
    List {
        /// One of alumno, curso, matricula.
        table: String,
        /// Emit JSON instead of tab separated text.
        #[arg(long)]
        json: bool,
    },
    /// List the students enrolled in a course.
    Course { id: i64 },
    /// List the courses a student is enrolled in.
    Student { id: i64 },
    /// Enroll a student in a course and push the enrollment sheet back.
    Enroll {
        #[arg(long)]
        student: i64,
        #[arg(long)]
        course: i64,
        /// Enrollment date as YYYY-MM-DD; defaults to today.
        #[arg(long)]
        date: Option<NaiveDate>,
    },
    /// Register a student and push the student sheet back.
    AddStudent {
        #[arg(long)]
        first: String,
        #[arg(long)]
        last: String,
        #[arg(long)]
        email: String,
        #[arg(long)]
        phone: String,
    },
}
