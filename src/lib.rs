//! Core library for the enrollment-sync command line application.
//!
//! The library mirrors three related tables (students, courses and
//! enrollments) between a spreadsheet workbook and a local SQLite cache. The
//! modules keep responsibilities narrow: store adapters live under [`io`],
//! row representations inside [`model`], sheet/record conversion in
//! [`flatten`], the SQLite schema in [`cache`], read queries in [`query`],
//! and the session state machine with write-back under [`sync`].

pub mod cache;
pub mod config;
pub mod dates;
pub mod error;
pub mod flatten;
pub mod io;
pub mod model;
pub mod query;
pub mod sync;

pub use error::{Result, SyncError};
