pub mod excel_read;
pub mod excel_write;
pub mod store;

pub use store::{MemoryStore, TabularStore, WorkbookStore};
