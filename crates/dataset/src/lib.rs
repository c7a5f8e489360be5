//! CSV ingestion of raw order records and CSV export of results.

pub mod export;
pub mod loader;

pub use export::{write_ids, write_segments};
pub use loader::{load_records, load_records_file};
