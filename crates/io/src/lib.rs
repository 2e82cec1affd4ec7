// Spreadsheet input and report output for provcheck

pub mod error;
pub mod json;
pub mod report;
pub mod xlsx;

pub use error::IoError;
pub use report::{comparison_file_name, write_comparison, write_reports};
pub use xlsx::{load_sources, read_workbook, read_workbook_bytes};
