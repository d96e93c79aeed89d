//! Workbook ingestion for rollback preparation.

pub mod age_distribution;
pub mod error;
pub mod workbook;

pub use age_distribution::{
    AgeDistributionBuilder, MIN_AGE_COLUMN, PROPORTION_COLUMN, ROOT_SHEET, write_distribution_json,
};
pub use error::{IngestError, Result};
pub use workbook::{CellValue, ExcelWorkbook, MemoryWorkbook, SheetTable, WorkbookSource};
