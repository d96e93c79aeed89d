//! Error types for workbook ingestion.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while reading age-distribution workbooks.
#[derive(Debug, Error)]
pub enum IngestError {
    // === Workbook Errors ===
    /// Workbook could not be opened or parsed.
    #[error("failed to read workbook {path}: {message}")]
    Workbook { path: PathBuf, message: String },

    /// A referenced sheet does not exist in the workbook.
    #[error("sheet '{sheet}' not found in workbook")]
    SheetNotFound { sheet: String },

    // === Data Format Errors ===
    /// Required column not found in a sheet.
    #[error("required column '{column}' not found in sheet '{sheet}'")]
    MissingColumn { column: String, sheet: String },

    /// Cell value could not be interpreted as the column's type.
    #[error("invalid {column} value '{value}' in sheet '{sheet}' row {row}")]
    InvalidValue {
        sheet: String,
        row: usize,
        column: String,
        value: String,
    },

    // === Output Errors ===
    /// Failed to write output.
    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Failed to serialize distributions.
    #[error("failed to serialize age distributions: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type for ingestion operations.
pub type Result<T> = std::result::Result<T, IngestError>;
