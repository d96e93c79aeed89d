//! Error types for input-database extraction.

use std::path::PathBuf;

use polars::prelude::PolarsError;
use thiserror::Error;

/// Errors that can occur while extracting tables or locating databases.
#[derive(Debug, Error)]
pub enum ExtractError {
    // === Database Errors ===
    /// Input database could not be opened.
    #[error("failed to open input database {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },

    /// A query failed, usually because the schema is not the expected one.
    #[error("malformed input database schema ({query}): {source}")]
    Schema {
        query: &'static str,
        #[source]
        source: rusqlite::Error,
    },

    // === Resource Location Errors ===
    /// No archive index database could be found.
    #[error("failed to locate AIDB for project {project}")]
    AidbNotFound { project: PathBuf },

    // === Frame Errors ===
    /// Building or reshaping a table frame failed.
    #[error("failed to build {table} frame: {source}")]
    Frame {
        table: &'static str,
        #[source]
        source: PolarsError,
    },

    // === Output Errors ===
    /// Failed to write a CSV file.
    #[error("failed to write CSV {path}: {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: PolarsError,
    },

    /// Filesystem operation failed.
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Result type for extraction operations.
pub type Result<T> = std::result::Result<T, ExtractError>;
