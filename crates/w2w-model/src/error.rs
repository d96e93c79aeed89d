//! Error types for the project data model.

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while reading prepared project metadata.
#[derive(Debug, Error)]
pub enum ModelError {
    /// Project root does not exist or is not a directory.
    #[error("prepared project not found: {path}")]
    ProjectNotFound { path: PathBuf },

    /// No configuration file in the project declares a simulation window.
    #[error("no LocalDomain start_date/end_date found under {path}")]
    MissingSimulationWindow { path: PathBuf },

    /// A simulation date could not be parsed into a year.
    #[error("invalid simulation date '{value}' in {path}")]
    InvalidDate { value: String, path: PathBuf },

    /// Failed to read a file or directory.
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Failed to parse a JSON configuration file.
    #[error("failed to parse JSON {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Result type for model operations.
pub type Result<T> = std::result::Result<T, ModelError>;
