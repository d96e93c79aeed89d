//! Error types for project orchestration.

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

use w2w_extract::ExtractError;
use w2w_ingest::IngestError;
use w2w_model::ModelError;

/// Ordered stages of a project merge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum MergeStage {
    Merge,
    Tile,
    Patch,
    Configure,
}

impl MergeStage {
    pub const ALL: [MergeStage; 4] = [Self::Merge, Self::Tile, Self::Patch, Self::Configure];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Merge => "merge",
            Self::Tile => "tile",
            Self::Patch => "patch",
            Self::Configure => "configure",
        }
    }

}

impl fmt::Display for MergeStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Ordered external stages of single-project preparation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PrepareStage {
    Tile,
    InputDatabase,
    Configure,
}

impl PrepareStage {
    pub const ALL: [PrepareStage; 3] = [Self::Tile, Self::InputDatabase, Self::Configure];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Tile => "tile",
            Self::InputDatabase => "input database",
            Self::Configure => "configure",
        }
    }
}

impl fmt::Display for PrepareStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Invalid or incomplete configuration, detected before any side effect.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read configuration {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse configuration {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("missing required configuration key '{key}'")]
    MissingKey { key: &'static str },

    #[error("merge requires at least two projects, got {count}")]
    TooFewProjects { count: usize },
}

/// Failure reported by an external collaborator.
#[derive(Debug, Error)]
pub enum CollaboratorError {
    #[error("failed to launch {program}: {source}")]
    Launch {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{program} exited with {status}")]
    Failed { program: String, status: String },

    #[error("expected output is missing: {path}")]
    MissingArtifact { path: PathBuf },

    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{0}")]
    Message(String),
}

/// Errors surfaced by pipeline operations.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Project(#[from] ModelError),

    #[error(transparent)]
    Ingest(#[from] IngestError),

    #[error(transparent)]
    Extract(#[from] ExtractError),

    /// A merge stage failed; later stages were not run.
    #[error("{stage} stage failed: {source}")]
    Stage {
        stage: MergeStage,
        #[source]
        source: CollaboratorError,
    },

    /// A preparation stage failed; later stages were not run.
    #[error("{stage} stage failed: {source}")]
    Prepare {
        stage: PrepareStage,
        #[source]
        source: CollaboratorError,
    },

    #[error("spatial rollback failed: {0}")]
    Rollback(#[source] CollaboratorError),

    #[error("failed to build CBM defaults database: {0}")]
    Defaults(#[source] CollaboratorError),

    #[error("failed to convert spatial layers: {0}")]
    Spatial(#[source] CollaboratorError),

    #[error("failed to launch project run: {0}")]
    Run(#[source] CollaboratorError),

    #[error("no layer matching '{pattern}' in {dir}")]
    InventoryLayerNotFound { pattern: String, dir: PathBuf },

    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

impl PipelineError {
    /// The merge stage that failed, if this is a stage failure.
    pub fn stage(&self) -> Option<MergeStage> {
        match self {
            Self::Stage { stage, .. } => Some(*stage),
            _ => None,
        }
    }
}

/// Result type for pipeline operations.
pub type Result<T> = std::result::Result<T, PipelineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prepare_stage_error_display() {
        let err = PipelineError::Prepare {
            stage: PrepareStage::InputDatabase,
            source: CollaboratorError::MissingArtifact {
                path: PathBuf::from("/p/input_database/gcbm_input.db"),
            },
        };
        assert_eq!(
            err.to_string(),
            "input database stage failed: expected output is missing: /p/input_database/gcbm_input.db"
        );
        assert_eq!(err.stage(), None);
    }

    #[test]
    fn stage_error_display() {
        let err = PipelineError::Stage {
            stage: MergeStage::Tile,
            source: CollaboratorError::Failed {
                program: "tiler".to_string(),
                status: "exit status: 2".to_string(),
            },
        };
        assert_eq!(err.to_string(), "tile stage failed: tiler exited with exit status: 2");
        assert_eq!(err.stage(), Some(MergeStage::Tile));
    }
}
