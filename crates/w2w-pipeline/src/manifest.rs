//! Success indicator written after a completed merge.

use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::{PipelineError, Result};

pub const MANIFEST_FILE: &str = "merge_manifest.json";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestProject {
    pub name: String,
    pub path: PathBuf,
}

/// Record of a successful merge.
///
/// Only inputs and content digests are recorded, so identical inputs always
/// produce an identical manifest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MergeManifest {
    pub projects: Vec<ManifestProject>,
    pub start_year: i32,
    pub end_year: i32,
    pub include_index_layer: bool,
    pub database_sha256: String,
    pub transition_rules_sha256: String,
}

impl MergeManifest {
    pub fn path(output_root: &Path) -> PathBuf {
        output_root.join(MANIFEST_FILE)
    }

    pub fn write(&self, output_root: &Path) -> Result<PathBuf> {
        let path = Self::path(output_root);
        let json = serde_json::to_string_pretty(self).map_err(|source| PipelineError::Json {
            path: path.clone(),
            source,
        })?;
        fs::write(&path, json + "\n").map_err(|source| PipelineError::Io {
            path: path.clone(),
            source,
        })?;
        Ok(path)
    }

    pub fn read(output_root: &Path) -> Result<Self> {
        let path = Self::path(output_root);
        let text = fs::read_to_string(&path).map_err(|source| PipelineError::Io {
            path: path.clone(),
            source,
        })?;
        serde_json::from_str(&text).map_err(|source| PipelineError::Json { path, source })
    }

    /// Deletes a manifest left by an earlier run, if any.
    pub fn remove_stale(output_root: &Path) -> Result<()> {
        let path = Self::path(output_root);
        match fs::remove_file(&path) {
            Ok(()) => {
                tracing::info!(path = %path.display(), "removed stale merge manifest");
                Ok(())
            }
            Err(error) if error.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(source) => Err(PipelineError::Io { path, source }),
        }
    }
}

/// Hex-encoded SHA-256 of a file's contents.
pub fn sha256_file(path: &Path) -> Result<String> {
    let io_err = |source| PipelineError::Io {
        path: path.to_path_buf(),
        source,
    };
    let mut file = File::open(path).map_err(io_err)?;
    let mut hasher = Sha256::new();
    io::copy(&mut file, &mut hasher).map_err(io_err)?;
    Ok(hex::encode(hasher.finalize()))
}
