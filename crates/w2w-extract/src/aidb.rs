//! Location of the archive index database (AIDB).
//!
//! Search order: `aidb` or `AIDBPath` entries in any JSON file under the
//! project root (resolved relative to that file), then the default
//! Operational-Scale CBM-CFS3 install location.

use std::fs;
use std::path::{Path, PathBuf};

use serde_json::Value;
use walkdir::WalkDir;

use crate::error::{ExtractError, Result};

/// JSON keys that may carry an AIDB path hint.
pub const AIDB_KEYS: [&str; 2] = ["aidb", "AIDBPath"];

pub const DEFAULT_AIDB_PATH: &str = r"C:\Program Files (x86)\Operational-Scale CBM-CFS3\Admin\DBs\ArchiveIndex_Beta_Install.mdb";

#[derive(Debug, Clone)]
pub struct AidbLocator {
    default_path: PathBuf,
}

impl Default for AidbLocator {
    fn default() -> Self {
        Self::new(DEFAULT_AIDB_PATH)
    }
}

impl AidbLocator {
    pub fn new(default_path: impl Into<PathBuf>) -> Self {
        Self {
            default_path: default_path.into(),
        }
    }

    pub fn locate(&self, project_root: &Path) -> Result<PathBuf> {
        let json_files = WalkDir::new(project_root)
            .sort_by_file_name()
            .into_iter()
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.file_type().is_file())
            .map(walkdir::DirEntry::into_path)
            .filter(|path| {
                path.extension()
                    .and_then(|ext| ext.to_str())
                    .is_some_and(|ext| ext.eq_ignore_ascii_case("json"))
            });

        for json_file in json_files {
            if let Some(path) = hinted_path(&json_file) {
                tracing::info!(aidb = %path.display(), source = %json_file.display(), "found AIDB");
                return Ok(path);
            }
        }

        if self.default_path.exists() {
            tracing::info!(aidb = %self.default_path.display(), "using default AIDB");
            return Ok(self.default_path.clone());
        }

        Err(ExtractError::AidbNotFound {
            project: project_root.to_path_buf(),
        })
    }
}

fn hinted_path(json_file: &Path) -> Option<PathBuf> {
    let text = fs::read_to_string(json_file).ok()?;
    let value: Value = match serde_json::from_str(&text) {
        Ok(value) => value,
        Err(error) => {
            tracing::debug!(path = %json_file.display(), %error, "skipping unparsable JSON");
            return None;
        }
    };
    let parent = json_file.parent()?;
    AIDB_KEYS
        .iter()
        .filter_map(|key| value.get(*key).and_then(Value::as_str))
        .filter(|hint| !hint.is_empty())
        .map(|hint| parent.join(hint))
        .find(|path| path.exists())
}
