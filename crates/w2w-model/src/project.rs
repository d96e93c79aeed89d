//! Handles to previously prepared wall-to-wall projects.
//!
//! A prepared project is a directory produced by the prepare step. Its
//! metadata is read once when the handle is opened and never mutated.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde_json::Value;

use crate::error::{ModelError, Result};

/// Fixed relative layout shared by prepared and merged projects.
pub struct ProjectLayout;

impl ProjectLayout {
    pub const LAYERS: &'static str = "layers";
    pub const TILED_LAYERS: &'static str = "tiled";
    pub const MERGED_LAYERS: &'static str = "merged";
    pub const ROLLBACK_LAYERS: &'static str = "rollback";
    pub const INPUT_DATABASE: &'static str = "input_database";
    pub const INPUT_DB_FILE: &'static str = "gcbm_input.db";
    pub const ROLLBACK_DB_FILE: &'static str = "rollback_gcbm_input.db";
    pub const GCBM_PROJECT: &'static str = "gcbm_project";
    pub const TRANSITION_RULES_FILE: &'static str = "transition_rules.csv";
    pub const STUDY_AREA_FILE: &'static str = "study_area.json";

    pub fn tiled_layers(root: &Path) -> PathBuf {
        root.join(Self::LAYERS).join(Self::TILED_LAYERS)
    }

    pub fn merged_layers(root: &Path) -> PathBuf {
        root.join(Self::LAYERS).join(Self::MERGED_LAYERS)
    }

    pub fn rollback_layers(root: &Path) -> PathBuf {
        root.join(Self::LAYERS).join(Self::ROLLBACK_LAYERS)
    }

    pub fn input_database_dir(root: &Path) -> PathBuf {
        root.join(Self::INPUT_DATABASE)
    }

    pub fn input_db(root: &Path) -> PathBuf {
        Self::input_database_dir(root).join(Self::INPUT_DB_FILE)
    }

    pub fn rollback_db(root: &Path) -> PathBuf {
        Self::input_database_dir(root).join(Self::ROLLBACK_DB_FILE)
    }

    pub fn gcbm_project(root: &Path) -> PathBuf {
        root.join(Self::GCBM_PROJECT)
    }
}

/// Per-project input to the merge engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MergeInventory {
    pub index: usize,
    pub name: String,
    pub project_path: PathBuf,
    /// Rollback layers when the project was rolled back, tiled layers otherwise.
    pub layer_path: PathBuf,
    pub db_path: PathBuf,
    pub working_path: PathBuf,
    pub start_year: i32,
    pub end_year: i32,
}

/// Read-only handle to a prepared project directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreparedProject {
    path: PathBuf,
    name: String,
    start_year: i32,
    end_year: i32,
}

impl PreparedProject {
    /// Opens a prepared project and reads its simulation window.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if !path.is_dir() {
            return Err(ModelError::ProjectNotFound { path });
        }
        let name = path
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or("project")
            .to_string();
        let (start_year, end_year) = read_simulation_window(&ProjectLayout::gcbm_project(&path))?;
        tracing::debug!(project = %name, start_year, end_year, "opened prepared project");
        Ok(Self {
            path,
            name,
            start_year,
            end_year,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn start_year(&self) -> i32 {
        self.start_year
    }

    pub fn end_year(&self) -> i32 {
        self.end_year
    }

    pub fn tiled_layer_path(&self) -> PathBuf {
        ProjectLayout::tiled_layers(&self.path)
    }

    pub fn rollback_layer_path(&self) -> Option<PathBuf> {
        let path = ProjectLayout::rollback_layers(&self.path);
        path.is_dir().then_some(path)
    }

    pub fn input_db_path(&self) -> PathBuf {
        ProjectLayout::input_db(&self.path)
    }

    pub fn rollback_db_path(&self) -> Option<PathBuf> {
        let path = ProjectLayout::rollback_db(&self.path);
        path.is_file().then_some(path)
    }

    pub fn has_rollback(&self) -> bool {
        self.rollback_db_path().is_some()
    }

    /// The rollback-adjusted database if rollback ran, otherwise the original.
    pub fn authoritative_db_path(&self) -> PathBuf {
        self.rollback_db_path()
            .unwrap_or_else(|| self.input_db_path())
    }

    pub fn gcbm_config_path(&self) -> PathBuf {
        ProjectLayout::gcbm_project(&self.path)
    }

    /// Describes this project as merge input, creating its working directory.
    pub fn prepare_merge(&self, working_dir: &Path, index: usize) -> Result<MergeInventory> {
        let working_path = working_dir.join(format!("inventory_{index}"));
        fs::create_dir_all(&working_path).map_err(|source| ModelError::Io {
            path: working_path.clone(),
            source,
        })?;
        Ok(MergeInventory {
            index,
            name: self.name.clone(),
            project_path: self.path.clone(),
            layer_path: self
                .rollback_layer_path()
                .unwrap_or_else(|| self.tiled_layer_path()),
            db_path: self.authoritative_db_path(),
            working_path,
            start_year: self.start_year,
            end_year: self.end_year,
        })
    }
}

/// Scans the GCBM configuration directory for the `LocalDomain` window.
///
/// The end date is exclusive, so the last simulated year is one before it.
fn read_simulation_window(config_dir: &Path) -> Result<(i32, i32)> {
    let entries = fs::read_dir(config_dir).map_err(|source| ModelError::Io {
        path: config_dir.to_path_buf(),
        source,
    })?;
    let mut json_files = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|source| ModelError::Io {
            path: config_dir.to_path_buf(),
            source,
        })?;
        let path = entry.path();
        let is_json = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
        if is_json && path.is_file() {
            json_files.push(path);
        }
    }
    json_files.sort();

    for path in json_files {
        let text = fs::read_to_string(&path).map_err(|source| ModelError::Io {
            path: path.clone(),
            source,
        })?;
        let value: Value = serde_json::from_str(&text).map_err(|source| ModelError::Json {
            path: path.clone(),
            source,
        })?;
        let Some(domain) = value.get("LocalDomain") else {
            continue;
        };
        let start = domain.get("start_date").and_then(Value::as_str);
        let end = domain.get("end_date").and_then(Value::as_str);
        if let (Some(start), Some(end)) = (start, end) {
            let start_year = parse_year(start, &path)?;
            let end_year = parse_year(end, &path)? - 1;
            return Ok((start_year, end_year));
        }
    }

    Err(ModelError::MissingSimulationWindow {
        path: config_dir.to_path_buf(),
    })
}

fn parse_year(date: &str, path: &Path) -> Result<i32> {
    date.trim()
        .split(['/', '-'])
        .next()
        .and_then(|year| year.parse().ok())
        .ok_or_else(|| ModelError::InvalidDate {
            value: date.to_string(),
            path: path.to_path_buf(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_year_prefix() {
        let path = Path::new("localdomain.json");
        assert_eq!(parse_year("2010/01/01", path).unwrap(), 2010);
        assert_eq!(parse_year("1990-01-01", path).unwrap(), 1990);
        assert!(matches!(
            parse_year("soon", path),
            Err(ModelError::InvalidDate { .. })
        ));
    }
}
