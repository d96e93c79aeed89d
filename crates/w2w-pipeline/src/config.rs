//! Project configuration loaded from a JSON file.
//!
//! Relative paths are resolved against the directory holding the file.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use w2w_model::Classifier;

use crate::error::ConfigError;

/// External command line: program followed by leading arguments.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(transparent)]
pub struct ToolCommand(pub Vec<String>);

impl ToolCommand {
    pub fn new<I, S>(parts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(parts.into_iter().map(Into::into).collect())
    }

    pub fn program(&self) -> Option<&str> {
        self.0.first().map(String::as_str)
    }

    pub fn args(&self) -> &[String] {
        self.0.get(1..).unwrap_or_default()
    }
}

/// External collaborators that can be configured under `tools`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ToolKind {
    Merge,
    Tile,
    Patch,
    Configure,
    Rollback,
    Defaults,
    TileProject,
    InputDatabase,
    Spatial,
}

impl ToolKind {
    /// Key of the tool in the `tools` configuration section.
    pub fn key(self) -> &'static str {
        match self {
            Self::Merge => "merge",
            Self::Tile => "tile",
            Self::Patch => "patch",
            Self::Configure => "configure",
            Self::Rollback => "rollback",
            Self::Defaults => "defaults",
            Self::TileProject => "tile_project",
            Self::InputDatabase => "input_database",
            Self::Spatial => "spatial",
        }
    }
}

impl fmt::Display for ToolKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// Commands for each external collaborator.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ToolCommands {
    pub merge: Option<ToolCommand>,
    pub tile: Option<ToolCommand>,
    pub patch: Option<ToolCommand>,
    pub configure: Option<ToolCommand>,
    pub rollback: Option<ToolCommand>,
    pub defaults: Option<ToolCommand>,
    /// Tiles a single project's layers.
    pub tile_project: Option<ToolCommand>,
    /// Builds a project's input database.
    pub input_database: Option<ToolCommand>,
    /// Converts tiled layers into the spatial inventory dataset.
    pub spatial: Option<ToolCommand>,
}

impl ToolCommands {
    /// Command line of `kind`, if configured with a program.
    pub fn get(&self, kind: ToolKind) -> Option<&ToolCommand> {
        let command = match kind {
            ToolKind::Merge => self.merge.as_ref(),
            ToolKind::Tile => self.tile.as_ref(),
            ToolKind::Patch => self.patch.as_ref(),
            ToolKind::Configure => self.configure.as_ref(),
            ToolKind::Rollback => self.rollback.as_ref(),
            ToolKind::Defaults => self.defaults.as_ref(),
            ToolKind::TileProject => self.tile_project.as_ref(),
            ToolKind::InputDatabase => self.input_database.as_ref(),
            ToolKind::Spatial => self.spatial.as_ref(),
        };
        command.filter(|command| command.program().is_some())
    }
}

/// Inventory vintage given either as a year or as a tiled layer name.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum InventoryYear {
    Year(i32),
    Layer(String),
}

fn default_rollback_year() -> i32 {
    1990
}

fn default_establishment_disturbance_type() -> String {
    "Wildfire".to_string()
}

/// Settings for the spatial rollback.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RollbackSettings {
    pub age_distribution: PathBuf,
    pub inventory_year: InventoryYear,
    #[serde(default = "default_rollback_year")]
    pub rollback_year: i32,
    #[serde(default)]
    pub prioritize_disturbances: bool,
    #[serde(default)]
    pub single_draw: bool,
    #[serde(default = "default_establishment_disturbance_type")]
    pub establishment_disturbance_type: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Configuration {
    pub project_name: Option<String>,
    pub classifiers: Vec<Classifier>,
    pub start_year: Option<i32>,
    pub end_year: Option<i32>,
    pub gcbm_template_path: Option<PathBuf>,
    pub gcbm_disturbance_order: Vec<String>,
    pub gcbm_exe: Option<PathBuf>,
    pub distributed_client: Option<PathBuf>,
    pub python_exe: Option<String>,
    pub rollback: Option<RollbackSettings>,
    pub tools: ToolCommands,
    #[serde(skip)]
    base_dir: PathBuf,
}

impl Configuration {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let base_dir = path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();
        let config = Self::from_json(&text, base_dir).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        tracing::debug!(path = %path.display(), "loaded configuration");
        Ok(config)
    }

    /// Parses configuration text, resolving relative paths against `base_dir`.
    pub fn from_json(text: &str, base_dir: PathBuf) -> Result<Self, serde_json::Error> {
        let mut config: Self = serde_json::from_str(text)?;
        let resolve = |path: Option<PathBuf>| path.map(|path| resolve_against(&base_dir, &path));
        config.gcbm_template_path = resolve(config.gcbm_template_path.take());
        config.gcbm_exe = resolve(config.gcbm_exe.take());
        config.distributed_client = resolve(config.distributed_client.take());
        if let Some(rollback) = config.rollback.as_mut() {
            rollback.age_distribution = resolve_against(&base_dir, &rollback.age_distribution);
        }
        config.base_dir = base_dir;
        Ok(config)
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// Resolves `path` against the configuration directory unless absolute.
    pub fn resolve(&self, path: &Path) -> PathBuf {
        resolve_against(&self.base_dir, path)
    }

    pub fn template_path(&self) -> Result<&Path, ConfigError> {
        self.gcbm_template_path
            .as_deref()
            .ok_or(ConfigError::MissingKey {
                key: "gcbm_template_path",
            })
    }

    pub fn rollback_settings(&self) -> Result<&RollbackSettings, ConfigError> {
        self.rollback
            .as_ref()
            .ok_or(ConfigError::MissingKey { key: "rollback" })
    }

    pub fn gcbm_exe(&self) -> Result<&Path, ConfigError> {
        self.gcbm_exe
            .as_deref()
            .ok_or(ConfigError::MissingKey { key: "gcbm_exe" })
    }

    pub fn distributed_client(&self) -> Result<&Path, ConfigError> {
        self.distributed_client
            .as_deref()
            .ok_or(ConfigError::MissingKey {
                key: "distributed_client",
            })
    }

    pub fn python_exe(&self) -> &str {
        self.python_exe.as_deref().unwrap_or("python")
    }
}

fn resolve_against(base_dir: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base_dir.join(path)
    }
}
