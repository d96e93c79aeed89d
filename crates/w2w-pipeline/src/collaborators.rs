//! Interfaces to the external engines the pipeline sequences.
//!
//! Each merge stage hands its output to the next by value: a
//! [`MergedInventory`] is consumed by tiling, a [`TiledInventory`] by
//! patching. No two stages hold the same intermediate artifact at once.
//!
//! Single-project preparation uses [`ProjectTiler`] and
//! [`InputDatabaseBuilder`]; conversion hands tiled layers to a
//! [`SpatialConverter`].

use std::path::{Path, PathBuf};

use w2w_model::MergeInventory;

use crate::config::InventoryYear;
use crate::error::CollaboratorError;

pub type CollaboratorResult<T> = std::result::Result<T, CollaboratorError>;

/// Consolidated database plus merged, untiled layers.
#[derive(Debug, PartialEq, Eq)]
pub struct MergedInventory {
    pub layer_path: PathBuf,
    pub db_path: PathBuf,
}

/// Tiled layers, the transition-rules side table and the unpatched database.
#[derive(Debug, PartialEq, Eq)]
pub struct TiledInventory {
    pub layer_path: PathBuf,
    pub transition_rules_path: PathBuf,
    pub db_path: PathBuf,
}

/// Tiled layers with a database whose transition rules were rewritten.
#[derive(Debug, PartialEq, Eq)]
pub struct PatchedInventory {
    pub layer_path: PathBuf,
    pub transition_rules_path: PathBuf,
    pub db_path: PathBuf,
}

#[derive(Debug, Clone, Copy)]
pub struct MergeEngineRequest<'a> {
    pub inventories: &'a [MergeInventory],
    pub merged_output_path: &'a Path,
    pub db_output_path: &'a Path,
    pub start_year: i32,
    /// Cooperative upper bound for the engine's internal batching.
    pub memory_limit_mb: u64,
    pub working_dir: &'a Path,
}

#[derive(Debug, Clone, Copy)]
pub struct TileRequest<'a> {
    pub output_path: &'a Path,
    pub inventories: &'a [MergeInventory],
    /// Emit one reporting-classifier layer per source project.
    pub include_index_layer: bool,
    pub working_dir: &'a Path,
}

#[derive(Debug, Clone, Copy)]
pub struct ConfigureRequest<'a> {
    pub layer_path: &'a Path,
    pub db_path: &'a Path,
    pub template_path: &'a Path,
    pub output_path: &'a Path,
    /// Simulation start; the template's own value is kept when `None`.
    pub start_year: Option<i32>,
    pub end_year: Option<i32>,
    pub disturbance_order: &'a [String],
}

/// Tiling of one project's layers as described by its configuration file.
#[derive(Debug, Clone, Copy)]
pub struct ProjectTileRequest<'a> {
    pub config_path: &'a Path,
    pub output_path: &'a Path,
}

#[derive(Debug, Clone, Copy)]
pub struct InputDatabaseRequest<'a> {
    pub config_path: &'a Path,
    pub layer_path: &'a Path,
    pub output_path: &'a Path,
}

#[derive(Debug, Clone, Copy)]
pub struct SpatialRequest<'a> {
    pub layer_path: &'a Path,
    pub cbm_defaults_path: &'a Path,
    pub start_year: i32,
    pub disturbance_order: &'a [String],
    /// `(layer, attribute)` pairs for layers whose attribute name differs.
    pub renames: &'a [(&'a str, &'a str)],
    pub output_path: &'a Path,
}

#[derive(Debug, Clone)]
pub struct RollbackRequest<'a> {
    pub input_layers: &'a Path,
    pub input_db: &'a Path,
    /// A year, or the path of the tiled layer holding inventory years.
    pub inventory_year: InventoryYear,
    pub rollback_year: i32,
    pub age_distribution: &'a Path,
    pub prioritize_disturbances: bool,
    pub single_draw: bool,
    pub establishment_disturbance_type: &'a str,
    pub output_path: &'a Path,
    pub db_output_path: &'a Path,
}

pub trait MergeEngine {
    fn merge(&self, request: &MergeEngineRequest<'_>) -> CollaboratorResult<MergedInventory>;
}

pub trait TilingEngine {
    fn tile(
        &self,
        merged: MergedInventory,
        request: &TileRequest<'_>,
    ) -> CollaboratorResult<TiledInventory>;
}

/// Rewrites the database's transition rules from the tiled side table.
pub trait TransitionRulePatcher {
    fn patch(&self, tiled: TiledInventory) -> CollaboratorResult<PatchedInventory>;
}

/// Writes the final run configuration.
pub trait ConfigGenerator {
    fn configure(&self, request: &ConfigureRequest<'_>) -> CollaboratorResult<()>;
}

pub trait ProjectTiler {
    fn tile_project(&self, request: &ProjectTileRequest<'_>) -> CollaboratorResult<()>;
}

/// Builds `gcbm_input.db` from the project's tabular inputs.
pub trait InputDatabaseBuilder {
    fn build_input_db(&self, request: &InputDatabaseRequest<'_>) -> CollaboratorResult<()>;
}

/// Converts tiled layers into the spatial inventory dataset.
pub trait SpatialConverter {
    fn convert_layers(&self, request: &SpatialRequest<'_>) -> CollaboratorResult<()>;
}

pub trait RollbackSimulator {
    fn rollback(&self, request: &RollbackRequest<'_>) -> CollaboratorResult<()>;
}

/// Builds `cbm_defaults.db` from a non-SQLite archive index.
pub trait DefaultsBuilder {
    fn build_defaults(&self, aidb: &Path, output: &Path) -> CollaboratorResult<()>;
}

/// The four engines a merge runs through, in stage order.
#[derive(Clone, Copy)]
pub struct MergeCollaborators<'a> {
    pub merge: &'a dyn MergeEngine,
    pub tile: &'a dyn TilingEngine,
    pub patch: &'a dyn TransitionRulePatcher,
    pub configure: &'a dyn ConfigGenerator,
}

impl<'a, T> From<&'a T> for MergeCollaborators<'a>
where
    T: MergeEngine + TilingEngine + TransitionRulePatcher + ConfigGenerator,
{
    fn from(engine: &'a T) -> Self {
        Self {
            merge: engine,
            tile: engine,
            patch: engine,
            configure: engine,
        }
    }
}

/// The engines single-project preparation runs through.
#[derive(Clone, Copy)]
pub struct PrepareCollaborators<'a> {
    pub tile: &'a dyn ProjectTiler,
    pub input_db: &'a dyn InputDatabaseBuilder,
    /// Required only when the configuration has a `rollback` section.
    pub rollback: Option<&'a dyn RollbackSimulator>,
    pub configure: &'a dyn ConfigGenerator,
}
