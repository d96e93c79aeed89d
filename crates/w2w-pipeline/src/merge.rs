//! Multi-project merge: Merge, Tile, Patch and Configure, in that order.
//!
//! Each stage runs only after the previous stage's artifacts exist on disk.
//! The first failure aborts the merge without a retry. Partial outputs stay on
//! disk and no manifest is written.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::info;

use w2w_model::{MergeInventory, PreparedProject, ProjectLayout};

use crate::collaborators::{ConfigureRequest, MergeCollaborators, MergeEngineRequest, TileRequest};
use crate::error::{ConfigError, MergeStage, PipelineError, Result};
use crate::manifest::{ManifestProject, MergeManifest, sha256_file};
use crate::memory::{MemorySource, memory_ceiling_mb};
use crate::stage::{expect_artifacts, run_stage};

/// Reconciled simulation years of a merged project.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SimulationWindow {
    pub start_year: i32,
    pub end_year: i32,
}

/// Widest window covering every project: earliest start, latest end.
///
/// Returns `None` for an empty slice.
pub fn reconcile_window(projects: &[PreparedProject]) -> Option<SimulationWindow> {
    let start_year = projects.iter().map(PreparedProject::start_year).min()?;
    let end_year = projects.iter().map(PreparedProject::end_year).max()?;
    Some(SimulationWindow {
        start_year,
        end_year,
    })
}

#[derive(Debug, Clone)]
pub struct MergeRequest {
    pub project_paths: Vec<PathBuf>,
    pub output_path: PathBuf,
    pub include_index_layer: bool,
}

#[derive(Debug, Clone)]
pub struct MergeSettings {
    pub template_path: PathBuf,
    pub disturbance_order: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeOutcome {
    pub window: SimulationWindow,
    pub project_count: usize,
    pub memory_limit_mb: u64,
    pub db_path: PathBuf,
    pub tiled_layers: PathBuf,
    pub gcbm_project: PathBuf,
    pub manifest_path: PathBuf,
}

pub struct MergeOrchestrator<'a> {
    collaborators: MergeCollaborators<'a>,
    memory: &'a dyn MemorySource,
}

impl<'a> MergeOrchestrator<'a> {
    pub fn new(collaborators: MergeCollaborators<'a>, memory: &'a dyn MemorySource) -> Self {
        Self {
            collaborators,
            memory,
        }
    }

    pub fn run(&self, request: &MergeRequest, settings: &MergeSettings) -> Result<MergeOutcome> {
        let count = request.project_paths.len();
        if count < 2 {
            return Err(ConfigError::TooFewProjects { count }.into());
        }

        let projects = request
            .project_paths
            .iter()
            .map(PreparedProject::open)
            .collect::<std::result::Result<Vec<_>, _>>()?;
        let window = reconcile_window(&projects).ok_or(ConfigError::TooFewProjects { count })?;
        info!(
            projects = count,
            start_year = window.start_year,
            end_year = window.end_year,
            "reconciled simulation window"
        );

        let output = request.output_path.as_path();
        create_dir(output)?;
        MergeManifest::remove_stale(output)?;

        let working_dir = tempfile::Builder::new()
            .prefix(".w2w-merge-")
            .tempdir_in(output)
            .map_err(|source| PipelineError::Io {
                path: output.to_path_buf(),
                source,
            })?;
        let inventories = projects
            .iter()
            .enumerate()
            .map(|(index, project)| project.prepare_merge(working_dir.path(), index))
            .collect::<std::result::Result<Vec<MergeInventory>, _>>()?;

        let memory_limit_mb = memory_ceiling_mb(self.memory);
        info!(memory_limit_mb, "computed merge memory ceiling");

        let merged_layers = ProjectLayout::merged_layers(output);
        let tiled_layers = ProjectLayout::tiled_layers(output);
        let db_path = ProjectLayout::input_db(output);
        let gcbm_project = ProjectLayout::gcbm_project(output);
        create_dir(&ProjectLayout::input_database_dir(output))?;

        let merged = run_stage(MergeStage::Merge, || {
            let merged = self.collaborators.merge.merge(&MergeEngineRequest {
                inventories: &inventories,
                merged_output_path: &merged_layers,
                db_output_path: &db_path,
                start_year: window.start_year,
                memory_limit_mb,
                working_dir: working_dir.path(),
            })?;
            expect_artifacts(&[merged.layer_path.as_path(), merged.db_path.as_path()])?;
            Ok(merged)
        })?;

        let tiled = run_stage(MergeStage::Tile, || {
            let tiled = self.collaborators.tile.tile(
                merged,
                &TileRequest {
                    output_path: &tiled_layers,
                    inventories: &inventories,
                    include_index_layer: request.include_index_layer,
                    working_dir: working_dir.path(),
                },
            )?;
            expect_artifacts(&[
                tiled.layer_path.as_path(),
                tiled.transition_rules_path.as_path(),
            ])?;
            Ok(tiled)
        })?;

        let patched = run_stage(MergeStage::Patch, || {
            let patched = self.collaborators.patch.patch(tiled)?;
            expect_artifacts(&[patched.db_path.as_path()])?;
            Ok(patched)
        })?;

        run_stage(MergeStage::Configure, || {
            self.collaborators.configure.configure(&ConfigureRequest {
                layer_path: &patched.layer_path,
                db_path: &patched.db_path,
                template_path: &settings.template_path,
                output_path: &gcbm_project,
                start_year: Some(window.start_year),
                end_year: Some(window.end_year),
                disturbance_order: &settings.disturbance_order,
            })?;
            expect_artifacts(&[gcbm_project.as_path()])
        })?;

        let manifest = MergeManifest {
            projects: projects
                .iter()
                .map(|project| ManifestProject {
                    name: project.name().to_string(),
                    path: project.path().to_path_buf(),
                })
                .collect(),
            start_year: window.start_year,
            end_year: window.end_year,
            include_index_layer: request.include_index_layer,
            database_sha256: sha256_file(&patched.db_path)?,
            transition_rules_sha256: sha256_file(&patched.transition_rules_path)?,
        };
        let manifest_path = manifest.write(output)?;
        info!(path = %manifest_path.display(), "merge complete");

        Ok(MergeOutcome {
            window,
            project_count: count,
            memory_limit_mb,
            db_path: patched.db_path,
            tiled_layers: patched.layer_path,
            gcbm_project,
            manifest_path,
        })
    }
}

pub(crate) fn create_dir(path: &Path) -> Result<()> {
    fs::create_dir_all(path).map_err(|source| PipelineError::Io {
        path: path.to_path_buf(),
        source,
    })
}
