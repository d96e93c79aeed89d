//! Single-project preparation: tile the layers, build the input database,
//! optionally roll back, then write the run configuration.
//!
//! Like a merge, each stage runs only once the previous stage's artifacts
//! exist and the first failure stops the sequence.

use std::path::{Path, PathBuf};

use tracing::{info, info_span};

use w2w_model::ProjectLayout;

use crate::collaborators::{
    ConfigureRequest, InputDatabaseRequest, PrepareCollaborators, ProjectTileRequest,
};
use crate::config::Configuration;
use crate::error::{ConfigError, PrepareStage, Result};
use crate::merge::create_dir;
use crate::rollback::{RollbackOutcome, RollbackPreparation};
use crate::stage::{expect_artifacts, run_stage};

#[derive(Debug, Clone)]
pub struct PrepareRequest {
    /// Configuration file handed to the tiling and input-database tools.
    pub config_path: PathBuf,
    /// Project root; the configuration directory when not given.
    pub output_path: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrepareOutcome {
    pub project_root: PathBuf,
    pub tiled_layers: PathBuf,
    pub input_db: PathBuf,
    pub rollback: Option<RollbackOutcome>,
    pub gcbm_project: PathBuf,
    pub start_year: Option<i32>,
    pub end_year: Option<i32>,
}

pub struct ProjectPreparation<'a> {
    collaborators: PrepareCollaborators<'a>,
    config: &'a Configuration,
}

impl<'a> ProjectPreparation<'a> {
    pub fn new(collaborators: PrepareCollaborators<'a>, config: &'a Configuration) -> Self {
        Self {
            collaborators,
            config,
        }
    }

    pub fn run(&self, request: &PrepareRequest) -> Result<PrepareOutcome> {
        let template_path = self.config.template_path()?;
        let rollback = match (&self.config.rollback, self.collaborators.rollback) {
            (Some(settings), Some(simulator)) => Some((settings, simulator)),
            (Some(_), None) => return Err(ConfigError::MissingKey { key: "rollback" }.into()),
            (None, _) => None,
        };

        let root = request
            .output_path
            .clone()
            .unwrap_or_else(|| default_project_root(&request.config_path));
        let _span = info_span!("prepare", project = %root.display()).entered();
        let tiled_layers = ProjectLayout::tiled_layers(&root);
        let input_db = ProjectLayout::input_db(&root);
        let gcbm_project = ProjectLayout::gcbm_project(&root);
        create_dir(&ProjectLayout::input_database_dir(&root))?;

        run_stage(PrepareStage::Tile, || {
            self.collaborators.tile.tile_project(&ProjectTileRequest {
                config_path: &request.config_path,
                output_path: &tiled_layers,
            })?;
            expect_artifacts(&[tiled_layers.as_path()])
        })?;

        run_stage(PrepareStage::InputDatabase, || {
            self.collaborators
                .input_db
                .build_input_db(&InputDatabaseRequest {
                    config_path: &request.config_path,
                    layer_path: &tiled_layers,
                    output_path: &input_db,
                })?;
            expect_artifacts(&[input_db.as_path()])
        })?;

        let rollback = rollback
            .map(|(settings, simulator)| {
                RollbackPreparation::new(settings, &self.config.classifiers, simulator)
                    .run(&tiled_layers, &input_db)
            })
            .transpose()?;

        let (layer_path, db_path) = match &rollback {
            Some(outcome) => (outcome.output_path.as_path(), outcome.db_path.as_path()),
            None => (tiled_layers.as_path(), input_db.as_path()),
        };
        run_stage(PrepareStage::Configure, || {
            self.collaborators.configure.configure(&ConfigureRequest {
                layer_path,
                db_path,
                template_path,
                output_path: &gcbm_project,
                start_year: self.config.start_year,
                end_year: self.config.end_year,
                disturbance_order: &self.config.gcbm_disturbance_order,
            })?;
            expect_artifacts(&[gcbm_project.as_path()])
        })?;
        info!(project = %root.display(), "project prepared");

        Ok(PrepareOutcome {
            project_root: root,
            tiled_layers,
            input_db,
            rollback,
            gcbm_project,
            start_year: self.config.start_year,
            end_year: self.config.end_year,
        })
    }
}

/// Directory a project is prepared into when no output path is given.
pub fn default_project_root(config_path: &Path) -> PathBuf {
    config_path
        .parent()
        .filter(|parent| !parent.as_os_str().is_empty())
        .map_or_else(|| PathBuf::from("."), Path::to_path_buf)
}
