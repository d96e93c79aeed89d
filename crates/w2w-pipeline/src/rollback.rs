//! Preparation and launch of the spatial rollback for one project.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::info;

use w2w_ingest::{AgeDistributionBuilder, write_distribution_json};
use w2w_model::{Classifier, ProjectLayout};

use crate::collaborators::{RollbackRequest, RollbackSimulator};
use crate::config::{InventoryYear, RollbackSettings};
use crate::error::{CollaboratorError, PipelineError, Result};

/// Converted age distribution written next to the rollback layers.
pub const ROLLBACK_AGE_DISTRIBUTION_FILE: &str = "age_distribution.json";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RollbackOutcome {
    pub output_path: PathBuf,
    pub db_path: PathBuf,
    pub age_distribution: PathBuf,
    pub inventory_year: InventoryYear,
    /// Whether the age distribution was converted from a workbook.
    pub converted_age_distribution: bool,
}

pub struct RollbackPreparation<'a> {
    settings: &'a RollbackSettings,
    classifiers: &'a [Classifier],
    simulator: &'a dyn RollbackSimulator,
}

impl<'a> RollbackPreparation<'a> {
    pub fn new(
        settings: &'a RollbackSettings,
        classifiers: &'a [Classifier],
        simulator: &'a dyn RollbackSimulator,
    ) -> Self {
        Self {
            settings,
            classifiers,
            simulator,
        }
    }

    /// Rolls back the project whose tiled layers and input database are given.
    ///
    /// Layers are written to the `rollback` directory beside `tiled_layers`
    /// and the adjusted database beside `input_db`.
    pub fn run(&self, tiled_layers: &Path, input_db: &Path) -> Result<RollbackOutcome> {
        let output_path = tiled_layers
            .parent()
            .unwrap_or(tiled_layers)
            .join(ProjectLayout::ROLLBACK_LAYERS);
        let db_path = input_db
            .parent()
            .unwrap_or(Path::new("."))
            .join(ProjectLayout::ROLLBACK_DB_FILE);

        let inventory_year = match &self.settings.inventory_year {
            InventoryYear::Year(year) => InventoryYear::Year(*year),
            InventoryYear::Layer(name) => {
                let layer = find_inventory_layer(tiled_layers, name)?;
                InventoryYear::Layer(layer.to_string_lossy().into_owned())
            }
        };

        fs::create_dir_all(&output_path).map_err(|source| PipelineError::Io {
            path: output_path.clone(),
            source,
        })?;

        let source = &self.settings.age_distribution;
        let converted_age_distribution = is_workbook(source);
        let age_distribution = if converted_age_distribution {
            let target = output_path.join(ROLLBACK_AGE_DISTRIBUTION_FILE);
            let records = AgeDistributionBuilder::new(self.classifiers.iter().cloned())
                .build_from_path(source)?;
            write_distribution_json(&records, &target)?;
            target
        } else {
            source.clone()
        };

        info!(
            layers = %tiled_layers.display(),
            output = %output_path.display(),
            rollback_year = self.settings.rollback_year,
            "running spatial rollback"
        );
        self.simulator
            .rollback(&RollbackRequest {
                input_layers: tiled_layers,
                input_db,
                inventory_year: inventory_year.clone(),
                rollback_year: self.settings.rollback_year,
                age_distribution: &age_distribution,
                prioritize_disturbances: self.settings.prioritize_disturbances,
                single_draw: self.settings.single_draw,
                establishment_disturbance_type: &self.settings.establishment_disturbance_type,
                output_path: &output_path,
                db_output_path: &db_path,
            })
            .map_err(PipelineError::Rollback)?;
        if !db_path.is_file() {
            return Err(PipelineError::Rollback(CollaboratorError::MissingArtifact {
                path: db_path,
            }));
        }

        Ok(RollbackOutcome {
            output_path,
            db_path,
            age_distribution,
            inventory_year,
            converted_age_distribution,
        })
    }
}

fn is_workbook(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("xls") || ext.eq_ignore_ascii_case("xlsx"))
}

/// First file in `dir`, by name, matching `<name>_moja.tif*`.
fn find_inventory_layer(dir: &Path, name: &str) -> Result<PathBuf> {
    let prefix = format!("{name}_moja.tif");
    let io_err = |source| PipelineError::Io {
        path: dir.to_path_buf(),
        source,
    };
    let mut matches = Vec::new();
    for entry in fs::read_dir(dir).map_err(io_err)? {
        let entry = entry.map_err(io_err)?;
        if entry
            .file_name()
            .to_str()
            .is_some_and(|file_name| file_name.starts_with(&prefix))
        {
            matches.push(entry.path());
        }
    }
    matches.sort();
    matches
        .into_iter()
        .next()
        .ok_or_else(|| PipelineError::InventoryLayerNotFound {
            pattern: format!("{prefix}*"),
            dir: dir.to_path_buf(),
        })
}
