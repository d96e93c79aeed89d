//! Conversion of a prepared project into standalone model input files.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing::{info, warn};

use w2w_extract::{AidbLocator, ExtractSummary, extract_tables};
use w2w_model::PreparedProject;

use crate::collaborators::{DefaultsBuilder, SpatialConverter, SpatialRequest};
use crate::error::{CollaboratorError, PipelineError, Result};
use crate::stage::expect_artifacts;

pub const CBM_DEFAULTS_FILE: &str = "cbm_defaults.db";
pub const SPATIAL_INVENTORY_FILE: &str = "inventory.arrowspace";

/// Layers whose attribute in the spatial inventory has a different name.
pub const SPATIAL_LAYER_RENAMES: [(&str, &str); 3] = [
    ("initial_age", "age"),
    ("mean_annual_temperature", "mean_annual_temp"),
    ("inventory_delay", "delay"),
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConvertOutcome {
    pub source_db: PathBuf,
    pub tables: ExtractSummary,
    pub aidb_path: PathBuf,
    pub cbm_defaults_path: PathBuf,
    /// Whether the defaults database was copied rather than built.
    pub copied_defaults: bool,
    /// Spatial inventory dataset, when a spatial converter ran.
    pub spatial_inventory: Option<PathBuf>,
}

pub struct ProjectConverter<'a> {
    locator: AidbLocator,
    defaults: Option<&'a dyn DefaultsBuilder>,
    spatial: Option<(&'a dyn SpatialConverter, &'a [String])>,
}

impl<'a> ProjectConverter<'a> {
    pub fn new(locator: AidbLocator, defaults: Option<&'a dyn DefaultsBuilder>) -> Self {
        Self {
            locator,
            defaults,
            spatial: None,
        }
    }

    /// Also converts the project's layers into `inventory.arrowspace`.
    #[must_use]
    pub fn with_spatial(
        mut self,
        converter: &'a dyn SpatialConverter,
        disturbance_order: &'a [String],
    ) -> Self {
        self.spatial = Some((converter, disturbance_order));
        self
    }

    /// Writes the yield and transition tables and `cbm_defaults.db` into
    /// `output`, then the spatial inventory when a converter is attached.
    ///
    /// The output directory is cleared first. Tables and layers come from
    /// the rollback outputs when the project was rolled back.
    pub fn convert(
        &self,
        project: &PreparedProject,
        output: &Path,
        aidb: Option<&Path>,
    ) -> Result<ConvertOutcome> {
        let aidb_path = match aidb {
            Some(path) => path.to_path_buf(),
            None => self.locator.locate(project.path())?,
        };
        let copied_defaults = is_sqlite_archive(&aidb_path);
        let defaults = match (copied_defaults, self.defaults) {
            (true, _) => None,
            (false, Some(builder)) => Some(builder),
            (false, None) => {
                return Err(PipelineError::Defaults(CollaboratorError::Message(format!(
                    "{} is not a SQLite database and no defaults tool is configured",
                    aidb_path.display()
                ))));
            }
        };

        clear_dir(output)?;

        let source_db = project.authoritative_db_path();
        info!(
            project = %project.name(),
            db = %source_db.display(),
            rollback = project.has_rollback(),
            "extracting growth curves and transitions"
        );
        let tables = extract_tables(&source_db, output)?;
        info!(
            yields = tables.yield_rows,
            transitions = tables.transition_rows,
            "wrote SIT tables"
        );

        let cbm_defaults_path = output.join(CBM_DEFAULTS_FILE);
        match defaults {
            None => {
                fs::copy(&aidb_path, &cbm_defaults_path).map_err(|source| PipelineError::Io {
                    path: aidb_path.clone(),
                    source,
                })?;
            }
            Some(builder) => builder
                .build_defaults(&aidb_path, &cbm_defaults_path)
                .map_err(PipelineError::Defaults)?,
        }
        info!(aidb = %aidb_path.display(), output = %cbm_defaults_path.display(), "created CBM defaults database");

        let spatial_inventory = match self.spatial {
            Some((converter, disturbance_order)) => Some(convert_spatial(
                converter,
                project,
                &cbm_defaults_path,
                disturbance_order,
                output,
            )?),
            None => {
                warn!("no spatial converter configured; skipping {SPATIAL_INVENTORY_FILE}");
                None
            }
        };

        Ok(ConvertOutcome {
            source_db,
            tables,
            aidb_path,
            cbm_defaults_path,
            copied_defaults,
            spatial_inventory,
        })
    }
}

fn convert_spatial(
    converter: &dyn SpatialConverter,
    project: &PreparedProject,
    cbm_defaults_path: &Path,
    disturbance_order: &[String],
    output: &Path,
) -> Result<PathBuf> {
    let layer_path = project
        .rollback_layer_path()
        .unwrap_or_else(|| project.tiled_layer_path());
    let output_path = output.join(SPATIAL_INVENTORY_FILE);
    info!(
        layers = %layer_path.display(),
        output = %output_path.display(),
        "converting spatial layers"
    );
    converter
        .convert_layers(&SpatialRequest {
            layer_path: &layer_path,
            cbm_defaults_path,
            start_year: project.start_year(),
            disturbance_order,
            renames: &SPATIAL_LAYER_RENAMES,
            output_path: &output_path,
        })
        .and_then(|()| expect_artifacts(&[output_path.as_path()]))
        .map_err(PipelineError::Spatial)?;
    Ok(output_path)
}

fn is_sqlite_archive(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("db"))
}

fn clear_dir(path: &Path) -> Result<()> {
    let io_err = |source| PipelineError::Io {
        path: path.to_path_buf(),
        source,
    };
    match fs::remove_dir_all(path) {
        Ok(()) => {}
        Err(error) if error.kind() == io::ErrorKind::NotFound => {}
        Err(error) => return Err(io_err(error)),
    }
    fs::create_dir_all(path).map_err(io_err)
}
