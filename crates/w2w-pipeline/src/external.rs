//! Collaborators backed by configured external commands.
//!
//! Each command receives its inputs as `--flag value` arguments after the
//! arguments given in the configuration. Inventory lists are passed as a JSON
//! file written into the stage's working directory.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use w2w_model::{MergeInventory, ProjectLayout};

use crate::collaborators::{
    CollaboratorResult, ConfigGenerator, ConfigureRequest, DefaultsBuilder, InputDatabaseBuilder,
    InputDatabaseRequest, MergeEngine, MergeEngineRequest, MergedInventory, PatchedInventory,
    PrepareCollaborators, ProjectTileRequest, ProjectTiler, RollbackRequest, RollbackSimulator,
    SpatialConverter, SpatialRequest, TileRequest, TiledInventory, TilingEngine,
    TransitionRulePatcher,
};
use crate::config::{InventoryYear, ToolCommands, ToolKind};
use crate::error::{CollaboratorError, ConfigError};

const INVENTORIES_FILE: &str = "inventories.json";

/// Runs the configured external tools, one per [`ToolKind`].
#[derive(Debug, Clone)]
pub struct ExternalTools {
    tools: ToolCommands,
}

impl ExternalTools {
    pub fn new(tools: ToolCommands) -> Self {
        Self { tools }
    }

    /// Tools for a project merge; all four stage commands must be configured.
    pub fn for_merge(tools: &ToolCommands) -> Result<Self, ConfigError> {
        Self::requiring(
            tools,
            &[
                ToolKind::Merge,
                ToolKind::Tile,
                ToolKind::Patch,
                ToolKind::Configure,
            ],
        )
    }

    pub fn for_rollback(tools: &ToolCommands) -> Result<Self, ConfigError> {
        Self::requiring(tools, &[ToolKind::Rollback])
    }

    /// Tools for single-project preparation; `rollback` only when it will run.
    pub fn for_prepare(tools: &ToolCommands, with_rollback: bool) -> Result<Self, ConfigError> {
        let external = Self::requiring(
            tools,
            &[
                ToolKind::TileProject,
                ToolKind::InputDatabase,
                ToolKind::Configure,
            ],
        )?;
        if with_rollback {
            external.require(&[ToolKind::Rollback])?;
        }
        Ok(external)
    }

    fn requiring(tools: &ToolCommands, kinds: &[ToolKind]) -> Result<Self, ConfigError> {
        let external = Self::new(tools.clone());
        external.require(kinds)?;
        Ok(external)
    }

    /// Checks that every listed tool has a non-empty command line.
    pub fn require(&self, kinds: &[ToolKind]) -> Result<(), ConfigError> {
        match kinds.iter().find(|kind| !self.has(**kind)) {
            Some(kind) => Err(ConfigError::MissingKey { key: kind.key() }),
            None => Ok(()),
        }
    }

    pub fn has(&self, kind: ToolKind) -> bool {
        self.tools.get(kind).is_some()
    }

    /// Preparation collaborators backed by these tools.
    pub fn prepare_collaborators(&self, with_rollback: bool) -> PrepareCollaborators<'_> {
        PrepareCollaborators {
            tile: self,
            input_db: self,
            rollback: with_rollback.then_some(self as &dyn RollbackSimulator),
            configure: self,
        }
    }

    fn command(&self, kind: ToolKind) -> CollaboratorResult<Command> {
        let tool = self
            .tools
            .get(kind)
            .ok_or_else(|| CollaboratorError::Message(format!("no '{kind}' tool configured")))?;
        let program = tool.program().unwrap_or_default();
        let mut command = Command::new(program);
        command.args(tool.args());
        Ok(command)
    }
}

/// Runs `command` to completion, mapping a non-zero exit to an error.
pub(crate) fn run_command(mut command: Command) -> CollaboratorResult<()> {
    let program = command.get_program().to_string_lossy().into_owned();
    tracing::debug!(command = ?command, "launching external tool");
    let status = command
        .status()
        .map_err(|source| CollaboratorError::Launch {
            program: program.clone(),
            source,
        })?;
    if status.success() {
        Ok(())
    } else {
        Err(CollaboratorError::Failed {
            program,
            status: status.to_string(),
        })
    }
}

fn flag(command: &mut Command, name: &str, value: impl AsRef<std::ffi::OsStr>) {
    command.arg(name).arg(value);
}

fn write_inventories(working_dir: &Path, inventories: &[MergeInventory]) -> CollaboratorResult<PathBuf> {
    let path = working_dir.join(INVENTORIES_FILE);
    let json = serde_json::to_vec_pretty(inventories)
        .map_err(|error| CollaboratorError::Message(format!("failed to encode inventories: {error}")))?;
    fs::write(&path, json).map_err(|source| CollaboratorError::Io {
        path: path.clone(),
        source,
    })?;
    Ok(path)
}

impl MergeEngine for ExternalTools {
    fn merge(&self, request: &MergeEngineRequest<'_>) -> CollaboratorResult<MergedInventory> {
        let inventories = write_inventories(request.working_dir, request.inventories)?;
        let mut command = self.command(ToolKind::Merge)?;
        flag(&mut command, "--inventories", &inventories);
        flag(&mut command, "--output-path", request.merged_output_path);
        flag(&mut command, "--db-output-path", request.db_output_path);
        flag(&mut command, "--start-year", request.start_year.to_string());
        flag(&mut command, "--memory-limit-mb", request.memory_limit_mb.to_string());
        run_command(command)?;
        Ok(MergedInventory {
            layer_path: request.merged_output_path.to_path_buf(),
            db_path: request.db_output_path.to_path_buf(),
        })
    }
}

impl TilingEngine for ExternalTools {
    fn tile(
        &self,
        merged: MergedInventory,
        request: &TileRequest<'_>,
    ) -> CollaboratorResult<TiledInventory> {
        let inventories = write_inventories(request.working_dir, request.inventories)?;
        let mut command = self.command(ToolKind::Tile)?;
        flag(&mut command, "--output-path", request.output_path);
        flag(&mut command, "--merged-layers", &merged.layer_path);
        flag(&mut command, "--db-path", &merged.db_path);
        flag(&mut command, "--inventories", &inventories);
        if request.include_index_layer {
            command.arg("--include-index-layer");
        }
        run_command(command)?;
        Ok(TiledInventory {
            layer_path: request.output_path.to_path_buf(),
            transition_rules_path: request
                .output_path
                .join(ProjectLayout::TRANSITION_RULES_FILE),
            db_path: merged.db_path,
        })
    }
}

impl TransitionRulePatcher for ExternalTools {
    fn patch(&self, tiled: TiledInventory) -> CollaboratorResult<PatchedInventory> {
        let mut command = self.command(ToolKind::Patch)?;
        flag(&mut command, "--db-path", &tiled.db_path);
        flag(&mut command, "--transition-rules", &tiled.transition_rules_path);
        run_command(command)?;
        Ok(PatchedInventory {
            layer_path: tiled.layer_path,
            transition_rules_path: tiled.transition_rules_path,
            db_path: tiled.db_path,
        })
    }
}

impl ConfigGenerator for ExternalTools {
    fn configure(&self, request: &ConfigureRequest<'_>) -> CollaboratorResult<()> {
        let mut command = self.command(ToolKind::Configure)?;
        flag(&mut command, "--layer-path", request.layer_path);
        flag(&mut command, "--template-path", request.template_path);
        flag(&mut command, "--db-path", request.db_path);
        flag(&mut command, "--output-path", request.output_path);
        if let Some(year) = request.start_year {
            flag(&mut command, "--start-year", year.to_string());
        }
        if let Some(year) = request.end_year {
            flag(&mut command, "--end-year", year.to_string());
        }
        disturbance_order(&mut command, request.disturbance_order);
        run_command(command)
    }
}

impl ProjectTiler for ExternalTools {
    fn tile_project(&self, request: &ProjectTileRequest<'_>) -> CollaboratorResult<()> {
        let mut command = self.command(ToolKind::TileProject)?;
        flag(&mut command, "--config", request.config_path);
        flag(&mut command, "--output-path", request.output_path);
        run_command(command)
    }
}

impl InputDatabaseBuilder for ExternalTools {
    fn build_input_db(&self, request: &InputDatabaseRequest<'_>) -> CollaboratorResult<()> {
        let mut command = self.command(ToolKind::InputDatabase)?;
        flag(&mut command, "--config", request.config_path);
        flag(&mut command, "--layer-path", request.layer_path);
        flag(&mut command, "--output-path", request.output_path);
        run_command(command)
    }
}

impl SpatialConverter for ExternalTools {
    fn convert_layers(&self, request: &SpatialRequest<'_>) -> CollaboratorResult<()> {
        let mut command = self.command(ToolKind::Spatial)?;
        spatial_args(&mut command, request);
        run_command(command)
    }
}

fn disturbance_order(command: &mut Command, order: &[String]) {
    for disturbance in order {
        flag(command, "--disturbance-order", disturbance);
    }
}

fn spatial_args(command: &mut Command, request: &SpatialRequest<'_>) {
    flag(command, "--layer-path", request.layer_path);
    flag(command, "--cbm-defaults", request.cbm_defaults_path);
    flag(command, "--start-year", request.start_year.to_string());
    disturbance_order(command, request.disturbance_order);
    for (layer, attribute) in request.renames {
        flag(command, "--rename", format!("{layer}={attribute}"));
    }
    flag(command, "--output-path", request.output_path);
}

impl RollbackSimulator for ExternalTools {
    fn rollback(&self, request: &RollbackRequest<'_>) -> CollaboratorResult<()> {
        let mut command = self.command(ToolKind::Rollback)?;
        flag(&mut command, "--input-layers", request.input_layers);
        flag(&mut command, "--input-db", request.input_db);
        match &request.inventory_year {
            InventoryYear::Year(year) => flag(&mut command, "--inventory-year", year.to_string()),
            InventoryYear::Layer(layer) => flag(&mut command, "--inventory-year-layer", layer),
        }
        flag(&mut command, "--rollback-year", request.rollback_year.to_string());
        flag(&mut command, "--age-distribution", request.age_distribution);
        if request.prioritize_disturbances {
            command.arg("--prioritize-disturbances");
        }
        if request.single_draw {
            command.arg("--single-draw");
        }
        flag(
            &mut command,
            "--establishment-disturbance-type",
            request.establishment_disturbance_type,
        );
        flag(&mut command, "--output-path", request.output_path);
        flag(&mut command, "--db-output-path", request.db_output_path);
        run_command(command)
    }
}

impl DefaultsBuilder for ExternalTools {
    fn build_defaults(&self, aidb: &Path, output: &Path) -> CollaboratorResult<()> {
        let mut command = self.command(ToolKind::Defaults)?;
        flag(&mut command, "--aidb", aidb);
        flag(&mut command, "--output", output);
        run_command(command)
    }
}
