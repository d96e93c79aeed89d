//! Orchestration of wall-to-wall project preparation and merging.
//!
//! Heavy lifting (merging rasters, tiling, rollback simulation, run
//! configuration) is done by external collaborators behind the traits in
//! [`collaborators`]; this crate sequences them and owns the data handed
//! between them.
//!
//! Operations: [`ProjectPreparation`] builds one project,
//! [`ProjectConverter`] exports it as standalone model inputs,
//! [`RollbackPreparation`] rolls it back and [`MergeOrchestrator`] combines
//! prepared projects.

pub mod collaborators;
pub mod config;
pub mod convert;
pub mod error;
pub mod external;
pub mod manifest;
pub mod memory;
pub mod merge;
pub mod prepare;
pub mod rollback;
pub mod run;
mod stage;

pub use collaborators::{
    CollaboratorResult, ConfigGenerator, ConfigureRequest, DefaultsBuilder, InputDatabaseBuilder,
    InputDatabaseRequest, MergeCollaborators, MergeEngine, MergeEngineRequest, MergedInventory,
    PatchedInventory, PrepareCollaborators, ProjectTileRequest, ProjectTiler, RollbackRequest,
    RollbackSimulator, SpatialConverter, SpatialRequest, TileRequest, TiledInventory,
    TilingEngine, TransitionRulePatcher,
};
pub use config::{
    Configuration, InventoryYear, RollbackSettings, ToolCommand, ToolCommands, ToolKind,
};
pub use convert::{
    CBM_DEFAULTS_FILE, ConvertOutcome, ProjectConverter, SPATIAL_INVENTORY_FILE,
    SPATIAL_LAYER_RENAMES,
};
pub use error::{CollaboratorError, ConfigError, MergeStage, PipelineError, PrepareStage, Result};
pub use external::ExternalTools;
pub use manifest::{MANIFEST_FILE, ManifestProject, MergeManifest, sha256_file};
pub use memory::{FixedMemory, MemorySource, SystemMemory, memory_ceiling_mb};
pub use merge::{
    MergeOrchestrator, MergeOutcome, MergeRequest, MergeSettings, SimulationWindow,
    reconcile_window,
};
pub use prepare::{PrepareOutcome, PrepareRequest, ProjectPreparation, default_project_root};
pub use rollback::{ROLLBACK_AGE_DISTRIBUTION_FILE, RollbackOutcome, RollbackPreparation};
pub use run::{RunHost, cluster_command, launch, local_command};
