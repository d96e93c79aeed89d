//! Launching a prepared project locally or on the cluster.

use std::fmt;
use std::process::Command;

use chrono::{DateTime, Local};

use w2w_model::{PreparedProject, ProjectLayout};

use crate::config::Configuration;
use crate::error::{PipelineError, Result};
use crate::external::run_command;

const GCBM_CONFIG_FILE: &str = "gcbm_config.cfg";
const PROVIDER_CONFIG_FILE: &str = "provider_config.json";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunHost {
    Local,
    Cluster,
}

impl RunHost {
    pub fn command(
        self,
        project: &PreparedProject,
        config: &Configuration,
        now: DateTime<Local>,
    ) -> Result<Command> {
        match self {
            Self::Local => local_command(project, config),
            Self::Cluster => cluster_command(project, config, now),
        }
    }
}

impl fmt::Display for RunHost {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Local => "local",
            Self::Cluster => "cluster",
        })
    }
}

/// Runs the model executable inside the project's `gcbm_project` directory.
pub fn local_command(project: &PreparedProject, config: &Configuration) -> Result<Command> {
    let exe = config.gcbm_exe()?;
    let mut command = Command::new(exe);
    command
        .args(["--config_file", GCBM_CONFIG_FILE])
        .args(["--config_provider", PROVIDER_CONFIG_FILE])
        .current_dir(project.gcbm_config_path());
    Ok(command)
}

/// Submits the project to the distributed runner without waiting for it.
pub fn cluster_command(
    project: &PreparedProject,
    config: &Configuration,
    now: DateTime<Local>,
) -> Result<Command> {
    let client = config.distributed_client()?;
    let name = config.project_name.as_deref().unwrap_or(project.name());
    let title = format!("gcbm_{name}_{}", now.format("%Y%m%d_%H%M%S"));
    let gcbm_config = project.gcbm_config_path();
    let study_area = project
        .rollback_layer_path()
        .unwrap_or_else(|| project.tiled_layer_path())
        .join(ProjectLayout::STUDY_AREA_FILE);

    let mut command = Command::new(config.python_exe());
    command
        .arg(client)
        .arg("--title")
        .arg(title)
        .arg("--gcbm-config")
        .arg(gcbm_config.join(GCBM_CONFIG_FILE))
        .arg("--provider-config")
        .arg(gcbm_config.join(PROVIDER_CONFIG_FILE))
        .arg("--study-area")
        .arg(study_area)
        .arg("--no-wait")
        .current_dir(project.path());
    Ok(command)
}

/// Runs `command` and waits for it; a non-zero exit is an error.
pub fn launch(command: Command) -> Result<()> {
    run_command(command).map_err(PipelineError::Run)
}
