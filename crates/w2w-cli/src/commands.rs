use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::{info, info_span};

use w2w_extract::AidbLocator;
use w2w_ingest::{AgeDistributionBuilder, write_distribution_json};
use w2w_model::{Classifier, DistributionRecord, PreparedProject, ProjectLayout};
use w2w_pipeline::{
    Configuration, ConvertOutcome, DefaultsBuilder, ExternalTools, MergeOrchestrator,
    MergeOutcome, MergeRequest, MergeSettings, PrepareOutcome, PrepareRequest, ProjectConverter,
    ProjectPreparation, RollbackOutcome, RollbackPreparation, RunHost, SpatialConverter,
    SystemMemory, ToolKind, launch,
};

use crate::cli::{
    AgeDistributionArgs, ConvertArgs, MergeArgs, PrepareArgs, RollbackArgs, RunArgs,
};

#[derive(Debug)]
pub struct AgeDistributionReport {
    pub workbook: PathBuf,
    pub output: PathBuf,
    pub records: Vec<DistributionRecord>,
}

#[derive(Debug)]
pub struct RunReport {
    pub host: RunHost,
    pub project: PathBuf,
    pub command_line: String,
}

fn load_config(path: &Path) -> Result<Configuration> {
    Configuration::load(path).with_context(|| format!("load configuration {}", path.display()))
}

pub fn run_prepare(args: &PrepareArgs) -> Result<PrepareOutcome> {
    let _span = info_span!("prepare", config = %args.config.display()).entered();
    let config = load_config(&args.config)?;
    let with_rollback = config.rollback.is_some();
    let tools = ExternalTools::for_prepare(&config.tools, with_rollback)?;

    ProjectPreparation::new(tools.prepare_collaborators(with_rollback), &config)
        .run(&PrepareRequest {
            config_path: args.config.clone(),
            output_path: args.output_path.clone(),
        })
        .with_context(|| format!("prepare project from {}", args.config.display()))
}

pub fn run_age_distribution(args: &AgeDistributionArgs) -> Result<AgeDistributionReport> {
    let _span = info_span!("age_distribution", workbook = %args.workbook.display()).entered();
    let mut classifiers: Vec<Classifier> = match &args.config {
        Some(path) => load_config(path)?.classifiers,
        None => Vec::new(),
    };
    classifiers.extend(args.classifiers.iter().map(|name| Classifier::new(name.as_str())));

    let records = AgeDistributionBuilder::new(classifiers)
        .build_from_path(&args.workbook)
        .with_context(|| format!("convert age distribution {}", args.workbook.display()))?;
    write_distribution_json(&records, &args.output)
        .with_context(|| format!("write {}", args.output.display()))?;
    Ok(AgeDistributionReport {
        workbook: args.workbook.clone(),
        output: args.output.clone(),
        records,
    })
}

pub fn run_convert(args: &ConvertArgs) -> Result<ConvertOutcome> {
    let _span = info_span!("convert", project = %args.project.display()).entered();
    let project = PreparedProject::open(&args.project)
        .with_context(|| format!("open project {}", args.project.display()))?;
    let config = match &args.config {
        Some(path) => load_config(path)?,
        None => Configuration::default(),
    };
    let tools = ExternalTools::new(config.tools.clone());
    let defaults = tools
        .has(ToolKind::Defaults)
        .then_some(&tools as &dyn DefaultsBuilder);

    let mut converter = ProjectConverter::new(AidbLocator::default(), defaults);
    if tools.has(ToolKind::Spatial) {
        converter = converter.with_spatial(
            &tools as &dyn SpatialConverter,
            &config.gcbm_disturbance_order,
        );
    }
    converter
        .convert(&project, &args.output, args.aidb.as_deref())
        .with_context(|| format!("convert project {}", args.project.display()))
}

pub fn run_rollback(args: &RollbackArgs) -> Result<RollbackOutcome> {
    let _span = info_span!("rollback", project = %args.project.display()).entered();
    let config = load_config(&args.config)?;
    let settings = config.rollback_settings()?;
    let tools = ExternalTools::for_rollback(&config.tools)?;

    let tiled_layers = ProjectLayout::tiled_layers(&args.project);
    let input_db = ProjectLayout::input_db(&args.project);
    RollbackPreparation::new(settings, &config.classifiers, &tools)
        .run(&tiled_layers, &input_db)
        .with_context(|| format!("roll back project {}", args.project.display()))
}

pub fn run_merge(args: &MergeArgs) -> Result<MergeOutcome> {
    let _span = info_span!("merge", output = %args.output_path.display()).entered();
    let config = load_config(&args.config)?;
    let settings = MergeSettings {
        template_path: config.template_path()?.to_path_buf(),
        disturbance_order: config.gcbm_disturbance_order.clone(),
    };
    let tools = ExternalTools::for_merge(&config.tools)?;
    for project in &args.projects {
        info!(project = %project.display(), "merging project");
    }

    MergeOrchestrator::new((&tools).into(), &SystemMemory)
        .run(
            &MergeRequest {
                project_paths: args.projects.clone(),
                output_path: args.output_path.clone(),
                include_index_layer: args.include_index_layer,
            },
            &settings,
        )
        .context("merge projects")
}

pub fn run_project(args: &RunArgs) -> Result<RunReport> {
    let host = RunHost::from(args.host);
    let _span = info_span!("run", host = %host, project = %args.project.display()).entered();
    let project = PreparedProject::open(&args.project)
        .with_context(|| format!("open project {}", args.project.display()))?;
    let config = match &args.config {
        Some(path) => load_config(path)?,
        None => Configuration::default(),
    };

    let command = host.command(&project, &config, chrono::Local::now())?;
    let command_line = describe(&command);
    info!(command = %command_line, "launching project run");
    launch(command).with_context(|| format!("run project {}", args.project.display()))?;
    Ok(RunReport {
        host,
        project: args.project.clone(),
        command_line,
    })
}

fn describe(command: &std::process::Command) -> String {
    std::iter::once(command.get_program())
        .chain(command.get_args())
        .map(std::ffi::OsStr::to_string_lossy)
        .collect::<Vec<_>>()
        .join(" ")
}
