//! Command-line argument definitions for `walltowall`.

use std::io::{self, IsTerminal};
use std::path::{Path, PathBuf};

use clap::{Args, ColorChoice, Parser, Subcommand, ValueEnum};
use clap_verbosity_flag::{InfoLevel, Verbosity};
use colorchoice_clap::Color;
use tracing::level_filters::LevelFilter;

use w2w_pipeline::{RunHost, default_project_root};

use crate::logging::{LogConfig, LogFile, LogFileMode, LogFormat};

/// Log file written beside each command's outputs unless `--log-file` is given.
pub const DEFAULT_LOG_FILE: &str = "walltowall.log";

#[derive(Parser)]
#[command(
    name = "walltowall",
    version,
    about = "Manage wall-to-wall forest carbon projects",
    long_about = "Manage wall-to-wall forest carbon projects.\n\n\
                  Prepares projects from a configuration file, converts \
                  age-distribution workbooks for the spatial rollback, extracts \
                  growth curves and transition rules from project input databases, \
                  merges prepared projects and launches model runs."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Adjust log verbosity (-v for debug, -vv for trace, -q for warnings only).
    #[command(flatten)]
    pub verbosity: Verbosity<InfoLevel>,

    /// Control ANSI color output (auto, always, never).
    #[command(flatten)]
    pub color: Color,

    /// Explicit log level (overrides -v/-q flags).
    #[arg(long = "log-level", value_enum, global = true)]
    pub log_level: Option<LogLevelArg>,

    /// Log output format.
    #[arg(long = "log-format", value_enum, default_value = "pretty", global = true)]
    pub log_format: LogFormatArg,

    /// Log file; defaults to `walltowall.log` in the command's project or
    /// output directory.
    #[arg(long = "log-file", value_name = "PATH", global = true)]
    pub log_file: Option<PathBuf>,

    /// Log to stderr only.
    #[arg(long = "no-log-file", global = true, conflicts_with = "log_file")]
    pub no_log_file: bool,
}

impl Cli {
    /// Logging setup from the verbosity, format and log-file flags.
    ///
    /// An explicit `--log-level` wins over `-v`/`-q`, and either disables
    /// `RUST_LOG`.
    pub fn log_config(&self) -> LogConfig {
        let level_filter = match self.log_level {
            Some(LogLevelArg::Error) => LevelFilter::ERROR,
            Some(LogLevelArg::Warn) => LevelFilter::WARN,
            Some(LogLevelArg::Info) => LevelFilter::INFO,
            Some(LogLevelArg::Debug) => LevelFilter::DEBUG,
            Some(LogLevelArg::Trace) => LevelFilter::TRACE,
            None => self.verbosity.tracing_level_filter(),
        };
        LogConfig {
            level_filter,
            use_env_filter: !(self.verbosity.is_present() || self.log_level.is_some()),
            with_ansi: match self.color.color {
                ColorChoice::Always => true,
                ColorChoice::Never => false,
                ColorChoice::Auto => io::stderr().is_terminal(),
            },
            format: match self.log_format {
                LogFormatArg::Pretty => LogFormat::Pretty,
                LogFormatArg::Compact => LogFormat::Compact,
                LogFormatArg::Json => LogFormat::Json,
            },
            log_file: self.log_file_target(),
            ..LogConfig::default()
        }
    }

    fn log_file_target(&self) -> Option<LogFile> {
        if self.no_log_file {
            return None;
        }
        let path = self
            .log_file
            .clone()
            .unwrap_or_else(|| self.command.log_dir().join(DEFAULT_LOG_FILE));
        let mode = if self.command.appends_log() {
            LogFileMode::Append
        } else {
            LogFileMode::Truncate
        };
        Some(LogFile { path, mode })
    }
}

#[derive(Subcommand)]
pub enum Command {
    /// Tile, build the input database, roll back and configure one project.
    Prepare(PrepareArgs),

    /// Convert an age-distribution workbook into rollback JSON.
    AgeDistribution(AgeDistributionArgs),

    /// Write SIT yield and transition tables and the CBM defaults database.
    Convert(ConvertArgs),

    /// Run the spatial rollback for a tiled project.
    Rollback(RollbackArgs),

    /// Merge two or more prepared projects into one.
    Merge(MergeArgs),

    /// Run a prepared project locally or on the cluster.
    Run(RunArgs),
}

impl Command {
    /// Directory the default log file is written to.
    pub fn log_dir(&self) -> PathBuf {
        match self {
            Self::Prepare(args) => args
                .output_path
                .clone()
                .unwrap_or_else(|| default_project_root(&args.config)),
            Self::AgeDistribution(args) => parent_dir(&args.output),
            // The output directory is cleared by the conversion itself.
            Self::Convert(args) => args.project.clone(),
            Self::Rollback(args) => args.project.clone(),
            Self::Merge(args) => args.output_path.clone(),
            Self::Run(args) => args.project.clone(),
        }
    }

    /// Whether the default log file is appended to rather than replaced.
    pub fn appends_log(&self) -> bool {
        matches!(self, Self::Run(_))
    }
}

fn parent_dir(path: &Path) -> PathBuf {
    path.parent()
        .filter(|parent| !parent.as_os_str().is_empty())
        .map_or_else(|| PathBuf::from("."), Path::to_path_buf)
}

#[derive(Args)]
pub struct PrepareArgs {
    /// Project configuration with templates, tools and optional rollback.
    #[arg(value_name = "CONFIG")]
    pub config: PathBuf,

    /// Project root to prepare into; the configuration directory by default.
    #[arg(long = "output-path", value_name = "DIR")]
    pub output_path: Option<PathBuf>,
}

#[derive(Args)]
pub struct AgeDistributionArgs {
    /// Workbook with an `age_distribution` root sheet.
    #[arg(value_name = "WORKBOOK")]
    pub workbook: PathBuf,

    /// Destination JSON file.
    #[arg(long = "output", value_name = "PATH")]
    pub output: PathBuf,

    /// Classifier column to group rows by (repeatable).
    #[arg(long = "classifier", value_name = "NAME")]
    pub classifiers: Vec<String>,

    /// Project configuration to read classifiers from.
    #[arg(long = "config", value_name = "PATH")]
    pub config: Option<PathBuf>,
}

#[derive(Args)]
pub struct ConvertArgs {
    /// Root directory of the prepared project.
    #[arg(value_name = "PROJECT")]
    pub project: PathBuf,

    /// Output directory; cleared before writing.
    #[arg(value_name = "OUTPUT")]
    pub output: PathBuf,

    /// Archive index database; searched for when omitted.
    #[arg(long = "aidb", value_name = "PATH")]
    pub aidb: Option<PathBuf>,

    /// Project configuration providing the `defaults` and `spatial` tools
    /// and the disturbance order.
    #[arg(long = "config", value_name = "PATH")]
    pub config: Option<PathBuf>,
}

#[derive(Args)]
pub struct RollbackArgs {
    /// Project configuration with a `rollback` section.
    #[arg(value_name = "CONFIG")]
    pub config: PathBuf,

    /// Root directory of the tiled project.
    #[arg(value_name = "PROJECT")]
    pub project: PathBuf,
}

#[derive(Args)]
pub struct MergeArgs {
    /// Configuration with disturbance order and GCBM template.
    #[arg(value_name = "CONFIG")]
    pub config: PathBuf,

    /// Root directories of at least two prepared projects.
    #[arg(value_name = "PROJECT", required = true, num_args = 1..)]
    pub projects: Vec<PathBuf>,

    /// Directory to write the merged project to.
    #[arg(long = "output-path", value_name = "DIR")]
    pub output_path: PathBuf,

    /// Add the merged index as a reporting classifier.
    #[arg(long = "include-index-layer")]
    pub include_index_layer: bool,
}

#[derive(Args)]
pub struct RunArgs {
    /// Where to run the project.
    #[arg(value_enum)]
    pub host: HostArg,

    /// Root directory of the prepared project.
    #[arg(value_name = "PROJECT")]
    pub project: PathBuf,

    /// Project configuration with `gcbm_exe` or `distributed_client`.
    #[arg(long = "config", value_name = "PATH")]
    pub config: Option<PathBuf>,
}

#[derive(Clone, Copy, ValueEnum)]
pub enum HostArg {
    Local,
    Cluster,
}

impl From<HostArg> for RunHost {
    fn from(host: HostArg) -> Self {
        match host {
            HostArg::Local => RunHost::Local,
            HostArg::Cluster => RunHost::Cluster,
        }
    }
}

/// CLI log level choices.
#[derive(Clone, Copy, ValueEnum)]
pub enum LogLevelArg {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// CLI log format choices.
#[derive(Clone, Copy, ValueEnum)]
pub enum LogFormatArg {
    Pretty,
    Compact,
    Json,
}
