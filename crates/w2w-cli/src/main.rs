//! walltowall CLI.

use clap::Parser;

use w2w_cli::cli::{Cli, Command};
use w2w_cli::commands::{
    run_age_distribution, run_convert, run_merge, run_prepare, run_project, run_rollback,
};
use w2w_cli::logging::init_logging;

mod summary;

use crate::summary::{
    print_age_distribution, print_convert, print_merge, print_prepare, print_rollback, print_run,
};

fn main() {
    let cli = Cli::parse();
    cli.color.write_global();
    if let Err(error) = init_logging(&cli.log_config()) {
        eprintln!("error: failed to initialize logging: {error}");
        std::process::exit(1);
    }
    let result = match &cli.command {
        Command::Prepare(args) => run_prepare(args).map(|outcome| print_prepare(&outcome)),
        Command::AgeDistribution(args) => {
            run_age_distribution(args).map(|report| print_age_distribution(&report))
        }
        Command::Convert(args) => run_convert(args).map(|outcome| print_convert(&outcome)),
        Command::Rollback(args) => run_rollback(args).map(|outcome| print_rollback(&outcome)),
        Command::Merge(args) => run_merge(args).map(|outcome| print_merge(&outcome)),
        Command::Run(args) => run_project(args).map(|report| print_run(&report)),
    };
    if let Err(error) = result {
        tracing::error!("{error:#}");
        std::process::exit(1);
    }
}
