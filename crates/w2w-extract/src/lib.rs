//! Extraction of growth curves and transition rules from a GCBM input database.

pub mod aidb;
pub mod database;
pub mod error;
pub mod transitions;
pub mod writer;
pub mod yields;

pub use aidb::{AIDB_KEYS, AidbLocator, DEFAULT_AIDB_PATH};
pub use database::{open_read_only, with_input_db};
pub use error::{ExtractError, Result};
pub use transitions::TransitionExtractor;
pub use writer::{TRANSITIONS_FILE, YIELDS_FILE, commit_csv, stage_csv, write_frame_csv};
pub use yields::GrowthCurveExtractor;

use std::fs;
use std::path::{Path, PathBuf};

/// Files written by [`extract_tables`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractSummary {
    pub yields_path: PathBuf,
    pub yield_rows: usize,
    pub transitions_path: PathBuf,
    pub transition_rows: usize,
}

/// Writes `sit_yields.csv` and `sit_transitions.csv` for `db_path` into `output_dir`.
///
/// Both tables are extracted and staged before either file is replaced, so a
/// failure leaves any previous outputs in place.
pub fn extract_tables(db_path: &Path, output_dir: &Path) -> Result<ExtractSummary> {
    let mut yields = with_input_db(db_path, GrowthCurveExtractor::extract)?;
    let mut transitions = with_input_db(db_path, TransitionExtractor::extract)?;

    let yields_path = output_dir.join(YIELDS_FILE);
    let transitions_path = output_dir.join(TRANSITIONS_FILE);
    let staged_yields = stage_csv(&mut yields, &yields_path)?;
    let staged_transitions = match stage_csv(&mut transitions, &transitions_path) {
        Ok(path) => path,
        Err(error) => {
            let _ = fs::remove_file(&staged_yields);
            return Err(error);
        }
    };
    commit_csv(&staged_yields, &yields_path)?;
    commit_csv(&staged_transitions, &transitions_path)?;
    tracing::info!(
        yields = %yields_path.display(),
        transitions = %transitions_path.display(),
        "wrote SIT tables"
    );

    Ok(ExtractSummary {
        yields_path,
        yield_rows: yields.height(),
        transitions_path,
        transition_rows: transitions.height(),
    })
}
