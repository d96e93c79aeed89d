use std::fs::{self, File};
use std::path::{Path, PathBuf};

use polars::prelude::{CsvWriter, DataFrame, SerWriter};

use crate::error::{ExtractError, Result};

pub const YIELDS_FILE: &str = "sit_yields.csv";
pub const TRANSITIONS_FILE: &str = "sit_transitions.csv";

fn staging_path(path: &Path) -> PathBuf {
    path.with_extension("csv.tmp")
}

/// Writes `frame` as CSV to a sibling temporary file of `path` and returns
/// the temporary path. Null cells are written empty.
pub fn stage_csv(frame: &mut DataFrame, path: &Path) -> Result<PathBuf> {
    let io_err = |source| ExtractError::Io {
        path: path.to_path_buf(),
        source,
    };
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(io_err)?;
    }

    let tmp_path = staging_path(path);
    let mut file = File::create(&tmp_path).map_err(io_err)?;
    let written = CsvWriter::new(&mut file).include_header(true).finish(frame);
    if let Err(source) = written {
        drop(file);
        let _ = fs::remove_file(&tmp_path);
        return Err(ExtractError::Csv {
            path: path.to_path_buf(),
            source,
        });
    }
    file.sync_all().map_err(io_err)?;
    Ok(tmp_path)
}

/// Moves a staged file over its final path.
pub fn commit_csv(tmp_path: &Path, path: &Path) -> Result<()> {
    fs::rename(tmp_path, path).map_err(|source| ExtractError::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// Writes `frame` as CSV, replacing any existing file once complete.
pub fn write_frame_csv(frame: &mut DataFrame, path: &Path) -> Result<()> {
    let tmp_path = stage_csv(frame, path)?;
    commit_csv(&tmp_path, path)?;
    tracing::info!(path = %path.display(), rows = frame.height(), "wrote table");
    Ok(())
}
