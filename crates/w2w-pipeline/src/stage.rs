//! Sequencing of external stages: one span per stage, artifact checks and
//! mapping of collaborator failures onto the stage that raised them.

use std::fmt;
use std::path::Path;
use std::time::Instant;

use tracing::{info, info_span};

use crate::collaborators::CollaboratorResult;
use crate::error::{CollaboratorError, MergeStage, PipelineError, PrepareStage, Result};

/// A step of an ordered pipeline.
pub trait Stage: Copy + PartialEq + fmt::Display + 'static {
    /// Every stage in execution order.
    fn order() -> &'static [Self];

    fn failed(self, source: CollaboratorError) -> PipelineError;

    /// 1-based position in [`Stage::order`].
    fn step(self) -> usize {
        Self::order()
            .iter()
            .position(|stage| *stage == self)
            .map_or(0, |index| index + 1)
    }
}

impl Stage for MergeStage {
    fn order() -> &'static [Self] {
        &MergeStage::ALL
    }

    fn failed(self, source: CollaboratorError) -> PipelineError {
        PipelineError::Stage {
            stage: self,
            source,
        }
    }
}

impl Stage for PrepareStage {
    fn order() -> &'static [Self] {
        &PrepareStage::ALL
    }

    fn failed(self, source: CollaboratorError) -> PipelineError {
        PipelineError::Prepare {
            stage: self,
            source,
        }
    }
}

pub(crate) fn run_stage<S: Stage, T>(
    stage: S,
    f: impl FnOnce() -> CollaboratorResult<T>,
) -> Result<T> {
    let _span = info_span!("stage", stage = %stage, step = stage.step(), of = S::order().len())
        .entered();
    let started = Instant::now();
    info!("starting {stage} stage");
    let output = f().map_err(|source| {
        tracing::error!(error = %source, "{stage} stage failed");
        stage.failed(source)
    })?;
    info!(
        duration_ms = started.elapsed().as_millis() as u64,
        "finished {stage} stage"
    );
    Ok(output)
}

pub(crate) fn expect_artifacts(paths: &[&Path]) -> CollaboratorResult<()> {
    match paths.iter().find(|path| !path.exists()) {
        Some(path) => Err(CollaboratorError::MissingArtifact {
            path: path.to_path_buf(),
        }),
        None => Ok(()),
    }
}
