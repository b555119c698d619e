//! Instance space generation.
//!
//! Expands the parameter grid and invokes the external generator executable
//! once per point. Each invocation writes `duplicates` instance files into a
//! directory named after the point's algorithm, under the configured working
//! directory. A failed point is logged and skipped; on-disk contents are
//! verified later by the aggregation stage, not here.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use thiserror::Error;
use tracing::info;

use crate::matrix::{ParameterGrid, ParameterPoint};
use crate::queue::{self, WorkReport};
use crate::runner::{Invocation, RunnerError, ToolRunner};

/// Outcome of a generation run.
#[derive(Debug)]
pub struct GenerateOutcome {
    /// Per-point completion tally.
    pub report: WorkReport,
    /// Per-algorithm directories the generator was told to populate.
    pub output_dirs: Vec<PathBuf>,
}

#[derive(Debug, Error)]
enum PointError {
    #[error(transparent)]
    Runner(#[from] RunnerError),

    #[error("Generator exited with code {0}")]
    NonZeroExit(i32),
}

/// Drives the external instance generator over a parameter grid.
pub struct InstanceSpaceGenerator {
    runner: Arc<dyn ToolRunner>,
    program: PathBuf,
    workdir: PathBuf,
}

impl InstanceSpaceGenerator {
    /// Creates a generator driving `program` with `workdir` as the output
    /// root.
    pub fn new(runner: Arc<dyn ToolRunner>, program: impl Into<PathBuf>, workdir: impl Into<PathBuf>) -> Self {
        Self {
            runner,
            program: program.into(),
            workdir: workdir.into(),
        }
    }

    /// Issues one generation invocation per grid point.
    pub async fn generate(&self, grid: &ParameterGrid) -> GenerateOutcome {
        let points = grid.points();
        info!(points = points.len(), duplicates = grid.duplicates, "Generating instance space");

        let report = queue::drain("generate", points, |point| {
            let invocation = self.invocation(&point);
            async move {
                let output = self.runner.invoke(&invocation).await?;
                if output.is_success() {
                    Ok(())
                } else {
                    Err(PointError::NonZeroExit(output.exit_code))
                }
            }
        })
        .await;

        let output_dirs = grid
            .algorithms
            .iter()
            .map(|algorithm| self.workdir.join(algorithm))
            .collect();

        GenerateOutcome { report, output_dirs }
    }

    fn invocation(&self, point: &ParameterPoint) -> Invocation {
        Invocation::new(
            &self.program,
            vec![
                format!("-algorithm={}", point.algorithm),
                format!("-count={}", point.item_count),
                format!("-dups={}", point.duplicates),
                format!("-variability={}", point.variability),
                format!("-center={}", point.size_center),
                format!("-output={}", point.algorithm),
            ],
        )
        .with_cwd(&self.workdir)
    }

    /// The directory a grid's instances for `algorithm` land in.
    pub fn output_dir(&self, algorithm: &str) -> PathBuf {
        self.workdir.join(algorithm)
    }

    /// The configured working directory.
    pub fn workdir(&self) -> &Path {
        &self.workdir
    }
}
