//! Execution orchestration.
//!
//! Runs the external solver once per generated instance, writing one result
//! file per instance into a results directory named
//! `{NAME_UPPERCASE}_RESULTS`. The results directory is reset wholesale at
//! the start of a run: stale results from a previous run must never mix with
//! new ones, so an existing directory is deleted and recreated rather than
//! updated in place.
//!
//! Two entry modes cover the same ground from different directions:
//! algorithm-driven re-derives the full filename matrix from the parameter
//! grid, directory-driven takes whatever files are actually present.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use thiserror::Error;
use tracing::info;

use crate::matrix::{ParameterGrid, MAX_SIZE};
use crate::naming::{instance_base_name, result_file_name};
use crate::queue::{self, WorkReport};
use crate::runner::{Invocation, RunnerError, ToolRunner};

/// Errors that can occur while orchestrating a run.
#[derive(Debug, Error)]
pub enum OrchestrateError {
    #[error("Failed to reset results directory '{}': {source}", .path.display())]
    ResetFailed {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to list instance directory '{}': {source}", .path.display())]
    ListFailed {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Input directory '{}' has no usable name", .0.display())]
    UnnamedDirectory(PathBuf),
}

/// Outcome of an orchestration run.
#[derive(Debug)]
pub struct OrchestrateOutcome {
    /// Per-instance completion tally.
    pub report: WorkReport,
    /// Directory the result files were written to.
    pub results_dir: PathBuf,
}

/// One pending solver call.
struct SolveItem {
    input: PathBuf,
    output: PathBuf,
}

impl std::fmt::Display for SolveItem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.input.display())
    }
}

#[derive(Debug, Error)]
enum SolveError {
    #[error(transparent)]
    Runner(#[from] RunnerError),

    #[error("Solver exited with code {0}")]
    NonZeroExit(i32),
}

/// Drives the external solver over a set of instances.
pub struct ExecutionOrchestrator {
    runner: Arc<dyn ToolRunner>,
    solver: PathBuf,
    workdir: PathBuf,
}

impl ExecutionOrchestrator {
    /// Creates an orchestrator driving `solver`, resolving instance and
    /// results directories under `workdir`.
    pub fn new(runner: Arc<dyn ToolRunner>, solver: impl Into<PathBuf>, workdir: impl Into<PathBuf>) -> Self {
        Self {
            runner,
            solver: solver.into(),
            workdir: workdir.into(),
        }
    }

    /// The results directory name paired with an algorithm or input
    /// directory name.
    pub fn results_dir_name(name: &str) -> String {
        format!("{}_RESULTS", name.to_uppercase())
    }

    /// Deletes and recreates the results directory for `name`.
    ///
    /// Returns the directory path. Running the orchestrator twice leaves
    /// exactly the second run's contents.
    pub fn reset_results_dir(&self, name: &str) -> Result<PathBuf, OrchestrateError> {
        let dir = self.workdir.join(Self::results_dir_name(name));
        let reset_err = |source| OrchestrateError::ResetFailed {
            path: dir.clone(),
            source,
        };

        if dir.exists() {
            info!(dir = %dir.display(), "Removing stale results directory");
            std::fs::remove_dir_all(&dir).map_err(reset_err)?;
        }
        info!(dir = %dir.display(), "Creating results directory");
        std::fs::create_dir_all(&dir).map_err(reset_err)?;
        Ok(dir)
    }

    /// Algorithm-driven mode: re-derives the full filename matrix for
    /// `algorithm` and solves every expected instance.
    pub async fn run_algorithm(
        &self,
        algorithm: &str,
        duplicates: u32,
    ) -> Result<OrchestrateOutcome, OrchestrateError> {
        let results_dir = self.reset_results_dir(algorithm)?;
        let instance_dir = self.workdir.join(algorithm);

        let grid = ParameterGrid::for_algorithm(algorithm).with_duplicates(duplicates);
        let mut items = Vec::with_capacity(grid.len() * duplicates as usize);
        for point in grid.points() {
            for index in 0..point.duplicates {
                let base = instance_base_name(index, &point, MAX_SIZE);
                items.push(SolveItem {
                    input: instance_dir.join(format!("{base}.json")),
                    output: results_dir.join(result_file_name(&base)),
                });
            }
        }

        info!(algorithm, instances = items.len(), "Running solver over derived matrix");
        let report = self.solve_all(items).await;
        Ok(OrchestrateOutcome { report, results_dir })
    }

    /// Directory-driven mode: solves every file present in `input_dir`.
    pub async fn run_directory(&self, input_dir: &Path) -> Result<OrchestrateOutcome, OrchestrateError> {
        let name = input_dir
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| OrchestrateError::UnnamedDirectory(input_dir.to_path_buf()))?;
        let results_dir = self.reset_results_dir(name)?;

        let mut items = Vec::new();
        let entries = std::fs::read_dir(input_dir).map_err(|source| OrchestrateError::ListFailed {
            path: input_dir.to_path_buf(),
            source,
        })?;
        for entry in entries {
            let entry = entry.map_err(|source| OrchestrateError::ListFailed {
                path: input_dir.to_path_buf(),
                source,
            })?;
            let path = entry.path();
            if !path.is_file() {
                continue;
            }
            let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            items.push(SolveItem {
                output: results_dir.join(format!("{stem}_results.json")),
                input: path,
            });
        }
        // read_dir order is platform-dependent.
        items.sort_by(|a, b| a.input.cmp(&b.input));

        info!(dir = %input_dir.display(), instances = items.len(), "Running solver over directory");
        let report = self.solve_all(items).await;
        Ok(OrchestrateOutcome { report, results_dir })
    }

    async fn solve_all(&self, items: Vec<SolveItem>) -> WorkReport {
        queue::drain("solve", items, |item| {
            let invocation = Invocation::new(
                &self.solver,
                vec![
                    format!("-file={}", item.input.display()),
                    format!("-output={}", item.output.display()),
                ],
            );
            async move {
                let output = self.runner.invoke(&invocation).await?;
                if output.is_success() {
                    Ok(())
                } else {
                    Err(SolveError::NonZeroExit(output.exit_code))
                }
            }
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runner::testing::RecordingRunner;

    fn make_orchestrator(workdir: &Path) -> (Arc<RecordingRunner>, ExecutionOrchestrator) {
        let runner = Arc::new(RecordingRunner::new());
        let orchestrator = ExecutionOrchestrator::new(runner.clone(), "./tester", workdir);
        (runner, orchestrator)
    }

    #[test]
    fn test_results_dir_name() {
        assert_eq!(
            ExecutionOrchestrator::results_dir_name("NextFit"),
            "NEXTFIT_RESULTS"
        );
    }

    #[test]
    fn test_reset_discards_stale_results() {
        let dir = tempfile::tempdir().unwrap();
        let (_, orchestrator) = make_orchestrator(dir.path());

        let results = orchestrator.reset_results_dir("BestFit").unwrap();
        std::fs::write(results.join("stale.json"), b"{}").unwrap();

        let results = orchestrator.reset_results_dir("BestFit").unwrap();
        assert!(results.exists());
        assert!(!results.join("stale.json").exists());
    }

    #[tokio::test]
    async fn test_run_algorithm_derives_full_matrix() {
        let dir = tempfile::tempdir().unwrap();
        let (runner, orchestrator) = make_orchestrator(dir.path());

        let outcome = orchestrator.run_algorithm("NextFit", 2).await.unwrap();

        // 3 centers x 3 counts x 3 variabilities x 2 duplicates.
        assert_eq!(runner.recorded().len(), 54);
        assert_eq!(outcome.report.completed, 54);
        assert!(outcome.results_dir.ends_with("NEXTFIT_RESULTS"));

        let first = &runner.recorded()[0];
        let input = &first.args[0];
        assert!(input.starts_with("-file="), "got {input}");
        assert!(
            input.ends_with("binpacking0_50count_100max_25center_1variability_NextFit.json"),
            "got {input}"
        );
        let output = &first.args[1];
        assert!(
            output.ends_with("binpacking0_50count_100max_25center_1variability_NextFit_results.json"),
            "got {output}"
        );
    }

    #[tokio::test]
    async fn test_run_directory_pairs_outputs() {
        let dir = tempfile::tempdir().unwrap();
        let input_dir = dir.path().join("cases");
        std::fs::create_dir(&input_dir).unwrap();
        std::fs::write(input_dir.join("a.json"), b"{}").unwrap();
        std::fs::write(input_dir.join("b.json"), b"{}").unwrap();

        let (runner, orchestrator) = make_orchestrator(dir.path());
        let outcome = orchestrator.run_directory(&input_dir).await.unwrap();

        assert_eq!(outcome.report.completed, 2);
        assert!(outcome.results_dir.ends_with("CASES_RESULTS"));

        let recorded = runner.recorded();
        assert!(recorded[0].args[0].ends_with("a.json"));
        assert!(recorded[0].args[1].ends_with("a_results.json"));
        assert!(recorded[1].args[1].ends_with("b_results.json"));
    }

    #[tokio::test]
    async fn test_run_directory_missing_input() {
        let dir = tempfile::tempdir().unwrap();
        let (_, orchestrator) = make_orchestrator(dir.path());
        let missing = dir.path().join("absent");
        assert!(matches!(
            orchestrator.run_directory(&missing).await,
            Err(OrchestrateError::ListFailed { .. })
        ));
    }

    #[tokio::test]
    async fn test_failed_instance_does_not_halt_run() {
        let dir = tempfile::tempdir().unwrap();
        let input_dir = dir.path().join("cases");
        std::fs::create_dir(&input_dir).unwrap();
        for name in ["a.json", "b.json", "c.json"] {
            std::fs::write(input_dir.join(name), b"{}").unwrap();
        }

        let runner = Arc::new(RecordingRunner::failing_at(vec![1]));
        let orchestrator = ExecutionOrchestrator::new(runner.clone(), "./tester", dir.path());
        let outcome = orchestrator.run_directory(&input_dir).await.unwrap();

        assert_eq!(outcome.report.completed, 2);
        assert_eq!(outcome.report.failed, 1);
        assert_eq!(runner.recorded().len(), 3);
    }
}
