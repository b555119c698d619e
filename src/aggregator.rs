//! Results aggregation.
//!
//! Takes a results archive and a test-case archive, pairs every test case
//! with its result file by name, decodes the parameters embedded in the file
//! name, merges them with fields from both payloads, computes the optimality
//! ratio and bulk-loads rows into the SQLite store.
//!
//! Error policy: extraction failure or a missing expected directory aborts
//! the run before anything is written. A single bad pair (missing result,
//! malformed JSON, missing field, non-positive lower bound) is skipped and
//! counted; the batch never aborts on one.

use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, info};

use crate::archive;
use crate::error::{ArchiveError, NameError};
use crate::naming::{parse_instance_name, result_file_name};
use crate::orchestrator::ExecutionOrchestrator;
use crate::storage::{
    solution_optimality, FlushPolicy, RecordBatcher, ResultRecord, ResultStore, StoreError,
    BATCH_SIZE,
};

/// How often progress is logged while pairing files.
const PROGRESS_INTERVAL: usize = 1000;

/// Errors that abort an aggregation run.
#[derive(Debug, Error)]
pub enum AggregateError {
    #[error(transparent)]
    Archive(#[from] ArchiveError),

    #[error("Test cases directory for algorithm '{algorithm}' does not exist: {}", .path.display())]
    MissingTestCases { algorithm: String, path: PathBuf },

    #[error("Results directory for algorithm '{algorithm}' does not exist: {}", .path.display())]
    MissingResults { algorithm: String, path: PathBuf },

    #[error("Failed to list '{}': {source}", .path.display())]
    List {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("Failed to remove extracted directory '{}': {source}", .path.display())]
    Cleanup {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Why one (instance, result) pair was skipped.
#[derive(Debug, Error)]
enum SkipReason {
    #[error("No result file at {}", .0.display())]
    MissingResult(PathBuf),

    #[error("Unreadable file {}: {source}", .path.display())]
    Unreadable {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Malformed payload in {}: {source}", .path.display())]
    Malformed {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("Undecodable instance name: {0}")]
    BadName(#[from] NameError),

    #[error("Non-positive lower bound {0}, optimality undefined")]
    NonPositiveLowerBound(i64),
}

/// Fields read from an instance payload. Unknown fields are ignored.
#[derive(Debug, Deserialize)]
struct InstancePayload {
    #[serde(rename = "lowerBound")]
    lower_bound: i64,
    algorithm: String,
}

/// Fields read from a result payload.
#[derive(Debug, Deserialize)]
struct ResultPayload {
    count: i64,
    solution_time: f64,
}

/// Tally of an aggregation run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AggregateSummary {
    /// Rows handed to the store.
    pub inserted: usize,
    /// Pairs skipped (missing result, parse failure, bad name, bad bound).
    pub skipped: usize,
    /// Bulk-insert statements issued.
    pub flushes: usize,
}

/// Pairs extracted test cases with results and loads them into the store.
pub struct ResultsAggregator {
    workdir: PathBuf,
    batch_size: usize,
    flush_policy: FlushPolicy,
}

impl ResultsAggregator {
    /// Creates an aggregator extracting and pairing under `workdir`.
    pub fn new(workdir: impl Into<PathBuf>) -> Self {
        Self {
            workdir: workdir.into(),
            batch_size: BATCH_SIZE,
            flush_policy: FlushPolicy::OnCompletion,
        }
    }

    /// Overrides the bulk-insert batch size.
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    /// Sets what happens to a trailing partial batch.
    pub fn with_flush_policy(mut self, flush_policy: FlushPolicy) -> Self {
        self.flush_policy = flush_policy;
        self
    }

    /// Runs the full aggregation: extract, pair, load, clean up.
    pub async fn aggregate(
        &self,
        results_tar: &Path,
        test_cases_tar: &Path,
        algorithm: &str,
        store_path: &str,
    ) -> Result<AggregateSummary, AggregateError> {
        archive::extract(results_tar, &self.workdir)?;
        archive::extract(test_cases_tar, &self.workdir)?;

        let test_cases_dir = self.workdir.join(algorithm);
        let results_dir = self
            .workdir
            .join(ExecutionOrchestrator::results_dir_name(algorithm));

        if !test_cases_dir.is_dir() {
            return Err(AggregateError::MissingTestCases {
                algorithm: algorithm.to_string(),
                path: test_cases_dir,
            });
        }
        if !results_dir.is_dir() {
            return Err(AggregateError::MissingResults {
                algorithm: algorithm.to_string(),
                path: results_dir,
            });
        }

        let store = ResultStore::open(store_path).await?;
        let summary = self
            .load_pairs(&store, &test_cases_dir, &results_dir)
            .await?;

        for dir in [&test_cases_dir, &results_dir] {
            info!(dir = %dir.display(), "Removing extracted directory");
            std::fs::remove_dir_all(dir).map_err(|source| AggregateError::Cleanup {
                path: dir.clone(),
                source,
            })?;
        }

        info!(
            algorithm,
            inserted = summary.inserted,
            skipped = summary.skipped,
            flushes = summary.flushes,
            "Aggregation complete"
        );
        Ok(summary)
    }

    /// Pairs every test-case file with its result and batch-loads the rows.
    async fn load_pairs(
        &self,
        store: &ResultStore,
        test_cases_dir: &Path,
        results_dir: &Path,
    ) -> Result<AggregateSummary, AggregateError> {
        let mut files: Vec<PathBuf> = Vec::new();
        let entries =
            std::fs::read_dir(test_cases_dir).map_err(|source| AggregateError::List {
                path: test_cases_dir.to_path_buf(),
                source,
            })?;
        for entry in entries {
            let entry = entry.map_err(|source| AggregateError::List {
                path: test_cases_dir.to_path_buf(),
                source,
            })?;
            if entry.path().is_file() {
                files.push(entry.path());
            }
        }
        files.sort();

        let total = files.len();
        let mut summary = AggregateSummary::default();
        let mut batcher = RecordBatcher::new(self.batch_size);

        for (processed, test_case) in files.into_iter().enumerate() {
            match build_record(&test_case, results_dir) {
                Ok(record) => {
                    if let Some(batch) = batcher.push(record) {
                        store.insert_batch(&batch).await?;
                        summary.inserted += batch.len();
                        summary.flushes += 1;
                    }
                }
                Err(reason) => {
                    debug!(file = %test_case.display(), %reason, "Skipping pair");
                    summary.skipped += 1;
                }
            }

            if (processed + 1) % PROGRESS_INTERVAL == 0 {
                info!(done = processed + 1, total, "Pairing progress");
            }
        }

        if let Some(batch) = batcher.finish(self.flush_policy) {
            store.insert_batch(&batch).await?;
            summary.inserted += batch.len();
            summary.flushes += 1;
        }

        Ok(summary)
    }
}

/// Builds one row from a test-case file and its expected result file.
fn build_record(test_case: &Path, results_dir: &Path) -> Result<ResultRecord, SkipReason> {
    let base = test_case
        .file_stem()
        .and_then(|s| s.to_str())
        .ok_or_else(|| {
            SkipReason::BadName(NameError::TooFewTokens {
                name: test_case.display().to_string(),
                found: 0,
                expected: 5,
            })
        })?;

    let result_path = results_dir.join(result_file_name(base));
    if !result_path.exists() {
        return Err(SkipReason::MissingResult(result_path));
    }

    let instance: InstancePayload = read_json(test_case)?;
    let result: ResultPayload = read_json(&result_path)?;
    let decoded = parse_instance_name(base)?;

    if instance.lower_bound <= 0 {
        return Err(SkipReason::NonPositiveLowerBound(instance.lower_bound));
    }

    Ok(ResultRecord {
        count: decoded.count as i64,
        center: decoded.center as i64,
        variability: decoded.variability as i64,
        lower_bound: instance.lower_bound,
        algorithm: instance.algorithm,
        solution_bin_count: result.count,
        solution_time: result.solution_time,
        solution_optimality: solution_optimality(result.count, instance.lower_bound),
    })
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, SkipReason> {
    let bytes = std::fs::read(path).map_err(|source| SkipReason::Unreadable {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_slice(&bytes).map_err(|source| SkipReason::Malformed {
        path: path.to_path_buf(),
        source,
    })
}
