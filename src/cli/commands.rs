//! CLI command definitions for packbench.
//!
//! Three stages, one subcommand each (plus the directory-driven variant of
//! the run stage): `generate` expands the parameter matrix against the
//! external generator, `run`/`run-dir` drive the external solver, and
//! `process` aggregates archived results into a SQLite store.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::bail;
use clap::Parser;
use tracing::info;

use crate::aggregator::ResultsAggregator;
use crate::generator::InstanceSpaceGenerator;
use crate::matrix::{ParameterGrid, DEFAULT_DUPLICATES};
use crate::orchestrator::ExecutionOrchestrator;
use crate::queue::WorkReport;
use crate::runner::{SubprocessRunner, ToolRunner};
use crate::storage::FlushPolicy;

/// Default path of the external instance generator.
const DEFAULT_GENERATOR: &str = "./generator";

/// Default path of the external solver.
const DEFAULT_SOLVER: &str = "./tester";

/// Default wrapping deadline per external invocation, in seconds.
const DEFAULT_TIMEOUT_SECS: u64 = 300;

/// Bin-packing benchmark harness.
#[derive(Parser)]
#[command(name = "packbench")]
#[command(about = "Generate, run and aggregate bin-packing benchmarks")]
#[command(version)]
#[command(
    long_about = "packbench drives external bin-packing tooling over a parameterized benchmark matrix.\n\nStages:\n  generate  expand the parameter matrix into instance files via the generator executable\n  run       solve every derived instance of one algorithm\n  run-dir   solve every instance file in a directory\n  process   aggregate archived results into a SQLite store\n\nExample usage:\n  packbench process -r results.tar.gz -t cases.tar.gz -a FirstFit -o results.db"
)]
pub struct Cli {
    /// The subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,

    /// Log level (trace, debug, info, warn, error).
    #[arg(short, long, default_value = "info", global = true)]
    pub log_level: String,
}

/// Available CLI subcommands.
#[derive(clap::Subcommand)]
pub enum Commands {
    /// Generate instance files for every point of the benchmark matrix.
    #[command(alias = "gen")]
    Generate(GenerateArgs),

    /// Run the solver over every derived instance of one algorithm.
    Run(RunArgs),

    /// Run the solver over every file in an instance directory.
    RunDir(RunDirArgs),

    /// Aggregate results and test-case archives into a SQLite store.
    #[command(alias = "proc")]
    Process(ProcessArgs),
}

/// Arguments for `packbench generate`.
#[derive(Parser, Debug)]
pub struct GenerateArgs {
    /// Path to the instance generator executable.
    #[arg(long, default_value = DEFAULT_GENERATOR)]
    pub generator: PathBuf,

    /// Comma-separated algorithm list (default: the 8 built-in algorithms).
    #[arg(long)]
    pub algorithms: Option<String>,

    /// Instances generated per parameter point.
    #[arg(long, default_value_t = DEFAULT_DUPLICATES)]
    pub dups: u32,

    /// Working directory the per-algorithm output directories land in.
    #[arg(short, long, default_value = ".")]
    pub workdir: PathBuf,

    /// Deadline per generator invocation, in seconds.
    #[arg(long, default_value_t = DEFAULT_TIMEOUT_SECS)]
    pub timeout_secs: u64,
}

/// Arguments for `packbench run`.
#[derive(Parser, Debug)]
pub struct RunArgs {
    /// The algorithm to run all instances for.
    #[arg(short, long)]
    pub algorithm: String,

    /// Path to the solver executable.
    #[arg(long, default_value = DEFAULT_SOLVER)]
    pub solver: PathBuf,

    /// Instances expected per parameter point.
    #[arg(long, default_value_t = DEFAULT_DUPLICATES)]
    pub dups: u32,

    /// Working directory holding the instance directory; the results
    /// directory is created here.
    #[arg(short, long, default_value = ".")]
    pub workdir: PathBuf,

    /// Deadline per solver invocation, in seconds.
    #[arg(long, default_value_t = DEFAULT_TIMEOUT_SECS)]
    pub timeout_secs: u64,
}

/// Arguments for `packbench run-dir`.
#[derive(Parser, Debug)]
pub struct RunDirArgs {
    /// The directory containing instance files.
    #[arg(short, long)]
    pub file: PathBuf,

    /// Path to the solver executable.
    #[arg(long, default_value = DEFAULT_SOLVER)]
    pub solver: PathBuf,

    /// Working directory the results directory is created in.
    #[arg(short, long, default_value = ".")]
    pub workdir: PathBuf,

    /// Deadline per solver invocation, in seconds.
    #[arg(long, default_value_t = DEFAULT_TIMEOUT_SECS)]
    pub timeout_secs: u64,
}

/// Arguments for `packbench process`.
#[derive(Parser, Debug)]
pub struct ProcessArgs {
    /// Tar file containing results JSON files.
    #[arg(short = 'r', long = "resultsTar")]
    pub results_tar: PathBuf,

    /// Tar file containing test case descriptions.
    #[arg(short = 't', long = "testCasesTar")]
    pub test_cases_tar: PathBuf,

    /// Filename of the output SQLite database.
    #[arg(short, long)]
    pub output: String,

    /// Algorithm to process files for.
    #[arg(short, long)]
    pub algorithm: String,

    /// Working directory archives are extracted into.
    #[arg(short, long, default_value = ".")]
    pub workdir: PathBuf,

    /// Only flush full batches, dropping a trailing partial batch (the
    /// behavior of the legacy tooling).
    #[arg(long)]
    pub no_final_flush: bool,
}

/// Parses CLI arguments without running a command.
pub fn parse_cli() -> Cli {
    Cli::parse()
}

/// Parses CLI arguments and runs the selected command.
pub async fn run() -> anyhow::Result<()> {
    run_with_cli(parse_cli()).await
}

/// Runs the selected command with pre-parsed arguments.
pub async fn run_with_cli(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Commands::Generate(args) => generate(args).await,
        Commands::Run(args) => run_algorithm(args).await,
        Commands::RunDir(args) => run_directory(args).await,
        Commands::Process(args) => process(args).await,
    }
}

fn subprocess_runner(timeout_secs: u64) -> Arc<dyn ToolRunner> {
    Arc::new(SubprocessRunner::with_timeout(Duration::from_secs(
        timeout_secs,
    )))
}

fn check_interrupted(report: &WorkReport) -> anyhow::Result<()> {
    if report.cancelled {
        bail!("Interrupted after {} items", report.processed());
    }
    Ok(())
}

async fn generate(args: GenerateArgs) -> anyhow::Result<()> {
    let mut grid = ParameterGrid::default().with_duplicates(args.dups);
    if let Some(list) = &args.algorithms {
        let algorithms: Vec<String> = list
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();
        if algorithms.is_empty() {
            bail!("--algorithms was given but holds no algorithm names");
        }
        grid = grid.with_algorithms(algorithms);
    }

    let generator =
        InstanceSpaceGenerator::new(subprocess_runner(args.timeout_secs), args.generator, args.workdir);
    let outcome = generator.generate(&grid).await;

    info!(
        completed = outcome.report.completed,
        failed = outcome.report.failed,
        "Generation finished"
    );
    check_interrupted(&outcome.report)
}

async fn run_algorithm(args: RunArgs) -> anyhow::Result<()> {
    let orchestrator = ExecutionOrchestrator::new(
        subprocess_runner(args.timeout_secs),
        args.solver,
        args.workdir,
    );
    let outcome = orchestrator.run_algorithm(&args.algorithm, args.dups).await?;

    info!(
        results_dir = %outcome.results_dir.display(),
        completed = outcome.report.completed,
        failed = outcome.report.failed,
        "Run finished"
    );
    check_interrupted(&outcome.report)
}

async fn run_directory(args: RunDirArgs) -> anyhow::Result<()> {
    let orchestrator = ExecutionOrchestrator::new(
        subprocess_runner(args.timeout_secs),
        args.solver,
        args.workdir,
    );
    let outcome = orchestrator.run_directory(&args.file).await?;

    info!(
        results_dir = %outcome.results_dir.display(),
        completed = outcome.report.completed,
        failed = outcome.report.failed,
        "Run finished"
    );
    check_interrupted(&outcome.report)
}

async fn process(args: ProcessArgs) -> anyhow::Result<()> {
    let flush_policy = if args.no_final_flush {
        FlushPolicy::OnThreshold
    } else {
        FlushPolicy::OnCompletion
    };

    let aggregator = ResultsAggregator::new(args.workdir).with_flush_policy(flush_policy);
    let summary = aggregator
        .aggregate(
            &args.results_tar,
            &args.test_cases_tar,
            &args.algorithm,
            &args.output,
        )
        .await?;

    info!(
        inserted = summary.inserted,
        skipped = summary.skipped,
        "Processing finished"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_process_flag_spelling() {
        let cli = Cli::try_parse_from([
            "packbench",
            "process",
            "--resultsTar",
            "results.tar",
            "-t",
            "cases.tar",
            "-o",
            "out.db",
            "-a",
            "FirstFit",
        ])
        .unwrap();
        match cli.command {
            Commands::Process(args) => {
                assert_eq!(args.results_tar, PathBuf::from("results.tar"));
                assert_eq!(args.test_cases_tar, PathBuf::from("cases.tar"));
                assert_eq!(args.output, "out.db");
                assert_eq!(args.algorithm, "FirstFit");
                assert!(!args.no_final_flush);
            }
            _ => panic!("expected process subcommand"),
        }
    }

    #[test]
    fn test_run_defaults() {
        let cli = Cli::try_parse_from(["packbench", "run", "-a", "NextFit"]).unwrap();
        match cli.command {
            Commands::Run(args) => {
                assert_eq!(args.algorithm, "NextFit");
                assert_eq!(args.solver, PathBuf::from("./tester"));
                assert_eq!(args.dups, DEFAULT_DUPLICATES);
                assert_eq!(args.timeout_secs, DEFAULT_TIMEOUT_SECS);
            }
            _ => panic!("expected run subcommand"),
        }
    }

    #[test]
    fn test_run_dir_takes_file_flag() {
        let cli = Cli::try_parse_from(["packbench", "run-dir", "-f", "NextFit"]).unwrap();
        match cli.command {
            Commands::RunDir(args) => assert_eq!(args.file, PathBuf::from("NextFit")),
            _ => panic!("expected run-dir subcommand"),
        }
    }

    #[test]
    fn test_missing_required_flag_rejected() {
        assert!(Cli::try_parse_from(["packbench", "run"]).is_err());
        assert!(Cli::try_parse_from(["packbench", "process", "-o", "out.db"]).is_err());
    }
}
