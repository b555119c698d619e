//! Command-line interface for packbench.
//!
//! Provides commands for instance generation, solver orchestration and
//! results aggregation.

mod commands;

pub use commands::{parse_cli, run, run_with_cli, Cli};
