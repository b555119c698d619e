//! Error types shared across harness subsystems.
//!
//! Component-specific errors (runner, storage, orchestration, aggregation)
//! live next to their components; this module holds the enums used by more
//! than one of them.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while decoding an instance file name.
#[derive(Debug, Error)]
pub enum NameError {
    #[error("Instance name '{name}' has {found} '_'-separated tokens, expected at least {expected}")]
    TooFewTokens {
        name: String,
        found: usize,
        expected: usize,
    },

    #[error("Token '{token}' in instance name '{name}' carries no digits")]
    NoDigits { name: String, token: String },

    #[error("Token '{token}' in instance name '{name}' is out of range: {source}")]
    OutOfRange {
        name: String,
        token: String,
        source: std::num::ParseIntError,
    },
}

/// Errors that can occur while extracting an archive.
#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("Failed to open archive '{}': {source}", .path.display())]
    Open {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to extract archive '{}': {source}", .path.display())]
    Extract {
        path: PathBuf,
        source: std::io::Error,
    },
}
