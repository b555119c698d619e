//! External tool invocation.
//!
//! The generator and solver executables are collaborators, not library code;
//! everything the harness knows about them is "run this program with these
//! arguments and tell me how it went". That seam is the [`ToolRunner`] trait,
//! so orchestration logic can be exercised against a recording double without
//! real binaries.

pub mod subprocess;

use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;

pub use subprocess::SubprocessRunner;

/// One pending external tool invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    /// Program to execute.
    pub program: PathBuf,
    /// Arguments, one token each.
    pub args: Vec<String>,
    /// Working directory for the child process.
    pub cwd: Option<PathBuf>,
}

impl Invocation {
    /// Creates an invocation with no working-directory override.
    pub fn new(program: impl Into<PathBuf>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
            cwd: None,
        }
    }

    /// Sets the child's working directory.
    pub fn with_cwd(mut self, cwd: impl Into<PathBuf>) -> Self {
        self.cwd = Some(cwd.into());
        self
    }
}

impl std::fmt::Display for Invocation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.program.display())?;
        for arg in &self.args {
            write!(f, " {arg}")?;
        }
        Ok(())
    }
}

/// Outcome of a completed invocation.
#[derive(Debug, Clone)]
pub struct InvocationOutput {
    /// Exit code of the process (-1 if terminated by a signal).
    pub exit_code: i32,
    /// Captured standard output.
    pub stdout: String,
    /// Captured standard error.
    pub stderr: String,
    /// Wall-clock duration of the invocation.
    pub duration: Duration,
}

impl InvocationOutput {
    /// True when the process exited with code 0.
    pub fn is_success(&self) -> bool {
        self.exit_code == 0
    }
}

/// Errors that can occur while running an external tool.
#[derive(Debug, thiserror::Error)]
pub enum RunnerError {
    #[error("Failed to spawn '{}': {source}", .program.display())]
    Spawn {
        program: PathBuf,
        source: std::io::Error,
    },

    #[error("Invocation timed out after {0:?}")]
    Timeout(Duration),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Capability interface over external executables.
#[async_trait]
pub trait ToolRunner: Send + Sync {
    /// Runs one invocation to completion and returns its output.
    async fn invoke(&self, invocation: &Invocation) -> Result<InvocationOutput, RunnerError>;
}

#[cfg(test)]
pub(crate) mod testing {
    //! Recording double used by component tests in place of real binaries.

    use std::sync::Mutex;
    use std::time::Duration;

    use async_trait::async_trait;

    use super::{Invocation, InvocationOutput, RunnerError, ToolRunner};

    /// Records every invocation and answers with a canned exit code.
    #[derive(Default)]
    pub struct RecordingRunner {
        pub invocations: Mutex<Vec<Invocation>>,
        /// Indices (0-based) of invocations that should report failure.
        pub fail_at: Vec<usize>,
    }

    impl RecordingRunner {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn failing_at(fail_at: Vec<usize>) -> Self {
            Self {
                invocations: Mutex::new(Vec::new()),
                fail_at,
            }
        }

        pub fn recorded(&self) -> Vec<Invocation> {
            self.invocations.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl ToolRunner for RecordingRunner {
        async fn invoke(&self, invocation: &Invocation) -> Result<InvocationOutput, RunnerError> {
            let index = {
                let mut invocations = self.invocations.lock().unwrap();
                invocations.push(invocation.clone());
                invocations.len() - 1
            };
            let exit_code = if self.fail_at.contains(&index) { 1 } else { 0 };
            Ok(InvocationOutput {
                exit_code,
                stdout: String::new(),
                stderr: String::new(),
                duration: Duration::ZERO,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invocation_display() {
        let inv = Invocation::new("./generator", vec!["-count=50".into(), "-dups=2".into()]);
        assert_eq!(inv.to_string(), "./generator -count=50 -dups=2");
    }

    #[test]
    fn test_output_success() {
        let ok = InvocationOutput {
            exit_code: 0,
            stdout: String::new(),
            stderr: String::new(),
            duration: Duration::from_millis(1),
        };
        assert!(ok.is_success());

        let failed = InvocationOutput { exit_code: 2, ..ok };
        assert!(!failed.is_success());
    }
}
