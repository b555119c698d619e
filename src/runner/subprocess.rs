//! Subprocess-backed [`ToolRunner`].

use std::process::Stdio;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::process::Command;
use tracing::debug;

use super::{Invocation, InvocationOutput, RunnerError, ToolRunner};

/// Default wrapping deadline per invocation. The external tools enforce no
/// timeout of their own, so the harness must.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(300);

/// Runs invocations as child processes, one at a time.
pub struct SubprocessRunner {
    timeout: Duration,
}

impl SubprocessRunner {
    /// Creates a runner with the default deadline.
    pub fn new() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Creates a runner with a custom per-invocation deadline.
    pub fn with_timeout(timeout: Duration) -> Self {
        Self { timeout }
    }
}

impl Default for SubprocessRunner {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ToolRunner for SubprocessRunner {
    async fn invoke(&self, invocation: &Invocation) -> Result<InvocationOutput, RunnerError> {
        let start = Instant::now();

        let mut cmd = Command::new(&invocation.program);
        cmd.args(&invocation.args)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            // Dropping the wait future (deadline hit or loop cancelled) must
            // terminate the child rather than leave it running detached.
            .kill_on_drop(true);
        if let Some(cwd) = &invocation.cwd {
            cmd.current_dir(cwd);
        }

        debug!(invocation = %invocation, "Spawning external tool");

        let child = cmd.spawn().map_err(|source| RunnerError::Spawn {
            program: invocation.program.clone(),
            source,
        })?;

        let output = match tokio::time::timeout(self.timeout, child.wait_with_output()).await {
            Ok(Ok(output)) => output,
            Ok(Err(source)) => return Err(RunnerError::Io(source)),
            Err(_) => return Err(RunnerError::Timeout(self.timeout)),
        };

        Ok(InvocationOutput {
            exit_code: output.status.code().unwrap_or(-1),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            duration: start.elapsed(),
        })
    }
}
