// ABOUTME: Runs approved commands against the real secrets CLI.
// ABOUTME: Captures stdout, stderr, and the exit code; never fails past this boundary.

use std::process::{Command, Stdio};

use crate::protocol::ExecutionResult;

/// Runs an argument vector and reports what happened. Blocking.
pub trait CommandRunner: Send + Sync {
    fn run(&self, args: &[String]) -> ExecutionResult;
}

/// Spawns the configured binary as a subprocess.
#[derive(Debug, Clone)]
pub struct CliRunner {
    binary: String,
}

impl CliRunner {
    pub fn new(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
        }
    }
}

impl CommandRunner for CliRunner {
    fn run(&self, args: &[String]) -> ExecutionResult {
        let output = Command::new(&self.binary)
            .args(args)
            .stdin(Stdio::null())
            .output();

        match output {
            Ok(output) => ExecutionResult {
                stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
                stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
                // Killed by a signal: no code.
                exit: output.status.code().unwrap_or(1),
            },
            Err(e) => {
                tracing::warn!(binary = %self.binary, error = %e, "failed to spawn CLI");
                ExecutionResult::failure(format!("failed to run {}: {}", self.binary, e))
            }
        }
    }
}
