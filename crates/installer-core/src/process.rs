//! Subprocess invocation behind a narrow trait
//!
//! The archiver shells out to `tar` and the git accessor to `git`. Both go
//! through [`CommandRunner`] so tests can substitute a scripted fake.

use crate::error::{InstallerError, Result};
use std::path::Path;
use std::process::Command;

/// Captured result of a finished process
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    /// Exit code (-1 when the process was killed by a signal)
    pub status: i32,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.status == 0
    }
}

/// Runs an external program to completion
pub trait CommandRunner: Send + Sync {
    /// Run `program` with `args`, optionally inside `cwd`.
    ///
    /// A non-zero exit is not an error here; only a failure to spawn is.
    fn run(&self, program: &str, args: &[&str], cwd: Option<&Path>) -> Result<CommandOutput>;
}

/// Runner backed by [`std::process::Command`]
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemRunner;

impl CommandRunner for SystemRunner {
    fn run(&self, program: &str, args: &[&str], cwd: Option<&Path>) -> Result<CommandOutput> {
        let mut command = Command::new(program);
        command.args(args);
        if let Some(dir) = cwd {
            command.current_dir(dir);
        }

        tracing::trace!(program, ?args, ?cwd, "Running command");

        let output = command
            .output()
            .map_err(|source| InstallerError::CommandFailed {
                program: program.to_string(),
                source,
            })?;

        Ok(CommandOutput {
            status: output.status.code().unwrap_or(-1),
            stdout: String::from_utf8_lossy(&output.stdout).trim().to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        })
    }
}
