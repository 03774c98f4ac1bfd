//! Local git repository access

use crate::error::{InstallerError, Result};
use crate::process::CommandRunner;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Thin wrapper over `git` subcommands run inside one repository
pub struct GitAccessor {
    repo: PathBuf,
    runner: Arc<dyn CommandRunner>,
}

impl GitAccessor {
    pub fn new(repo: impl Into<PathBuf>, runner: Arc<dyn CommandRunner>) -> Self {
        Self {
            repo: repo.into(),
            runner,
        }
    }

    pub fn repo(&self) -> &Path {
        &self.repo
    }

    /// True when `path` is a directory holding a `.git` directory
    pub fn is_repository(path: &Path) -> bool {
        path.is_dir() && path.join(".git").is_dir()
    }

    /// Whether `git_ref` resolves (`git rev-parse --verify`)
    pub fn ref_exists(&self, git_ref: &str) -> Result<bool> {
        let out = self
            .runner
            .run("git", &["rev-parse", "--verify", git_ref], Some(&self.repo))?;
        Ok(out.success())
    }

    /// Abbreviated id of the commit HEAD points at
    pub fn short_head(&self) -> Result<String> {
        let out = self
            .runner
            .run("git", &["rev-parse", "--short", "HEAD"], Some(&self.repo))?;

        if !out.success() || out.stdout.is_empty() {
            return Err(InstallerError::RefNotFound {
                repo: self.repo.display().to_string(),
                git_ref: "HEAD".to_string(),
            });
        }

        Ok(out.stdout)
    }

    /// Write a tar archive of `git_ref` to `output`
    pub fn archive(&self, git_ref: &str, output: &Path) -> Result<()> {
        let output_str = output.to_string_lossy();
        let out = self.runner.run(
            "git",
            &["archive", "--format=tar", "-o", &output_str, git_ref],
            Some(&self.repo),
        )?;

        if !out.success() {
            return Err(InstallerError::ArchiveCreationFailed {
                repo: self.repo.clone(),
                git_ref: git_ref.to_string(),
                reason: out.stderr,
            });
        }

        Ok(())
    }
}
