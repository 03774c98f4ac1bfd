//! Archive validation and extraction
//!
//! This module provides:
//! - Format detection by magic bytes (tar, tar.gz, zip)
//! - Archive validation before extraction
//! - Extraction, optionally stripping a single wrapping directory
//!
//! Tar archives are unpacked by the system `tar` binary so symbolic links in
//! project trees survive. Zip archives are unpacked in-process.

pub mod format;
pub mod relocate;

use crate::error::{InstallerError, Result};
use crate::process::{CommandRunner, SystemRunner};
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use zip::ZipArchive;

pub use format::{detect_format, ArchiveFormat};

/// Validates and extracts downloaded archives
#[derive(Clone)]
pub struct Archiver {
    runner: Arc<dyn CommandRunner>,
    temp_dir: Option<PathBuf>,
}

impl Default for Archiver {
    fn default() -> Self {
        Self::new(Arc::new(SystemRunner))
    }
}

impl Archiver {
    pub fn new(runner: Arc<dyn CommandRunner>) -> Self {
        Self {
            runner,
            temp_dir: None,
        }
    }

    /// Stage stripped extractions under `dir` instead of the system temp dir
    pub fn with_temp_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.temp_dir = Some(dir.into());
        self
    }

    /// Check the archive exists, is non-empty and has a known format
    pub fn validate(&self, archive: &Path) -> Result<ArchiveFormat> {
        let metadata = fs::metadata(archive).map_err(|_| InstallerError::ArchiveMissing {
            path: archive.to_path_buf(),
        })?;

        if metadata.len() == 0 {
            return Err(InstallerError::ArchiveEmpty {
                path: archive.to_path_buf(),
            });
        }

        detect_format(archive)?.ok_or_else(|| InstallerError::ArchiveFormatUnknown {
            path: archive.to_path_buf(),
        })
    }

    /// Extract `archive` into `destination`.
    ///
    /// With `strip_first_level` the archive must contain exactly one
    /// top-level directory, whose contents end up at the destination root.
    pub fn extract(
        &self,
        archive: &Path,
        destination: &Path,
        strip_first_level: bool,
    ) -> Result<()> {
        let format = detect_format(archive)?.ok_or_else(|| InstallerError::UnsupportedFormat {
            path: archive.to_path_buf(),
        })?;

        fs::create_dir_all(destination).map_err(|e| {
            InstallerError::io(
                format!("Failed to create directory {}", destination.display()),
                e,
            )
        })?;

        tracing::debug!(
            archive = %archive.display(),
            destination = %destination.display(),
            %format,
            strip_first_level,
            "Extracting archive"
        );

        if !strip_first_level {
            return self.unpack(format, archive, destination);
        }

        // Dropping the staging dir removes it on every path out of here.
        let mut builder = tempfile::Builder::new();
        builder.prefix("installer-extract-");
        let staging = match &self.temp_dir {
            Some(dir) => builder.tempdir_in(dir),
            None => builder.tempdir(),
        }
        .map_err(|e| InstallerError::io("Failed to create temporary directory", e))?;

        self.unpack(format, archive, staging.path())?;

        let entries = fs::read_dir(staging.path())
            .map_err(|e| InstallerError::io("Failed to read extracted archive", e))?
            .collect::<std::io::Result<Vec<_>>>()
            .map_err(|e| InstallerError::io("Failed to read extracted archive", e))?;

        let root = match entries.as_slice() {
            [only] if only.path().is_dir() => only.path(),
            _ => {
                return Err(InstallerError::UnexpectedArchiveLayout {
                    archive: archive.to_path_buf(),
                    count: entries.len(),
                })
            }
        };

        relocate::move_contents(&root, destination)
    }

    fn unpack(&self, format: ArchiveFormat, archive: &Path, dir: &Path) -> Result<()> {
        match format {
            ArchiveFormat::Tar => self.unpack_tar(archive, dir, "-xf"),
            ArchiveFormat::TarGz => self.unpack_tar(archive, dir, "-xzf"),
            ArchiveFormat::Zip => unpack_zip(archive, dir),
        }
    }

    fn unpack_tar(&self, archive: &Path, dir: &Path, mode: &str) -> Result<()> {
        let archive_str = archive.to_string_lossy();
        let dir_str = dir.to_string_lossy();
        let out = self
            .runner
            .run("tar", &[mode, &archive_str, "-C", &dir_str], None)?;

        if !out.success() {
            return Err(InstallerError::ExtractionFailure {
                archive: archive.to_path_buf(),
                reason: if out.stderr.is_empty() {
                    format!("tar exited with status {}", out.status)
                } else {
                    out.stderr
                },
            });
        }

        Ok(())
    }
}

fn unpack_zip(archive: &Path, dir: &Path) -> Result<()> {
    let failure = |reason: String| InstallerError::ExtractionFailure {
        archive: archive.to_path_buf(),
        reason,
    };

    let file = File::open(archive).map_err(|source| InstallerError::ReadError {
        path: archive.to_path_buf(),
        source,
    })?;
    let mut zip = ZipArchive::new(file).map_err(|e| failure(e.to_string()))?;
    zip.extract(dir).map_err(|e| failure(e.to_string()))
}
