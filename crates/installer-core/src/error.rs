//! Error types for the download pipeline
//!
//! Every failure is terminal: nothing here is retried or downgraded to a
//! warning. Variants carry the offending value so callers can branch on the
//! kind without matching on message text.

use std::path::PathBuf;
use thiserror::Error;

/// Result alias used throughout the crate
pub type Result<T> = std::result::Result<T, InstallerError>;

#[derive(Debug, Error)]
pub enum InstallerError {
    // Input
    #[error("Invalid repository URI: {uri}")]
    InvalidUri { uri: String },

    #[error("Invalid git reference: '{git_ref}'")]
    InvalidGitRef { git_ref: String },

    // Source
    #[error("Repository not found: {repo}: {reason}")]
    RepositoryNotFound { repo: String, reason: String },

    #[error("Not a git repository: {}", .path.display())]
    NotAGitRepository { path: PathBuf },

    // Reference resolution
    #[error("No release found for {repo}")]
    NoReleaseFound { repo: String },

    #[error("Reference '{git_ref}' not found in {repo}")]
    RefNotFound { repo: String, git_ref: String },

    #[error("Failed to verify reference '{git_ref}' in {repo}: {reason}")]
    RefVerificationFailed {
        repo: String,
        git_ref: String,
        reason: String,
    },

    // Acquisition
    #[error("Failed to download {url}: {reason}")]
    DownloadFailed { url: String, reason: String },

    #[error("Failed to create archive of '{git_ref}' from {}: {reason}", .repo.display())]
    ArchiveCreationFailed {
        repo: PathBuf,
        git_ref: String,
        reason: String,
    },

    // Archive
    #[error("Archive file does not exist: {}", .path.display())]
    ArchiveMissing { path: PathBuf },

    #[error("Archive file is empty: {}", .path.display())]
    ArchiveEmpty { path: PathBuf },

    #[error("Unknown archive format: {}", .path.display())]
    ArchiveFormatUnknown { path: PathBuf },

    #[error("Unable to read archive {}: {source}", .path.display())]
    ReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Expected exactly one top-level entry in {}, found {count}", .archive.display())]
    UnexpectedArchiveLayout { archive: PathBuf, count: usize },

    #[error("Failed to extract {}: {reason}", .archive.display())]
    ExtractionFailure { archive: PathBuf, reason: String },

    #[error("Unsupported archive format: {}", .path.display())]
    UnsupportedFormat { path: PathBuf },

    // Result
    #[error("Invalid project structure: '{manifest}' not found in {}", .destination.display())]
    InvalidProjectStructure {
        destination: PathBuf,
        manifest: String,
    },

    #[error("Destination is not an existing directory: {}", .path.display())]
    InvalidDestination { path: PathBuf },

    // Plumbing
    #[error("Failed to run '{program}': {source}")]
    CommandFailed {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },
}

impl InstallerError {
    /// Wrap an I/O error with a short description of what was being done
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_name_the_offending_value() {
        let err = InstallerError::RefNotFound {
            repo: "https://github.com/acme/app".to_string(),
            git_ref: "9.9.9".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("9.9.9"));
        assert!(msg.contains("https://github.com/acme/app"));

        let err = InstallerError::InvalidProjectStructure {
            destination: PathBuf::from("/tmp/dst"),
            manifest: "composer.json".to_string(),
        };
        assert!(err.to_string().contains("composer.json"));
        assert!(err.to_string().contains("/tmp/dst"));
    }

    #[test]
    fn test_io_helper_keeps_source() {
        let err = InstallerError::io(
            "Failed to create directory",
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        );
        assert_eq!(err.to_string(), "Failed to create directory: denied");
        assert!(std::error::Error::source(&err).is_some());
    }
}
