//! Installer Core - artifact resolution and repository download
//!
//! This library turns a user-supplied source string into a working copy of
//! a project template on disk. It is shared by installer binaries that
//! differ only in their product configuration.
//!
//! # Architecture
//!
//! - **Artifact** - parses source URIs into a validated (repository, reference) pair
//! - **Archiver** - detects archive formats and extracts them, optionally stripping one level
//! - **Downloader** - HTTP client with finite timeouts for probes and streamed downloads
//! - **RepositoryDownloader** - remote and local download pipelines ending in a manifest check
//!
//! # Example Usage
//!
//! ```ignore
//! use installer_core::{Artifact, RepositoryDownloader};
//!
//! let artifact = Artifact::from_uri(Some("https://github.com/drevops/vortex#stable"))?;
//! let outcome = RepositoryDownloader::new("my-installer")
//!     .download(&artifact, Path::new("/tmp/project"))
//!     .await?;
//! println!("Installed {}", outcome.version);
//! ```

pub mod archiver;
pub mod artifact;
pub mod downloader;
pub mod error;
pub mod git;
pub mod process;
pub mod product;
pub mod releases;
pub mod repository;

#[cfg(test)]
mod test_support;

// Re-export main types for convenience
pub use archiver::{ArchiveFormat, Archiver};
pub use artifact::{Artifact, DEFAULT_REPO, REF_HEAD, REF_STABLE};
pub use downloader::{Downloader, DownloaderBuilder};
pub use error::{InstallerError, Result};
pub use process::{CommandOutput, CommandRunner, SystemRunner};
pub use product::ProductConfig;
pub use repository::{download, DownloadOutcome, RepositoryDownloader, DEVELOP_VERSION};
