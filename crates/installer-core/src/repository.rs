//! Repository download orchestration
//!
//! Remote sources are probed over HTTP, resolved to a concrete reference and
//! fetched as `{repo}/archive/{ref}.tar.gz`. Local sources are archived with
//! `git archive`. Both end with extraction and a manifest check.

use crate::archiver::Archiver;
use crate::artifact::{Artifact, REF_HEAD, REF_STABLE};
use crate::downloader::{auth_headers, Downloader};
use crate::error::{InstallerError, Result};
use crate::git::GitAccessor;
use crate::process::{CommandRunner, SystemRunner};
use crate::product::ProductConfig;
use crate::releases::{self, Release, DEFAULT_API_BASE, RELEASES_ACCEPT};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT};
use reqwest::StatusCode;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempPath;

/// Version label reported for `HEAD` downloads
pub const DEVELOP_VERSION: &str = "develop";

/// Manifest expected at the root of every downloaded project
pub const DEFAULT_MANIFEST: &str = "composer.json";

/// What a successful download produced
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadOutcome {
    /// Human-readable version label: a tag, `develop`, or the custom ref
    pub version: String,
    /// Reference that was actually archived
    pub git_ref: String,
}

/// Archive URL for a repository and reference
pub fn archive_url(repo_url: &str, git_ref: &str) -> String {
    format!("{}/archive/{}.tar.gz", repo_url.trim_end_matches('/'), git_ref)
}

/// Downloads an artifact into a destination directory
pub struct RepositoryDownloader {
    downloader: Downloader,
    tools: LocalTools,
    token: Option<String>,
    api_base: String,
    manifest_file: String,
    release_prefix: Option<String>,
}

/// Blocking half of a download: `git`, `tar` and filesystem work
#[derive(Clone)]
struct LocalTools {
    archiver: Archiver,
    runner: Arc<dyn CommandRunner>,
    temp_dir: Option<PathBuf>,
}

impl RepositoryDownloader {
    /// Create a repository downloader with a custom user agent
    pub fn new(user_agent: &str) -> Self {
        Self::from_downloader(Downloader::new(user_agent))
    }

    /// Create a repository downloader from a product config
    pub fn from_config<C: ProductConfig>(config: &C) -> Self {
        let downloader = Downloader::builder(config.user_agent())
            .no_proxy(!config.use_system_proxy())
            .build();

        Self::from_downloader(downloader)
            .with_token(config.token())
            .with_api_base(config.releases_api_base())
            .with_manifest_file(config.manifest_file())
    }

    fn from_downloader(downloader: Downloader) -> Self {
        let runner: Arc<dyn CommandRunner> = Arc::new(SystemRunner);
        Self {
            downloader,
            tools: LocalTools {
                archiver: Archiver::new(runner.clone()),
                runner,
                temp_dir: None,
            },
            token: None,
            api_base: DEFAULT_API_BASE.to_string(),
            manifest_file: DEFAULT_MANIFEST.to_string(),
            release_prefix: None,
        }
    }

    /// Use `runner` for `git` and `tar` invocations
    pub fn with_runner(mut self, runner: Arc<dyn CommandRunner>) -> Self {
        self.tools.runner = runner;
        self.tools.rebuild_archiver();
        self
    }

    /// Create temporary archives and staging directories under `dir`
    pub fn with_temp_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.tools.temp_dir = Some(dir.into());
        self.tools.rebuild_archiver();
        self
    }

    pub fn with_downloader(mut self, downloader: Downloader) -> Self {
        self.downloader = downloader;
        self
    }

    pub fn with_token(mut self, token: Option<String>) -> Self {
        self.token = token;
        self
    }

    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into();
        self
    }

    pub fn with_manifest_file(mut self, manifest_file: impl Into<String>) -> Self {
        self.manifest_file = manifest_file.into();
        self
    }

    /// Only consider releases whose tag starts with `prefix` for `stable`
    pub fn with_release_prefix(mut self, prefix: Option<String>) -> Self {
        self.release_prefix = prefix.filter(|p| !p.is_empty());
        self
    }

    /// Download `artifact` into `destination`, which must already exist.
    pub async fn download(
        &self,
        artifact: &Artifact,
        destination: &Path,
    ) -> Result<DownloadOutcome> {
        if !destination.is_dir() {
            return Err(InstallerError::InvalidDestination {
                path: destination.to_path_buf(),
            });
        }

        tracing::debug!(%artifact, remote = artifact.is_remote(), "Starting download");

        let outcome = if artifact.is_remote() {
            self.download_remote(artifact, destination).await?
        } else {
            let tools = self.tools.clone();
            let artifact = artifact.clone();
            let destination = destination.to_path_buf();
            blocking(move || tools.download_local(&artifact, &destination)).await?
        };

        self.ensure_project(destination)?;

        tracing::info!(
            version = %outcome.version,
            git_ref = %outcome.git_ref,
            destination = %destination.display(),
            "Downloaded repository"
        );

        Ok(outcome)
    }

    async fn download_remote(&self, artifact: &Artifact, destination: &Path) -> Result<DownloadOutcome> {
        let repo_url = artifact.http_repo_url()?;

        self.verify_repository(&repo_url).await?;

        let (git_ref, version) = match artifact.git_ref() {
            REF_STABLE => {
                let tag = self.resolve_stable_release(&repo_url).await?;
                (tag.clone(), tag)
            }
            REF_HEAD => (REF_HEAD.to_string(), DEVELOP_VERSION.to_string()),
            other => {
                self.verify_remote_ref(&repo_url, other).await?;
                (other.to_string(), other.to_string())
            }
        };

        let url = archive_url(&repo_url, &git_ref);
        let archive = temp_archive(self.tools.temp_dir.as_deref(), ".tar.gz")?;

        let result = self.fetch_and_extract(&url, &archive, destination).await;
        release_temp(archive);
        result?;

        Ok(DownloadOutcome { version, git_ref })
    }

    async fn fetch_and_extract(&self, url: &str, archive: &Path, destination: &Path) -> Result<()> {
        self.downloader
            .download(url, archive, self.headers())
            .await?;

        let archiver = self.tools.archiver.clone();
        let archive = archive.to_path_buf();
        let destination = destination.to_path_buf();
        blocking(move || {
            archiver.validate(&archive)?;
            archiver.extract(&archive, &destination, true)
        })
        .await
    }

    /// Latest non-draft release tag of a remote repository
    pub async fn resolve_stable_release(&self, repo_url: &str) -> Result<String> {
        let api_url = releases::releases_api_url(&self.api_base, repo_url)?;

        let mut headers = self.headers();
        headers.insert(ACCEPT, HeaderValue::from_static(RELEASES_ACCEPT));

        let releases: Vec<Release> = self
            .downloader
            .get_json(&api_url, headers)
            .await
            .map_err(|e| InstallerError::DownloadFailed {
                url: api_url.clone(),
                reason: e.to_string(),
            })?;

        let tag = releases::select_release(&releases, self.release_prefix.as_deref())
            .ok_or_else(|| InstallerError::NoReleaseFound {
                repo: repo_url.to_string(),
            })?;

        tracing::debug!(%repo_url, tag, "Resolved stable release");
        Ok(tag.to_string())
    }

    async fn verify_repository(&self, repo_url: &str) -> Result<()> {
        let not_found = |reason: String| InstallerError::RepositoryNotFound {
            repo: repo_url.to_string(),
            reason,
        };

        let status = self
            .downloader
            .head(repo_url, self.headers())
            .await
            .map_err(|e| not_found(e.to_string()))?;

        if status.as_u16() >= 400 {
            return Err(not_found(format!("HTTP {}", status)));
        }

        Ok(())
    }

    async fn verify_remote_ref(&self, repo_url: &str, git_ref: &str) -> Result<()> {
        let url = archive_url(repo_url, git_ref);
        let failed = |reason: String| InstallerError::RefVerificationFailed {
            repo: repo_url.to_string(),
            git_ref: git_ref.to_string(),
            reason,
        };

        let status = self
            .downloader
            .head(&url, self.headers())
            .await
            .map_err(|e| failed(e.to_string()))?;

        if status == StatusCode::NOT_FOUND {
            return Err(InstallerError::RefNotFound {
                repo: repo_url.to_string(),
                git_ref: git_ref.to_string(),
            });
        }
        if status.as_u16() >= 400 {
            return Err(failed(format!("HTTP {} from {}", status, url)));
        }

        Ok(())
    }

    fn ensure_project(&self, destination: &Path) -> Result<()> {
        if destination.join(&self.manifest_file).is_file() {
            return Ok(());
        }

        Err(InstallerError::InvalidProjectStructure {
            destination: destination.to_path_buf(),
            manifest: self.manifest_file.clone(),
        })
    }

    fn headers(&self) -> HeaderMap {
        auth_headers(self.token.as_deref())
    }
}

impl LocalTools {
    fn rebuild_archiver(&mut self) {
        let archiver = Archiver::new(self.runner.clone());
        self.archiver = match &self.temp_dir {
            Some(dir) => archiver.with_temp_dir(dir),
            None => archiver,
        };
    }

    fn download_local(&self, artifact: &Artifact, destination: &Path) -> Result<DownloadOutcome> {
        let repo = Path::new(artifact.repo());
        if !GitAccessor::is_repository(repo) {
            return Err(InstallerError::NotAGitRepository {
                path: repo.to_path_buf(),
            });
        }

        let git = GitAccessor::new(repo, self.runner.clone());

        // Local checkouts have no releases; `stable` means the current HEAD.
        let (git_ref, version) = match artifact.git_ref() {
            REF_STABLE | REF_HEAD => (git.short_head()?, DEVELOP_VERSION.to_string()),
            other => {
                if !git.ref_exists(other)? {
                    return Err(InstallerError::RefNotFound {
                        repo: artifact.repo().to_string(),
                        git_ref: other.to_string(),
                    });
                }
                (other.to_string(), other.to_string())
            }
        };

        let archive = temp_archive(self.temp_dir.as_deref(), ".tar")?;

        let result = self.archive_and_extract(&git, &git_ref, &archive, destination);
        release_temp(archive);
        result?;

        Ok(DownloadOutcome { version, git_ref })
    }

    fn archive_and_extract(
        &self,
        git: &GitAccessor,
        git_ref: &str,
        archive: &Path,
        destination: &Path,
    ) -> Result<()> {
        git.archive(git_ref, archive)?;

        let size = std::fs::metadata(archive).map(|m| m.len()).unwrap_or(0);
        if size == 0 {
            return Err(InstallerError::ArchiveCreationFailed {
                repo: git.repo().to_path_buf(),
                git_ref: git_ref.to_string(),
                reason: format!("{} is missing or empty", archive.display()),
            });
        }

        self.archiver.validate(archive)?;
        self.archiver.extract(archive, destination, false)
    }
}

/// Run blocking work off the async worker threads
async fn blocking<T, F>(task: F) -> Result<T>
where
    F: FnOnce() -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    match tokio::task::spawn_blocking(task).await {
        Ok(result) => result,
        Err(e) => match e.try_into_panic() {
            Ok(panic) => std::panic::resume_unwind(panic),
            Err(e) => Err(InstallerError::io(
                "Background task was cancelled",
                std::io::Error::other(e),
            )),
        },
    }
}

/// Download `repo` at `git_ref` into `destination` with default settings,
/// returning the version label.
///
/// The access token is read from `GITHUB_TOKEN`.
pub async fn download(repo: &str, git_ref: &str, destination: &Path) -> Result<String> {
    let artifact = Artifact::create(repo, git_ref)?;
    let token = std::env::var("GITHUB_TOKEN")
        .ok()
        .filter(|t| !t.trim().is_empty());

    let outcome = RepositoryDownloader::new(env!("CARGO_PKG_NAME"))
        .with_token(token)
        .download(&artifact, destination)
        .await?;

    Ok(outcome.version)
}

fn temp_archive(dir: Option<&Path>, suffix: &str) -> Result<TempPath> {
    let mut builder = tempfile::Builder::new();
    builder.prefix("installer-").suffix(suffix);
    match dir {
        Some(dir) => builder.tempfile_in(dir),
        None => builder.tempfile(),
    }
    .map(|f| f.into_temp_path())
        .map_err(|e| InstallerError::io("Failed to create temporary archive file", e))
}

fn release_temp(archive: TempPath) {
    let path = archive.to_path_buf();
    if let Err(e) = archive.close() {
        tracing::warn!(path = %path.display(), error = %e, "Failed to remove temporary archive");
    }
}
