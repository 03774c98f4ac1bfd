//! Release discovery for the `stable` reference

use crate::error::{InstallerError, Result};
use serde::Deserialize;
use url::Url;

/// Public GitHub API
pub const DEFAULT_API_BASE: &str = "https://api.github.com";

/// Media type requested from the releases endpoint
pub const RELEASES_ACCEPT: &str = "application/vnd.github.v3+json";

/// Entry of the releases listing; other fields are ignored
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Release {
    pub tag_name: String,
    #[serde(default)]
    pub draft: bool,
}

/// Releases endpoint for a repository URL such as `https://github.com/org/project`
pub fn releases_api_url(api_base: &str, repo_url: &str) -> Result<String> {
    let invalid = || InstallerError::InvalidUri {
        uri: repo_url.to_string(),
    };

    let url = Url::parse(repo_url).map_err(|_| invalid())?;
    let mut segments = url
        .path_segments()
        .ok_or_else(invalid)?
        .filter(|s| !s.is_empty());

    let org = segments.next().ok_or_else(invalid)?;
    let project = segments.next().ok_or_else(invalid)?;
    let project = project.strip_suffix(".git").unwrap_or(project);

    Ok(format!(
        "{}/repos/{}/{}/releases",
        api_base.trim_end_matches('/'),
        org,
        project
    ))
}

/// First non-draft release, in listing order, whose tag starts with `prefix`
pub fn select_release<'a>(releases: &'a [Release], prefix: Option<&str>) -> Option<&'a str> {
    releases
        .iter()
        .filter(|r| !r.draft)
        .find(|r| prefix.map_or(true, |p| r.tag_name.starts_with(p)))
        .map(|r| r.tag_name.as_str())
}
