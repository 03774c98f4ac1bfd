//! Artifact: a resolved (repository, reference) pair
//!
//! An artifact is built once per installation from the user-supplied source
//! string. Parsing walks an ordered table of URI grammars and stops at the
//! first match, so new hosting patterns are added by appending a rule.

use crate::error::{InstallerError, Result};
use regex::Regex;
use std::fmt;
use std::sync::LazyLock;
use url::Url;

/// Repository used when no source is given
pub const DEFAULT_REPO: &str = "https://github.com/drevops/vortex.git";

/// Sentinel ref: latest published release
pub const REF_STABLE: &str = "stable";

/// Sentinel ref: latest commit on the default branch
pub const REF_HEAD: &str = "HEAD";

/// Schemes that mark a repository as remote
const REMOTE_SCHEMES: &[&str] = &["http", "https", "ssh", "git"];

/// What to do when a rule matches
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleAction {
    /// Take the `repo` and optional `ref` captures
    Extract,
    /// Stop parsing and report the input as malformed
    Reject,
}

/// A single URI grammar
#[derive(Debug)]
pub struct UriRule {
    pub name: &'static str,
    pub pattern: &'static str,
    pub action: RuleAction,
}

/// Deprecated `repo@ref` forms, rewritten to `repo#ref` before parsing.
/// The authority segment is consumed first so `user@host` is never taken
/// for a reference.
const DEPRECATED_REF_PATTERNS: &[&str] = &[
    r"^(https?://[^/]+/[^@#]+)@([^@#]+)$",
    r"^((?:ssh|git)://[^/]+/[^@#]+)@([^@#]+)$",
    r"^(git@[^:]+:[^@#]+)@([^@#]+)$",
];

/// URI grammars in match order
pub const URI_RULES: &[UriRule] = &[
    UriRule {
        name: "release-tag",
        pattern: r"^(?P<repo>https?://[^/#]+/[^/#]+/[^/#]+)/releases/tag/(?P<ref>[^#]+?)/?$",
        action: RuleAction::Extract,
    },
    UriRule {
        name: "tree",
        pattern: r"^(?P<repo>https?://[^/#]+/[^/#]+/[^/#]+)/tree/(?P<ref>[^#]+?)/?$",
        action: RuleAction::Extract,
    },
    UriRule {
        name: "commit",
        pattern: r"^(?P<repo>https?://[^/#]+/[^/#]+/[^/#]+)/commit/(?P<ref>[^#]+?)/?$",
        action: RuleAction::Extract,
    },
    UriRule {
        name: "https-git-ref",
        pattern: r"^(?P<repo>https?://.+\.git)#(?P<ref>.+)$",
        action: RuleAction::Extract,
    },
    UriRule {
        name: "scp-ref",
        pattern: r"^(?P<repo>git@.+)#(?P<ref>.+)$",
        action: RuleAction::Extract,
    },
    UriRule {
        name: "https",
        pattern: r"^(?P<repo>https?://[^/#]+/[^/#]+/[^#]+?)(?:#(?P<ref>.+))?$",
        action: RuleAction::Extract,
    },
    UriRule {
        name: "ssh",
        pattern: r"^(?P<repo>(?:ssh|git)://(?:[^@/#]+@)?[^/#]+/[^#]+?)(?:#(?P<ref>.+))?$",
        action: RuleAction::Extract,
    },
    UriRule {
        name: "scp",
        pattern: r"^(?P<repo>git@[^:/#]+:[^#]+?)(?:#(?P<ref>.+))?$",
        action: RuleAction::Extract,
    },
    UriRule {
        name: "file",
        pattern: r"^file://(?P<repo>[^#]+?)(?:#(?P<ref>.+))?$",
        action: RuleAction::Extract,
    },
    // Anything that still looks like a URL did not fit its grammar.
    UriRule {
        name: "malformed-url",
        pattern: r"^(?:[A-Za-z][A-Za-z0-9+.-]*://|git@)",
        action: RuleAction::Reject,
    },
    UriRule {
        name: "local",
        pattern: r"^(?P<repo>[^#]+?)(?:#(?P<ref>.+))?$",
        action: RuleAction::Extract,
    },
];

static DEPRECATED_REF_REGEXES: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    DEPRECATED_REF_PATTERNS
        .iter()
        .map(|p| Regex::new(p).unwrap())
        .collect()
});

static URI_REGEXES: LazyLock<Vec<(&'static UriRule, Regex)>> = LazyLock::new(|| {
    URI_RULES
        .iter()
        .map(|rule| (rule, Regex::new(rule.pattern).unwrap()))
        .collect()
});

/// Immutable (repository, reference) pair
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    repo: String,
    git_ref: String,
}

impl Artifact {
    /// Create an artifact from an explicit repository and reference
    pub fn create(repo: impl Into<String>, git_ref: impl Into<String>) -> Result<Self> {
        let repo = repo.into();
        let git_ref = git_ref.into();

        if repo.trim().is_empty() {
            return Err(InstallerError::InvalidUri { uri: repo });
        }
        if !is_valid_git_ref(&git_ref) {
            return Err(InstallerError::InvalidGitRef { git_ref });
        }

        Ok(Self { repo, git_ref })
    }

    /// The built-in default artifact (default repository, stable release)
    pub fn default_artifact() -> Self {
        Self {
            repo: DEFAULT_REPO.to_string(),
            git_ref: REF_STABLE.to_string(),
        }
    }

    /// Parse a user-supplied source string.
    ///
    /// `None` or a blank string yields [`Artifact::default_artifact`].
    pub fn from_uri(uri: Option<&str>) -> Result<Self> {
        let uri = match uri.map(str::trim) {
            Some(u) if !u.is_empty() => u,
            _ => return Ok(Self::default_artifact()),
        };

        let uri = rewrite_deprecated_ref(uri);
        let (rule, repo, git_ref) = match_uri(&uri)?;

        tracing::debug!(rule = rule.name, %repo, %git_ref, "Parsed artifact URI");

        Self::create(repo, git_ref)
    }

    pub fn repo(&self) -> &str {
        &self.repo
    }

    pub fn git_ref(&self) -> &str {
        &self.git_ref
    }

    pub fn is_remote(&self) -> bool {
        is_remote_repo(&self.repo)
    }

    pub fn is_local(&self) -> bool {
        !self.is_remote()
    }

    pub fn is_stable(&self) -> bool {
        self.git_ref == REF_STABLE
    }

    pub fn is_development(&self) -> bool {
        self.git_ref == REF_HEAD
    }

    /// True when both fields equal the built-in defaults
    pub fn is_default(&self) -> bool {
        self.repo == DEFAULT_REPO && self.git_ref == REF_STABLE
    }

    /// Repository with any trailing `.git` removed
    pub fn normalized_repo_url(&self) -> String {
        self.repo
            .strip_suffix(".git")
            .unwrap_or(&self.repo)
            .to_string()
    }

    /// Normalized repository as an `https://` URL, for HTTP probes and
    /// archive downloads. `git@host:org/repo`, `ssh://` and `git://` forms
    /// are mapped onto the same host and path.
    pub fn http_repo_url(&self) -> Result<String> {
        let normalized = self.normalized_repo_url();
        let invalid = || InstallerError::InvalidUri {
            uri: self.repo.clone(),
        };

        if normalized.starts_with("http://") || normalized.starts_with("https://") {
            return Ok(normalized);
        }

        if let Some(rest) = normalized.strip_prefix("git@") {
            let (host, path) = rest.split_once(':').ok_or_else(invalid)?;
            return Ok(format!("https://{}/{}", host, path.trim_start_matches('/')));
        }

        if normalized.starts_with("ssh://") || normalized.starts_with("git://") {
            let url = Url::parse(&normalized).map_err(|_| invalid())?;
            let host = url.host_str().ok_or_else(invalid)?;
            return Ok(format!("https://{}{}", host, url.path()));
        }

        Err(invalid())
    }
}

impl fmt::Display for Artifact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.repo, self.git_ref)
    }
}

/// Rewrite a deprecated `repo@ref` suffix into `repo#ref`
pub fn rewrite_deprecated_ref(uri: &str) -> String {
    if uri.contains('#') {
        return uri.to_string();
    }

    for re in DEPRECATED_REF_REGEXES.iter() {
        if re.is_match(uri) {
            return re.replace(uri, "$1#$2").into_owned();
        }
    }

    uri.to_string()
}

/// Run the grammar table against a URI, returning the winning rule and the
/// extracted repository and reference (`HEAD` when no reference is given).
pub fn match_uri(uri: &str) -> Result<(&'static UriRule, String, String)> {
    for (rule, re) in URI_REGEXES.iter() {
        let Some(caps) = re.captures(uri) else {
            continue;
        };

        if rule.action == RuleAction::Reject {
            break;
        }

        let repo = caps
            .name("repo")
            .map(|m| m.as_str().to_string())
            .unwrap_or_default();
        let git_ref = caps
            .name("ref")
            .map(|m| m.as_str().to_string())
            .unwrap_or_else(|| REF_HEAD.to_string());

        return Ok((*rule, repo, git_ref));
    }

    Err(InstallerError::InvalidUri {
        uri: uri.to_string(),
    })
}

/// Whether a repository string points at a remote host
pub fn is_remote_repo(repo: &str) -> bool {
    if repo.starts_with("git@") {
        return true;
    }

    repo.split_once("://")
        .map(|(scheme, _)| REMOTE_SCHEMES.contains(&scheme.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

/// Check reference syntax: tags, branches, commit hashes and the sentinels.
/// Shell metacharacters and git-forbidden sequences are rejected.
pub fn is_valid_git_ref(git_ref: &str) -> bool {
    if git_ref == REF_STABLE || git_ref == REF_HEAD {
        return true;
    }

    if git_ref.is_empty()
        || !git_ref
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-' | '/'))
    {
        return false;
    }

    !(git_ref.starts_with(['-', '.', '/'])
        || git_ref.ends_with(['/', '.'])
        || git_ref.contains("..")
        || git_ref.contains("//")
        || git_ref.ends_with(".lock"))
}
