//! Product configuration trait for installer binaries
//!
//! Each product implements this trait to define its identity and the
//! settings the download pipeline reads: user agent, token variable,
//! manifest file and release API location.

use crate::artifact::Artifact;
use crate::error::Result;
use crate::releases::DEFAULT_API_BASE;

/// Configuration trait for different installer products
pub trait ProductConfig: Clone + Send + Sync + 'static {
    /// Internal product name (used for CLI command, env vars)
    fn name(&self) -> &'static str;

    /// Human-readable display name
    fn display_name(&self) -> &'static str;

    /// Environment variable overriding the default source URI
    fn source_env(&self) -> &'static str;

    /// URL for product documentation
    fn docs_url(&self) -> &'static str;

    /// Environment variable holding an API access token
    fn token_env(&self) -> &'static str {
        "GITHUB_TOKEN"
    }

    /// File that must exist at the root of a downloaded project
    fn manifest_file(&self) -> &'static str {
        "composer.json"
    }

    /// Base URL of the releases API
    fn releases_api_base(&self) -> &'static str {
        DEFAULT_API_BASE
    }

    /// User agent string for HTTP requests
    fn user_agent(&self) -> &'static str {
        self.name()
    }

    /// Whether HTTP requests go through proxies configured in the environment
    fn use_system_proxy(&self) -> bool {
        true
    }

    /// Access token from the environment, if set and non-empty
    fn token(&self) -> Option<String> {
        std::env::var(self.token_env())
            .ok()
            .filter(|t| !t.trim().is_empty())
    }

    /// Resolve the artifact to install: an explicit URI wins, then the
    /// source environment variable, then the built-in default.
    fn artifact(&self, uri: Option<&str>) -> Result<Artifact> {
        let from_env = std::env::var(self.source_env()).ok();
        Artifact::from_uri(uri.or(from_env.as_deref()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Clone)]
    struct TestConfig;

    impl ProductConfig for TestConfig {
        fn name(&self) -> &'static str {
            "test-installer"
        }

        fn display_name(&self) -> &'static str {
            "Test"
        }

        fn source_env(&self) -> &'static str {
            "TEST_INSTALLER_SOURCE_UNSET_FOR_TESTS"
        }

        fn docs_url(&self) -> &'static str {
            "https://example.com/docs"
        }

        fn token_env(&self) -> &'static str {
            "TEST_INSTALLER_TOKEN_UNSET_FOR_TESTS"
        }
    }

    #[test]
    fn test_defaults() {
        let config = TestConfig;
        assert_eq!(config.user_agent(), "test-installer");
        assert_eq!(config.manifest_file(), "composer.json");
        assert_eq!(config.releases_api_base(), "https://api.github.com");
        assert_eq!(config.token(), None);
        assert!(config.use_system_proxy());
    }

    #[test]
    fn test_artifact_resolution() {
        let config = TestConfig;
        assert!(config.artifact(None).unwrap().is_default());

        let artifact = config
            .artifact(Some("https://github.com/acme/app#1.0.0"))
            .unwrap();
        assert_eq!(artifact.git_ref(), "1.0.0");
    }
}
