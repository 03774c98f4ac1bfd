//! HTTP access: streamed file downloads, existence probes and JSON fetches

use crate::error::{InstallerError, Result};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use std::path::Path;
use std::time::Duration;
use tokio::io::AsyncWriteExt;

/// Time allowed to establish a connection
pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Time allowed for a whole request, body included
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// HTTP client wrapper used for every network call in the pipeline
#[derive(Debug, Clone)]
pub struct Downloader {
    client: reqwest::Client,
}

impl Downloader {
    /// Create a downloader with a custom user agent and the default timeouts
    pub fn new(user_agent: &str) -> Self {
        Self::builder(user_agent).build()
    }

    pub fn builder(user_agent: &str) -> DownloaderBuilder {
        DownloaderBuilder {
            user_agent: user_agent.to_string(),
            connect_timeout: CONNECT_TIMEOUT,
            timeout: REQUEST_TIMEOUT,
            no_proxy: false,
        }
    }

    /// Wrap an already configured client
    pub fn from_client(client: reqwest::Client) -> Self {
        Self { client }
    }

    /// Stream `url` into `destination`, returning the number of bytes written.
    ///
    /// Redirects are followed. Transport errors and non-2xx responses are
    /// reported as [`InstallerError::DownloadFailed`].
    pub async fn download(&self, url: &str, destination: &Path, headers: HeaderMap) -> Result<u64> {
        let failed = |reason: String| InstallerError::DownloadFailed {
            url: url.to_string(),
            reason,
        };

        tracing::debug!(%url, destination = %destination.display(), "Downloading");

        let mut response = self
            .client
            .get(url)
            .headers(headers)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| failed(e.to_string()))?;

        let mut file = tokio::fs::File::create(destination).await.map_err(|e| {
            InstallerError::io(format!("Failed to create {}", destination.display()), e)
        })?;

        let mut written: u64 = 0;
        while let Some(chunk) = response.chunk().await.map_err(|e| failed(e.to_string()))? {
            file.write_all(&chunk).await.map_err(|e| {
                InstallerError::io(format!("Failed to write {}", destination.display()), e)
            })?;
            written += chunk.len() as u64;
        }

        file.flush().await.map_err(|e| {
            InstallerError::io(format!("Failed to write {}", destination.display()), e)
        })?;

        tracing::debug!(%url, bytes = written, "Download complete");
        Ok(written)
    }

    /// Issue a `HEAD` request and return the final status code
    pub async fn head(&self, url: &str, headers: HeaderMap) -> reqwest::Result<StatusCode> {
        let response = self.client.head(url).headers(headers).send().await?;
        Ok(response.status())
    }

    /// `GET` a JSON document; non-2xx statuses are errors
    pub async fn get_json<T: DeserializeOwned>(
        &self,
        url: &str,
        headers: HeaderMap,
    ) -> reqwest::Result<T> {
        self.client
            .get(url)
            .headers(headers)
            .send()
            .await?
            .error_for_status()?
            .json::<T>()
            .await
    }
}

/// Client settings for a [`Downloader`]
#[derive(Debug, Clone)]
pub struct DownloaderBuilder {
    user_agent: String,
    connect_timeout: Duration,
    timeout: Duration,
    no_proxy: bool,
}

impl DownloaderBuilder {
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Total time allowed per request, body included
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Ignore proxies configured in the environment
    pub fn no_proxy(mut self, no_proxy: bool) -> Self {
        self.no_proxy = no_proxy;
        self
    }

    pub fn build(self) -> Downloader {
        let mut builder = reqwest::Client::builder()
            .user_agent(self.user_agent.as_str())
            .connect_timeout(self.connect_timeout)
            .timeout(self.timeout);
        if self.no_proxy {
            builder = builder.no_proxy();
        }

        let client = builder.build().unwrap_or_else(|e| {
            tracing::warn!(error = %e, "Failed to configure HTTP client, using defaults");
            reqwest::Client::new()
        });
        Downloader { client }
    }
}

/// Default request headers: a bearer token when one is available
pub fn auth_headers(token: Option<&str>) -> HeaderMap {
    let mut headers = HeaderMap::new();
    if let Some(token) = token.filter(|t| !t.is_empty()) {
        if let Ok(value) = HeaderValue::from_str(&format!("Bearer {}", token)) {
            headers.insert(AUTHORIZATION, value);
        }
    }
    headers
}
