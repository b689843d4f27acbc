//! HTTP fetcher implementation
//!
//! This module handles every request the crawler makes:
//! - Building an HTTP client with the fixed header set the remote expects
//! - Skipping documents that already exist locally (resumability)
//! - Streaming bodies to disk, transparently decompressed by reqwest
//! - Guaranteeing that no empty or truncated file is left at a destination
//! - Self-throttling with a fixed delay after each successful download

use crate::config::{CrawlerConfig, RemoteConfig};
use crate::FetchError;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, ACCEPT, CACHE_CONTROL, CONNECTION};
use reqwest::Client;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::fs::{self, File};
use tokio::io::AsyncWriteExt;

/// Result of a successful `ensure` call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchOutcome {
    /// The destination already existed; no request was made
    AlreadyPresent,

    /// The document was downloaded
    Downloaded {
        /// Decompressed size written to disk
        bytes: u64,
    },
}

/// Builds an HTTP client with the fixed header set
///
/// `Accept-Encoding: gzip, deflate` is added by reqwest itself, which also
/// decompresses matching responses.
///
/// # Example
///
/// ```no_run
/// use canvass::config::Config;
/// use canvass::crawler::build_http_client;
///
/// let config = Config::default();
/// let client = build_http_client(&config.remote, &config.crawler).unwrap();
/// ```
pub fn build_http_client(
    remote: &RemoteConfig,
    crawler: &CrawlerConfig,
) -> Result<Client, reqwest::Error> {
    let mut headers = HeaderMap::new();
    headers.insert(
        ACCEPT,
        HeaderValue::from_static("application/json, text/plain, */*"),
    );
    headers.insert(CACHE_CONTROL, HeaderValue::from_static("no-cache"));
    headers.insert(CONNECTION, HeaderValue::from_static("keep-alive"));

    // Validated with the config; anything malformed here is skipped
    for (name, value) in &remote.headers {
        match (
            HeaderName::from_bytes(name.as_bytes()),
            HeaderValue::from_str(value),
        ) {
            (Ok(name), Ok(value)) => {
                headers.insert(name, value);
            }
            _ => tracing::warn!("Ignoring invalid header {}", name),
        }
    }

    let mut builder = Client::builder()
        .user_agent(remote.user_agent.clone())
        .default_headers(headers)
        .gzip(true)
        .deflate(true);

    if let Some(secs) = crawler.request_timeout_secs {
        builder = builder.timeout(Duration::from_secs(secs));
    }

    builder.build()
}

/// Ensures local copies of remote documents
///
/// A `Fetcher` is cheap to share behind an `Arc`; the worker pool hands the
/// same instance to every worker.
#[derive(Debug, Clone)]
pub struct Fetcher {
    client: Client,
    base_url: String,
    delay: Duration,
}

impl Fetcher {
    /// Creates a fetcher for `base_url`
    ///
    /// `delay` is slept after every successful download, independent of how
    /// many workers share the fetcher.
    pub fn new(client: Client, base_url: impl Into<String>, delay: Duration) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            client,
            base_url,
            delay,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Ensures `destination` holds the document at `remote_path`
    ///
    /// # Request Flow
    ///
    /// 1. If `destination` exists → `AlreadyPresent`, no request
    /// 2. GET `base_url + remote_path`
    ///    - non-2xx → `FetchError::Status`
    ///    - `Content-Length: 0` → `FetchError::EmptyResponse`
    /// 3. Stream the body to `<destination>.part`
    ///    - zero bytes → partial file removed, `FetchError::EmptyBody`
    ///    - stream or write error → partial file removed
    /// 4. Rename onto `destination`, sleep the configured delay
    pub async fn ensure(
        &self,
        destination: &Path,
        remote_path: &str,
    ) -> Result<FetchOutcome, FetchError> {
        if fs::try_exists(destination).await.unwrap_or(false) {
            tracing::trace!("Already present: {}", destination.display());
            return Ok(FetchOutcome::AlreadyPresent);
        }

        tracing::info!("Downloading: {}", remote_path);

        let url = format!("{}{}", self.base_url, remote_path);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|source| FetchError::Transport {
                path: remote_path.to_string(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                path: remote_path.to_string(),
                status: status.to_string(),
            });
        }

        if response.content_length() == Some(0) {
            return Err(FetchError::EmptyResponse {
                path: remote_path.to_string(),
            });
        }

        let partial = partial_path(destination);
        let bytes = match write_body(response, &partial, remote_path).await {
            Ok(bytes) => bytes,
            Err(e) => {
                let _ = fs::remove_file(&partial).await;
                return Err(e);
            }
        };

        if bytes == 0 {
            let _ = fs::remove_file(&partial).await;
            return Err(FetchError::EmptyBody {
                path: remote_path.to_string(),
            });
        }

        if let Err(source) = fs::rename(&partial, destination).await {
            let _ = fs::remove_file(&partial).await;
            return Err(FetchError::Io {
                path: destination.to_path_buf(),
                source,
            });
        }

        tracing::debug!("Saved {} ({} bytes)", destination.display(), bytes);

        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        Ok(FetchOutcome::Downloaded { bytes })
    }
}

/// Sibling file a body is streamed into before it is moved into place
fn partial_path(destination: &Path) -> PathBuf {
    let mut name = destination
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".part");
    destination.with_file_name(name)
}

/// Streams a response body into `path`, returning the number of bytes written
async fn write_body(
    mut response: reqwest::Response,
    path: &Path,
    remote_path: &str,
) -> Result<u64, FetchError> {
    let io_err = |source| FetchError::Io {
        path: path.to_path_buf(),
        source,
    };

    let mut file = File::create(path).await.map_err(io_err)?;
    let mut written = 0u64;

    while let Some(chunk) = response
        .chunk()
        .await
        .map_err(|source| FetchError::Transport {
            path: remote_path.to_string(),
            source,
        })?
    {
        file.write_all(&chunk).await.map_err(io_err)?;
        written += chunk.len() as u64;
    }

    file.flush().await.map_err(io_err)?;
    Ok(written)
}
