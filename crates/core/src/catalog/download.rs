//! Fetching snapshot artifacts from the origin catalog.

use async_trait::async_trait;
use futures::StreamExt;
use reqwest::header::{CONTENT_DISPOSITION, CONTENT_RANGE};
use reqwest::{Client, StatusCode};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};

use crate::config::Credentials;
use crate::metrics;

use super::types::Snapshot;

#[derive(Debug, Error)]
pub enum DownloadError {
    /// The origin has nothing to give for this snapshot. Callers skip it.
    #[error("artifact for {id} not available: {reason}")]
    NotFound { id: String, reason: String },

    #[error("origin returned HTTP {status} for {id}")]
    Http { id: String, status: u16 },

    #[error("origin unreachable: {0}")]
    Connectivity(String),

    #[error("failed to build HTTP client: {0}")]
    Client(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl DownloadError {
    /// The origin could not deliver the artifact this time. The snapshot is
    /// skipped and retried on a later cycle; local failures are not included.
    pub fn is_unavailable(&self) -> bool {
        matches!(
            self,
            DownloadError::NotFound { .. } | DownloadError::Http { .. } | DownloadError::Connectivity(_)
        )
    }

    /// Metric label.
    pub fn kind(&self) -> &'static str {
        match self {
            DownloadError::NotFound { .. } => "not_found",
            DownloadError::Http { .. } => "http",
            DownloadError::Connectivity(_) => "connectivity",
            DownloadError::Client(_) | DownloadError::Io(_) => "fatal",
        }
    }
}

/// Fetches the artifact behind a snapshot into a local directory.
#[async_trait]
pub trait OriginDownloader: Send + Sync {
    /// Download into `dest_dir`, returning the written file.
    async fn fetch(&self, snapshot: &Snapshot, dest_dir: &Path) -> Result<PathBuf, DownloadError>;
}

/// Streams artifacts over HTTP with basic auth.
pub struct HttpOriginDownloader {
    client: Client,
    credentials: Credentials,
}

impl HttpOriginDownloader {
    pub fn new(credentials: Credentials, timeout: Duration) -> Result<Self, DownloadError> {
        let client = Client::builder()
            .connect_timeout(timeout)
            .build()
            .map_err(|e| DownloadError::Client(e.to_string()))?;
        Ok(Self {
            client,
            credentials,
        })
    }
}

#[async_trait]
impl OriginDownloader for HttpOriginDownloader {
    async fn fetch(&self, snapshot: &Snapshot, dest_dir: &Path) -> Result<PathBuf, DownloadError> {
        let not_found = |reason: &str| DownloadError::NotFound {
            id: snapshot.id.clone(),
            reason: reason.to_string(),
        };

        let response = self
            .client
            .get(&snapshot.link)
            .basic_auth(&self.credentials.username, Some(&self.credentials.password))
            .send()
            .await
            .map_err(|e| DownloadError::Connectivity(e.to_string()))?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND || status == StatusCode::GONE {
            return Err(not_found("removed from origin"));
        }
        if !status.is_success() {
            return Err(DownloadError::Http {
                id: snapshot.id.clone(),
                status: status.as_u16(),
            });
        }

        let filename = response
            .headers()
            .get(CONTENT_DISPOSITION)
            .and_then(|v| v.to_str().ok())
            .and_then(disposition_filename)
            .ok_or_else(|| not_found("response carries no file"))?;
        let expected_size = response
            .headers()
            .get(CONTENT_RANGE)
            .and_then(|v| v.to_str().ok())
            .and_then(range_total)
            .or(response.content_length());

        tokio::fs::create_dir_all(dest_dir).await?;
        let target = dest_dir.join(&filename);

        if let (Some(expected), Ok(meta)) = (expected_size, tokio::fs::metadata(&target).await) {
            if meta.len() == expected {
                info!(file = %target.display(), "Artifact already downloaded");
                return Ok(target);
            }
        }

        info!(id = %snapshot.id, file = %filename, size = ?expected_size, "Downloading artifact");

        let partial = dest_dir.join(format!("{}.part", filename));
        let mut file = tokio::fs::File::create(&partial).await?;
        let mut stream = response.bytes_stream();
        let mut written: u64 = 0;
        let mut last_decile = 0;

        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| DownloadError::Connectivity(e.to_string()))?;
            file.write_all(&chunk).await?;
            written += chunk.len() as u64;

            if let Some(total) = expected_size.filter(|t| *t > 0) {
                let decile = written * 10 / total;
                if decile > last_decile {
                    last_decile = decile;
                    debug!(id = %snapshot.id, percent = decile * 10, "Download progress");
                }
            }
        }
        file.flush().await?;
        drop(file);

        tokio::fs::rename(&partial, &target).await?;
        metrics::BYTES_DOWNLOADED.inc_by(written);
        Ok(target)
    }
}

/// Extract `filename="..."` from a Content-Disposition header, keeping only
/// the final path component.
pub fn disposition_filename(header: &str) -> Option<String> {
    let re = regex_lite::Regex::new(r#"filename="(.+)""#).ok()?;
    let name = re.captures(header)?.get(1)?.as_str();
    Path::new(name)
        .file_name()
        .and_then(|n| n.to_str())
        .filter(|n| !n.is_empty())
        .map(String::from)
}

/// Total size from a Content-Range header (`bytes 0-99/12345`).
pub fn range_total(header: &str) -> Option<u64> {
    header.rsplit_once('/')?.1.trim().parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_disposition_filename() {
        assert_eq!(
            disposition_filename(r#"attachment; filename="S2A_X.zip""#).as_deref(),
            Some("S2A_X.zip")
        );
        assert_eq!(
            disposition_filename(r#"attachment; filename="../../etc/passwd""#).as_deref(),
            Some("passwd")
        );
        assert_eq!(disposition_filename("inline"), None);
    }

    #[test]
    fn test_range_total() {
        assert_eq!(range_total("bytes 0-99/12345"), Some(12345));
        assert_eq!(range_total("bytes */*"), None);
        assert_eq!(range_total("garbage"), None);
    }
}
