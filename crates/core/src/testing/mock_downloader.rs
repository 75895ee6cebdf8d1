//! Mock origin downloader for testing.

use async_trait::async_trait;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::catalog::{DownloadError, OriginDownloader, Snapshot};

/// Mock implementation of [`OriginDownloader`].
///
/// Serves configured artifacts by snapshot id. Unknown ids fail with
/// [`DownloadError::NotFound`].
#[derive(Debug, Clone, Default)]
pub struct MockOriginDownloader {
    /// Snapshot id to (file name, contents).
    artifacts: Arc<RwLock<HashMap<String, (String, Vec<u8>)>>>,
    fetched: Arc<RwLock<Vec<String>>>,
    next_error: Arc<RwLock<Option<DownloadError>>>,
}

impl MockOriginDownloader {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn set_artifact(&self, id: &str, filename: &str, contents: &[u8]) {
        self.artifacts
            .write()
            .await
            .insert(id.to_string(), (filename.to_string(), contents.to_vec()));
    }

    pub async fn set_next_error(&self, error: DownloadError) {
        *self.next_error.write().await = Some(error);
    }

    pub async fn fetch_count(&self) -> usize {
        self.fetched.read().await.len()
    }

    /// Snapshot ids fetched so far, in order.
    pub async fn fetched_ids(&self) -> Vec<String> {
        self.fetched.read().await.clone()
    }
}

#[async_trait]
impl OriginDownloader for MockOriginDownloader {
    async fn fetch(&self, snapshot: &Snapshot, dest_dir: &Path) -> Result<PathBuf, DownloadError> {
        self.fetched.write().await.push(snapshot.id.clone());
        if let Some(error) = self.next_error.write().await.take() {
            return Err(error);
        }

        let artifacts = self.artifacts.read().await;
        let (filename, contents) =
            artifacts
                .get(&snapshot.id)
                .ok_or_else(|| DownloadError::NotFound {
                    id: snapshot.id.clone(),
                    reason: "no artifact configured".to_string(),
                })?;

        tokio::fs::create_dir_all(dest_dir).await?;
        let path = dest_dir.join(filename);
        tokio::fs::write(&path, contents).await?;
        Ok(path)
    }
}
