//! Materializes snapshot artifacts locally, preferring the store mirror over
//! the origin.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::catalog::{DownloadError, OriginDownloader, Snapshot};
use crate::metrics;
use crate::store::{join_key, relative_key, BlobStore, StoreError};

#[derive(Debug, Error)]
pub enum SyncError {
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("download error: {0}")]
    Download(#[from] DownloadError),
}

impl SyncError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, SyncError::Download(DownloadError::NotFound { .. }))
    }
}

/// Where a synced artifact came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncSource {
    Store,
    Origin,
}

/// A locally available artifact and its store key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncedArtifact {
    pub path: PathBuf,
    pub key: String,
    pub source: SyncSource,
}

/// Store-first artifact sync.
///
/// A snapshot is mirrored under `<sync_prefix>/<id>/`. Any object there other
/// than a bare `<sync_prefix>/<id>` marker is taken as the artifact, and the
/// origin is never contacted for it.
pub struct ArtifactSync {
    store: Arc<dyn BlobStore>,
    downloader: Arc<dyn OriginDownloader>,
    sync_prefix: String,
}

impl ArtifactSync {
    pub fn new(
        store: Arc<dyn BlobStore>,
        downloader: Arc<dyn OriginDownloader>,
        sync_prefix: impl Into<String>,
    ) -> Self {
        Self {
            store,
            downloader,
            sync_prefix: sync_prefix.into(),
        }
    }

    pub fn sync_prefix(&self) -> &str {
        &self.sync_prefix
    }

    /// Make the snapshot's artifact available under `local_root`.
    ///
    /// Returns `Ok(None)` when the origin cannot deliver the artifact (gone,
    /// offline, unreachable); the caller skips it. Store and local IO
    /// failures propagate.
    pub async fn ensure_local(
        &self,
        snapshot: &Snapshot,
        local_root: &Path,
    ) -> Result<Option<SyncedArtifact>, SyncError> {
        let prefix = join_key(&[&self.sync_prefix, &snapshot.id]);
        let keys = self.store.list(&prefix).await?;
        debug!(snapshot = %snapshot.id, objects = keys.len(), "Checked sync prefix");

        let mirrored = keys.iter().find_map(|key| {
            let rel = relative_key(key, &self.sync_prefix)?;
            (rel.trim_matches('/') != snapshot.id).then_some((key, rel))
        });

        if let Some((key, rel)) = mirrored {
            let path = local_root.join(rel);
            self.store.get(key, &path).await?;
            metrics::STORE_HITS.inc();
            info!(snapshot = %snapshot.id, key = %key, "Artifact found in store");
            return Ok(Some(SyncedArtifact {
                path,
                key: key.clone(),
                source: SyncSource::Store,
            }));
        }

        let dest = local_root.join(&snapshot.id);
        tokio::fs::create_dir_all(&dest).await.map_err(StoreError::from)?;

        let path = match self.downloader.fetch(snapshot, &dest).await {
            Ok(path) => path,
            Err(e) => {
                metrics::DOWNLOAD_FAILURES.with_label_values(&[e.kind()]).inc();
                if e.is_unavailable() {
                    warn!(snapshot = %snapshot.id, error = %e, "Artifact unavailable, skipping");
                    return Ok(None);
                }
                return Err(e.into());
            }
        };
        metrics::ORIGIN_DOWNLOADS.inc();

        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| StoreError::InvalidKey(path.display().to_string()))?;
        let key = join_key(&[&prefix, name]);
        self.store.put(&path, &key, true).await?;
        info!(snapshot = %snapshot.id, key = %key, "Artifact downloaded and mirrored");

        Ok(Some(SyncedArtifact {
            path,
            key,
            source: SyncSource::Origin,
        }))
    }
}
