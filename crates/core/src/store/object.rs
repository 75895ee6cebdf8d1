use async_trait::async_trait;
use futures::TryStreamExt;
use object_store::aws::AmazonS3Builder;
use object_store::local::LocalFileSystem;
use object_store::memory::InMemory;
use object_store::path::Path as ObjectPath;
use object_store::{ObjectStore, PutPayload};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};

use crate::config::StoreEnvironment;

use super::{BlobStore, StoreError};

/// [`BlobStore`] over any `object_store` backend.
#[derive(Clone)]
pub struct ObjectStoreBlobStore {
    inner: Arc<dyn ObjectStore>,
}

impl ObjectStoreBlobStore {
    pub fn new(inner: Arc<dyn ObjectStore>) -> Self {
        Self { inner }
    }

    /// S3 bucket from the environment, or a local directory when
    /// `GPS_STORE_ROOT` is set.
    pub fn from_environment(env: &StoreEnvironment) -> Result<Self, StoreError> {
        if let Some(root) = &env.local_root {
            std::fs::create_dir_all(root)?;
            info!(root = %root.display(), "Using local object store");
            let local = LocalFileSystem::new_with_prefix(root)
                .map_err(|e| StoreError::Config(e.to_string()))?;
            return Ok(Self::new(Arc::new(local)));
        }

        let mut builder = AmazonS3Builder::new()
            .with_bucket_name(&env.bucket)
            .with_access_key_id(&env.access_key_id)
            .with_secret_access_key(&env.secret_access_key);
        if let Some(region) = &env.region {
            builder = builder.with_region(region);
        }
        if let Some(endpoint) = &env.endpoint {
            builder = builder
                .with_endpoint(endpoint)
                .with_allow_http(endpoint.starts_with("http://"));
        }

        let s3 = builder
            .build()
            .map_err(|e| StoreError::Config(e.to_string()))?;
        info!(bucket = %env.bucket, "Using S3 object store");
        Ok(Self::new(Arc::new(s3)))
    }

    /// Volatile store for tests and dry runs.
    pub fn in_memory() -> Self {
        Self::new(Arc::new(InMemory::new()))
    }

    fn path(key: &str) -> Result<ObjectPath, StoreError> {
        let path = ObjectPath::from(key);
        if path.as_ref().is_empty() {
            return Err(StoreError::InvalidKey(key.to_string()));
        }
        Ok(path)
    }

    async fn exists(&self, path: &ObjectPath) -> Result<bool, StoreError> {
        match self.inner.head(path).await {
            Ok(_) => Ok(true),
            Err(object_store::Error::NotFound { .. }) => Ok(false),
            Err(e) => Err(e.into()),
        }
    }
}

#[async_trait]
impl BlobStore for ObjectStoreBlobStore {
    async fn list(&self, prefix: &str) -> Result<Vec<String>, StoreError> {
        let prefix = ObjectPath::from(prefix);
        let prefix = (!prefix.as_ref().is_empty()).then_some(prefix);

        let metas: Vec<_> = self.inner.list(prefix.as_ref()).try_collect().await?;
        let mut keys: Vec<String> = metas.into_iter().map(|m| m.location.to_string()).collect();
        keys.sort();
        Ok(keys)
    }

    async fn get(&self, key: &str, local_path: &Path) -> Result<(), StoreError> {
        let path = Self::path(key)?;
        let bytes = self.inner.get(&path).await?.bytes().await?;
        if let Some(parent) = local_path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(local_path, &bytes).await?;
        debug!(key, local = %local_path.display(), bytes = bytes.len(), "Fetched object");
        Ok(())
    }

    async fn put(&self, local_path: &Path, key: &str, overwrite: bool) -> Result<(), StoreError> {
        let path = Self::path(key)?;
        // Create-only puts are not available on every backend.
        if !overwrite && self.exists(&path).await? {
            return Err(StoreError::AlreadyExists(key.to_string()));
        }
        let data = tokio::fs::read(local_path).await?;
        let size = data.len();
        self.inner.put(&path, PutPayload::from(data)).await?;
        debug!(key, bytes = size, "Stored object");
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        let path = Self::path(key)?;
        self.inner.delete(&path).await?;
        Ok(())
    }
}
