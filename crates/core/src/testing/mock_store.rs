//! In-memory blob store for testing.

use async_trait::async_trait;
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::store::{BlobStore, StoreError};

/// Mock implementation of [`BlobStore`] backed by a map.
///
/// Prefixes match whole key segments, like the object-store backend:
/// `out/a` matches `out/a` and `out/a/x` but not `out/ab`.
#[derive(Debug, Clone, Default)]
pub struct MockBlobStore {
    objects: Arc<RwLock<BTreeMap<String, Vec<u8>>>>,
    gets: Arc<RwLock<Vec<String>>>,
    puts: Arc<RwLock<Vec<String>>>,
}

impl MockBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert(&self, key: &str, contents: Vec<u8>) {
        self.objects.write().await.insert(key.to_string(), contents);
    }

    pub async fn contents(&self, key: &str) -> Option<Vec<u8>> {
        self.objects.read().await.get(key).cloned()
    }

    pub async fn keys(&self) -> Vec<String> {
        self.objects.read().await.keys().cloned().collect()
    }

    pub async fn get_count(&self) -> usize {
        self.gets.read().await.len()
    }

    pub async fn put_count(&self) -> usize {
        self.puts.read().await.len()
    }

    /// Keys written so far, in order.
    pub async fn put_keys(&self) -> Vec<String> {
        self.puts.read().await.clone()
    }
}

fn under_prefix(key: &str, prefix: &str) -> bool {
    let prefix = prefix.trim_matches('/');
    prefix.is_empty()
        || key == prefix
        || key
            .strip_prefix(prefix)
            .is_some_and(|rest| rest.starts_with('/'))
}

#[async_trait]
impl BlobStore for MockBlobStore {
    async fn list(&self, prefix: &str) -> Result<Vec<String>, StoreError> {
        Ok(self
            .objects
            .read()
            .await
            .keys()
            .filter(|key| under_prefix(key, prefix))
            .cloned()
            .collect())
    }

    async fn get(&self, key: &str, local_path: &Path) -> Result<(), StoreError> {
        self.gets.write().await.push(key.to_string());
        let contents = self
            .contents(key)
            .await
            .ok_or_else(|| StoreError::NotFound(key.to_string()))?;
        if let Some(parent) = local_path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(local_path, contents).await?;
        Ok(())
    }

    async fn put(&self, local_path: &Path, key: &str, overwrite: bool) -> Result<(), StoreError> {
        let contents = tokio::fs::read(local_path).await?;
        let mut objects = self.objects.write().await;
        if !overwrite && objects.contains_key(key) {
            return Err(StoreError::AlreadyExists(key.to_string()));
        }
        objects.insert(key.to_string(), contents);
        self.puts.write().await.push(key.to_string());
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        self.objects
            .write()
            .await
            .remove(key)
            .map(|_| ())
            .ok_or_else(|| StoreError::NotFound(key.to_string()))
    }
}
