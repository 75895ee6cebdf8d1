//! Blob storage: the input, output and sync prefixes of one bucket.

mod object;
mod ops;

pub use object::ObjectStoreBlobStore;
pub use ops::{
    check_in_store, fetch_inputs, join_key, push_outputs, relative_key, remove_prefix,
    INPUT_EXTENSIONS,
};

use async_trait::async_trait;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("object not found: {0}")]
    NotFound(String),

    #[error("object already exists: {0}")]
    AlreadyExists(String),

    #[error("invalid object key: {0}")]
    InvalidKey(String),

    #[error("store configuration error: {0}")]
    Config(String),

    #[error("object store error: {0}")]
    Backend(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<object_store::Error> for StoreError {
    fn from(err: object_store::Error) -> Self {
        match err {
            object_store::Error::NotFound { path, .. } => StoreError::NotFound(path),
            object_store::Error::AlreadyExists { path, .. } => StoreError::AlreadyExists(path),
            other => StoreError::Backend(other.to_string()),
        }
    }
}

/// Minimal key/value blob store.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Keys under `prefix`, matched on whole `/`-separated segments.
    async fn list(&self, prefix: &str) -> Result<Vec<String>, StoreError>;

    /// Download `key` to `local_path`, creating parent directories.
    async fn get(&self, key: &str, local_path: &Path) -> Result<(), StoreError>;

    /// Upload `local_path` to `key`. Without `overwrite`, an existing key
    /// fails with [`StoreError::AlreadyExists`].
    async fn put(&self, local_path: &Path, key: &str, overwrite: bool) -> Result<(), StoreError>;

    async fn delete(&self, key: &str) -> Result<(), StoreError>;
}
