//! Prefix-level helpers built on [`BlobStore`].

use std::collections::BTreeSet;
use std::path::{Component, Path, PathBuf};
use tracing::{debug, info};

use super::{BlobStore, StoreError};

/// Dataset input files mirrored from the input prefix.
pub const INPUT_EXTENSIONS: [&str; 7] = ["geojson", "shp", "shx", "dbf", "prj", "cpg", "xml"];

/// Join key fragments with `/`, ignoring empty fragments and stray slashes.
pub fn join_key(parts: &[&str]) -> String {
    parts
        .iter()
        .map(|p| p.trim_matches('/'))
        .filter(|p| !p.is_empty())
        .collect::<Vec<_>>()
        .join("/")
}

/// Strip `prefix/` from `key`. Keys outside the prefix yield `None`.
pub fn relative_key<'a>(key: &'a str, prefix: &str) -> Option<&'a str> {
    let prefix = prefix.trim_matches('/');
    if prefix.is_empty() {
        return Some(key);
    }
    key.strip_prefix(prefix)?.strip_prefix('/')
}

/// Map a relative key onto a local path under `root`, rejecting anything
/// that would escape it.
fn local_path(root: &Path, relative: &str) -> Result<PathBuf, StoreError> {
    let rel = Path::new(relative);
    if rel
        .components()
        .any(|c| !matches!(c, Component::Normal(_)))
    {
        return Err(StoreError::InvalidKey(relative.to_string()));
    }
    Ok(root.join(rel))
}

/// Distinct key prefixes under `prefix`, truncated to `depth` segments.
///
/// With depth 1 this is the set of snapshot ids that already have outputs.
pub async fn check_in_store(
    store: &dyn BlobStore,
    prefix: &str,
    depth: usize,
) -> Result<BTreeSet<String>, StoreError> {
    let depth = depth.max(1);
    let keys = store.list(prefix).await?;

    let found: BTreeSet<String> = keys
        .iter()
        .filter_map(|key| relative_key(key, prefix))
        .map(|rel| rel.split('/').take(depth).collect::<Vec<_>>().join("/"))
        .filter(|k| !k.is_empty())
        .collect();

    debug!(prefix, depth, entries = found.len(), "Checked store");
    Ok(found)
}

/// Download every dataset input file under `prefix` into `dest`, keeping
/// the relative layout.
pub async fn fetch_inputs(
    store: &dyn BlobStore,
    prefix: &str,
    dest: &Path,
) -> Result<Vec<PathBuf>, StoreError> {
    let mut fetched = Vec::new();

    for key in store.list(prefix).await? {
        let Some(rel) = relative_key(&key, prefix) else {
            continue;
        };
        let wanted = Path::new(rel)
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|ext| INPUT_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()));
        if !wanted {
            continue;
        }

        let target = local_path(dest, rel)?;
        store.get(&key, &target).await?;
        fetched.push(target);
    }

    info!(prefix, files = fetched.len(), "Fetched inputs");
    Ok(fetched)
}

/// Upload every regular file under `root` to `prefix/<relative path>`,
/// overwriting. Returns the uploaded keys.
pub async fn push_outputs(
    store: &dyn BlobStore,
    prefix: &str,
    root: &Path,
) -> Result<Vec<String>, StoreError> {
    let mut uploaded = Vec::new();
    if !root.exists() {
        return Ok(uploaded);
    }

    let mut pending = vec![root.to_path_buf()];
    while let Some(dir) = pending.pop() {
        let mut entries = tokio::fs::read_dir(&dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            let file_type = entry.file_type().await?;
            if file_type.is_dir() {
                pending.push(path);
                continue;
            }
            if !file_type.is_file() {
                continue;
            }

            let Ok(rel) = path.strip_prefix(root) else {
                continue;
            };
            let rel = rel
                .components()
                .filter_map(|c| c.as_os_str().to_str())
                .collect::<Vec<_>>()
                .join("/");
            let key = join_key(&[prefix, &rel]);

            store.put(&path, &key, true).await?;
            debug!(key = %key, "Uploaded");
            uploaded.push(key);
        }
    }

    uploaded.sort();
    info!(prefix, root = %root.display(), uploaded = uploaded.len(), "Pushed outputs");
    Ok(uploaded)
}

/// Delete every object under `prefix`. Returns the deleted keys.
pub async fn remove_prefix(store: &dyn BlobStore, prefix: &str) -> Result<Vec<String>, StoreError> {
    let keys = store.list(prefix).await?;
    for key in &keys {
        store.delete(key).await?;
    }
    info!(prefix, deleted = keys.len(), "Removed prefix");
    Ok(keys)
}
