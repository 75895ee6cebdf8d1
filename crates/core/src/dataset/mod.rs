//! Discovery of datasets in the local input scratch root.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

#[derive(Debug, Error)]
pub enum ScanError {
    #[error("failed to scan {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// One unit of work: a directory of areas, cutting shapes and graphs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dataset {
    pub name: String,
    pub path: PathBuf,
    /// `*.geojson` search areas.
    pub areas: Vec<PathBuf>,
    /// `*.shp` cutting shapes.
    pub shapes: Vec<PathBuf>,
    /// `*.xml` processing graphs.
    pub graphs: Vec<PathBuf>,
}

impl Dataset {
    /// Shapes to cut with; a single `None` when the dataset has none.
    pub fn shape_selection(&self) -> Vec<Option<PathBuf>> {
        if self.shapes.is_empty() {
            vec![None]
        } else {
            self.shapes.iter().cloned().map(Some).collect()
        }
    }
}

/// Datasets to process and the names skipped as already complete.
#[derive(Debug, Default)]
pub struct ScanResult {
    pub pending: Vec<Dataset>,
    pub skipped: Vec<String>,
}

fn io_error(path: &Path) -> impl FnOnce(std::io::Error) -> ScanError + '_ {
    move |source| ScanError::Io {
        path: path.to_path_buf(),
        source,
    }
}

fn has_extension(path: &Path, ext: &str) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case(ext))
}

/// Read one dataset directory.
pub async fn read_dataset(path: &Path) -> Result<Dataset, ScanError> {
    let name = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or_default()
        .to_string();

    let mut dataset = Dataset {
        name,
        path: path.to_path_buf(),
        areas: Vec::new(),
        shapes: Vec::new(),
        graphs: Vec::new(),
    };

    let mut entries = tokio::fs::read_dir(path).await.map_err(io_error(path))?;
    while let Some(entry) = entries.next_entry().await.map_err(io_error(path))? {
        let file = entry.path();
        if !file.is_file() {
            continue;
        }
        if has_extension(&file, "geojson") {
            dataset.areas.push(file);
        } else if has_extension(&file, "shp") {
            dataset.shapes.push(file);
        } else if has_extension(&file, "xml") {
            dataset.graphs.push(file);
        }
    }

    dataset.areas.sort();
    dataset.shapes.sort();
    dataset.graphs.sort();
    Ok(dataset)
}

/// Enumerate the immediate subdirectories of `input_root`, skipping any
/// whose name is in `completed`.
///
/// A missing input root means nothing was fetched and yields no datasets.
pub async fn scan_datasets(
    input_root: &Path,
    completed: &BTreeSet<String>,
) -> Result<ScanResult, ScanError> {
    let mut result = ScanResult::default();
    if !input_root.exists() {
        debug!(root = %input_root.display(), "Input root missing, nothing to scan");
        return Ok(result);
    }

    let mut dirs = Vec::new();
    let mut entries = tokio::fs::read_dir(input_root)
        .await
        .map_err(io_error(input_root))?;
    while let Some(entry) = entries.next_entry().await.map_err(io_error(input_root))? {
        let path = entry.path();
        if path.is_dir() {
            dirs.push(path);
        }
    }
    dirs.sort();

    for dir in dirs {
        let dataset = read_dataset(&dir).await?;
        if completed.contains(&dataset.name) {
            info!(dataset = %dataset.name, "Output set exists, skipping");
            result.skipped.push(dataset.name);
            continue;
        }
        debug!(
            dataset = %dataset.name,
            areas = dataset.areas.len(),
            shapes = dataset.shapes.len(),
            graphs = dataset.graphs.len(),
            "Found dataset"
        );
        result.pending.push(dataset);
    }

    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn touch(path: &Path) {
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, b"").unwrap();
    }

    #[tokio::test]
    async fn test_scan_collects_files() {
        let dir = tempfile::tempdir().unwrap();
        touch(&dir.path().join("setA/b.geojson"));
        touch(&dir.path().join("setA/a.GeoJSON"));
        touch(&dir.path().join("setA/cut.shp"));
        touch(&dir.path().join("setA/cut.dbf"));
        touch(&dir.path().join("setA/graph.xml"));
        touch(&dir.path().join("loose.geojson"));

        let result = scan_datasets(dir.path(), &BTreeSet::new()).await.unwrap();
        assert_eq!(result.pending.len(), 1);

        let dataset = &result.pending[0];
        assert_eq!(dataset.name, "setA");
        assert_eq!(dataset.areas.len(), 2);
        assert!(dataset.areas[0].ends_with("a.GeoJSON"));
        assert_eq!(dataset.shapes.len(), 1);
        assert_eq!(dataset.graphs.len(), 1);
        assert_eq!(dataset.shape_selection(), vec![Some(dataset.shapes[0].clone())]);
    }

    #[tokio::test]
    async fn test_completed_datasets_skipped() {
        let dir = tempfile::tempdir().unwrap();
        touch(&dir.path().join("setA/area.geojson"));
        touch(&dir.path().join("setB/area.geojson"));

        let completed = BTreeSet::from(["setA".to_string()]);
        let result = scan_datasets(dir.path(), &completed).await.unwrap();

        assert_eq!(result.skipped, vec!["setA"]);
        assert_eq!(result.pending.len(), 1);
        assert_eq!(result.pending[0].name, "setB");
        assert_eq!(result.pending[0].shape_selection(), vec![None]);
    }

    #[tokio::test]
    async fn test_missing_root() {
        let result = scan_datasets(Path::new("/nonexistent/gps/input"), &BTreeSet::new())
            .await
            .unwrap();
        assert!(result.pending.is_empty());
    }
}
