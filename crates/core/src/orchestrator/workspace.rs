use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Scratch directories owned by one cycle.
///
/// `input`, `output` and `data` are created under the scratch root and
/// removed again on [`CycleWorkspace::cleanup`] or drop, whichever comes first.
#[derive(Debug)]
pub struct CycleWorkspace {
    input: PathBuf,
    output: PathBuf,
    data: PathBuf,
    cleaned: bool,
}

impl CycleWorkspace {
    pub async fn create(root: &Path) -> std::io::Result<Self> {
        let workspace = Self {
            input: root.join("input"),
            output: root.join("output"),
            data: root.join("data"),
            cleaned: false,
        };
        // Leftovers from an aborted run would be mistaken for new inputs.
        for dir in workspace.dirs() {
            remove_dir(dir).await;
            tokio::fs::create_dir_all(dir).await?;
        }
        debug!(root = %root.display(), "Created cycle workspace");
        Ok(workspace)
    }

    pub fn input(&self) -> &Path {
        &self.input
    }

    pub fn output(&self) -> &Path {
        &self.output
    }

    pub fn data(&self) -> &Path {
        &self.data
    }

    /// Output directory of one dataset.
    pub fn dataset_output(&self, dataset: &str) -> PathBuf {
        self.output.join(dataset)
    }

    /// Remove a dataset's output subtree. Absence is not an error.
    pub async fn clear_dataset_output(&self, dataset: &str) {
        remove_dir(&self.dataset_output(dataset)).await;
    }

    pub async fn cleanup(&mut self) {
        if self.cleaned {
            return;
        }
        for dir in self.dirs() {
            remove_dir(dir).await;
        }
        self.cleaned = true;
        debug!("Removed cycle workspace");
    }

    fn dirs(&self) -> [&PathBuf; 3] {
        [&self.input, &self.output, &self.data]
    }
}

// Only reached when a cycle bails out before `cleanup`.
impl Drop for CycleWorkspace {
    fn drop(&mut self) {
        if self.cleaned {
            return;
        }
        for dir in self.dirs() {
            report_removal(dir, std::fs::remove_dir_all(dir));
        }
        self.cleaned = true;
    }
}

async fn remove_dir(path: &Path) {
    report_removal(path, tokio::fs::remove_dir_all(path).await);
}

fn report_removal(path: &Path, result: std::io::Result<()>) {
    match result {
        Ok(()) => {}
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => warn!(path = %path.display(), error = %e, "Failed to remove scratch directory"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_created_and_removed_on_drop() {
        let root = tempfile::tempdir().unwrap();
        let (input, data) = {
            let workspace = CycleWorkspace::create(root.path()).await.unwrap();
            std::fs::write(workspace.data().join("artifact.zip"), b"x").unwrap();
            assert!(workspace.input().is_dir());
            assert!(workspace.output().is_dir());
            (workspace.input().to_path_buf(), workspace.data().to_path_buf())
        };
        assert!(!input.exists());
        assert!(!data.exists());
        assert!(root.path().exists());
    }

    #[tokio::test]
    async fn test_stale_contents_removed_on_create() {
        let root = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(root.path().join("input/old")).unwrap();

        let workspace = CycleWorkspace::create(root.path()).await.unwrap();
        assert!(!workspace.input().join("old").exists());
    }

    #[tokio::test]
    async fn test_cleanup_is_idempotent() {
        let root = tempfile::tempdir().unwrap();
        let mut workspace = CycleWorkspace::create(root.path()).await.unwrap();
        workspace.clear_dataset_output("missing").await;
        workspace.cleanup().await;
        workspace.cleanup().await;
        assert!(!workspace.output().exists());
    }

    #[tokio::test]
    async fn test_clear_dataset_output_keeps_siblings() {
        let root = tempfile::tempdir().unwrap();
        let workspace = CycleWorkspace::create(root.path()).await.unwrap();
        std::fs::create_dir_all(workspace.dataset_output("setA").join("area")).unwrap();
        std::fs::create_dir_all(workspace.dataset_output("setB")).unwrap();

        workspace.clear_dataset_output("setA").await;

        assert!(!workspace.dataset_output("setA").exists());
        assert!(workspace.dataset_output("setB").is_dir());
    }
}
