//! Mock processor for testing.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::processing::{ProcessingError, ProcessingJob, Processor};

/// Mock implementation of [`Processor`].
///
/// Each job writes one file, `<output_dir>/<area>/<title>.tiff`, so pushes
/// downstream see real files. The file is written even when the job is made
/// to fail.
#[derive(Debug, Clone)]
pub struct MockProcessor {
    name: String,
    jobs: Arc<RwLock<Vec<ProcessingJob>>>,
    next_error: Arc<RwLock<Option<ProcessingError>>>,
}

impl MockProcessor {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            jobs: Arc::new(RwLock::new(Vec::new())),
            next_error: Arc::new(RwLock::new(None)),
        }
    }

    pub async fn set_next_error(&self, error: ProcessingError) {
        *self.next_error.write().await = Some(error);
    }

    pub async fn jobs(&self) -> Vec<ProcessingJob> {
        self.jobs.read().await.clone()
    }

    pub async fn job_count(&self) -> usize {
        self.jobs.read().await.len()
    }
}

#[async_trait]
impl Processor for MockProcessor {
    fn name(&self) -> &str {
        &self.name
    }

    async fn process(&self, job: &ProcessingJob) -> Result<Vec<PathBuf>, ProcessingError> {
        self.jobs.write().await.push(job.clone());

        let dir = job.output_dir.join(job.area_name());
        let output = dir.join(format!("{}.tiff", job.title));
        // Only touch the disk inside an existing scratch tree.
        if job.output_dir.parent().is_some_and(Path::is_dir) {
            tokio::fs::create_dir_all(&dir).await?;
            tokio::fs::write(&output, job.title.as_bytes()).await?;
        }

        // A failing job leaves its file behind, like a tool dying mid-run.
        if let Some(error) = self.next_error.write().await.take() {
            return Err(error);
        }
        Ok(vec![output])
    }
}
