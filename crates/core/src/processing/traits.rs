use async_trait::async_trait;
use std::path::PathBuf;

use super::{ProcessingError, ProcessingJob};

/// Turns one synced artifact into output files.
#[async_trait]
pub trait Processor: Send + Sync {
    fn name(&self) -> &str;

    /// Run the job, returning the files produced under `job.output_dir`.
    async fn process(&self, job: &ProcessingJob) -> Result<Vec<PathBuf>, ProcessingError>;
}
