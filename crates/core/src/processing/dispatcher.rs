use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

use crate::metrics;

use super::gdal::{Sentinel1Processor, Sentinel2Processor};
use super::graph::GraphProcessor;
use super::{ProcessingConfig, ProcessingError, ProcessingJob, Processor, ProcessorKind};

/// Routes jobs to a processor by platform name.
#[derive(Clone, Default)]
pub struct Dispatcher {
    processors: HashMap<String, Arc<dyn Processor>>,
}

impl Dispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the processors named in the configuration.
    pub fn from_config(config: &ProcessingConfig) -> Self {
        let mut dispatcher = Self::new();
        for (platform, kind) in &config.platforms {
            let processor: Arc<dyn Processor> = match kind {
                ProcessorKind::Sentinel1 => Arc::new(Sentinel1Processor::new(config)),
                ProcessorKind::Sentinel2 => Arc::new(Sentinel2Processor::new(config)),
                ProcessorKind::Graph => Arc::new(GraphProcessor::new(config)),
            };
            dispatcher.register(platform.clone(), processor);
        }
        dispatcher
    }

    pub fn register(&mut self, platform: impl Into<String>, processor: Arc<dyn Processor>) {
        self.processors.insert(platform.into(), processor);
    }

    pub fn platforms(&self) -> Vec<&str> {
        let mut platforms: Vec<&str> = self.processors.keys().map(String::as_str).collect();
        platforms.sort();
        platforms
    }

    /// Process a job for `platform`. Unknown platforms produce nothing.
    pub async fn dispatch(
        &self,
        platform: Option<&str>,
        job: &ProcessingJob,
    ) -> Result<Vec<PathBuf>, ProcessingError> {
        let Some(processor) = platform.and_then(|p| self.processors.get(p)) else {
            warn!(
                title = %job.title,
                platform = platform.unwrap_or("<none>"),
                "Processing not implemented for platform"
            );
            return Ok(Vec::new());
        };
        let platform = platform.unwrap_or_default();

        info!(title = %job.title, processor = processor.name(), "Processing snapshot");
        match processor.process(job).await {
            Ok(outputs) => {
                metrics::OUTPUTS_PRODUCED
                    .with_label_values(&[platform])
                    .inc_by(outputs.len() as u64);
                Ok(outputs)
            }
            Err(e) => {
                metrics::PROCESSING_FAILURES
                    .with_label_values(&[platform])
                    .inc();
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockProcessor;

    fn job() -> ProcessingJob {
        ProcessingJob::new("/data/S2A_X.zip", "/out/ds", "/in/ds/field.geojson")
    }

    #[tokio::test]
    async fn test_routes_by_platform() {
        let s2 = Arc::new(MockProcessor::new("s2"));
        let s1 = Arc::new(MockProcessor::new("s1"));
        let mut dispatcher = Dispatcher::new();
        dispatcher.register("Sentinel-2", s2.clone());
        dispatcher.register("Sentinel-1", s1.clone());

        let outputs = dispatcher.dispatch(Some("Sentinel-2"), &job()).await.unwrap();
        assert_eq!(outputs.len(), 1);
        assert_eq!(s2.job_count().await, 1);
        assert_eq!(s1.job_count().await, 0);
    }

    #[tokio::test]
    async fn test_unknown_platform_produces_nothing() {
        let dispatcher = Dispatcher::new();
        assert!(dispatcher.dispatch(Some("Sentinel-5P"), &job()).await.unwrap().is_empty());
        assert!(dispatcher.dispatch(None, &job()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_errors_propagate() {
        let processor = Arc::new(MockProcessor::new("s2"));
        processor
            .set_next_error(ProcessingError::tool_failed("gdalwarp", Some(1), None))
            .await;
        let mut dispatcher = Dispatcher::new();
        dispatcher.register("Sentinel-2", processor);

        let err = dispatcher.dispatch(Some("Sentinel-2"), &job()).await.unwrap_err();
        assert!(matches!(err, ProcessingError::ToolFailed { .. }));
    }

    #[test]
    fn test_from_config() {
        let dispatcher = Dispatcher::from_config(&ProcessingConfig::default());
        assert_eq!(dispatcher.platforms(), vec!["Sentinel-1", "Sentinel-2"]);
    }
}
