use async_trait::async_trait;
use std::path::PathBuf;
use tracing::{info, warn};

use super::tool::ToolCommand;
use super::types::title_of;
use super::{ProcessingConfig, ProcessingError, ProcessingJob, Processor};

/// Runs each of the dataset's processing graphs through `gpt`.
///
/// Output of every run is written to `logs/<graph>_<title>.log` under the
/// job output directory. A failing graph is logged and the remaining
/// graphs still run.
pub struct GraphProcessor {
    gpt: PathBuf,
    timeout_secs: u64,
}

impl GraphProcessor {
    pub fn new(config: &ProcessingConfig) -> Self {
        Self {
            gpt: config.tools.gpt.clone(),
            timeout_secs: config.timeout_secs,
        }
    }
}

#[async_trait]
impl Processor for GraphProcessor {
    fn name(&self) -> &str {
        "graph"
    }

    async fn process(&self, job: &ProcessingJob) -> Result<Vec<PathBuf>, ProcessingError> {
        if job.graphs.is_empty() {
            warn!(title = %job.title, "No processing graphs in dataset");
            return Ok(Vec::new());
        }

        let mut produced = Vec::new();
        for graph in &job.graphs {
            let graph_name = title_of(graph);
            let dir = job
                .output_dir
                .join(job.output_prefix(None))
                .join(&graph_name);
            tokio::fs::create_dir_all(&dir).await?;
            let destination = dir.join(format!("{}.tif", job.title));
            let log = job
                .output_dir
                .join("logs")
                .join(format!("{}_{}.log", graph_name, job.title));

            info!(graph = %graph_name, title = %job.title, "Running graph");
            let run = ToolCommand::new(&self.gpt, self.timeout_secs)
                .arg(graph)
                .arg(format!("-Pinput={}", job.source.display()))
                .arg(format!("-Poutput={}", destination.display()))
                .log_to(&log)
                .run()
                .await;

            if log.exists() {
                produced.push(log.clone());
            }
            match run {
                Ok(_) => {
                    if destination.exists() {
                        produced.push(destination);
                    }
                }
                Err(e) => {
                    warn!(graph = %graph_name, title = %job.title, error = %e, "Graph failed");
                }
            }
        }
        Ok(produced)
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::os::unix::fs::PermissionsExt;

    /// A fake `gpt` that writes its output argument, or fails for graphs
    /// named `broken.xml`.
    fn fake_gpt(dir: &std::path::Path) -> PathBuf {
        let script = dir.join("gpt");
        std::fs::write(
            &script,
            r#"#!/bin/sh
graph="$1"
echo "processing $graph"
case "$graph" in
  *broken.xml) echo "graph error" >&2; exit 1 ;;
esac
out="${3#-Poutput=}"
echo data > "$out"
"#,
        )
        .unwrap();
        std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();
        script
    }

    #[tokio::test]
    async fn test_failing_graph_does_not_stop_others() {
        let dir = tempfile::tempdir().unwrap();
        let config = ProcessingConfig {
            tools: crate::processing::ToolPaths {
                gpt: fake_gpt(dir.path()),
                ..Default::default()
            },
            ..ProcessingConfig::default()
        };
        let job = ProcessingJob::new(dir.path().join("S1A_T.zip"), dir.path().join("out"), "site.geojson")
            .with_graphs(vec![
                dir.path().join("broken.xml"),
                dir.path().join("terrain.xml"),
            ]);

        let produced = GraphProcessor::new(&config).process(&job).await.unwrap();

        let out = dir.path().join("out");
        assert!(produced.contains(&out.join("site/terrain/S1A_T.tif")));
        assert!(produced.contains(&out.join("logs/terrain_S1A_T.log")));
        assert!(produced.contains(&out.join("logs/broken_S1A_T.log")));
        assert!(!out.join("site/broken/S1A_T.tif").exists());

        let log = std::fs::read_to_string(out.join("logs/broken_S1A_T.log")).unwrap();
        assert!(log.contains("graph error"));
    }

    #[tokio::test]
    async fn test_no_graphs() {
        let job = ProcessingJob::new("a.zip", "out", "area.geojson");
        let produced = GraphProcessor::new(&ProcessingConfig::default())
            .process(&job)
            .await
            .unwrap();
        assert!(produced.is_empty());
    }
}
