//! One orchestration cycle: fetch, discover, per-snapshot processing, cleanup.

use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::watch;
use tracing::{debug, error, info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::area::read_area;
use crate::catalog::{Catalog, OriginDownloader, SearchQuery, Snapshot};
use crate::config::StoreEnvironment;
use crate::dataset::{scan_datasets, Dataset};
use crate::metrics;
use crate::processing::{Dispatcher, ProcessingJob};
use crate::store::{check_in_store, fetch_inputs, push_outputs, BlobStore};
use crate::sync::{ArtifactSync, SyncSource};

use super::config::SchedulerConfig;
use super::types::{CycleReport, OrchestratorError};
use super::workspace::CycleWorkspace;

/// The three store prefixes a cycle works with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorePrefixes {
    pub input: String,
    pub output: String,
    pub sync: String,
}

impl From<&StoreEnvironment> for StorePrefixes {
    fn from(env: &StoreEnvironment) -> Self {
        Self {
            input: env.input_prefix.clone(),
            output: env.output_prefix.clone(),
            sync: env.sync_prefix.clone(),
        }
    }
}

/// Collaborators of the orchestrator.
pub struct Components {
    pub catalog: Arc<dyn Catalog>,
    pub store: Arc<dyn BlobStore>,
    pub downloader: Arc<dyn OriginDownloader>,
    pub dispatcher: Dispatcher,
}

pub struct Orchestrator {
    catalog: Arc<dyn Catalog>,
    store: Arc<dyn BlobStore>,
    sync: ArtifactSync,
    dispatcher: Dispatcher,
    template: SearchQuery,
    prefixes: StorePrefixes,
    config: SchedulerConfig,
}

fn stop_requested(shutdown: &watch::Receiver<bool>) -> bool {
    *shutdown.borrow()
}

impl Orchestrator {
    pub fn new(
        components: Components,
        template: SearchQuery,
        prefixes: StorePrefixes,
        config: SchedulerConfig,
    ) -> Self {
        let sync = ArtifactSync::new(
            components.store.clone(),
            components.downloader,
            prefixes.sync.clone(),
        );
        Self {
            catalog: components.catalog,
            store: components.store,
            sync,
            dispatcher: components.dispatcher,
            template,
            prefixes,
            config,
        }
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    /// Run one full cycle.
    ///
    /// Errors confined to an area are recorded in the report; only failures
    /// of the fetch phase or of the scratch space fail the cycle itself.
    pub async fn run_cycle(
        &self,
        shutdown: &watch::Receiver<bool>,
    ) -> Result<CycleReport, OrchestratorError> {
        let cycle_id = Uuid::new_v4().to_string();
        let span = info_span!("cycle", cycle_id = %cycle_id);
        let started = Instant::now();

        let result = self.cycle(cycle_id, shutdown).instrument(span).await;

        metrics::CYCLE_DURATION.observe(started.elapsed().as_secs_f64());
        let outcome = match &result {
            Ok(report) if report.is_clean() => "ok",
            Ok(_) => "partial",
            Err(_) => "failed",
        };
        metrics::CYCLES_TOTAL.with_label_values(&[outcome]).inc();
        result
    }

    async fn cycle(
        &self,
        cycle_id: String,
        shutdown: &watch::Receiver<bool>,
    ) -> Result<CycleReport, OrchestratorError> {
        let mut report = CycleReport::new(cycle_id);
        let mut workspace = CycleWorkspace::create(&self.config.scratch_root).await?;
        info!("Cycle started");

        // Fetch
        let store = self.store.as_ref();
        fetch_inputs(store, &self.prefixes.input, workspace.input()).await?;
        let completed = check_in_store(
            store,
            &self.prefixes.output,
            self.config.completeness_depth,
        )
        .await?;

        // Discovery
        let scan = scan_datasets(workspace.input(), &completed).await?;
        report.datasets_seen = scan.pending.len() + scan.skipped.len();
        report.datasets_skipped = scan.skipped.len();
        metrics::DATASETS_SKIPPED.inc_by(scan.skipped.len() as u64);

        for dataset in &scan.pending {
            if stop_requested(shutdown) {
                report.interrupted = true;
                break;
            }
            self.process_dataset(&workspace, dataset, shutdown, &mut report)
                .instrument(info_span!("dataset", dataset = %dataset.name))
                .await;
            workspace.clear_dataset_output(&dataset.name).await;
            report.datasets_processed += 1;
        }

        workspace.cleanup().await;
        report.finished_at = Some(chrono::Utc::now());
        info!(
            datasets = report.datasets_seen,
            skipped = report.datasets_skipped,
            snapshots = report.snapshots_found,
            store_hits = report.store_hits,
            downloads = report.downloads,
            outputs = report.outputs,
            errors = report.errors.len(),
            interrupted = report.interrupted,
            "Cycle finished"
        );
        Ok(report)
    }

    async fn process_dataset(
        &self,
        workspace: &CycleWorkspace,
        dataset: &Dataset,
        shutdown: &watch::Receiver<bool>,
        report: &mut CycleReport,
    ) {
        if dataset.areas.is_empty() {
            warn!("Dataset has no areas");
            return;
        }

        for area_path in &dataset.areas {
            if stop_requested(shutdown) {
                report.interrupted = true;
                return;
            }
            report.areas += 1;

            let area = match read_area(area_path).await {
                Ok(area) => area,
                Err(e) => {
                    warn!(area = %area_path.display(), error = %e, "Failed to read area");
                    report.errors.push(e.to_string());
                    continue;
                }
            };
            info!(area = %area.name, "Processing area");

            let query = self.template.merged_with(area.properties.iter());
            let mut snapshots = match self.catalog.search(&query, Some(&area.wkt)).await {
                Ok(snapshots) => snapshots,
                Err(e) => {
                    error!(area = %area.name, error = %e, "Search failed");
                    report.errors.push(format!("{}: {}", area.name, e));
                    continue;
                }
            };
            snapshots.sort_by_key(|s| s.begin_position);
            report.snapshots_found += snapshots.len();
            info!(area = %area.name, snapshots = snapshots.len(), "Snapshots found");

            let run = self
                .process_snapshots(workspace, dataset, area_path, &query, &snapshots, shutdown, report)
                .await;
            if let Err(e) = run {
                error!(area = %area.name, error = %e, "Area aborted");
                report.errors.push(format!("{}: {}", area.name, e));
            }
        }
    }

    #[allow(clippy::too_many_arguments)]
    async fn process_snapshots(
        &self,
        workspace: &CycleWorkspace,
        dataset: &Dataset,
        area_path: &Path,
        query: &SearchQuery,
        snapshots: &[Snapshot],
        shutdown: &watch::Receiver<bool>,
        report: &mut CycleReport,
    ) -> Result<(), OrchestratorError> {
        for (index, snapshot) in snapshots.iter().enumerate() {
            if stop_requested(shutdown) {
                report.interrupted = true;
                return Ok(());
            }

            let Some(artifact) = self.sync.ensure_local(snapshot, workspace.data()).await? else {
                report.snapshots_skipped += 1;
                warn!(snapshot = %snapshot.id, "Not synced, skipping");
                continue;
            };
            match artifact.source {
                SyncSource::Store => report.store_hits += 1,
                SyncSource::Origin => report.downloads += 1,
            }
            info!(index, snapshot = %snapshot.id, title = %snapshot.title, "Snapshot ready");

            let job = ProcessingJob::new(
                &artifact.path,
                workspace.dataset_output(&dataset.name),
                area_path,
            )
            .with_shapes(dataset.shape_selection())
            .with_graphs(dataset.graphs.clone());

            let outcome = async {
                let outputs = self.dispatcher.dispatch(query.platform(), &job).await?;
                let pushed =
                    push_outputs(self.store.as_ref(), &self.prefixes.output, workspace.output())
                        .await?;
                Ok::<_, OrchestratorError>((outputs, pushed))
            }
            .await;

            remove_file(&artifact.path).await;
            let (outputs, pushed) = match outcome {
                Ok(done) => done,
                Err(e) => {
                    // Partial outputs would be published by the next push.
                    workspace.clear_dataset_output(&dataset.name).await;
                    return Err(e);
                }
            };
            for output in &outputs {
                remove_file(output).await;
            }

            report.outputs += outputs.len();
            report.objects_pushed += pushed.len();
            metrics::OBJECTS_PUSHED.inc_by(pushed.len() as u64);
            debug!(snapshot = %snapshot.id, outputs = outputs.len(), pushed = pushed.len(), "Snapshot done");
        }
        Ok(())
    }
}

async fn remove_file(path: &Path) {
    match tokio::fs::remove_file(path).await {
        Ok(()) => {}
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => warn!(path = %path.display(), error = %e, "Failed to remove file"),
    }
}
