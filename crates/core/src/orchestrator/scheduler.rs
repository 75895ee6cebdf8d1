//! Periodic cycle scheduler.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, RwLock};
use tracing::{error, info, warn};

use super::config::SchedulerConfig;
use super::cycle::Orchestrator;
use super::types::SchedulerStatus;

/// Runs [`Orchestrator::run_cycle`] forever, pausing `interval_secs` between
/// the end of one cycle and the start of the next.
pub struct Scheduler {
    orchestrator: Arc<Orchestrator>,
    config: SchedulerConfig,
    status: Arc<RwLock<SchedulerStatus>>,
}

impl Scheduler {
    pub fn new(orchestrator: Arc<Orchestrator>, config: SchedulerConfig) -> Self {
        Self {
            orchestrator,
            config,
            status: Arc::new(RwLock::new(SchedulerStatus::default())),
        }
    }

    /// Shared view of the scheduler state.
    pub fn status_handle(&self) -> Arc<RwLock<SchedulerStatus>> {
        Arc::clone(&self.status)
    }

    pub async fn status(&self) -> SchedulerStatus {
        self.status.read().await.clone()
    }

    /// Loop until `shutdown` flips to true or its sender is dropped.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        info!(
            interval_secs = self.config.interval_secs,
            run_immediately = self.config.run_immediately,
            "Scheduler started"
        );

        if !self.config.run_immediately && !self.wait_or_shutdown(&mut shutdown).await {
            info!("Scheduler stopped");
            return;
        }

        loop {
            if *shutdown.borrow() {
                break;
            }
            self.run_once(&shutdown).await;
            if !self.wait_or_shutdown(&mut shutdown).await {
                break;
            }
        }
        info!("Scheduler stopped");
    }

    /// Run a single cycle and record its outcome in the status.
    pub async fn run_once(&self, shutdown: &watch::Receiver<bool>) {
        self.status.write().await.running = true;
        let result = self.orchestrator.run_cycle(shutdown).await;

        let mut status = self.status.write().await;
        status.running = false;
        match result {
            Ok(report) => {
                if !report.is_clean() {
                    warn!(errors = report.errors.len(), "Cycle finished with errors");
                }
                status.cycles_completed += 1;
                status.last_report = Some(report);
                status.last_error = None;
            }
            Err(e) => {
                error!(error = %e, "Cycle failed");
                status.cycles_failed += 1;
                status.last_error = Some(e.to_string());
            }
        }
    }

    /// Sleep one interval. Returns false when shutdown was requested.
    async fn wait_or_shutdown(&self, shutdown: &mut watch::Receiver<bool>) -> bool {
        if *shutdown.borrow() {
            return false;
        }
        tokio::select! {
            _ = tokio::time::sleep(Duration::from_secs(self.config.interval_secs)) => true,
            changed = shutdown.changed() => {
                if changed.is_err() {
                    info!("Shutdown sender dropped");
                } else {
                    info!("Scheduler received shutdown signal");
                }
                false
            }
        }
    }
}
