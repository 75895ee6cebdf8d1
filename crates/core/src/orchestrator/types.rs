//! Types for the orchestrator.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::area::AreaError;
use crate::catalog::CatalogError;
use crate::dataset::ScanError;
use crate::processing::ProcessingError;
use crate::store::StoreError;
use crate::sync::SyncError;

/// Errors that can occur during a cycle.
#[derive(Debug, Error)]
pub enum OrchestratorError {
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("sync error: {0}")]
    Sync(#[from] SyncError),

    #[error("scan error: {0}")]
    Scan(#[from] ScanError),

    #[error("area error: {0}")]
    Area(#[from] AreaError),

    #[error("catalog error: {0}")]
    Catalog(#[from] CatalogError),

    #[error("processing error: {0}")]
    Processing(#[from] ProcessingError),

    #[error("scratch space error: {0}")]
    Workspace(#[from] std::io::Error),
}

/// Counters and errors for one cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CycleReport {
    pub cycle_id: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub datasets_seen: usize,
    pub datasets_skipped: usize,
    pub datasets_processed: usize,
    pub areas: usize,
    pub snapshots_found: usize,
    /// Snapshots the origin had no artifact for.
    pub snapshots_skipped: usize,
    pub store_hits: usize,
    pub downloads: usize,
    pub outputs: usize,
    pub objects_pushed: usize,
    pub errors: Vec<String>,
    /// The cycle stopped early on shutdown.
    pub interrupted: bool,
}

impl CycleReport {
    pub fn new(cycle_id: impl Into<String>) -> Self {
        Self {
            cycle_id: cycle_id.into(),
            started_at: Utc::now(),
            finished_at: None,
            datasets_seen: 0,
            datasets_skipped: 0,
            datasets_processed: 0,
            areas: 0,
            snapshots_found: 0,
            snapshots_skipped: 0,
            store_hits: 0,
            downloads: 0,
            outputs: 0,
            objects_pushed: 0,
            errors: Vec::new(),
            interrupted: false,
        }
    }

    pub fn is_clean(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Scheduler state for the status endpoint.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SchedulerStatus {
    /// A cycle is in progress.
    pub running: bool,
    pub cycles_completed: u64,
    pub cycles_failed: u64,
    pub last_report: Option<CycleReport>,
    pub last_error: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_serialization() {
        let mut report = CycleReport::new("c-1");
        report.snapshots_found = 3;
        report.errors.push("area failed".to_string());

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["cycle_id"], "c-1");
        assert_eq!(json["snapshots_found"], 3);
        assert!(!report.is_clean());
    }
}
