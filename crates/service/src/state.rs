use chrono::{DateTime, Utc};
use std::sync::Arc;
use tokio::sync::RwLock;

use gps_core::{SanitizedConfig, SchedulerStatus};

/// Shared application state
pub struct AppState {
    config: SanitizedConfig,
    config_hash: String,
    started_at: DateTime<Utc>,
    scheduler: Arc<RwLock<SchedulerStatus>>,
}

impl AppState {
    pub fn new(
        config: SanitizedConfig,
        config_hash: impl Into<String>,
        scheduler: Arc<RwLock<SchedulerStatus>>,
    ) -> Self {
        Self {
            config,
            config_hash: config_hash.into(),
            started_at: Utc::now(),
            scheduler,
        }
    }

    pub fn sanitized_config(&self) -> &SanitizedConfig {
        &self.config
    }

    pub fn config_hash(&self) -> &str {
        &self.config_hash
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub async fn scheduler_status(&self) -> SchedulerStatus {
        self.scheduler.read().await.clone()
    }
}
