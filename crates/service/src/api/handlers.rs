use axum::{
    extract::State,
    http::header,
    response::IntoResponse,
    Json,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;

use gps_core::{metrics, SanitizedConfig, SchedulerStatus};

use crate::state::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
}

pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
    })
}

#[derive(Serialize)]
pub struct StatusResponse {
    pub version: &'static str,
    pub started_at: DateTime<Utc>,
    pub config_hash: String,
    pub scheduler: SchedulerStatus,
    pub config: SanitizedConfig,
}

pub async fn status(State(state): State<Arc<AppState>>) -> Json<StatusResponse> {
    Json(StatusResponse {
        version: env!("CARGO_PKG_VERSION"),
        started_at: state.started_at(),
        config_hash: state.config_hash().to_string(),
        scheduler: state.scheduler_status().await,
        config: state.sanitized_config().clone(),
    })
}

/// Prometheus text exposition of the core metrics.
pub async fn metrics() -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        metrics::encode_metrics(),
    )
}
