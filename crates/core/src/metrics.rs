//! Prometheus metrics for core components.
//!
//! This module provides metrics for:
//! - Catalog search (requests, retries, snapshots)
//! - Artifact sync (store hits, origin downloads, failures)
//! - Processing and the orchestration cycle

use once_cell::sync::Lazy;
use prometheus::{
    Encoder, Histogram, HistogramOpts, IntCounter, IntCounterVec, Opts, Registry, TextEncoder,
};

/// Registry holding every core metric.
pub static REGISTRY: Lazy<Registry> = Lazy::new(|| {
    let registry = Registry::new();
    register_metrics(&registry);
    registry
});

// =============================================================================
// Catalog
// =============================================================================

/// Catalog page requests total.
pub static CATALOG_REQUESTS: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new("gps_catalog_requests_total", "Total catalog page requests").unwrap()
});

/// Catalog requests retried after a connectivity error.
pub static CATALOG_RETRIES: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "gps_catalog_retries_total",
        "Total catalog requests retried after connectivity errors",
    )
    .unwrap()
});

pub static SNAPSHOTS_FOUND: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new("gps_snapshots_found_total", "Total snapshots returned by searches").unwrap()
});

// =============================================================================
// Sync
// =============================================================================

/// Artifacts already present under the sync prefix.
pub static STORE_HITS: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new("gps_store_hits_total", "Artifacts found in the object store").unwrap()
});

pub static ORIGIN_DOWNLOADS: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "gps_origin_downloads_total",
        "Artifacts downloaded from the origin",
    )
    .unwrap()
});

/// Failed origin downloads by kind.
pub static DOWNLOAD_FAILURES: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("gps_download_failures_total", "Failed origin downloads"),
        &["kind"], // "not_found", "http", "connectivity", "fatal"
    )
    .unwrap()
});

pub static BYTES_DOWNLOADED: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new("gps_bytes_downloaded_total", "Bytes downloaded from the origin").unwrap()
});

// =============================================================================
// Processing
// =============================================================================

/// Output files produced by platform.
pub static OUTPUTS_PRODUCED: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("gps_outputs_produced_total", "Output files produced"),
        &["platform"],
    )
    .unwrap()
});

pub static PROCESSING_FAILURES: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("gps_processing_failures_total", "Failed processing jobs"),
        &["platform"],
    )
    .unwrap()
});

// =============================================================================
// Cycle
// =============================================================================

pub static OBJECTS_PUSHED: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new("gps_objects_pushed_total", "Objects written under the output prefix")
        .unwrap()
});

/// Datasets skipped because their outputs already exist.
pub static DATASETS_SKIPPED: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new("gps_datasets_skipped_total", "Datasets skipped as complete").unwrap()
});

/// Cycles by result.
pub static CYCLES_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("gps_cycles_total", "Total orchestration cycles"),
        &["result"], // "ok", "partial", "failed"
    )
    .unwrap()
});

pub static CYCLE_DURATION: Lazy<Histogram> = Lazy::new(|| {
    Histogram::with_opts(
        HistogramOpts::new("gps_cycle_duration_seconds", "Duration of orchestration cycles")
            .buckets(vec![1.0, 10.0, 60.0, 300.0, 900.0, 1800.0, 3600.0, 7200.0, 21600.0]),
    )
    .unwrap()
});

// =============================================================================
// Helper functions
// =============================================================================

/// Get all core metrics for registration in a registry.
pub fn all_metrics() -> Vec<Box<dyn prometheus::core::Collector>> {
    vec![
        // Catalog
        Box::new(CATALOG_REQUESTS.clone()),
        Box::new(CATALOG_RETRIES.clone()),
        Box::new(SNAPSHOTS_FOUND.clone()),
        // Sync
        Box::new(STORE_HITS.clone()),
        Box::new(ORIGIN_DOWNLOADS.clone()),
        Box::new(DOWNLOAD_FAILURES.clone()),
        Box::new(BYTES_DOWNLOADED.clone()),
        // Processing
        Box::new(OUTPUTS_PRODUCED.clone()),
        Box::new(PROCESSING_FAILURES.clone()),
        // Cycle
        Box::new(OBJECTS_PUSHED.clone()),
        Box::new(DATASETS_SKIPPED.clone()),
        Box::new(CYCLES_TOTAL.clone()),
        Box::new(CYCLE_DURATION.clone()),
    ]
}

fn register_metrics(registry: &Registry) {
    for metric in all_metrics() {
        if let Err(e) = registry.register(metric) {
            tracing::warn!(error = %e, "Failed to register metric");
        }
    }
}

/// Encode all core metrics in the Prometheus text format.
pub fn encode_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        tracing::warn!(error = %e, "Failed to encode metrics");
        return String::new();
    }
    String::from_utf8(buffer).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_includes_counters() {
        CATALOG_REQUESTS.inc();
        CYCLES_TOTAL.with_label_values(&["ok"]).inc();

        let text = encode_metrics();
        assert!(text.contains("gps_catalog_requests_total"));
        assert!(text.contains("gps_cycles_total{result=\"ok\"}"));
    }
}
