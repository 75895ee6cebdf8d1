use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// One catalog record, immutable once parsed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    /// Catalog-assigned unique id.
    pub id: String,
    /// Download URL.
    pub link: String,
    pub icon: Option<String>,
    /// Human-readable size as reported by the catalog ("1.2 GB").
    pub size: Option<String>,
    pub title: String,
    /// WKT footprint.
    pub footprint: Option<String>,
    pub begin_position: DateTime<Utc>,
    pub end_position: DateTime<Utc>,
    pub ingestion_date: Option<DateTime<Utc>>,
    /// Cloud cover percentage (0-100).
    pub cloud_coverage: Option<f64>,
    pub instrument: Option<String>,
}

impl Snapshot {
    /// Acquisition midpoint, used for temporal pairing.
    pub fn midpoint(&self) -> DateTime<Utc> {
        self.begin_position + (self.end_position - self.begin_position) / 2
    }
}

/// Why a search loop stopped. Reported for logging; none of these is an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StopReason {
    /// Accumulated records reached the configured maximum.
    MaxRecords,
    /// Every filename chunk has been queried.
    ChunksExhausted,
    /// The next page would start past the reported total.
    TotalReached,
    /// The response carried no entries.
    NoMoreResults,
    /// The iteration budget ran out.
    IterationBudget,
    /// A non-retryable failure ended the loop early.
    Aborted(String),
}

impl std::fmt::Display for StopReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StopReason::MaxRecords => write!(f, "max records reached"),
            StopReason::ChunksExhausted => write!(f, "filename chunks exhausted"),
            StopReason::TotalReached => write!(f, "total results reached"),
            StopReason::NoMoreResults => write!(f, "no more results"),
            StopReason::IterationBudget => write!(f, "iteration budget exhausted"),
            StopReason::Aborted(reason) => write!(f, "aborted: {}", reason),
        }
    }
}

/// Errors from catalog operations.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("catalog credentials are not configured")]
    MissingCredentials,

    #[error("unsupported area geometry: {0}")]
    UnsupportedArea(String),

    #[error("catalog returned HTTP {status}: {body}")]
    Http { status: u16, body: String },

    #[error("catalog unreachable: {0}")]
    Connectivity(String),

    #[error("malformed catalog response: {0}")]
    MalformedResponse(String),

    #[error("invalid catalog entry {id}: {reason}")]
    InvalidEntry { id: String, reason: String },

    #[error("failed to build HTTP client: {0}")]
    Client(String),
}

impl CatalogError {
    /// Connectivity failures are retried after a delay; everything else
    /// ends the search loop.
    pub fn is_retryable(&self) -> bool {
        matches!(self, CatalogError::Connectivity(_))
    }
}
