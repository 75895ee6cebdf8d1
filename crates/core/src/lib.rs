pub mod area;
pub mod catalog;
pub mod config;
pub mod dataset;
pub mod metrics;
pub mod orchestrator;
pub mod processing;
pub mod store;
pub mod sync;
pub mod testing;

pub use area::{read_area, Area, AreaError};
pub use catalog::{
    Catalog, CatalogError, DataHubClient, DownloadError, HttpFeedTransport, HttpOriginDownloader,
    OriginDownloader, QueryField, SearchQuery, Snapshot,
};
pub use config::{
    load_config, load_config_from_str, validate_config, Config, ConfigError, Credentials,
    SanitizedConfig, StoreEnvironment,
};
pub use dataset::{scan_datasets, Dataset, ScanError, ScanResult};
pub use orchestrator::{
    Components, CycleReport, Orchestrator, OrchestratorError, Scheduler, SchedulerConfig,
    SchedulerStatus, StorePrefixes,
};
pub use processing::{Dispatcher, ProcessingConfig, ProcessingError, ProcessingJob, Processor};
pub use store::{BlobStore, ObjectStoreBlobStore, StoreError};
pub use sync::{ArtifactSync, SyncError, SyncSource, SyncedArtifact};
