//! Processing dispatch: platform-specific processors over external raster tools.

mod config;
mod dispatcher;
mod error;
mod gdal;
mod graph;
mod tool;
mod traits;
mod types;

pub use config::{ProcessingConfig, ProcessorKind, ToolPaths};
pub use dispatcher::Dispatcher;
pub use error::ProcessingError;
pub use gdal::{parse_subdatasets, Sentinel1Processor, Sentinel2Processor, Subdataset};
pub use graph::GraphProcessor;
pub use tool::{probe_tool, ToolCommand};
pub use traits::Processor;
pub use types::{title_of, ProcessingJob};
