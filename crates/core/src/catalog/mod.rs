//! Satellite data catalog: typed queries, paginated search and artifact download.

mod client;
mod download;
mod feed;
mod nearest;
mod query;
mod transport;
mod types;

pub use client::{Cursor, DataHubClient, PageStep};
pub use download::{
    disposition_filename, range_total, DownloadError, HttpOriginDownloader, OriginDownloader,
};
pub use feed::{parse_entry, parse_feed, parse_timestamp, FeedPage};
pub use nearest::closest_in_time;
pub use query::{Filters, QueryField, SearchQuery, DEFAULT_ROWS};
pub use transport::{FeedTransport, HttpFeedTransport};
pub use types::{CatalogError, Snapshot, StopReason};

use async_trait::async_trait;

/// A searchable snapshot catalog.
#[async_trait]
pub trait Catalog: Send + Sync {
    /// Catalog name for logging.
    fn name(&self) -> &str;

    /// Search with `query`, optionally restricted to a WKT `area`.
    ///
    /// Results are accumulated across pages. A non-retryable transport
    /// failure ends the loop and returns what was found so far.
    async fn search(
        &self,
        query: &SearchQuery,
        area: Option<&str>,
    ) -> Result<Vec<Snapshot>, CatalogError>;
}
