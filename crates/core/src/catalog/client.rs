//! Paginated catalog search.

use async_trait::async_trait;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::config::{CatalogConfig, Credentials};
use crate::metrics;

use super::feed::parse_feed;
use super::query::SearchQuery;
use super::transport::{FeedTransport, HttpFeedTransport};
use super::types::{CatalogError, Snapshot, StopReason};
use super::Catalog;

/// Position of the search loop between pages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cursor {
    /// Index of the current filename chunk, when searching by filename.
    pub chunk: Option<usize>,
    /// Paging offset within the current query.
    pub start: u32,
    /// Total reported by the first page that carried one.
    pub total: Option<u64>,
}

/// Outcome of folding one page into the accumulated results.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageStep {
    Continue(Cursor),
    Done(StopReason),
}

/// Client for an OpenSearch-style satellite data catalog.
pub struct DataHubClient {
    transport: Box<dyn FeedTransport>,
    credentials: Credentials,
    config: CatalogConfig,
    verbose: bool,
}

impl DataHubClient {
    /// Client over HTTP, using `config.url`.
    pub fn new(config: CatalogConfig, credentials: Credentials) -> Result<Self, CatalogError> {
        let transport = HttpFeedTransport::new(
            config.url.clone(),
            credentials.clone(),
            Duration::from_secs(config.timeout_secs),
        )?;
        Ok(Self::with_transport(config, credentials, transport))
    }

    pub fn with_transport(
        config: CatalogConfig,
        credentials: Credentials,
        transport: impl FeedTransport + 'static,
    ) -> Self {
        Self {
            transport: Box::new(transport),
            credentials,
            config,
            verbose: false,
        }
    }

    /// Report paging progress at info level instead of debug.
    pub fn verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    /// Fold one decoded page into `found` and decide where to go next.
    ///
    /// Stop checks run in order: record cap, chunk exhaustion, reported
    /// total. The next offset never reaches the reported total.
    pub fn step(
        &self,
        body: &Value,
        cursor: Cursor,
        chunk_count: usize,
        rows: u32,
        found: &mut Vec<Snapshot>,
    ) -> Result<PageStep, CatalogError> {
        let Some(page) = parse_feed(body)? else {
            return Ok(PageStep::Done(StopReason::NoMoreResults));
        };

        let count = page.entries.len();
        let total = cursor.total.or(page.total);
        found.extend(page.entries);

        if self.verbose {
            info!(page_entries = count, accumulated = found.len(), total = ?total, "Catalog page");
        } else {
            debug!(page_entries = count, accumulated = found.len(), total = ?total, "Catalog page");
        }

        if found.len() >= self.config.max_records {
            return Ok(PageStep::Done(StopReason::MaxRecords));
        }

        if let Some(chunk) = cursor.chunk {
            let next = chunk + 1;
            if next >= chunk_count {
                return Ok(PageStep::Done(StopReason::ChunksExhausted));
            }
            return Ok(PageStep::Continue(Cursor {
                chunk: Some(next),
                start: 0,
                total: None,
            }));
        }

        if count == 0 {
            return Ok(PageStep::Done(StopReason::NoMoreResults));
        }

        let start = cursor.start.saturating_add(rows);
        if total.is_some_and(|t| u64::from(start) >= t) {
            return Ok(PageStep::Done(StopReason::TotalReached));
        }

        Ok(PageStep::Continue(Cursor {
            chunk: None,
            start,
            total,
        }))
    }
}

#[async_trait]
impl Catalog for DataHubClient {
    fn name(&self) -> &str {
        &self.config.url
    }

    async fn search(
        &self,
        query: &SearchQuery,
        area: Option<&str>,
    ) -> Result<Vec<Snapshot>, CatalogError> {
        if !self.credentials.is_complete() {
            return Err(CatalogError::MissingCredentials);
        }

        let mut query = query.clone();
        if let Some(area) = area.filter(|a| !a.trim().is_empty()) {
            if let Err(e) = query.set_area(area) {
                warn!(error = %e, "Ignoring area");
            }
        }

        let chunk_size = self.config.chunk_size.max(1);
        let chunks: Vec<&[String]> = query.filenames.chunks(chunk_size).collect();

        let mut cursor = Cursor {
            chunk: (!chunks.is_empty()).then_some(0),
            start: query.start,
            total: None,
        };
        let mut found = Vec::new();
        let mut reason = StopReason::IterationBudget;
        let retry_delay = Duration::from_secs(self.config.retry_delay_secs);

        for iteration in 0..self.config.max_iterations {
            let chunk = cursor.chunk.and_then(|i| chunks.get(i).copied());
            let params = query.request_params(chunk, cursor.start, self.config.forward_extra_fields);
            metrics::CATALOG_REQUESTS.inc();

            let body = match self.transport.fetch(&params).await {
                Ok(body) => body,
                Err(e) if e.is_retryable() => {
                    metrics::CATALOG_RETRIES.inc();
                    warn!(iteration, error = %e, "Catalog request failed, retrying");
                    tokio::time::sleep(retry_delay).await;
                    continue;
                }
                Err(e) => {
                    warn!(iteration, error = %e, "Catalog request failed");
                    reason = StopReason::Aborted(e.to_string());
                    break;
                }
            };

            match self.step(&body, cursor, chunks.len(), query.rows, &mut found) {
                Ok(PageStep::Continue(next)) => cursor = next,
                Ok(PageStep::Done(done)) => {
                    reason = done;
                    break;
                }
                Err(e @ CatalogError::InvalidEntry { .. }) => return Err(e),
                Err(e) => {
                    warn!(iteration, error = %e, "Undecodable catalog page");
                    reason = StopReason::Aborted(e.to_string());
                    break;
                }
            }
        }

        metrics::SNAPSHOTS_FOUND.inc_by(found.len() as u64);
        info!(found = found.len(), reason = %reason, "Catalog search finished");
        Ok(found)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::QueryField;
    use crate::testing::{fixtures, ScriptedTransport};

    fn config() -> CatalogConfig {
        CatalogConfig {
            retry_delay_secs: 0,
            ..CatalogConfig::default()
        }
    }

    fn credentials() -> Credentials {
        Credentials::new("user", "pass")
    }

    #[tokio::test]
    async fn test_missing_credentials() {
        let transport = ScriptedTransport::new(vec![]);
        let client = DataHubClient::with_transport(config(), Credentials::default(), transport.clone());

        let result = client.search(&SearchQuery::new(), None).await;
        assert!(matches!(result, Err(CatalogError::MissingCredentials)));
        assert_eq!(transport.request_count().await, 0);
    }

    #[tokio::test]
    async fn test_paginates_until_total() {
        let transport = ScriptedTransport::new(vec![
            Ok(fixtures::feed_page(&["a", "b"], 5)),
            Ok(fixtures::feed_page(&["c", "d"], 5)),
            Ok(fixtures::feed_page(&["e"], 5)),
        ]);
        let client = DataHubClient::with_transport(config(), credentials(), transport.clone());
        let query = SearchQuery {
            rows: 2,
            ..SearchQuery::new().with(QueryField::PlatformName, "Sentinel-2")
        };

        let found = client.search(&query, None).await.unwrap();
        assert_eq!(found.len(), 5);

        let starts: Vec<String> = transport
            .requests()
            .await
            .iter()
            .map(|p| fixtures::param(p, "start").unwrap_or_default())
            .collect();
        assert_eq!(starts, vec!["0", "2", "4"]);
    }

    #[tokio::test]
    async fn test_stops_at_max_records() {
        let transport = ScriptedTransport::new(vec![
            Ok(fixtures::feed_page(&["a", "b", "c"], 100)),
            Ok(fixtures::feed_page(&["d", "e", "f"], 100)),
        ]);
        let client = DataHubClient::with_transport(
            CatalogConfig {
                max_records: 3,
                ..config()
            },
            credentials(),
            transport.clone(),
        );

        let found = client.search(&SearchQuery::new(), None).await.unwrap();
        assert_eq!(found.len(), 3);
        assert_eq!(transport.request_count().await, 1);
    }

    #[tokio::test]
    async fn test_http_error_returns_partial_results() {
        let transport = ScriptedTransport::new(vec![
            Ok(fixtures::feed_page(&["a", "b"], 10)),
            Err(CatalogError::Http {
                status: 503,
                body: "down".to_string(),
            }),
        ]);
        let client = DataHubClient::with_transport(config(), credentials(), transport.clone());
        let query = SearchQuery {
            rows: 2,
            ..SearchQuery::new()
        };

        let found = client.search(&query, None).await.unwrap();
        assert_eq!(found.len(), 2);
        assert_eq!(transport.request_count().await, 2);
    }

    #[tokio::test]
    async fn test_connectivity_error_retries_same_cursor() {
        let transport = ScriptedTransport::new(vec![
            Err(CatalogError::Connectivity("refused".to_string())),
            Ok(fixtures::feed_page(&["a"], 1)),
        ]);
        let client = DataHubClient::with_transport(config(), credentials(), transport.clone());

        let found = client.search(&SearchQuery::new(), None).await.unwrap();
        assert_eq!(found.len(), 1);

        let requests = transport.requests().await;
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[0], requests[1]);
    }

    #[tokio::test]
    async fn test_retries_bounded_by_iteration_budget() {
        let errors = (0..10)
            .map(|_| Err(CatalogError::Connectivity("refused".to_string())))
            .collect();
        let transport = ScriptedTransport::new(errors);
        let client = DataHubClient::with_transport(
            CatalogConfig {
                max_iterations: 4,
                ..config()
            },
            credentials(),
            transport.clone(),
        );

        let found = client.search(&SearchQuery::new(), None).await.unwrap();
        assert!(found.is_empty());
        assert_eq!(transport.request_count().await, 4);
    }

    #[tokio::test]
    async fn test_filename_chunks() {
        let filenames: Vec<String> = (0..5).map(|i| format!("S2A_{}*", i)).collect();
        let transport = ScriptedTransport::new(vec![
            Ok(fixtures::feed_page(&["a", "b"], 2)),
            Ok(fixtures::feed_page(&["c", "d"], 2)),
            Ok(fixtures::feed_page(&["e"], 1)),
        ]);
        let client = DataHubClient::with_transport(
            CatalogConfig {
                chunk_size: 2,
                ..config()
            },
            credentials(),
            transport.clone(),
        );
        let query = SearchQuery::new()
            .with(QueryField::PlatformName, "Sentinel-2")
            .with_filenames(filenames);

        let found = client.search(&query, Some("POINT (1 2)")).await.unwrap();
        assert_eq!(found.len(), 5);

        let requests = transport.requests().await;
        assert_eq!(requests.len(), 3);
        assert_eq!(
            fixtures::param(&requests[0], "q").unwrap(),
            "filename:S2A_0* OR filename:S2A_1*"
        );
        assert_eq!(fixtures::param(&requests[2], "q").unwrap(), "filename:S2A_4*");
        for request in &requests {
            assert_eq!(fixtures::param(request, "start").unwrap(), "0");
        }
    }

    #[tokio::test]
    async fn test_invalid_entry_aborts_search() {
        let mut page = fixtures::feed_page(&["a"], 1);
        page["feed"]["entry"][0]
            .as_object_mut()
            .unwrap()
            .remove("link");
        let transport = ScriptedTransport::new(vec![Ok(page)]);
        let client = DataHubClient::with_transport(config(), credentials(), transport);

        let result = client.search(&SearchQuery::new(), None).await;
        assert!(matches!(result, Err(CatalogError::InvalidEntry { .. })));
    }

    #[tokio::test]
    async fn test_unsupported_area_is_ignored() {
        let transport = ScriptedTransport::new(vec![Ok(fixtures::feed_page(&["a"], 1))]);
        let client = DataHubClient::with_transport(config(), credentials(), transport.clone());
        let query = SearchQuery::new().with(QueryField::PlatformName, "Sentinel-1");

        client
            .search(&query, Some("LINESTRING(0 0, 1 1)"))
            .await
            .unwrap();

        let requests = transport.requests().await;
        assert_eq!(
            fixtures::param(&requests[0], "q").unwrap(),
            "platformname:Sentinel-1"
        );
    }

    #[tokio::test]
    async fn test_area_becomes_footprint() {
        let transport = ScriptedTransport::new(vec![Ok(fixtures::feed_page(&["a"], 1))]);
        let client = DataHubClient::with_transport(config(), credentials(), transport.clone());

        client
            .search(&SearchQuery::new(), Some("POLYGON((0 0,1 0,1 1,0 0))"))
            .await
            .unwrap();

        let requests = transport.requests().await;
        assert_eq!(
            fixtures::param(&requests[0], "q").unwrap(),
            "footprint:\"Intersects(POLYGON((0 0,1 0,1 1,0 0)))\""
        );
    }

    #[test]
    fn test_step_never_reaches_total() {
        let client = DataHubClient::with_transport(
            config(),
            credentials(),
            ScriptedTransport::new(vec![]),
        );
        let mut found = Vec::new();
        let cursor = Cursor {
            chunk: None,
            start: 0,
            total: None,
        };

        let step = client
            .step(&fixtures::feed_page(&["a", "b"], 4), cursor, 0, 2, &mut found)
            .unwrap();
        let PageStep::Continue(next) = step else {
            panic!("expected another page");
        };
        assert_eq!(next.start, 2);
        assert_eq!(next.total, Some(4));

        let step = client
            .step(&fixtures::feed_page(&["c", "d"], 4), next, 0, 2, &mut found)
            .unwrap();
        assert_eq!(step, PageStep::Done(StopReason::TotalReached));
        assert_eq!(found.len(), 4);
    }
}
