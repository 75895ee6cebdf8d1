//! Mock catalog for testing.

use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::catalog::{Catalog, CatalogError, SearchQuery, Snapshot};

/// A recorded search for test assertions.
#[derive(Debug, Clone)]
pub struct RecordedSearch {
    pub query: SearchQuery,
    pub area: Option<String>,
}

/// Mock implementation of the [`Catalog`] trait.
///
/// Returns the configured snapshots for every search and records the
/// query and area of each call.
#[derive(Debug, Clone, Default)]
pub struct MockCatalog {
    results: Arc<RwLock<Vec<Snapshot>>>,
    searches: Arc<RwLock<Vec<RecordedSearch>>>,
    /// If set, the next search fails with this error.
    next_error: Arc<RwLock<Option<CatalogError>>>,
}

impl MockCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn set_results(&self, results: Vec<Snapshot>) {
        *self.results.write().await = results;
    }

    pub async fn set_next_error(&self, error: CatalogError) {
        *self.next_error.write().await = Some(error);
    }

    pub async fn recorded_searches(&self) -> Vec<RecordedSearch> {
        self.searches.read().await.clone()
    }

    pub async fn search_count(&self) -> usize {
        self.searches.read().await.len()
    }
}

#[async_trait]
impl Catalog for MockCatalog {
    fn name(&self) -> &str {
        "mock"
    }

    async fn search(
        &self,
        query: &SearchQuery,
        area: Option<&str>,
    ) -> Result<Vec<Snapshot>, CatalogError> {
        self.searches.write().await.push(RecordedSearch {
            query: query.clone(),
            area: area.map(str::to_string),
        });
        if let Some(error) = self.next_error.write().await.take() {
            return Err(error);
        }
        Ok(self.results.read().await.clone())
    }
}
