//! Feed transport replaying scripted responses.

use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::VecDeque;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::catalog::{CatalogError, FeedTransport};

/// Replays responses in order and records every request.
///
/// Once the script runs out every fetch returns an empty document, which
/// the client treats as the end of results.
#[derive(Debug, Clone)]
pub struct ScriptedTransport {
    responses: Arc<RwLock<VecDeque<Result<Value, CatalogError>>>>,
    requests: Arc<RwLock<Vec<Vec<(String, String)>>>>,
}

impl ScriptedTransport {
    pub fn new(responses: Vec<Result<Value, CatalogError>>) -> Self {
        Self {
            responses: Arc::new(RwLock::new(responses.into())),
            requests: Arc::new(RwLock::new(Vec::new())),
        }
    }

    pub async fn requests(&self) -> Vec<Vec<(String, String)>> {
        self.requests.read().await.clone()
    }

    pub async fn request_count(&self) -> usize {
        self.requests.read().await.len()
    }
}

#[async_trait]
impl FeedTransport for ScriptedTransport {
    async fn fetch(&self, params: &[(String, String)]) -> Result<Value, CatalogError> {
        self.requests.write().await.push(params.to_vec());
        self.responses
            .write()
            .await
            .pop_front()
            .unwrap_or_else(|| Ok(json!({})))
    }
}
