//! Transport used by the catalog client to fetch one feed page.

use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

use crate::config::Credentials;

use super::types::CatalogError;

/// Fetches one page of catalog results for the given request parameters.
#[async_trait]
pub trait FeedTransport: Send + Sync {
    async fn fetch(&self, params: &[(String, String)]) -> Result<Value, CatalogError>;
}

/// HTTP GET with basic auth against an OpenSearch endpoint.
pub struct HttpFeedTransport {
    client: Client,
    url: String,
    credentials: Credentials,
}

impl HttpFeedTransport {
    pub fn new(
        url: impl Into<String>,
        credentials: Credentials,
        timeout: Duration,
    ) -> Result<Self, CatalogError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| CatalogError::Client(e.to_string()))?;
        Ok(Self {
            client,
            url: url.into(),
            credentials,
        })
    }
}

#[async_trait]
impl FeedTransport for HttpFeedTransport {
    async fn fetch(&self, params: &[(String, String)]) -> Result<Value, CatalogError> {
        debug!(url = %self.url, ?params, "Querying catalog");

        let response = self
            .client
            .get(&self.url)
            .basic_auth(&self.credentials.username, Some(&self.credentials.password))
            .query(params)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() || e.is_connect() || e.is_request() {
                    CatalogError::Connectivity(e.to_string())
                } else {
                    CatalogError::MalformedResponse(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(CatalogError::Http {
                status: status.as_u16(),
                body: body.chars().take(200).collect(),
            });
        }

        response
            .json::<Value>()
            .await
            .map_err(|e| CatalogError::MalformedResponse(format!("failed to decode response: {}", e)))
    }
}
