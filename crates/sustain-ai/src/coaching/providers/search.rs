use async_trait::async_trait;
use reqwest::Client;
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::{excerpt, status_error, Document, KnowledgeSource, ProviderError, SearchRequest};
use crate::config::SearchConfig;

const PROVIDER_NAME: &str = "azure_search";

/// Knowledge source backed by an Azure Cognitive Search index (`docs/search` REST API).
pub struct AzureSearchClient {
    client: Client,
    config: SearchConfig,
}

impl AzureSearchClient {
    pub fn new(config: SearchConfig, timeout: Duration) -> Result<Self, ProviderError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|err| ProviderError::RequestFailed {
                provider: PROVIDER_NAME.to_string(),
                reason: format!("failed to build http client: {err}"),
            })?;

        Ok(Self { client, config })
    }

    fn search_url(&self) -> String {
        format!(
            "{}/indexes/{}/docs/search?api-version={}",
            self.config.endpoint.trim_end_matches('/'),
            self.config.index,
            self.config.api_version
        )
    }
}

impl std::fmt::Debug for AzureSearchClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AzureSearchClient")
            .field("endpoint", &self.config.endpoint)
            .field("index", &self.config.index)
            .finish_non_exhaustive()
    }
}

#[derive(Serialize)]
struct SearchBody<'a> {
    search: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    filter: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    select: Option<String>,
    top: usize,
}

#[derive(Deserialize)]
struct SearchResponse {
    #[serde(default)]
    value: Vec<Document>,
}

#[async_trait]
impl KnowledgeSource for AzureSearchClient {
    async fn search(&self, request: SearchRequest) -> Result<Vec<Document>, ProviderError> {
        let url = self.search_url();
        let body = SearchBody {
            search: &request.query,
            filter: request.filter.as_deref(),
            select: (!request.select.is_empty()).then(|| request.select.join(",")),
            top: request.top,
        };

        tracing::debug!(%url, filter = ?request.filter, top = request.top, "querying knowledge source");

        let response = self
            .client
            .post(&url)
            .header("api-key", self.config.api_key.expose_secret())
            .json(&body)
            .send()
            .await
            .map_err(|err| ProviderError::RequestFailed {
                provider: PROVIDER_NAME.to_string(),
                reason: err.to_string(),
            })?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|err| ProviderError::RequestFailed {
                provider: PROVIDER_NAME.to_string(),
                reason: format!("failed to read response body: {err}"),
            })?;

        if !status.is_success() {
            return Err(status_error(PROVIDER_NAME, status, &text));
        }

        let parsed: SearchResponse =
            serde_json::from_str(&text).map_err(|err| ProviderError::InvalidResponse {
                provider: PROVIDER_NAME.to_string(),
                reason: format!("{err}; body: {}", excerpt(&text)),
            })?;

        Ok(parsed.value)
    }
}
