//! Seams to the two external collaborators: an indexed knowledge source and a
//! generative completion backend.

mod completion;
mod search;

pub use completion::ChatCompletionsClient;
pub use search::AzureSearchClient;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::error::CoachingError;

/// Raw document returned by the knowledge source.
pub type Document = Map<String, Value>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchRequest {
    pub query: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter: Option<String>,
    #[serde(default)]
    pub select: Vec<String>,
    pub top: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletionRequest {
    pub system_prompt: String,
    pub user_prompt: String,
    pub max_tokens: u32,
    /// `None` defers to the backend's configured default.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
}

/// Indexed document store queried first for recommendations.
#[async_trait]
pub trait KnowledgeSource: Send + Sync {
    async fn search(&self, request: SearchRequest) -> Result<Vec<Document>, ProviderError>;
}

/// Large-language-model completion service.
#[async_trait]
pub trait GenerativeBackend: Send + Sync {
    async fn complete(&self, request: CompletionRequest) -> Result<String, ProviderError>;
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProviderError {
    #[error("{provider} is not configured")]
    NotConfigured { provider: String },
    #[error("{provider} request failed: {reason}")]
    RequestFailed { provider: String, reason: String },
    #[error("{provider} rejected the credentials")]
    AuthFailed { provider: String },
    #[error("{provider} is rate limiting requests")]
    RateLimited { provider: String },
    #[error("{provider} returned an invalid response: {reason}")]
    InvalidResponse { provider: String, reason: String },
}

impl ProviderError {
    pub fn provider(&self) -> &str {
        match self {
            ProviderError::NotConfigured { provider }
            | ProviderError::RequestFailed { provider, .. }
            | ProviderError::AuthFailed { provider }
            | ProviderError::RateLimited { provider }
            | ProviderError::InvalidResponse { provider, .. } => provider,
        }
    }
}

impl From<ProviderError> for CoachingError {
    fn from(value: ProviderError) -> Self {
        CoachingError::UpstreamService {
            provider: value.provider().to_string(),
            reason: value.to_string(),
        }
    }
}

/// Stand-in for a collaborator that has no configuration; every call fails so
/// the engine falls back to its deterministic paths.
#[derive(Debug, Clone)]
pub struct DisabledProvider {
    name: &'static str,
}

impl DisabledProvider {
    pub const fn knowledge_source() -> Self {
        Self {
            name: "knowledge_source",
        }
    }

    pub const fn generative_backend() -> Self {
        Self {
            name: "generative_backend",
        }
    }

    fn error(&self) -> ProviderError {
        ProviderError::NotConfigured {
            provider: self.name.to_string(),
        }
    }
}

#[async_trait]
impl KnowledgeSource for DisabledProvider {
    async fn search(&self, _request: SearchRequest) -> Result<Vec<Document>, ProviderError> {
        Err(self.error())
    }
}

#[async_trait]
impl GenerativeBackend for DisabledProvider {
    async fn complete(&self, _request: CompletionRequest) -> Result<String, ProviderError> {
        Err(self.error())
    }
}

/// Trim a response body for inclusion in error messages.
pub(crate) fn excerpt(body: &str) -> &str {
    let mut end = body.len().min(200);
    while !body.is_char_boundary(end) {
        end -= 1;
    }
    &body[..end]
}

/// Classify a non-success HTTP status from a provider.
pub(crate) fn status_error(provider: &str, status: reqwest::StatusCode, body: &str) -> ProviderError {
    let provider = provider.to_string();
    match status.as_u16() {
        401 | 403 => ProviderError::AuthFailed { provider },
        429 => ProviderError::RateLimited { provider },
        _ => ProviderError::RequestFailed {
            provider,
            reason: format!("HTTP {status}: {}", excerpt(body)),
        },
    }
}
