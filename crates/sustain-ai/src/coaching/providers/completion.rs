use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::{excerpt, status_error, CompletionRequest, GenerativeBackend, ProviderError};
use crate::config::CompletionConfig;

const PROVIDER_NAME: &str = "chat_completions";

/// Generative backend speaking the OpenAI Chat Completions protocol.
///
/// With an `api_version` configured the client targets an Azure OpenAI
/// deployment (`/openai/deployments/{model}/chat/completions`) and authenticates
/// with the `api-key` header; otherwise it posts to `{base_url}/v1/chat/completions`
/// with a bearer token. `max_tokens` from the config caps every request.
pub struct ChatCompletionsClient {
    client: Client,
    config: CompletionConfig,
}

impl ChatCompletionsClient {
    pub fn new(config: CompletionConfig, timeout: Duration) -> Result<Self, ProviderError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|err| ProviderError::RequestFailed {
                provider: PROVIDER_NAME.to_string(),
                reason: format!("failed to build http client: {err}"),
            })?;

        Ok(Self { client, config })
    }

    fn completions_url(&self) -> String {
        let base = self.config.base_url.trim_end_matches('/');
        match &self.config.api_version {
            Some(version) => format!(
                "{base}/openai/deployments/{}/chat/completions?api-version={version}",
                self.config.model
            ),
            None => {
                let base = base.strip_suffix("/v1").unwrap_or(base);
                format!("{base}/v1/chat/completions")
            }
        }
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match (&self.config.api_key, &self.config.api_version) {
            (Some(key), Some(_)) => request.header("api-key", key.expose_secret()),
            (Some(key), None) => request.bearer_auth(key.expose_secret()),
            (None, _) => request,
        }
    }
}

impl std::fmt::Debug for ChatCompletionsClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChatCompletionsClient")
            .field("base_url", &self.config.base_url)
            .field("model", &self.config.model)
            .finish_non_exhaustive()
    }
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Serialize)]
struct ChatCompletionBody<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    model: Option<&'a str>,
    messages: Vec<ChatMessage<'a>>,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Deserialize)]
struct ChatChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

#[async_trait]
impl GenerativeBackend for ChatCompletionsClient {
    async fn complete(&self, request: CompletionRequest) -> Result<String, ProviderError> {
        let url = self.completions_url();
        let model = self
            .config
            .api_version
            .is_none()
            .then_some(self.config.model.as_str());
        let body = ChatCompletionBody {
            model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: &request.system_prompt,
                },
                ChatMessage {
                    role: "user",
                    content: &request.user_prompt,
                },
            ],
            max_tokens: request.max_tokens.min(self.config.max_tokens),
            temperature: request.temperature.unwrap_or(self.config.temperature),
        };

        tracing::debug!(%url, max_tokens = request.max_tokens, "requesting completion");

        let response = self
            .authorize(self.client.post(&url))
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

        let parsed: ChatCompletionResponse =
            serde_json::from_str(&text).map_err(|err| ProviderError::InvalidResponse {
                provider: PROVIDER_NAME.to_string(),
                reason: format!("{err}; body: {}", excerpt(&text)),
            })?;

        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .filter(|content| !content.trim().is_empty())
            .ok_or_else(|| ProviderError::InvalidResponse {
                provider: PROVIDER_NAME.to_string(),
                reason: "response contained no message content".to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::SecretString;

    fn config(api_version: Option<&str>) -> CompletionConfig {
        CompletionConfig {
            base_url: "https://llm.example.net/v1/".to_string(),
            api_key: Some(SecretString::from("key".to_string())),
            model: "coach-model".to_string(),
            api_version: api_version.map(str::to_string),
            max_tokens: 200,
            temperature: 0.2,
        }
    }

    #[test]
    fn openai_style_url_avoids_double_version_segment() {
        let client =
            ChatCompletionsClient::new(config(None), Duration::from_secs(5)).expect("client");
        assert_eq!(
            client.completions_url(),
            "https://llm.example.net/v1/chat/completions"
        );
    }

    #[test]
    fn azure_style_url_targets_deployment() {
        let client = ChatCompletionsClient::new(config(Some("2024-02-01")), Duration::from_secs(5))
            .expect("client");
        assert_eq!(
            client.completions_url(),
            "https://llm.example.net/v1/openai/deployments/coach-model/chat/completions?api-version=2024-02-01"
        );
    }
}
