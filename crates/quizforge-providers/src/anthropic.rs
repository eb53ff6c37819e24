//! Anthropic (Claude) messages API provider.

use std::time::Instant;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use quizforge_core::error::ProviderError;
use quizforge_core::traits::{
    parse_data_uri, GenerateRequest, GenerateResponse, ImageRequest, ModelInfo, TextProvider,
    TokenUsage,
};

use crate::http::{
    build_client, check_status, decode_error, require_key, send_error, DEFAULT_TIMEOUT_SECS,
};

const DEFAULT_BASE_URL: &str = "https://api.anthropic.com";
const API_VERSION: &str = "2023-06-01";
pub const API_KEY_ENV: &str = "CLAUDE_API_KEY";

/// Anthropic API provider.
pub struct AnthropicProvider {
    api_key: Option<String>,
    base_url: String,
    client: reqwest::Client,
}

impl AnthropicProvider {
    pub fn new(api_key: Option<String>, base_url: Option<String>) -> Self {
        Self {
            api_key,
            base_url: base_url.unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            client: build_client(DEFAULT_TIMEOUT_SECS),
        }
    }

    async fn call(
        &self,
        body: &MessagesRequest,
        start: Instant,
    ) -> anyhow::Result<GenerateResponse> {
        let api_key = require_key(&self.api_key, "anthropic", API_KEY_ENV)?;

        let response = self
            .client
            .post(format!("{}/v1/messages", self.base_url))
            .header("x-api-key", api_key)
            .header("anthropic-version", API_VERSION)
            .json(body)
            .send()
            .await
            .map_err(|e| send_error(e, DEFAULT_TIMEOUT_SECS))?;
        let response = check_status(response, &body.model, error_message).await?;
        let api_response: MessagesResponse = response.json().await.map_err(decode_error)?;

        let content: String = api_response
            .content
            .iter()
            .filter_map(|block| block.text.as_deref())
            .collect();
        if content.trim().is_empty() {
            return Err(ProviderError::EmptyResponse("anthropic".into()).into());
        }

        let usage = api_response.usage;
        Ok(GenerateResponse {
            content,
            model: api_response.model,
            token_usage: TokenUsage {
                prompt_tokens: usage.input_tokens,
                completion_tokens: usage.output_tokens,
                total_tokens: usage.input_tokens + usage.output_tokens,
            },
            latency_ms: start.elapsed().as_millis() as u64,
        })
    }
}

#[derive(Serialize)]
struct MessagesRequest {
    model: String,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
    messages: Vec<Message>,
}

#[derive(Serialize)]
struct Message {
    role: &'static str,
    content: Vec<ContentBlock>,
}

#[derive(Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ContentBlock {
    Text { text: String },
    Image { source: ImageSource },
}

#[derive(Serialize)]
struct ImageSource {
    #[serde(rename = "type")]
    kind: &'static str,
    media_type: String,
    data: String,
}

#[derive(Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    content: Vec<ResponseBlock>,
    #[serde(default)]
    usage: Usage,
    model: String,
}

#[derive(Deserialize)]
struct ResponseBlock {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Deserialize, Default)]
struct Usage {
    #[serde(default)]
    input_tokens: u32,
    #[serde(default)]
    output_tokens: u32,
}

#[derive(Deserialize)]
struct AnthropicError {
    error: AnthropicErrorBody,
}

#[derive(Deserialize)]
struct AnthropicErrorBody {
    message: String,
}

fn error_message(body: &str) -> Option<String> {
    serde_json::from_str::<AnthropicError>(body)
        .ok()
        .map(|e| e.error.message)
}

#[async_trait]
impl TextProvider for AnthropicProvider {
    fn name(&self) -> &str {
        "anthropic"
    }

    #[instrument(skip(self, request), fields(model = %request.model))]
    async fn generate(&self, request: &GenerateRequest) -> anyhow::Result<GenerateResponse> {
        let start = Instant::now();
        let body = MessagesRequest {
            model: request.model.clone(),
            max_tokens: request.max_tokens,
            temperature: Some(request.temperature),
            system: request.system_prompt.clone(),
            messages: vec![Message {
                role: "user",
                content: vec![ContentBlock::Text {
                    text: request.prompt.clone(),
                }],
            }],
        };
        self.call(&body, start).await
    }

    #[instrument(skip(self, request), fields(model = %request.model))]
    async fn analyze_image(&self, request: &ImageRequest) -> anyhow::Result<GenerateResponse> {
        let start = Instant::now();
        let image = parse_data_uri(&request.image_data_uri)?;

        let body = MessagesRequest {
            model: request.model.clone(),
            max_tokens: request.max_tokens,
            temperature: None,
            system: None,
            messages: vec![Message {
                role: "user",
                content: vec![
                    ContentBlock::Image {
                        source: ImageSource {
                            kind: "base64",
                            media_type: image.mime_type.to_string(),
                            data: image.base64_data.to_string(),
                        },
                    },
                    ContentBlock::Text {
                        text: request.prompt.clone(),
                    },
                ],
            }],
        };
        self.call(&body, start).await
    }

    fn available_models(&self) -> Vec<ModelInfo> {
        vec![
            ModelInfo {
                id: "claude-sonnet-4-20250514".into(),
                name: "Claude Sonnet 4".into(),
                provider: "anthropic".into(),
                max_context: 200_000,
                vision: true,
            },
            ModelInfo {
                id: "claude-3-5-haiku-20241022".into(),
                name: "Claude 3.5 Haiku".into(),
                provider: "anthropic".into(),
                max_context: 200_000,
                vision: true,
            },
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn request() -> GenerateRequest {
        GenerateRequest {
            model: "claude-sonnet-4-20250514".into(),
            prompt: "Generate 4 questions about volcanoes".into(),
            system_prompt: Some("Respond with JSON".into()),
            max_tokens: 2048,
            temperature: 0.7,
        }
    }

    #[tokio::test]
    async fn successful_generation() {
        let server = MockServer::start().await;

        let response_body = serde_json::json!({
            "content": [{"type": "text", "text": "{\"questions\": []}"}],
            "model": "claude-sonnet-4-20250514",
            "usage": {"input_tokens": 50, "output_tokens": 20}
        });

        Mock::given(method("POST"))
            .and(path("/v1/messages"))
            .and(header("x-api-key", "test-key"))
            .and(header("anthropic-version", API_VERSION))
            .and(body_partial_json(serde_json::json!({"system": "Respond with JSON"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(&response_body))
            .mount(&server)
            .await;

        let provider = AnthropicProvider::new(Some("test-key".into()), Some(server.uri()));
        let response = provider.generate(&request()).await.unwrap();
        assert_eq!(response.content, "{\"questions\": []}");
        assert_eq!(response.token_usage.total_tokens, 70);
    }

    #[tokio::test]
    async fn authentication_failure() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/messages"))
            .respond_with(ResponseTemplate::new(401).set_body_json(serde_json::json!({
                "type": "error",
                "error": {"type": "authentication_error", "message": "invalid x-api-key"}
            })))
            .mount(&server)
            .await;

        let provider = AnthropicProvider::new(Some("bad-key".into()), Some(server.uri()));
        let err = provider.generate(&request()).await.unwrap_err();
        assert_eq!(err.to_string(), "authentication failed: invalid x-api-key");
    }

    #[tokio::test]
    async fn rate_limiting() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/messages"))
            .respond_with(ResponseTemplate::new(429).insert_header("retry-after", "30"))
            .mount(&server)
            .await;

        let provider = AnthropicProvider::new(Some("test-key".into()), Some(server.uri()));
        let err = provider.generate(&request()).await.unwrap_err();
        let provider_err = err.downcast_ref::<ProviderError>().unwrap();
        assert_eq!(provider_err.retry_after_ms(), Some(30_000));
        assert!(!provider_err.is_permanent());
    }

    #[tokio::test]
    async fn unknown_model() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/messages"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let provider = AnthropicProvider::new(Some("test-key".into()), Some(server.uri()));
        let err = provider.generate(&request()).await.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ProviderError>(),
            Some(ProviderError::ModelNotFound(m)) if m == "claude-sonnet-4-20250514"
        ));
    }

    #[tokio::test]
    async fn image_block_precedes_prompt() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/messages"))
            .and(body_partial_json(serde_json::json!({
                "messages": [{"role": "user", "content": [
                    {"type": "image", "source": {"type": "base64", "media_type": "image/png", "data": "iVBORw0KGgo="}},
                    {"type": "text", "text": "Extract the key terms"}
                ]}]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "content": [{"type": "text", "text": "mitosis, anaphase"}],
                "model": "claude-sonnet-4-20250514"
            })))
            .mount(&server)
            .await;

        let provider = AnthropicProvider::new(Some("test-key".into()), Some(server.uri()));
        let response = provider
            .analyze_image(&ImageRequest {
                model: "claude-sonnet-4-20250514".into(),
                prompt: "Extract the key terms".into(),
                image_data_uri: "data:image/png;base64,iVBORw0KGgo=".into(),
                max_tokens: 256,
            })
            .await
            .unwrap();
        assert_eq!(response.content, "mitosis, anaphase");
    }

    #[tokio::test]
    async fn missing_key() {
        let provider = AnthropicProvider::new(None, Some("http://127.0.0.1:9".into()));
        let err = provider.generate(&request()).await.unwrap_err();
        assert!(err.to_string().contains("CLAUDE_API_KEY"));
    }
}
