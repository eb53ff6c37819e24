//! Google Gemini provider (`generateContent` REST API).

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

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";
pub const API_KEY_ENV: &str = "GEMINI_API_KEY";

/// Gemini API provider.
pub struct GeminiProvider {
    api_key: Option<String>,
    base_url: String,
    client: reqwest::Client,
}

impl GeminiProvider {
    /// A missing key is reported on the first call, not here.
    pub fn new(api_key: Option<String>, base_url: Option<String>) -> Self {
        Self {
            api_key,
            base_url: base_url.unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            client: build_client(DEFAULT_TIMEOUT_SECS),
        }
    }

    async fn call(
        &self,
        model: &str,
        body: &GeminiRequest,
        start: Instant,
    ) -> anyhow::Result<GenerateResponse> {
        let api_key = require_key(&self.api_key, "gemini", API_KEY_ENV)?;

        let response = self
            .client
            .post(format!(
                "{}/v1beta/models/{model}:generateContent",
                self.base_url
            ))
            .header("x-goog-api-key", api_key)
            .json(body)
            .send()
            .await
            .map_err(|e| send_error(e, DEFAULT_TIMEOUT_SECS))?;

        let response = check_status(response, model, error_message).await?;
        let api_response: GeminiResponse = response.json().await.map_err(decode_error)?;

        let content: String = api_response
            .candidates
            .first()
            .and_then(|c| c.content.as_ref())
            .map(|c| c.parts.iter().filter_map(|p| p.text.as_deref()).collect())
            .unwrap_or_default();
        if content.trim().is_empty() {
            return Err(ProviderError::EmptyResponse("gemini".into()).into());
        }

        let usage = api_response.usage_metadata;
        Ok(GenerateResponse {
            content,
            model: api_response
                .model_version
                .unwrap_or_else(|| model.to_string()),
            token_usage: TokenUsage {
                prompt_tokens: usage.prompt_token_count,
                completion_tokens: usage.candidates_token_count,
                total_tokens: usage.total_token_count,
            },
            latency_ms: start.elapsed().as_millis() as u64,
        })
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiRequest {
    contents: Vec<GeminiContent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<GeminiContent>,
    generation_config: GenerationConfig,
}

#[derive(Serialize)]
struct GeminiContent {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<&'static str>,
    parts: Vec<GeminiPart>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
enum GeminiPart {
    Text(String),
    InlineData(InlineData),
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct InlineData {
    mime_type: String,
    data: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    max_output_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f64>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
    #[serde(default)]
    usage_metadata: GeminiUsage,
    #[serde(default)]
    model_version: Option<String>,
}

#[derive(Deserialize)]
struct GeminiCandidate {
    #[serde(default)]
    content: Option<GeminiResponseContent>,
}

#[derive(Deserialize)]
struct GeminiResponseContent {
    #[serde(default)]
    parts: Vec<GeminiResponsePart>,
}

#[derive(Deserialize)]
struct GeminiResponsePart {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct GeminiUsage {
    #[serde(default)]
    prompt_token_count: u32,
    #[serde(default)]
    candidates_token_count: u32,
    #[serde(default)]
    total_token_count: u32,
}

#[derive(Deserialize)]
struct GeminiError {
    error: GeminiErrorBody,
}

#[derive(Deserialize)]
struct GeminiErrorBody {
    message: String,
}

fn error_message(body: &str) -> Option<String> {
    serde_json::from_str::<GeminiError>(body)
        .ok()
        .map(|e| e.error.message)
}

#[async_trait]
impl TextProvider for GeminiProvider {
    fn name(&self) -> &str {
        "gemini"
    }

    #[instrument(skip(self, request), fields(model = %request.model))]
    async fn generate(&self, request: &GenerateRequest) -> anyhow::Result<GenerateResponse> {
        let start = Instant::now();

        let body = GeminiRequest {
            contents: vec![GeminiContent {
                role: Some("user"),
                parts: vec![GeminiPart::Text(request.prompt.clone())],
            }],
            system_instruction: request.system_prompt.as_ref().map(|s| GeminiContent {
                role: None,
                parts: vec![GeminiPart::Text(s.clone())],
            }),
            generation_config: GenerationConfig {
                max_output_tokens: request.max_tokens,
                temperature: Some(request.temperature),
            },
        };

        self.call(&request.model, &body, start).await
    }

    #[instrument(skip(self, request), fields(model = %request.model))]
    async fn analyze_image(&self, request: &ImageRequest) -> anyhow::Result<GenerateResponse> {
        let start = Instant::now();
        let image = parse_data_uri(&request.image_data_uri)?;

        let body = GeminiRequest {
            contents: vec![GeminiContent {
                role: Some("user"),
                parts: vec![
                    GeminiPart::Text(request.prompt.clone()),
                    GeminiPart::InlineData(InlineData {
                        mime_type: image.mime_type.to_string(),
                        data: image.base64_data.to_string(),
                    }),
                ],
            }],
            system_instruction: None,
            generation_config: GenerationConfig {
                max_output_tokens: request.max_tokens,
                temperature: None,
            },
        };

        self.call(&request.model, &body, start).await
    }

    fn available_models(&self) -> Vec<ModelInfo> {
        vec![
            ModelInfo {
                id: "gemini-2.5-flash".into(),
                name: "Gemini 2.5 Flash".into(),
                provider: "gemini".into(),
                max_context: 1_048_576,
                vision: true,
            },
            ModelInfo {
                id: "gemini-2.5-pro".into(),
                name: "Gemini 2.5 Pro".into(),
                provider: "gemini".into(),
                max_context: 1_048_576,
                vision: true,
            },
            ModelInfo {
                id: "gemini-2.0-flash".into(),
                name: "Gemini 2.0 Flash".into(),
                provider: "gemini".into(),
                max_context: 1_048_576,
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

    const GENERATE_PATH: &str = "/v1beta/models/gemini-2.5-flash:generateContent";

    fn request() -> GenerateRequest {
        GenerateRequest {
            model: "gemini-2.5-flash".into(),
            prompt: "Generate 3 questions about optics".into(),
            system_prompt: Some("Respond with JSON".into()),
            max_tokens: 1024,
            temperature: 0.7,
        }
    }

    #[tokio::test]
    async fn successful_generation() {
        let server = MockServer::start().await;

        let response_body = serde_json::json!({
            "candidates": [{"content": {"role": "model", "parts": [{"text": "{\"questions\": "}, {"text": "[]}"}]}}],
            "usageMetadata": {"promptTokenCount": 12, "candidatesTokenCount": 8, "totalTokenCount": 20},
            "modelVersion": "gemini-2.5-flash-001"
        });

        Mock::given(method("POST"))
            .and(path(GENERATE_PATH))
            .and(header("x-goog-api-key", "test-key"))
            .and(body_partial_json(serde_json::json!({
                "systemInstruction": {"parts": [{"text": "Respond with JSON"}]},
                "generationConfig": {"maxOutputTokens": 1024}
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(&response_body))
            .mount(&server)
            .await;

        let provider = GeminiProvider::new(Some("test-key".into()), Some(server.uri()));
        let response = provider.generate(&request()).await.unwrap();
        assert_eq!(response.content, "{\"questions\": []}");
        assert_eq!(response.model, "gemini-2.5-flash-001");
        assert_eq!(response.token_usage.total_tokens, 20);
    }

    #[tokio::test]
    async fn missing_key_fails_without_a_request() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let provider = GeminiProvider::new(None, Some(server.uri()));
        let err = provider.generate(&request()).await.unwrap_err();
        let provider_err = err.downcast_ref::<ProviderError>().unwrap();
        assert!(matches!(provider_err, ProviderError::MissingCredential { .. }));
        assert!(err.to_string().contains(API_KEY_ENV));
    }

    #[tokio::test]
    async fn network_error_does_not_leak_key() {
        let provider = GeminiProvider::new(
            Some("SECRET-KEY-123".into()),
            Some("http://127.0.0.1:1".into()),
        );
        let err = provider.generate(&request()).await.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ProviderError>(),
            Some(ProviderError::NetworkError(_))
        ));
        assert!(!format!("{err:#}").contains("SECRET-KEY-123"));
        assert!(!format!("{err:?}").contains("SECRET-KEY-123"));
    }

    #[tokio::test]
    async fn non_success_below_400_is_an_api_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(GENERATE_PATH))
            .respond_with(ResponseTemplate::new(304))
            .mount(&server)
            .await;

        let provider = GeminiProvider::new(Some("k".into()), Some(server.uri()));
        let err = provider.generate(&request()).await.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ProviderError>(),
            Some(ProviderError::ApiError { status: 304, .. })
        ));
    }

    #[tokio::test]
    async fn empty_candidates_is_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(GENERATE_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "candidates": []
            })))
            .mount(&server)
            .await;

        let provider = GeminiProvider::new(Some("k".into()), Some(server.uri()));
        let err = provider.generate(&request()).await.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ProviderError>(),
            Some(ProviderError::EmptyResponse(_))
        ));
    }

    #[tokio::test]
    async fn api_error_message_is_extracted() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(GENERATE_PATH))
            .respond_with(ResponseTemplate::new(400).set_body_json(serde_json::json!({
                "error": {"code": 400, "message": "Invalid JSON payload", "status": "INVALID_ARGUMENT"}
            })))
            .mount(&server)
            .await;

        let provider = GeminiProvider::new(Some("k".into()), Some(server.uri()));
        let err = provider.generate(&request()).await.unwrap_err();
        assert_eq!(
            err.to_string(),
            "API error (HTTP 400): Invalid JSON payload"
        );
    }

    #[tokio::test]
    async fn image_is_sent_inline() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(GENERATE_PATH))
            .and(body_partial_json(serde_json::json!({
                "contents": [{"role": "user", "parts": [
                    {"text": "Describe this diagram"},
                    {"inlineData": {"mimeType": "image/png", "data": "iVBORw0KGgo="}}
                ]}]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "candidates": [{"content": {"parts": [{"text": "A cell diagram."}]}}]
            })))
            .mount(&server)
            .await;

        let provider = GeminiProvider::new(Some("k".into()), Some(server.uri()));
        let response = provider
            .analyze_image(&ImageRequest {
                model: "gemini-2.5-flash".into(),
                prompt: "Describe this diagram".into(),
                image_data_uri: "data:image/png;base64,iVBORw0KGgo=".into(),
                max_tokens: 512,
            })
            .await
            .unwrap();
        assert_eq!(response.content, "A cell diagram.");
        assert_eq!(response.model, "gemini-2.5-flash");
    }

    #[tokio::test]
    async fn invalid_image_uri_is_rejected() {
        let provider = GeminiProvider::new(Some("k".into()), Some("http://127.0.0.1:9".into()));
        let err = provider
            .analyze_image(&ImageRequest {
                model: "gemini-2.5-flash".into(),
                prompt: "Describe".into(),
                image_data_uri: "not-a-data-uri".into(),
                max_tokens: 512,
            })
            .await
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ProviderError>(),
            Some(ProviderError::InvalidImage(_))
        ));
    }
}
