//! Mock provider for testing.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use quizforge_core::error::ProviderError;
use quizforge_core::traits::{
    GenerateRequest, GenerateResponse, ImageRequest, ModelInfo, TextProvider, TokenUsage,
};

#[derive(Debug, Clone, Copy)]
enum Failure {
    ServerError,
    MissingCredential,
}

/// A mock provider for exercising the generator without real API calls.
///
/// Resolution order for each call: failure mode, then the next scripted
/// response, then the first prompt-substring match, then the default.
pub struct MockProvider {
    /// Map of prompt substring → response text.
    responses: HashMap<String, String>,
    default_response: String,
    sequence: Mutex<VecDeque<String>>,
    failure: Option<Failure>,
    call_count: AtomicU32,
    last_request: Mutex<Option<GenerateRequest>>,
}

impl MockProvider {
    /// Create a mock with prompt-substring → response mappings.
    pub fn new(responses: HashMap<String, String>) -> Self {
        Self {
            responses,
            default_response: r#"{"questions": []}"#.to_string(),
            sequence: Mutex::new(VecDeque::new()),
            failure: None,
            call_count: AtomicU32::new(0),
            last_request: Mutex::new(None),
        }
    }

    /// Create a mock that always returns the same response.
    pub fn with_fixed_response(response: &str) -> Self {
        Self {
            default_response: response.to_string(),
            ..Self::new(HashMap::new())
        }
    }

    /// Create a mock that returns `responses` in order, then the default.
    pub fn with_sequence<I, S>(responses: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            sequence: Mutex::new(responses.into_iter().map(Into::into).collect()),
            ..Self::new(HashMap::new())
        }
    }

    /// Create a mock whose every call fails with an HTTP 500.
    pub fn failing() -> Self {
        Self {
            failure: Some(Failure::ServerError),
            ..Self::new(HashMap::new())
        }
    }

    /// Create a mock that behaves like a backend with no API key.
    pub fn unconfigured() -> Self {
        Self {
            failure: Some(Failure::MissingCredential),
            ..Self::new(HashMap::new())
        }
    }

    /// Number of calls made to this provider.
    pub fn call_count(&self) -> u32 {
        self.call_count.load(Ordering::Relaxed)
    }

    /// Last text-generation request made to this provider.
    pub fn last_request(&self) -> Option<GenerateRequest> {
        self.last_request
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    fn fail(&self, failure: Failure) -> anyhow::Error {
        match failure {
            Failure::ServerError => ProviderError::ApiError {
                status: 500,
                message: "mock failure".into(),
            }
            .into(),
            Failure::MissingCredential => ProviderError::MissingCredential {
                provider: "mock".into(),
                env_var: "MOCK_API_KEY".into(),
            }
            .into(),
        }
    }

    fn respond(&self, model: &str, prompt: &str, content: String) -> GenerateResponse {
        let prompt_tokens = (prompt.len() / 4) as u32;
        let completion_tokens = (content.len() / 4) as u32;
        GenerateResponse {
            content,
            model: model.to_string(),
            token_usage: TokenUsage {
                prompt_tokens,
                completion_tokens,
                total_tokens: prompt_tokens + completion_tokens,
            },
            latency_ms: 1,
        }
    }
}

#[async_trait]
impl TextProvider for MockProvider {
    fn name(&self) -> &str {
        "mock"
    }

    async fn generate(&self, request: &GenerateRequest) -> anyhow::Result<GenerateResponse> {
        self.call_count.fetch_add(1, Ordering::Relaxed);
        *self.last_request.lock().unwrap_or_else(|e| e.into_inner()) = Some(request.clone());

        if let Some(failure) = self.failure {
            return Err(self.fail(failure));
        }

        let scripted = self
            .sequence
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .pop_front();
        let content = scripted.unwrap_or_else(|| {
            self.responses
                .iter()
                .find(|(key, _)| request.prompt.contains(key.as_str()))
                .map(|(_, v)| v.clone())
                .unwrap_or_else(|| self.default_response.clone())
        });

        Ok(self.respond(&request.model, &request.prompt, content))
    }

    async fn analyze_image(&self, request: &ImageRequest) -> anyhow::Result<GenerateResponse> {
        self.call_count.fetch_add(1, Ordering::Relaxed);
        if let Some(failure) = self.failure {
            return Err(self.fail(failure));
        }
        quizforge_core::traits::parse_data_uri(&request.image_data_uri)?;
        Ok(self.respond(
            &request.model,
            &request.prompt,
            self.default_response.clone(),
        ))
    }

    fn available_models(&self) -> Vec<ModelInfo> {
        vec![ModelInfo {
            id: "mock-model".into(),
            name: "Mock Model".into(),
            provider: "mock".into(),
            max_context: 100_000,
            vision: true,
        }]
    }
}
