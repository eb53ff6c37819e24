//! Core trait definitions for text-generation providers.
//!
//! The async trait is implemented by the `quizforge-providers` crate for each
//! backend, and by test doubles.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::ProviderError;

// ---------------------------------------------------------------------------
// Provider trait
// ---------------------------------------------------------------------------

/// Trait for text-generation backends.
///
/// Every call is single-shot: one outbound request, no retry. Callers decide
/// whether to fall back.
#[async_trait]
pub trait TextProvider: Send + Sync {
    /// Human-readable provider name (e.g. "gemini").
    fn name(&self) -> &str;

    /// Generate text from a prompt and return the first completion.
    async fn generate(&self, request: &GenerateRequest) -> anyhow::Result<GenerateResponse>;

    /// Describe or analyze an image given as a data URI, guided by a prompt.
    async fn analyze_image(&self, request: &ImageRequest) -> anyhow::Result<GenerateResponse>;

    /// List known models for this provider.
    fn available_models(&self) -> Vec<ModelInfo>;
}

/// Request to generate text.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerateRequest {
    /// Model identifier (e.g. "gemini-2.5-flash").
    pub model: String,
    /// The main prompt.
    pub prompt: String,
    /// Optional system prompt.
    #[serde(default)]
    pub system_prompt: Option<String>,
    /// Maximum tokens to generate.
    pub max_tokens: u32,
    /// Sampling temperature.
    pub temperature: f64,
}

/// Request to analyze an image.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageRequest {
    /// Model identifier.
    pub model: String,
    /// Instruction sent alongside the image.
    pub prompt: String,
    /// `data:<mime>;base64,<payload>` URI.
    pub image_data_uri: String,
    /// Maximum tokens to generate.
    pub max_tokens: u32,
}

/// Response from a generation call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerateResponse {
    /// First text completion.
    pub content: String,
    /// Model that actually generated the response.
    pub model: String,
    /// Token usage, when the backend reports it.
    pub token_usage: TokenUsage,
    /// Latency in milliseconds.
    pub latency_ms: u64,
}

/// Token accounting reported by a backend.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

/// Information about an available model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelInfo {
    /// Model identifier.
    pub id: String,
    /// Human-readable model name.
    pub name: String,
    /// Provider name.
    pub provider: String,
    /// Maximum context window size in tokens.
    pub max_context: u32,
    /// Whether the model accepts image input.
    pub vision: bool,
}

// ---------------------------------------------------------------------------
// Image data URIs
// ---------------------------------------------------------------------------

/// A decoded-header view of a `data:` URI. The payload stays base64.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataUri<'a> {
    pub mime_type: &'a str,
    pub base64_data: &'a str,
}

/// Split a `data:<mime>;base64,<payload>` URI into MIME type and payload.
pub fn parse_data_uri(uri: &str) -> Result<DataUri<'_>, ProviderError> {
    let invalid = || {
        let preview: String = uri.chars().take(32).collect();
        ProviderError::InvalidImage(preview)
    };

    let rest = uri.strip_prefix("data:").ok_or_else(invalid)?;
    let (header, payload) = rest.split_once(',').ok_or_else(invalid)?;
    let mime_type = header.strip_suffix(";base64").ok_or_else(invalid)?;

    if mime_type.is_empty() || payload.is_empty() {
        return Err(invalid());
    }

    Ok(DataUri {
        mime_type,
        base64_data: payload,
    })
}

/// Default system prompt for question generation.
pub const DEFAULT_SYSTEM_PROMPT: &str = "You are an expert educational content creator. Respond ONLY with a single raw JSON object. Do not wrap it in markdown or add any text before or after it.";
