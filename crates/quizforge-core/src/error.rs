//! Error types for the generation pipeline.
//!
//! Provider errors live here rather than in `quizforge-providers` so the
//! generator can downcast and classify failures without string matching.

use thiserror::Error;

/// Errors that can occur when interacting with a text-generation provider.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// No API key is configured for the selected provider.
    #[error("configuration error: no API key configured for {provider} (set {env_var})")]
    MissingCredential {
        provider: String,
        env_var: String,
    },

    /// The API returned a 429 rate limit response.
    #[error("rate limited, retry after {retry_after_ms}ms")]
    RateLimited { retry_after_ms: u64 },

    /// Authentication failed (invalid API key).
    #[error("authentication failed: {0}")]
    AuthenticationFailed(String),

    /// The requested model was not found.
    #[error("model not found: {0}")]
    ModelNotFound(String),

    /// The API returned an error response.
    #[error("API error (HTTP {status}): {message}")]
    ApiError { status: u16, message: String },

    /// The API answered successfully but carried no text.
    #[error("empty response from {0}")]
    EmptyResponse(String),

    /// Image input was not a `data:<mime>;base64,<data>` URI.
    #[error("invalid image data URI: {0}")]
    InvalidImage(String),

    /// The request timed out.
    #[error("request timed out after {0}s")]
    Timeout(u64),

    /// A network error occurred.
    #[error("network error: {0}")]
    NetworkError(String),
}

impl ProviderError {
    /// Returns `true` if every later call to the same provider would fail the
    /// same way.
    pub fn is_permanent(&self) -> bool {
        matches!(
            self,
            ProviderError::MissingCredential { .. }
                | ProviderError::AuthenticationFailed(_)
                | ProviderError::ModelNotFound(_)
        )
    }

    /// Returns the retry-after delay in milliseconds, if applicable.
    pub fn retry_after_ms(&self) -> Option<u64> {
        match self {
            ProviderError::RateLimited { retry_after_ms } => Some(*retry_after_ms),
            _ => None,
        }
    }
}

/// Failure to turn raw model output into questions.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    /// No `{...}` object could be located and parsed in the output.
    #[error("no JSON object found in model output")]
    NoJsonObject,

    /// The object parsed but has no `questions` array.
    #[error("model output has no \"questions\" array")]
    MissingQuestions,
}

/// Invalid generation input.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RequestError {
    #[error("topic must not be empty")]
    EmptyTopic,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn permanent_classification() {
        let missing = ProviderError::MissingCredential {
            provider: "gemini".into(),
            env_var: "GEMINI_API_KEY".into(),
        };
        assert!(missing.is_permanent());
        assert!(missing.to_string().contains("GEMINI_API_KEY"));
        assert!(!ProviderError::Timeout(30).is_permanent());
        assert!(!ProviderError::EmptyResponse("openai".into()).is_permanent());
    }

    #[test]
    fn retry_after() {
        let err = ProviderError::RateLimited {
            retry_after_ms: 5000,
        };
        assert_eq!(err.retry_after_ms(), Some(5000));
        assert_eq!(ProviderError::NetworkError("x".into()).retry_after_ms(), None);
    }
}
