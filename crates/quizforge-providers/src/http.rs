//! HTTP plumbing shared by the hosted backends.

use std::time::Duration;

use quizforge_core::error::ProviderError;

pub(crate) const DEFAULT_TIMEOUT_SECS: u64 = 120;

/// Build a client with the standard timeout. Falls back to reqwest's
/// defaults if the TLS backend cannot be configured.
pub(crate) fn build_client(timeout_secs: u64) -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .build()
        .unwrap_or_default()
}

/// Return the configured key, or a `MissingCredential` error naming the
/// variable that would supply it.
pub(crate) fn require_key<'a>(
    api_key: &'a Option<String>,
    provider: &str,
    env_var: &str,
) -> Result<&'a str, ProviderError> {
    match api_key.as_deref().map(str::trim) {
        Some(key) if !key.is_empty() => Ok(key),
        _ => Err(ProviderError::MissingCredential {
            provider: provider.to_string(),
            env_var: env_var.to_string(),
        }),
    }
}

/// Transport failure. The URL is stripped so credentials never reach logs.
pub(crate) fn send_error(e: reqwest::Error, timeout_secs: u64) -> ProviderError {
    if e.is_timeout() {
        ProviderError::Timeout(timeout_secs)
    } else {
        ProviderError::NetworkError(e.without_url().to_string())
    }
}

/// Map non-success statuses onto [`ProviderError`]. `error_message` pulls a
/// human-readable message out of the backend's error body, when it has one.
pub(crate) async fn check_status(
    response: reqwest::Response,
    model: &str,
    error_message: fn(&str) -> Option<String>,
) -> Result<reqwest::Response, ProviderError> {
    if response.status().is_success() {
        return Ok(response);
    }
    let status = response.status().as_u16();

    if status == 429 {
        let retry_after = response
            .headers()
            .get("retry-after")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(5)
            * 1000;
        return Err(ProviderError::RateLimited {
            retry_after_ms: retry_after,
        });
    }
    if status == 404 {
        return Err(ProviderError::ModelNotFound(model.to_string()));
    }

    let body = response.text().await.unwrap_or_default();
    let message = error_message(&body).unwrap_or(body);
    if status == 401 || status == 403 {
        return Err(ProviderError::AuthenticationFailed(message));
    }
    Err(ProviderError::ApiError { status, message })
}

/// Error for a 2xx body that does not have the expected shape.
pub(crate) fn decode_error(e: reqwest::Error) -> ProviderError {
    ProviderError::ApiError {
        status: 0,
        message: format!("failed to parse response: {}", e.without_url()),
    }
}
