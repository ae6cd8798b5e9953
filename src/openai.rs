//! OpenAI client configuration and error classification.

use crate::error::{GrunnError, Result, ServiceErrorKind};
use async_openai::error::OpenAIError;
use async_openai::{config::OpenAIConfig, Client};
use std::time::Duration;

/// Default timeout for OpenAI API requests (5 minutes).
pub const DEFAULT_TIMEOUT_SECS: u64 = 300;

/// Create an OpenAI client.
///
/// An explicit `api_key` wins; otherwise the client reads `OPENAI_API_KEY`.
pub fn create_client(api_key: Option<&str>, timeout: Duration) -> Result<Client<OpenAIConfig>> {
    let http_client = reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| GrunnError::Config(format!("Failed to create HTTP client: {}", e)))?;

    let config = match api_key {
        Some(key) if !key.is_empty() => OpenAIConfig::new().with_api_key(key),
        _ => OpenAIConfig::default(),
    };

    Ok(Client::with_config(config).with_http_client(http_client))
}

/// Decide which kind of failure an OpenAI error represents.
pub fn classify_error(err: &OpenAIError) -> ServiceErrorKind {
    match err {
        OpenAIError::Reqwest(e) => {
            if e.is_timeout() {
                ServiceErrorKind::Timeout
            } else if let Some(status) = e.status() {
                classify_status(status.as_u16())
            } else {
                ServiceErrorKind::Unavailable
            }
        }
        OpenAIError::ApiError(api) => {
            let text = format!(
                "{} {} {:?}",
                api.r#type.as_deref().unwrap_or_default(),
                api.message,
                api.code
            )
            .to_lowercase();
            classify_api_text(&text)
        }
        OpenAIError::InvalidArgument(_) => ServiceErrorKind::MalformedRequest,
        _ => ServiceErrorKind::Unavailable,
    }
}

fn classify_status(status: u16) -> ServiceErrorKind {
    match status {
        401 | 403 => ServiceErrorKind::Authentication,
        408 | 504 => ServiceErrorKind::Timeout,
        429 => ServiceErrorKind::RateLimited,
        400..=499 => ServiceErrorKind::MalformedRequest,
        _ => ServiceErrorKind::Unavailable,
    }
}

fn classify_api_text(text: &str) -> ServiceErrorKind {
    if text.contains("invalid_api_key")
        || text.contains("incorrect api key")
        || text.contains("authentication")
        || text.contains("permission")
    {
        ServiceErrorKind::Authentication
    } else if text.contains("rate_limit") || text.contains("rate limit") || text.contains("quota") {
        ServiceErrorKind::RateLimited
    } else if text.contains("timeout") || text.contains("timed out") {
        ServiceErrorKind::Timeout
    } else if text.contains("server_error") || text.contains("overloaded") {
        ServiceErrorKind::Unavailable
    } else {
        ServiceErrorKind::MalformedRequest
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_status() {
        assert_eq!(classify_status(401), ServiceErrorKind::Authentication);
        assert_eq!(classify_status(429), ServiceErrorKind::RateLimited);
        assert_eq!(classify_status(400), ServiceErrorKind::MalformedRequest);
        assert_eq!(classify_status(503), ServiceErrorKind::Unavailable);
    }

    #[test]
    fn test_classify_api_text() {
        assert_eq!(
            classify_api_text("invalid_request_error incorrect api key provided"),
            ServiceErrorKind::Authentication
        );
        assert_eq!(
            classify_api_text("requests rate limit reached"),
            ServiceErrorKind::RateLimited
        );
        assert_eq!(
            classify_api_text("invalid_request_error maximum context length"),
            ServiceErrorKind::MalformedRequest
        );
    }

    #[test]
    fn test_invalid_argument_is_malformed() {
        let err = OpenAIError::InvalidArgument("missing model".to_string());
        assert_eq!(classify_error(&err), ServiceErrorKind::MalformedRequest);
    }
}
