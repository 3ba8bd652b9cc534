//! Error types for LLM operations

use reqwest::StatusCode;
use serde_json::Value;
use thiserror::Error;

/// Result type for LLM operations
pub type Result<T> = std::result::Result<T, LLMError>;

/// Longest provider error message carried inside an [`LLMError`]
const MAX_DETAIL_CHARS: usize = 200;

/// Errors that can occur during LLM operations
#[derive(Error, Debug)]
pub enum LLMError {
    /// Credential missing, invalid or not allowed to use the model
    #[error("Provider rejected the credentials (HTTP {0})")]
    Authentication(u16),

    /// Rate limit or quota exhausted
    #[error("Provider rate limit or quota exhausted")]
    RateLimited,

    /// The provider rejected the request body
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Model not found: {0}")]
    ModelNotFound(String),

    /// Any other non-success status
    #[error("Provider returned HTTP {status}: {detail}")]
    Status { status: u16, detail: String },

    /// HTTP transport error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Response body did not have the expected shape
    #[error("Unexpected response format: {0}")]
    UnexpectedResponse(String),

    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl LLMError {
    /// Classify a non-success response from the provider
    ///
    /// Only a short summary of `body` is kept; rate limit bodies are dropped.
    pub fn from_status(status: StatusCode, body: &str, model: &str) -> Self {
        match status.as_u16() {
            401 | 403 => Self::Authentication(status.as_u16()),
            429 => Self::RateLimited,
            400 => Self::InvalidRequest(error_detail(body)),
            404 => Self::ModelNotFound(model.to_string()),
            other => Self::Status {
                status: other,
                detail: error_detail(body),
            },
        }
    }
}

/// Provider message from an `{"error": {"message": ..}}` body, else the raw body
///
/// The result is cut to a fixed number of characters.
pub fn error_detail(body: &str) -> String {
    let message = serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|value| match &value["error"] {
            Value::Object(error) => error
                .get("message")
                .and_then(Value::as_str)
                .map(str::to_string),
            Value::String(message) => Some(message.clone()),
            _ => None,
        })
        .unwrap_or_else(|| body.trim().to_string());

    if message.chars().count() > MAX_DETAIL_CHARS {
        let truncated: String = message.chars().take(MAX_DETAIL_CHARS).collect();
        format!("{truncated}...")
    } else {
        message
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const GEMINI_ERROR: &str = r#"{"error": {"code": 400, "message": "Invalid value at 'top_p'"}}"#;

    fn classify(status: u16, body: &str) -> LLMError {
        let status = StatusCode::from_u16(status).unwrap();
        LLMError::from_status(status, body, "gemini-2.0-flash-exp")
    }

    #[test]
    fn test_credential_statuses() {
        assert!(matches!(classify(401, "denied"), LLMError::Authentication(401)));
        assert!(matches!(classify(403, "denied"), LLMError::Authentication(403)));
    }

    #[test]
    fn test_rate_limit_drops_body() {
        let err = classify(429, r#"{"error": {"message": "project 1234 quota exceeded"}}"#);
        assert!(matches!(err, LLMError::RateLimited));
        assert!(!err.to_string().contains("1234"));
    }

    #[test]
    fn test_bad_request_keeps_provider_message() {
        match classify(400, GEMINI_ERROR) {
            LLMError::InvalidRequest(detail) => assert_eq!(detail, "Invalid value at 'top_p'"),
            other => panic!("expected invalid request, got {other:?}"),
        }
    }

    #[test]
    fn test_not_found_names_model() {
        match classify(404, "<html>missing</html>") {
            LLMError::ModelNotFound(model) => assert_eq!(model, "gemini-2.0-flash-exp"),
            other => panic!("expected model not found, got {other:?}"),
        }
    }

    #[test]
    fn test_server_error_is_truncated() {
        let body = "x".repeat(5_000);
        match classify(500, &body) {
            LLMError::Status { status, detail } => {
                assert_eq!(status, 500);
                assert_eq!(detail.len(), MAX_DETAIL_CHARS + 3);
            }
            other => panic!("expected status error, got {other:?}"),
        }
    }

    #[test]
    fn test_error_detail_accepts_string_error() {
        assert_eq!(error_detail(r#"{"error": "bad key"}"#), "bad key");
        assert_eq!(error_detail("  plain text \n"), "plain text");
    }
}
