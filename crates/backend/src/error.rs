//! Error types for the backend HTTP/SSE client
//!
//! The core scheduler never retries (retry policy is explicitly out of
//! scope); these error kinds exist to let request-scoped failures be
//! encoded into a `ResponseSummary` rather than raised out of `resolve`.

/// Result type alias for backend operations
pub type Result<T> = std::result::Result<T, BackendError>;

/// The four error kinds the backend client can produce.
#[derive(Debug, Clone, thiserror::Error)]
pub enum BackendError {
    /// The backend responded with a non-2xx HTTP status.
    #[error("backend returned HTTP {status}: {message}")]
    HttpStatus {
        /// HTTP status code
        status: u16,
        /// Error message extracted from the response body, if any
        message: String,
        /// Raw response body, kept for diagnostics
        body: Option<String>,
    },

    /// The request's deadline elapsed before or during the stream.
    #[error("request deadline exceeded")]
    Deadline,

    /// The SSE stream could not be parsed as the OpenAI-compatible wire
    /// format (bad JSON chunk, missing `data: ` prefix, etc).
    #[error("malformed stream: {0}")]
    MalformedStream(String),

    /// Connection-level failure: DNS, TCP, TLS, or an unexpected
    /// connection close before `[DONE]`.
    #[error("transport error: {0}")]
    Transport(String),
}

impl BackendError {
    /// Build an `HttpStatus` error, extracting a message from common
    /// OpenAI/Anthropic-shaped JSON error bodies when possible.
    pub fn from_response_body(status: u16, body: String) -> Self {
        let message = extract_error_message(&body)
            .unwrap_or_else(|| format!("HTTP {status}"));
        Self::HttpStatus {
            status,
            message,
            body: Some(body),
        }
    }

    /// Whether a caller layering retry logic on top of this core would
    /// usually want to retry this class of error. The scheduler itself
    /// never consults this — retries are out of scope here.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::HttpStatus { status, .. } => *status >= 500 || *status == 429,
            Self::Transport(_) => true,
            Self::Deadline | Self::MalformedStream(_) => false,
        }
    }

    /// Convert a `reqwest::Error` into the closest matching kind.
    pub fn from_reqwest(error: reqwest::Error) -> Self {
        if error.is_timeout() {
            Self::Deadline
        } else if error.is_connect() || error.is_request() {
            Self::Transport(error.to_string())
        } else {
            Self::Transport(error.to_string())
        }
    }
}

fn extract_error_message(body: &str) -> Option<String> {
    let json: serde_json::Value = serde_json::from_str(body).ok()?;
    if let Some(msg) = json.get("error").and_then(|e| e.get("message")).and_then(|m| m.as_str()) {
        return Some(msg.to_string());
    }
    if let Some(msg) = json.get("message").and_then(|m| m.as_str()) {
        return Some(msg.to_string());
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn http_status_is_retryable_on_5xx_and_429() {
        assert!(BackendError::from_response_body(503, "{}".into()).is_retryable());
        assert!(BackendError::from_response_body(429, "{}".into()).is_retryable());
        assert!(!BackendError::from_response_body(400, "{}".into()).is_retryable());
    }

    #[test]
    fn deadline_and_malformed_are_never_retryable() {
        assert!(!BackendError::Deadline.is_retryable());
        assert!(!BackendError::MalformedStream("bad".into()).is_retryable());
    }

    #[test]
    fn extracts_openai_and_anthropic_shaped_messages() {
        let openai = r#"{"error": {"message": "invalid api key"}}"#;
        let err = BackendError::from_response_body(401, openai.to_string());
        assert!(matches!(err, BackendError::HttpStatus { message, .. } if message == "invalid api key"));

        let anthropic = r#"{"message": "overloaded"}"#;
        let err = BackendError::from_response_body(503, anthropic.to_string());
        assert!(matches!(err, BackendError::HttpStatus { message, .. } if message == "overloaded"));
    }
}
