//! Typed errors for the chat-completions boundary
//!
//! A non-2xx from either request round is the only error class that aborts
//! a whole user turn, so it carries the HTTP status and response body
//! verbatim for display.

use thiserror::Error;

/// Chat-completions request errors with typed variants
#[derive(Debug, Error)]
pub enum LlmError {
    /// Authentication token is expired or invalid (HTTP 401)
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Rate limit exceeded (HTTP 429)
    #[error("Rate limited: {0}")]
    RateLimited(String),

    /// Malformed request (HTTP 400)
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Server-side error (HTTP 5xx)
    #[error("Service error: {0}")]
    ServiceError(String),

    /// Network connectivity issue (connection refused, timeout, mid-stream read failure)
    #[error("Network error: {0}")]
    Network(String),

    /// Other errors not fitting the above categories
    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

impl LlmError {
    /// Check if this error is transient (could succeed on a later turn)
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            LlmError::RateLimited(_) | LlmError::ServiceError(_) | LlmError::Network(_)
        )
    }

    /// Convert an HTTP status code and response body into a typed LlmError
    pub fn from_http_status(status: reqwest::StatusCode, body: String) -> Self {
        match status.as_u16() {
            401 => LlmError::Unauthorized(body),
            429 => LlmError::RateLimited(body),
            400 => LlmError::BadRequest(body),
            500..=599 => LlmError::ServiceError(body),
            _ => LlmError::Other(anyhow::anyhow!("HTTP {}: {}", status, body)),
        }
    }
}
