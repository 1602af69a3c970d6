//! Generation client error types
//!
//! Errors returned by a [`GenerationClient`](super::GenerationClient) call.
//! The variants follow the way a hosted model API can fail so that callers
//! can decide whether a retry makes sense.

use thiserror::Error;

/// Errors that can occur during a single text or image generation call
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GenerationError {
    /// Upstream rejected the call because of request rate (HTTP 429)
    #[error("Rate limit exceeded: {0}")]
    RateLimited(String),

    /// The call did not complete within the client timeout
    #[error("Generation request timed out after {0} seconds")]
    Timeout(u64),

    /// The account has no remaining quota (HTTP 429 with `insufficient_quota`)
    #[error("Quota exceeded: {0}")]
    QuotaExceeded(String),

    /// API key missing, invalid, or not permitted (HTTP 401/403)
    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// Upstream rejected the request payload (HTTP 400)
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Transport-level failure (DNS, connection refused, TLS, ...)
    #[error("Network error: {0}")]
    Network(String),

    /// Any other non-success HTTP status
    #[error("Upstream returned status {status}: {message}")]
    Upstream {
        /// HTTP status code
        status: u16,
        /// Error body (possibly truncated)
        message: String,
    },

    /// Response did not match the expected shape
    #[error("Malformed response: {0}")]
    MalformedResponse(String),
}

impl GenerationError {
    /// Whether a retry of the same call may succeed
    ///
    /// Only rate limiting and timeouts are transient. Quota, authentication
    /// and malformed payloads will fail the same way again.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            GenerationError::RateLimited(_) | GenerationError::Timeout(_)
        )
    }
}
