// error.rs — Error taxonomy for completion requests.

use std::time::Duration;

use thiserror::Error;

/// Errors a text-completion provider can report.
///
/// `Auth` and `Rejected` are permanent; everything else is transient and may
/// succeed if retried.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CompletionError {
    /// Missing or rejected credentials.
    #[error("authentication failed: {0}")]
    Auth(String),

    /// The provider is throttling requests.
    #[error("rate limited: {message}")]
    RateLimit {
        message: String,
        /// Server-suggested wait before retrying, if any.
        retry_after: Option<Duration>,
    },

    /// The provider refused the request itself (a 4xx other than auth,
    /// timeout, or throttling). Sending it again will not help.
    #[error("request rejected ({status}): {message}")]
    Rejected { status: u16, message: String },

    /// The provider answered with a server-side failure or an unreadable body.
    #[error("server error ({status}): {message}")]
    Server { status: u16, message: String },

    /// The request never reached the provider.
    #[error("network error: {0}")]
    Network(String),

    /// The request was sent but no answer arrived in time.
    #[error("request timed out: {0}")]
    Timeout(String),
}

impl CompletionError {
    pub fn is_retryable(&self) -> bool {
        !matches!(
            self,
            CompletionError::Auth(_) | CompletionError::Rejected { .. }
        )
    }

    /// Short category name for logs and user-facing summaries.
    pub fn kind(&self) -> &'static str {
        match self {
            CompletionError::Auth(_) => "auth",
            CompletionError::RateLimit { .. } => "rate_limit",
            CompletionError::Rejected { .. } => "rejected",
            CompletionError::Server { .. } => "server",
            CompletionError::Network(_) => "network",
            CompletionError::Timeout(_) => "timeout",
        }
    }

    /// The server's Retry-After hint, when it gave one.
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            CompletionError::RateLimit { retry_after, .. } => *retry_after,
            _ => None,
        }
    }
}
