//! Completion provider boundary.
//!
//! Provider failures are classified into an [`ErrorKind`] here so the retry
//! loop never has to look at provider-specific message text.

use async_trait::async_trait;

#[async_trait]
pub trait LlmClient: Send + Sync {
    async fn complete(&self, prompt: &str) -> Result<String, LlmError>;

    /// Model identifier, used in logs and health output.
    fn model(&self) -> &str;
}

/// How the retry loop should treat a provider failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Throttled by the provider; back off and retry.
    RateLimited,
    /// Network trouble, timeouts, 5xx; retry within budget.
    Transient,
    /// Resending the same request cannot succeed.
    Permanent,
}

impl ErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::RateLimited => "rate_limited",
            ErrorKind::Transient => "transient",
            ErrorKind::Permanent => "permanent",
        }
    }
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum LlmError {
    #[error("API request failed: {0}")]
    RequestFailed(String),

    #[error("Rate limited: {message}")]
    RateLimited {
        message: String,
        retry_after_secs: Option<u64>,
    },

    #[error("API returned status {status}: {message}")]
    Api { status: u16, message: String },

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Provider not configured: {0}")]
    NotConfigured(String),

    #[error("Timeout after {0} seconds")]
    Timeout(u64),
}

impl LlmError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            LlmError::RateLimited { .. } => ErrorKind::RateLimited,
            LlmError::RequestFailed(_) | LlmError::Timeout(_) => ErrorKind::Transient,
            LlmError::Api { status, .. } if *status == 408 || *status >= 500 => {
                ErrorKind::Transient
            }
            LlmError::Api { .. } | LlmError::InvalidResponse(_) | LlmError::NotConfigured(_) => {
                ErrorKind::Permanent
            }
        }
    }

    /// Provider-suggested wait before the next attempt.
    pub fn retry_after_secs(&self) -> Option<u64> {
        match self {
            LlmError::RateLimited {
                retry_after_secs, ..
            } => *retry_after_secs,
            _ => None,
        }
    }

    /// Builds the error for an HTTP failure.
    ///
    /// Providers do not agree on a status for throttling, so a body that
    /// mentions "rate limit" is treated like a 429.
    pub fn from_status(status: u16, message: String, retry_after_secs: Option<u64>) -> Self {
        if status == 429 || mentions_rate_limit(&message) {
            LlmError::RateLimited {
                message,
                retry_after_secs,
            }
        } else {
            LlmError::Api { status, message }
        }
    }
}

pub fn mentions_rate_limit(message: &str) -> bool {
    let lowered = message.to_lowercase();
    lowered.contains("rate limit") || lowered.contains("rate_limit")
}
