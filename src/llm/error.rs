//! LLM error types with retry classification.
//!
//! Transient failures (rate limits, 5xx, dropped connections) are retried by
//! the client; everything else surfaces to the agent immediately.

use std::time::Duration;

/// Classification of LLM errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LlmErrorKind {
    /// HTTP 429
    RateLimited,
    /// HTTP 5xx
    ServerError,
    /// HTTP 4xx other than 429 (bad request, auth, unknown model)
    ClientError,
    /// Connection failure or timeout
    NetworkError,
    /// Body could not be decoded, or held no choices
    ParseError,
}

impl LlmErrorKind {
    /// Whether the same request may succeed if sent again.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            LlmErrorKind::RateLimited | LlmErrorKind::ServerError | LlmErrorKind::NetworkError
        )
    }

    fn base_delay(&self) -> Duration {
        match self {
            LlmErrorKind::RateLimited => Duration::from_secs(5),
            LlmErrorKind::ServerError => Duration::from_secs(2),
            _ => Duration::from_secs(1),
        }
    }
}

impl std::fmt::Display for LlmErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            LlmErrorKind::RateLimited => "rate limited",
            LlmErrorKind::ServerError => "server error",
            LlmErrorKind::ClientError => "client error",
            LlmErrorKind::NetworkError => "network error",
            LlmErrorKind::ParseError => "parse error",
        };
        f.write_str(label)
    }
}

/// Error from a chat-completion call.
#[derive(Debug, thiserror::Error)]
#[error("{kind}{}: {message}", .status.map(|s| format!(" (HTTP {s})")).unwrap_or_default())]
pub struct LlmError {
    pub kind: LlmErrorKind,
    pub status: Option<u16>,
    pub message: String,
    /// Delay requested by the server through `Retry-After`.
    pub retry_after: Option<Duration>,
}

impl LlmError {
    fn new(kind: LlmErrorKind, status: Option<u16>, message: impl Into<String>) -> Self {
        Self {
            kind,
            status,
            message: message.into(),
            retry_after: None,
        }
    }

    /// Build an error from a non-success HTTP response.
    pub fn from_status(status: u16, body: impl Into<String>, retry_after: Option<Duration>) -> Self {
        let mut err = Self::new(classify_http_status(status), Some(status), body);
        if err.kind == LlmErrorKind::RateLimited {
            err.retry_after = retry_after;
        }
        err
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self::new(LlmErrorKind::NetworkError, None, message)
    }

    pub fn parse(message: impl Into<String>) -> Self {
        Self::new(LlmErrorKind::ParseError, None, message)
    }

    pub fn is_transient(&self) -> bool {
        self.kind.is_transient()
    }

    /// Delay before retry number `attempt` (0-based).
    ///
    /// Honors `Retry-After` when present; otherwise doubles a per-kind base
    /// delay each attempt, capped at 60 seconds.
    pub fn backoff(&self, attempt: u32) -> Duration {
        if let Some(after) = self.retry_after {
            return after;
        }
        let secs = self
            .kind
            .base_delay()
            .as_secs()
            .saturating_mul(2u64.saturating_pow(attempt));
        Duration::from_secs(secs.min(60))
    }
}

/// Configuration for retry behavior.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum number of retries after the first attempt
    pub max_retries: u32,
    /// Upper bound on total time spent retrying one request
    pub max_retry_duration: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            max_retry_duration: Duration::from_secs(120),
        }
    }
}

impl RetryConfig {
    pub fn should_retry(&self, error: &LlmError, attempt: u32) -> bool {
        error.is_transient() && attempt < self.max_retries
    }
}

/// Map an HTTP status code onto an error kind.
pub fn classify_http_status(status: u16) -> LlmErrorKind {
    match status {
        429 => LlmErrorKind::RateLimited,
        400..=499 => LlmErrorKind::ClientError,
        _ => LlmErrorKind::ServerError,
    }
}
