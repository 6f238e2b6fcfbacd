//! Summarization error types with retry strategies.
//!
//! # Error Taxonomy
//!
//! | Error | Cause | Handling |
//! |-------|-------|----------|
//! | `NoProviderConfigured` | Every provider key is blank | Configure at least one API key |
//! | `AuthFailure` | HTTP 401/403 | Next provider; never retried |
//! | `PayloadTooLarge` | HTTP 413 | Next provider; caller may downgrade to `short` |
//! | `RateLimited` | HTTP 429 | Linear backoff, then next provider |
//! | `ServerError` | HTTP 5xx | Linear backoff, then next provider |
//! | `TransportError` | Connect/timeout/body read failure | Next provider; never retried |
//! | `EmptyResponse` | No `choices[0].message.content` | Next provider; never retried |
//! | `AllProvidersFailed` | Provider walk ended without a result | Terminal |
//!
//! # Retry Strategies
//!
//! Each error maps to a [`RetryStrategy`]:
//! - `LinearBackoff`: wait `step * attempt` before the next attempt
//! - `NoRetry`: return immediately
//!
//! Retrying happens per completion call inside
//! [`RetryExecutor`](crate::retry::RetryExecutor); provider fallback happens
//! one level up in the orchestrator.

use std::time::Duration;
use thiserror::Error;

/// Result type for summarization operations.
pub type Result<T> = std::result::Result<T, SummaryError>;

// ============================================================================
// Retry Strategy
// ============================================================================

/// Default delay unit for HTTP 429.
pub const RATE_LIMIT_BACKOFF_STEP: Duration = Duration::from_millis(2000);

/// Default delay unit for HTTP 5xx.
pub const SERVER_ERROR_BACKOFF_STEP: Duration = Duration::from_millis(1000);

/// Strategy for retrying a failed completion call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryStrategy {
    /// Wait `step * attempt` (1-based) before trying again.
    LinearBackoff {
        /// Delay unit multiplied by the attempt number.
        step: Duration,
    },

    /// Do not retry at all.
    NoRetry,
}

impl RetryStrategy {
    /// Backoff used for HTTP 429.
    pub fn rate_limit_backoff() -> Self {
        Self::LinearBackoff {
            step: RATE_LIMIT_BACKOFF_STEP,
        }
    }

    /// Backoff used for HTTP 5xx.
    pub fn server_backoff() -> Self {
        Self::LinearBackoff {
            step: SERVER_ERROR_BACKOFF_STEP,
        }
    }

    /// Check if this strategy allows retrying.
    pub fn should_retry(&self) -> bool {
        !matches!(self, Self::NoRetry)
    }

    /// Delay to wait after the given failed attempt (1-based).
    pub fn delay_after(&self, attempt: u32) -> Duration {
        match self {
            Self::LinearBackoff { step } => *step * attempt,
            Self::NoRetry => Duration::ZERO,
        }
    }
}

// ============================================================================
// Summary Error Types
// ============================================================================

/// Errors that can occur while producing a summary.
#[derive(Debug, Error)]
pub enum SummaryError {
    /// No provider has a usable credential.
    #[error("No API keys configured")]
    NoProviderConfigured,

    /// Credentials rejected (401/403).
    #[error("{provider} auth failed ({status})")]
    AuthFailure { provider: String, status: u16 },

    /// Request body rejected as too large (413).
    #[error("413: payload too large for {provider}")]
    PayloadTooLarge { provider: String },

    /// Rate limit hit (429). `attempts` counts the calls made before giving up.
    #[error("{provider} rate limited after {attempts} attempt(s)")]
    RateLimited { provider: String, attempts: u32 },

    /// Server-side failure (5xx).
    #[error("{provider} server error {status} after {attempts} attempt(s)")]
    ServerError {
        provider: String,
        status: u16,
        attempts: u32,
    },

    /// Network, timeout or body-read failure.
    #[error("Transport error: {0}")]
    TransportError(String),

    /// The provider answered without usable content.
    #[error("Empty response from {provider}")]
    EmptyResponse { provider: String },

    /// Any other non-success HTTP status.
    #[error("{provider} HTTP {status}: {message}")]
    ApiError {
        provider: String,
        status: u16,
        message: String,
    },

    /// The provider walk ended without a surfaced result.
    #[error("All providers failed ({tried} tried)")]
    AllProvidersFailed { tried: usize },

    /// Contract violation detected before any I/O (blank key, empty content).
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Extracted text is below the caller's minimum length.
    #[error("Content too short to summarize: {got} chars (minimum {min})")]
    ContentTooShort { min: usize, got: usize },

    /// Response body could not be decoded.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// The caller cancelled the request.
    #[error("Summary generation cancelled")]
    Cancelled,
}

impl From<reqwest::Error> for SummaryError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            SummaryError::TransportError(format!("Request timed out: {}", err))
        } else if err.is_connect() {
            SummaryError::TransportError(format!("Connection failed: {}", err))
        } else {
            SummaryError::TransportError(err.to_string())
        }
    }
}

// ============================================================================
// Classification
// ============================================================================

impl SummaryError {
    /// Map an HTTP failure status to its error class.
    ///
    /// `body` is only kept for statuses without a dedicated variant.
    pub fn from_status(provider: &str, status: u16, body: &str) -> Self {
        let provider = provider.to_string();
        match status {
            401 | 403 => Self::AuthFailure { provider, status },
            413 => Self::PayloadTooLarge { provider },
            429 => Self::RateLimited {
                provider,
                attempts: 1,
            },
            500..=599 => Self::ServerError {
                provider,
                status,
                attempts: 1,
            },
            _ => Self::ApiError {
                provider,
                status,
                message: body.chars().take(200).collect(),
            },
        }
    }

    /// Get the default retry strategy for this error.
    ///
    /// # Example
    ///
    /// ```
    /// use webnovel_summarizer::{RetryStrategy, SummaryError};
    ///
    /// let error = SummaryError::from_status("groq", 503, "");
    /// assert_eq!(error.retry_strategy(), RetryStrategy::server_backoff());
    /// ```
    pub fn retry_strategy(&self) -> RetryStrategy {
        match self {
            Self::RateLimited { .. } => RetryStrategy::rate_limit_backoff(),
            Self::ServerError { .. } => RetryStrategy::server_backoff(),
            _ => RetryStrategy::NoRetry,
        }
    }

    /// Check if this error is recoverable by retrying the same call.
    pub fn is_recoverable(&self) -> bool {
        self.retry_strategy().should_retry()
    }

    /// Whether the failure is about the provider account rather than the document.
    pub fn is_provider_scoped(&self) -> bool {
        matches!(self, Self::AuthFailure { .. } | Self::RateLimited { .. })
    }

    /// Copy of this error with the attempt counter replaced.
    ///
    /// Only rate-limit and server errors carry a counter; others are returned unchanged.
    pub fn with_attempts(self, attempts: u32) -> Self {
        match self {
            Self::RateLimited { provider, .. } => Self::RateLimited { provider, attempts },
            Self::ServerError {
                provider, status, ..
            } => Self::ServerError {
                provider,
                status,
                attempts,
            },
            other => other,
        }
    }

    /// Get a user-facing description with a suggested action.
    ///
    /// # Example
    ///
    /// ```
    /// use webnovel_summarizer::SummaryError;
    ///
    /// let error = SummaryError::PayloadTooLarge { provider: "groq".into() };
    /// assert!(error.user_description().contains("Short Summary"));
    /// ```
    pub fn user_description(&self) -> String {
        match self {
            Self::NoProviderConfigured => {
                "No summarization backend is configured. Add an API key and try again.".to_string()
            }
            Self::AuthFailure { .. } => {
                "API authentication failed. Check that your API keys are valid.".to_string()
            }
            Self::PayloadTooLarge { .. } => {
                "Content too long! Try a shorter chapter or select the 'Short Summary' option."
                    .to_string()
            }
            Self::RateLimited { .. } => {
                "Rate limit exceeded. Wait a moment before trying again.".to_string()
            }
            Self::ServerError { .. } | Self::ApiError { .. } => {
                "The summarization service is having trouble. Please try again later.".to_string()
            }
            Self::TransportError(msg) if msg.contains("timed out") => {
                "Request timeout. Please try again.".to_string()
            }
            Self::TransportError(_) => "Network error. Check your connection.".to_string(),
            Self::EmptyResponse { .. } => {
                "The service returned an empty summary. Please try again.".to_string()
            }
            Self::AllProvidersFailed { .. } => {
                "Every summarization backend failed. Please try again later.".to_string()
            }
            Self::ContentTooShort { .. } => {
                "No content to summarize. Please try a different page.".to_string()
            }
            Self::Cancelled => "Summary generation was cancelled.".to_string(),
            Self::InvalidRequest(msg) | Self::Config(msg) => {
                format!("Failed to generate summary: {}", msg)
            }
            Self::Serialization(_) => {
                "Failed to read the service response. This may be a temporary issue.".to_string()
            }
        }
    }
}
