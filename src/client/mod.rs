//! Completion transport.
//!
//! [`CompletionClient`] performs exactly one chat-completion round trip per
//! call and returns either the generated text or a classified
//! [`SummaryError`]. It never retries; retry and fallback belong to the
//! orchestrator.
//!
//! | Implementation | Use |
//! |----------------|-----|
//! | [`HttpCompletionClient`] | OpenAI-compatible `/chat/completions` over reqwest |
//! | [`MockCompletionClient`] | Scripted outcomes and a call log for tests |

mod mock;
mod openai_compatible;

pub use mock::{MockCall, MockCompletionClient};
pub use openai_compatible::HttpCompletionClient;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::ops::AddAssign;

use crate::catalog::ProviderDescriptor;
use crate::error::{Result, SummaryError};

/// One chat-completion request: a system prompt plus one user prompt.
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionRequest {
    pub system_prompt: String,
    pub user_prompt: String,
    pub max_output_tokens: u32,
    pub temperature: f32,
    pub top_p: f32,
}

impl CompletionRequest {
    /// Create a request with temperature 0.7 and top-p 1.0.
    pub fn new(
        system_prompt: impl Into<String>,
        user_prompt: impl Into<String>,
        max_output_tokens: u32,
    ) -> Self {
        Self {
            system_prompt: system_prompt.into(),
            user_prompt: user_prompt.into(),
            max_output_tokens,
            temperature: 0.7,
            top_p: 1.0,
        }
    }

    pub fn with_sampling(mut self, temperature: f32, top_p: f32) -> Self {
        self.temperature = temperature;
        self.top_p = top_p;
        self
    }
}

/// Successful completion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Completion {
    /// Trimmed, non-blank generated text.
    pub content: String,
    /// Model reported by the backend (falls back to the requested model).
    pub model: String,
    pub usage: TokenUsage,
    pub finish_reason: Option<String>,
}

/// Token accounting reported by the backend.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    pub prompt_tokens: usize,
    pub completion_tokens: usize,
}

impl TokenUsage {
    pub fn new(prompt_tokens: usize, completion_tokens: usize) -> Self {
        Self {
            prompt_tokens,
            completion_tokens,
        }
    }

    pub fn total_tokens(&self) -> usize {
        self.prompt_tokens + self.completion_tokens
    }
}

impl AddAssign for TokenUsage {
    fn add_assign(&mut self, other: Self) {
        self.prompt_tokens += other.prompt_tokens;
        self.completion_tokens += other.completion_tokens;
    }
}

/// One-round-trip chat completion against a provider.
#[async_trait]
pub trait CompletionClient: Send + Sync {
    /// Send `request` to `provider`.
    ///
    /// # Errors
    ///
    /// `AuthFailure`, `PayloadTooLarge`, `RateLimited`, `ServerError`,
    /// `ApiError`, `TransportError` or `EmptyResponse` for backend failures;
    /// `InvalidRequest` when the key or prompt is blank.
    async fn complete(
        &self,
        provider: &ProviderDescriptor,
        request: &CompletionRequest,
    ) -> Result<Completion>;
}

/// Reject calls that can never succeed before doing any I/O.
pub fn check_request(provider: &ProviderDescriptor, request: &CompletionRequest) -> Result<()> {
    if !provider.has_credentials() {
        return Err(SummaryError::InvalidRequest(format!(
            "API key for {} is blank",
            provider.name
        )));
    }
    if request.user_prompt.trim().is_empty() {
        return Err(SummaryError::InvalidRequest(
            "prompt content is empty".to_string(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn provider(key: &str) -> ProviderDescriptor {
        ProviderDescriptor::new("p", key, "m", "http://localhost", 100, 1)
    }

    #[test]
    fn test_check_request_guards() {
        let request = CompletionRequest::new("sys", "Summarize this", 800);
        assert!(check_request(&provider("key"), &request).is_ok());

        assert!(matches!(
            check_request(&provider(" "), &request),
            Err(SummaryError::InvalidRequest(_))
        ));

        let blank = CompletionRequest::new("sys", "  \n", 800);
        assert!(matches!(
            check_request(&provider("key"), &blank),
            Err(SummaryError::InvalidRequest(_))
        ));
    }

    #[test]
    fn test_usage_accumulates() {
        let mut usage = TokenUsage::default();
        usage += TokenUsage::new(100, 20);
        usage += TokenUsage::new(50, 5);
        assert_eq!(usage, TokenUsage::new(150, 25));
        assert_eq!(usage.total_tokens(), 175);
    }

    #[test]
    fn test_request_defaults() {
        let request = CompletionRequest::new("sys", "user", 2000).with_sampling(0.2, 0.9);
        assert_eq!(request.temperature, 0.2);
        assert_eq!(request.top_p, 0.9);
        assert_eq!(CompletionRequest::new("s", "u", 1).temperature, 0.7);
    }
}
