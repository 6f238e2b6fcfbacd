//! Scripted completion client for testing.
//!
//! Outcomes are queued per provider name and consumed in order; once a
//! provider's queue is empty it answers with a deterministic default
//! summary. Every call is recorded so tests can assert on prompts, token
//! budgets and call order.

use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

use super::{check_request, Completion, CompletionClient, CompletionRequest, TokenUsage};
use crate::catalog::ProviderDescriptor;
use crate::error::Result;

/// One recorded call.
#[derive(Debug, Clone, PartialEq)]
pub struct MockCall {
    pub provider: String,
    pub system_prompt: String,
    pub user_prompt: String,
    pub max_output_tokens: u32,
}

/// Mock [`CompletionClient`] with per-provider scripted outcomes.
#[derive(Debug, Clone, Default)]
pub struct MockCompletionClient {
    scripts: Arc<Mutex<HashMap<String, VecDeque<Result<String>>>>>,
    calls: Arc<Mutex<Vec<MockCall>>>,
    latency: Option<Duration>,
}

impl MockCompletionClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Simulate network latency on every call.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Queue a successful response for `provider`.
    pub async fn push_response(&self, provider: &str, content: impl Into<String>) {
        self.push_result(provider, Ok(content.into())).await;
    }

    /// Queue an arbitrary outcome for `provider`.
    pub async fn push_result(&self, provider: &str, outcome: Result<String>) {
        self.scripts
            .lock()
            .await
            .entry(provider.to_string())
            .or_default()
            .push_back(outcome);
    }

    /// All calls made so far, in order.
    pub async fn calls(&self) -> Vec<MockCall> {
        self.calls.lock().await.clone()
    }

    pub async fn call_count(&self) -> usize {
        self.calls.lock().await.len()
    }

    /// Calls made to one provider.
    pub async fn calls_for(&self, provider: &str) -> Vec<MockCall> {
        self.calls
            .lock()
            .await
            .iter()
            .filter(|c| c.provider == provider)
            .cloned()
            .collect()
    }

    /// Default answer once a provider's script is exhausted.
    pub fn default_response(provider: &str, call_number: usize) -> String {
        format!("Summary #{} from {}", call_number, provider)
    }
}

#[async_trait]
impl CompletionClient for MockCompletionClient {
    async fn complete(
        &self,
        provider: &ProviderDescriptor,
        request: &CompletionRequest,
    ) -> Result<Completion> {
        check_request(provider, request)?;

        let call_number = {
            let mut calls = self.calls.lock().await;
            calls.push(MockCall {
                provider: provider.name.clone(),
                system_prompt: request.system_prompt.clone(),
                user_prompt: request.user_prompt.clone(),
                max_output_tokens: request.max_output_tokens,
            });
            calls.len()
        };

        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }

        let scripted = self
            .scripts
            .lock()
            .await
            .get_mut(&provider.name)
            .and_then(VecDeque::pop_front);

        let content = match scripted {
            Some(outcome) => outcome?,
            None => Self::default_response(&provider.name, call_number),
        };

        Ok(Completion {
            usage: TokenUsage::new(request.user_prompt.len() / 4, content.len() / 4),
            content,
            model: provider.model.clone(),
            finish_reason: Some("stop".to_string()),
        })
    }
}
