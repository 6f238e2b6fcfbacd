//! OpenAI-compatible chat completions over HTTP.
//!
//! Works with any endpoint that speaks the `/chat/completions` dialect
//! (Groq, Cerebras, OpenRouter, local llama.cpp servers, ...).
//!
//! # Wire format
//!
//! ```text
//! POST {base_url}/chat/completions
//! Authorization: Bearer <key>
//! Content-Type: application/json
//!
//! {"model": "...", "messages": [{"role": "system", ...}, {"role": "user", ...}],
//!  "temperature": 0.7, "max_tokens": 2000, "top_p": 1.0}
//! ```
//!
//! Only `choices[0].message.content` is required in the response.

use async_trait::async_trait;
use reqwest::header::{self, HeaderMap, HeaderName, HeaderValue};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;
use tracing::{debug, warn};

use super::{check_request, Completion, CompletionClient, CompletionRequest, TokenUsage};
use crate::catalog::ProviderDescriptor;
use crate::error::{Result, SummaryError};

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<RequestMessage<'a>>,
    temperature: f32,
    max_tokens: u32,
    top_p: f32,
}

#[derive(Debug, Serialize)]
struct RequestMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[allow(dead_code)]
    id: Option<String>,
    model: Option<String>,
    #[serde(default)]
    choices: Vec<Choice>,
    usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    #[allow(dead_code)]
    index: Option<usize>,
    message: Option<MessageContent>,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct MessageContent {
    #[allow(dead_code)]
    role: Option<String>,
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Usage {
    #[serde(default)]
    prompt_tokens: usize,
    #[serde(default)]
    completion_tokens: usize,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error: ErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    message: String,
}

// ============================================================================
// Client
// ============================================================================

/// reqwest-backed [`CompletionClient`].
///
/// One `reqwest::Client` is built per distinct provider settings (name,
/// headers, connect and total timeouts) and reused across calls, so concurrent
/// `generate` calls share connection pools. A descriptor whose headers or
/// timeouts changed gets a fresh client.
#[derive(Debug, Default)]
pub struct HttpCompletionClient {
    clients: Mutex<HashMap<ClientKey, Client>>,
}

/// Everything baked into a `reqwest::Client` at build time.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct ClientKey {
    name: String,
    headers: BTreeMap<String, String>,
    timeout: Duration,
    connect_timeout: Duration,
}

impl ClientKey {
    fn of(provider: &ProviderDescriptor) -> Self {
        Self {
            name: provider.name.clone(),
            headers: provider
                .headers
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
            timeout: provider.timeout,
            connect_timeout: provider.connect_timeout,
        }
    }
}

impl HttpCompletionClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build HTTP client with the provider's headers and timeouts.
    fn build_client(provider: &ProviderDescriptor) -> Result<Client> {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/json"),
        );

        for (key, value) in &provider.headers {
            let header_name = HeaderName::from_bytes(key.as_bytes()).map_err(|e| {
                SummaryError::Config(format!("Invalid header name '{}': {}", key, e))
            })?;
            let header_value = HeaderValue::from_str(value).map_err(|e| {
                SummaryError::Config(format!("Invalid header value for '{}': {}", key, e))
            })?;
            headers.insert(header_name, header_value);
        }

        Client::builder()
            .default_headers(headers)
            .connect_timeout(provider.connect_timeout)
            .timeout(provider.timeout)
            .build()
            .map_err(|e| SummaryError::Config(format!("Failed to build HTTP client: {}", e)))
    }

    fn client_for(&self, provider: &ProviderDescriptor) -> Result<Client> {
        let key = ClientKey::of(provider);
        let mut clients = self.clients.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(client) = clients.get(&key) {
            return Ok(client.clone());
        }
        let client = Self::build_client(provider)?;
        clients.insert(key, client.clone());
        Ok(client)
    }

    /// Build the chat completions endpoint URL.
    fn chat_completions_url(provider: &ProviderDescriptor) -> String {
        format!("{}/chat/completions", provider.base_url.trim_end_matches('/'))
    }
}

#[async_trait]
impl CompletionClient for HttpCompletionClient {
    async fn complete(
        &self,
        provider: &ProviderDescriptor,
        request: &CompletionRequest,
    ) -> Result<Completion> {
        check_request(provider, request)?;

        let client = self.client_for(provider)?;
        let url = Self::chat_completions_url(provider);
        let body = ChatRequest {
            model: &provider.model,
            messages: vec![
                RequestMessage {
                    role: "system",
                    content: &request.system_prompt,
                },
                RequestMessage {
                    role: "user",
                    content: &request.user_prompt,
                },
            ],
            temperature: request.temperature,
            max_tokens: request.max_output_tokens,
            top_p: request.top_p,
        };

        debug!(
            provider = %provider.name,
            model = %provider.model,
            key = %provider.masked_key(),
            max_tokens = request.max_output_tokens,
            "Chat completion request: url={}",
            url
        );

        let response = client
            .post(&url)
            .bearer_auth(&provider.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                warn!(provider = %provider.name, "Network error: {}", e);
                SummaryError::from(e)
            })?;

        let status = response.status();
        let text = response.text().await?;
        debug!(provider = %provider.name, status = status.as_u16(), bytes = text.len(), "Response received");

        if !status.is_success() {
            let message = serde_json::from_str::<ErrorResponse>(&text)
                .map(|e| e.error.message)
                .unwrap_or(text);
            warn!(
                provider = %provider.name,
                status = status.as_u16(),
                "API error: {}",
                message.chars().take(200).collect::<String>()
            );
            return Err(SummaryError::from_status(
                &provider.name,
                status.as_u16(),
                &message,
            ));
        }

        let parsed: ChatResponse = serde_json::from_str(&text)?;
        let usage = parsed
            .usage
            .map(|u| TokenUsage::new(u.prompt_tokens, u.completion_tokens))
            .unwrap_or_default();

        let (content, finish_reason) = parsed
            .choices
            .into_iter()
            .next()
            .map(|choice| {
                let content = choice.message.and_then(|m| m.content).unwrap_or_default();
                (content, choice.finish_reason)
            })
            .unwrap_or_default();

        let content = content.trim();
        if content.is_empty() {
            warn!(provider = %provider.name, "Response carried no content");
            return Err(SummaryError::EmptyResponse {
                provider: provider.name.clone(),
            });
        }

        Ok(Completion {
            content: content.to_string(),
            model: parsed.model.unwrap_or_else(|| provider.model.clone()),
            usage,
            finish_reason,
        })
    }
}
