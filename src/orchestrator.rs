//! Summary orchestration.
//!
//! [`SummaryOrchestrator`] walks the provider catalog in priority order and
//! returns the first provider's successful summary.
//!
//! ```text
//! generate(content, type)
//!   └─ for provider in catalog
//!        ├─ len <= max_content_chars ─► single call (prompt for `type`)
//!        └─ otherwise ───────────────► chunked:
//!              split at 85% of max_content_chars
//!              too many chunks? reduce once (head 70% / tail 30%), re-split
//!              each chunk: detailed prompt, "[Part i of N]", sleep
//!              combine: join with "---", prompt for `type`, "[Final combined summary]"
//! ```
//!
//! Every completion call is wrapped by [`RetryExecutor`]. A failing provider
//! hands the original content to the next one; the last provider's failure is
//! surfaced as-is. Calls and sleeps are strictly sequential.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::catalog::{ProviderCatalog, ProviderDescriptor};
use crate::chunker::{char_len, Chunk, Chunker};
use crate::client::{CompletionClient, CompletionRequest, TokenUsage};
use crate::config::{GenerationConfig, SummarizerConfig};
use crate::error::{Result, SummaryError};
use crate::prompts::{part_tag, tagged, SummaryType, FINAL_TAG};
use crate::reducer::ContentReducer;
use crate::retry::{sleep_or_cancel, RetryExecutor, RetryPolicy};
use crate::tokenizer::estimate_tokens_from_chars;

/// Share of `max_content_chars` used for chunk text; the rest covers the prompt template.
pub const CHUNK_SIZE_RATIO: f64 = 0.85;

/// Separator between chunk summaries in the combination prompt.
pub const CHUNK_SEPARATOR: &str = "\n\n---\n\n";

/// How a summary was produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Strategy {
    /// One completion call over the whole document.
    SingleShot,
    /// Per-chunk calls plus a combination call.
    Chunked {
        /// Chunks actually summarized.
        chunks: usize,
        /// Whether the middle of the document was dropped.
        reduced: bool,
    },
}

/// A finished summary with provenance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Summary {
    pub text: String,
    pub provider: String,
    pub model: String,
    pub summary_type: SummaryType,
    pub strategy: Strategy,
    /// Completion requests issued by the winning provider, retries included.
    pub calls: usize,
    pub usage: TokenUsage,
}

/// Bookkeeping for one provider attempt.
#[derive(Debug, Default)]
struct Attempt {
    calls: usize,
    usage: TokenUsage,
    model: Option<String>,
}

/// Provider fallback, chunking and combination engine.
///
/// Holds no mutable state; concurrent `generate` calls are independent.
#[derive(Clone)]
pub struct SummaryOrchestrator {
    client: Arc<dyn CompletionClient>,
    catalog: ProviderCatalog,
    retry: RetryExecutor,
    generation: GenerationConfig,
}

impl SummaryOrchestrator {
    /// Create an orchestrator with default retry and generation settings.
    pub fn new(client: Arc<dyn CompletionClient>, catalog: ProviderCatalog) -> Self {
        Self {
            client,
            catalog,
            retry: RetryExecutor::new(RetryPolicy::default()),
            generation: GenerationConfig::default(),
        }
    }

    /// Build catalog, retry policy and generation settings from config.
    pub fn from_config(config: &SummarizerConfig, client: Arc<dyn CompletionClient>) -> Self {
        Self::new(client, ProviderCatalog::from_config(config))
            .with_retry_policy(RetryPolicy::from(&config.retry))
            .with_generation(config.generation.clone())
    }

    pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.retry = RetryExecutor::new(policy);
        self
    }

    pub fn with_generation(mut self, generation: GenerationConfig) -> Self {
        self.generation = generation;
        self
    }

    pub fn catalog(&self) -> &ProviderCatalog {
        &self.catalog
    }

    /// Summarize `content` at the requested granularity.
    ///
    /// # Errors
    ///
    /// - `InvalidRequest` for blank content
    /// - `NoProviderConfigured` for an empty catalog
    /// - the last provider's failure when every provider failed
    pub async fn generate(&self, content: &str, summary_type: SummaryType) -> Result<Summary> {
        self.generate_with_cancel(content, summary_type, &CancellationToken::new())
            .await
    }

    /// [`generate`](Self::generate) that aborts with `Cancelled` at the next
    /// suspension point once `cancel` fires.
    pub async fn generate_with_cancel(
        &self,
        content: &str,
        summary_type: SummaryType,
        cancel: &CancellationToken,
    ) -> Result<Summary> {
        if content.trim().is_empty() {
            return Err(SummaryError::InvalidRequest(
                "content to summarize is empty".to_string(),
            ));
        }

        let providers = self.catalog.active_providers();
        if providers.is_empty() {
            warn!("No API keys configured");
            return Err(SummaryError::NoProviderConfigured);
        }

        let chars = char_len(content);
        let last = providers.len() - 1;

        for (position, provider) in providers.iter().enumerate() {
            info!(
                provider = %provider.name,
                model = %provider.model,
                chars,
                est_tokens = estimate_tokens_from_chars(chars),
                "Trying provider {}/{}",
                position + 1,
                providers.len()
            );

            match self
                .summarize_with(provider, content, chars, summary_type, cancel)
                .await
            {
                Ok(summary) => {
                    info!(
                        provider = %provider.name,
                        calls = summary.calls,
                        "Summary generated with {}",
                        provider.name
                    );
                    return Ok(summary);
                }
                Err(SummaryError::Cancelled) => return Err(SummaryError::Cancelled),
                Err(error) if position == last => {
                    warn!(provider = %provider.name, "Last provider failed: {}", error);
                    return Err(error);
                }
                Err(error) if error.is_provider_scoped() => {
                    warn!(provider = %provider.name, "{}, trying next provider", error);
                }
                Err(error) => {
                    warn!(
                        provider = %provider.name,
                        "{} failed: {}, trying next provider",
                        provider.name,
                        error
                    );
                }
            }
        }

        Err(SummaryError::AllProvidersFailed {
            tried: providers.len(),
        })
    }

    async fn summarize_with(
        &self,
        provider: &ProviderDescriptor,
        content: &str,
        chars: usize,
        summary_type: SummaryType,
        cancel: &CancellationToken,
    ) -> Result<Summary> {
        let mut attempt = Attempt::default();

        let (text, strategy) = if chars <= provider.max_content_chars {
            debug!(provider = %provider.name, "Content fits in one request");
            let text = self
                .single_shot(provider, content, chars, summary_type, &mut attempt, cancel)
                .await?;
            (text, Strategy::SingleShot)
        } else {
            self.chunked(provider, content, summary_type, &mut attempt, cancel)
                .await?
        };

        Ok(Summary {
            text,
            provider: provider.name.clone(),
            model: attempt.model.unwrap_or_else(|| provider.model.clone()),
            summary_type,
            strategy,
            calls: attempt.calls,
            usage: attempt.usage,
        })
    }

    async fn single_shot(
        &self,
        provider: &ProviderDescriptor,
        content: &str,
        chars: usize,
        summary_type: SummaryType,
        attempt: &mut Attempt,
        cancel: &CancellationToken,
    ) -> Result<String> {
        let prompt = summary_type.prompt(content);
        let max_tokens = summary_type.max_output_tokens(chars);
        self.complete(provider, prompt, max_tokens, attempt, cancel)
            .await
    }

    async fn chunked(
        &self,
        provider: &ProviderDescriptor,
        content: &str,
        summary_type: SummaryType,
        attempt: &mut Attempt,
        cancel: &CancellationToken,
    ) -> Result<(String, Strategy)> {
        let chunk_size = ((provider.max_content_chars as f64 * CHUNK_SIZE_RATIO) as usize).max(1);
        let (chunks, reduced) = Self::plan_chunks(content, chunk_size, provider.max_chunks);
        let total = chunks.len();

        info!(
            provider = %provider.name,
            chunks = total,
            chunk_size,
            reduced,
            "Processing {} chunks",
            total
        );

        let mut summaries = Vec::with_capacity(total);
        for chunk in &chunks {
            debug!(provider = %provider.name, chunk = chunk.index, chars = chunk.chars, "Summarizing chunk");
            let prompt = tagged(
                &part_tag(chunk.index, total),
                SummaryType::Detailed.prompt(&chunk.text),
            );
            let max_tokens = SummaryType::Detailed.max_output_tokens(chunk.chars);
            let summary = self
                .complete(provider, prompt, max_tokens, attempt, cancel)
                .await
                .inspect_err(|e| {
                    warn!(provider = %provider.name, chunk = chunk.index, "Chunk failed: {}", e)
                })?;
            summaries.push(summary);

            // Between chunks and once more before the combination call
            sleep_or_cancel(provider.inter_chunk_delay, cancel).await?;
        }

        let combined = summaries.join(CHUNK_SEPARATOR);
        let combined_chars = char_len(&combined);
        debug!(provider = %provider.name, chars = combined_chars, "Combining chunk summaries");

        let prompt = tagged(FINAL_TAG, summary_type.prompt(&combined));
        let max_tokens = summary_type.max_output_tokens(combined_chars);
        let text = self
            .complete(provider, prompt, max_tokens, attempt, cancel)
            .await?;

        Ok((
            text,
            Strategy::Chunked {
                chunks: total,
                reduced,
            },
        ))
    }

    /// Split `content` into at most `max_chunks` chunks, reducing once if needed.
    fn plan_chunks(content: &str, chunk_size: usize, max_chunks: usize) -> (Vec<Chunk>, bool) {
        let chunks = Chunker::split(content, chunk_size);
        if chunks.len() <= max_chunks {
            return (chunks, false);
        }

        info!(
            natural = chunks.len(),
            max_chunks, "Too many chunks, reducing content"
        );
        let budget = ContentReducer::budget_for(chunk_size, max_chunks);
        let reduced = ContentReducer::reduce(content, budget);

        let chunks = Chunker::split(&reduced, chunk_size);
        if chunks.len() <= max_chunks {
            return (chunks, true);
        }
        (Chunker::split_exact(&reduced, chunk_size), true)
    }

    /// One completion call under the retry policy.
    async fn complete(
        &self,
        provider: &ProviderDescriptor,
        user_prompt: String,
        max_output_tokens: u32,
        attempt: &mut Attempt,
        cancel: &CancellationToken,
    ) -> Result<String> {
        let request = CompletionRequest::new(
            self.generation.system_prompt.clone(),
            user_prompt,
            max_output_tokens,
        )
        .with_sampling(self.generation.temperature, self.generation.top_p);

        let mut requests = 0;
        let outcome = self
            .retry
            .execute(cancel, || {
                requests += 1;
                self.client.complete(provider, &request)
            })
            .await;
        attempt.calls += requests;

        let completion = outcome?;
        attempt.usage += completion.usage;
        attempt.model = Some(completion.model);
        Ok(completion.content)
    }
}
