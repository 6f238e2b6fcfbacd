//! Webnovel Summarizer - resilient multi-provider summarization engine
//!
//! Turns extracted chapter text into an LLM summary by walking an ordered
//! list of OpenAI-compatible backends, chunking documents that exceed a
//! backend's input ceiling, retrying transient failures and combining
//! per-chunk results into one answer.
//!
//! # Components
//!
//! | Module | Role |
//! |--------|------|
//! | [`catalog`] | Ordered providers with usable credentials |
//! | [`chunker`] | Boundary-aware splitting (paragraph, sentence, hard cut) |
//! | [`reducer`] | Head/tail trimming when a document needs too many chunks |
//! | [`client`] | One-round-trip chat completion transport |
//! | [`retry`] | Linear backoff for rate limits and 5xx, with cancellation |
//! | [`orchestrator`] | Provider fallback, chunked summary, combination |
//! | [`service`] | Source validation, short-summary downgrade, persistence |
//! | [`config`] | `summarizer.toml` loading and built-in provider chain |
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use webnovel_summarizer::{
//!     HttpCompletionClient, SummarizerConfig, SummaryOrchestrator, SummaryType,
//! };
//!
//! let config = SummarizerConfig::load()?;
//! let orchestrator =
//!     SummaryOrchestrator::from_config(&config, Arc::new(HttpCompletionClient::new()));
//! let summary = orchestrator.generate(&chapter_text, SummaryType::Detailed).await?;
//! println!("{} ({})", summary.text, summary.provider);
//! ```
//!
//! The library only emits `tracing` events; installing a subscriber is left
//! to the application.

pub mod catalog;
pub mod chunker;
pub mod client;
pub mod config;
pub mod error;
pub mod orchestrator;
pub mod prompts;
pub mod reducer;
pub mod retry;
pub mod service;
pub mod tokenizer;

pub use catalog::{ProviderCatalog, ProviderDescriptor};
pub use chunker::{char_len, Chunk, Chunker};
pub use client::{
    Completion, CompletionClient, CompletionRequest, HttpCompletionClient, MockCall,
    MockCompletionClient, TokenUsage,
};
pub use config::{
    ConfigError, GenerationConfig, InputConfig, ProviderConfig, RetryConfig, SummarizerConfig,
};
pub use error::{
    Result, RetryStrategy, SummaryError, RATE_LIMIT_BACKOFF_STEP, SERVER_ERROR_BACKOFF_STEP,
};
pub use orchestrator::{Strategy, Summary, SummaryOrchestrator, CHUNK_SEPARATOR};
pub use prompts::SummaryType;
pub use reducer::{ContentReducer, ELISION_MARKER};
pub use retry::{RetryExecutor, RetryPolicy};
pub use service::{MemorySink, SourceDocument, SummaryRecord, SummaryService, SummarySink};
pub use tokenizer::estimate_tokens;
