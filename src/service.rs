//! Caller-side workflow: validate the source, summarize, persist.
//!
//! [`SummaryService`] is the boundary between content extraction and the
//! orchestrator. It enforces the minimum source length, downgrades to a
//! short summary once when a request is too large, and hands the result to a
//! [`SummarySink`].

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::chunker::char_len;
use crate::config::{InputConfig, SummarizerConfig};
use crate::error::{Result, SummaryError};
use crate::orchestrator::{Strategy, Summary, SummaryOrchestrator};
use crate::prompts::SummaryType;

/// Extracted page text plus where it came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceDocument {
    pub content: String,
    pub url: String,
    pub title: String,
}

impl SourceDocument {
    pub fn new(
        content: impl Into<String>,
        url: impl Into<String>,
        title: impl Into<String>,
    ) -> Self {
        Self {
            content: content.into(),
            url: url.into(),
            title: title.into(),
        }
    }

    /// Reject text shorter than `min_chars` (whitespace-trimmed).
    pub fn validate(&self, min_chars: usize) -> Result<()> {
        let got = char_len(self.content.trim());
        if got == 0 || got < min_chars {
            return Err(SummaryError::ContentTooShort {
                min: min_chars,
                got,
            });
        }
        Ok(())
    }
}

/// What gets persisted for a finished summary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryRecord {
    pub title: String,
    pub url: String,
    pub summary_type: SummaryType,
    pub text: String,
    pub provider: String,
    pub model: String,
    pub strategy: Strategy,
    /// Seconds since the Unix epoch.
    pub created_at: u64,
}

impl SummaryRecord {
    pub fn from_summary(document: &SourceDocument, summary: Summary) -> Self {
        let created_at = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or_default();
        Self {
            title: document.title.clone(),
            url: document.url.clone(),
            summary_type: summary.summary_type,
            text: summary.text,
            provider: summary.provider,
            model: summary.model,
            strategy: summary.strategy,
            created_at,
        }
    }
}

/// Destination for finished summaries.
#[async_trait]
pub trait SummarySink: Send + Sync {
    async fn save(&self, record: SummaryRecord) -> Result<()>;
}

/// In-memory sink.
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    records: Arc<Mutex<Vec<SummaryRecord>>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn records(&self) -> Vec<SummaryRecord> {
        self.records.lock().await.clone()
    }
}

#[async_trait]
impl SummarySink for MemorySink {
    async fn save(&self, record: SummaryRecord) -> Result<()> {
        self.records.lock().await.push(record);
        Ok(())
    }
}

/// Validate, summarize and persist in one call.
pub struct SummaryService {
    orchestrator: SummaryOrchestrator,
    sink: Arc<dyn SummarySink>,
    input: InputConfig,
}

impl SummaryService {
    pub fn new(orchestrator: SummaryOrchestrator, sink: Arc<dyn SummarySink>) -> Self {
        Self {
            orchestrator,
            sink,
            input: InputConfig::default(),
        }
    }

    pub fn with_input(mut self, input: InputConfig) -> Self {
        self.input = input;
        self
    }

    /// Wire an orchestrator, sink and input rules from config.
    pub fn from_config(
        config: &SummarizerConfig,
        orchestrator: SummaryOrchestrator,
        sink: Arc<dyn SummarySink>,
    ) -> Self {
        Self::new(orchestrator, sink).with_input(config.input.clone())
    }

    pub fn orchestrator(&self) -> &SummaryOrchestrator {
        &self.orchestrator
    }

    pub async fn summarize(
        &self,
        document: &SourceDocument,
        summary_type: SummaryType,
    ) -> Result<SummaryRecord> {
        self.summarize_with_cancel(document, summary_type, &CancellationToken::new())
            .await
    }

    /// Summarize `document` and save the record.
    ///
    /// A `PayloadTooLarge` failure for a non-short request is retried once as
    /// [`SummaryType::Short`] when the downgrade is enabled.
    pub async fn summarize_with_cancel(
        &self,
        document: &SourceDocument,
        summary_type: SummaryType,
        cancel: &CancellationToken,
    ) -> Result<SummaryRecord> {
        document.validate(self.input.min_content_chars)?;

        let summary = match self
            .orchestrator
            .generate_with_cancel(&document.content, summary_type, cancel)
            .await
        {
            Err(SummaryError::PayloadTooLarge { provider })
                if self.input.downgrade_on_payload_too_large
                    && summary_type != SummaryType::Short =>
            {
                info!(
                    provider = %provider,
                    requested = %summary_type,
                    "Payload too large, retrying with a short summary"
                );
                self.orchestrator
                    .generate_with_cancel(&document.content, SummaryType::Short, cancel)
                    .await?
            }
            outcome => outcome?,
        };

        let record = SummaryRecord::from_summary(document, summary);
        self.sink.save(record.clone()).await?;
        info!(
            url = %record.url,
            summary_type = %record.summary_type,
            "Summary saved"
        );
        Ok(record)
    }
}
