//! Provider catalog.
//!
//! An ordered, read-only list of backends. Order is trial priority: the first
//! entry is attempted first. Descriptors with a blank API key never enter the
//! catalog.

use std::collections::HashMap;
use std::fmt;
use std::time::Duration;

use tracing::debug;

use crate::config::{ProviderConfig, SummarizerConfig};

/// Immutable description of one OpenAI-compatible backend.
#[derive(Clone)]
pub struct ProviderDescriptor {
    pub name: String,
    pub api_key: String,
    pub model: String,
    pub base_url: String,
    /// Largest input (in chars) sent in a single call.
    pub max_content_chars: usize,
    /// Largest number of chunks processed for one document.
    pub max_chunks: usize,
    /// Pause between successive chunk calls.
    pub inter_chunk_delay: Duration,
    /// Total request timeout.
    pub timeout: Duration,
    pub connect_timeout: Duration,
    /// Extra headers sent with every request.
    pub headers: HashMap<String, String>,
}

impl ProviderDescriptor {
    /// Create a descriptor with default delay (1s) and timeouts (30s connect, 90s total).
    pub fn new(
        name: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
        base_url: impl Into<String>,
        max_content_chars: usize,
        max_chunks: usize,
    ) -> Self {
        Self {
            name: name.into(),
            api_key: api_key.into(),
            model: model.into(),
            base_url: base_url.into(),
            max_content_chars,
            max_chunks,
            inter_chunk_delay: Duration::from_millis(1000),
            timeout: Duration::from_secs(90),
            connect_timeout: Duration::from_secs(30),
            headers: HashMap::new(),
        }
    }

    /// Set the pause between chunk calls.
    pub fn with_inter_chunk_delay(mut self, delay: Duration) -> Self {
        self.inter_chunk_delay = delay;
        self
    }

    /// Set the total request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the connection timeout.
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Add a custom header.
    pub fn with_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(key.into(), value.into());
        self
    }

    /// Build a descriptor from config, resolving the API key from the environment.
    pub fn from_config(config: &ProviderConfig) -> Self {
        Self {
            name: config.name.clone(),
            api_key: config.resolve_api_key(),
            model: config.model.clone(),
            base_url: config.base_url.clone(),
            max_content_chars: config.max_content_chars,
            max_chunks: config.max_chunks,
            inter_chunk_delay: Duration::from_millis(config.chunk_delay_ms),
            timeout: Duration::from_secs(config.timeout_seconds),
            connect_timeout: Duration::from_secs(config.connect_timeout_seconds),
            headers: config.headers.clone(),
        }
    }

    /// Whether the descriptor carries a usable credential.
    pub fn has_credentials(&self) -> bool {
        !self.api_key.trim().is_empty()
    }

    /// API key with everything but the last four chars hidden.
    pub fn masked_key(&self) -> String {
        let chars: Vec<char> = self.api_key.chars().collect();
        if chars.len() <= 8 {
            return "****".to_string();
        }
        let tail: String = chars[chars.len() - 4..].iter().collect();
        format!("****{}", tail)
    }
}

impl fmt::Debug for ProviderDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderDescriptor")
            .field("name", &self.name)
            .field("api_key", &self.masked_key())
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .field("max_content_chars", &self.max_content_chars)
            .field("max_chunks", &self.max_chunks)
            .field("inter_chunk_delay", &self.inter_chunk_delay)
            .finish()
    }
}

/// Ordered set of providers with usable credentials.
#[derive(Debug, Clone, Default)]
pub struct ProviderCatalog {
    providers: Vec<ProviderDescriptor>,
}

impl ProviderCatalog {
    /// Build a catalog, dropping descriptors with a blank key.
    pub fn new(descriptors: Vec<ProviderDescriptor>) -> Self {
        let providers = descriptors
            .into_iter()
            .filter(|p| {
                let usable = p.has_credentials();
                if !usable {
                    debug!(provider = %p.name, "Skipping provider without API key");
                }
                usable
            })
            .collect();
        Self { providers }
    }

    /// Build a catalog from the enabled providers of a config.
    pub fn from_config(config: &SummarizerConfig) -> Self {
        Self::new(
            config
                .providers
                .iter()
                .filter(|p| p.enabled)
                .map(ProviderDescriptor::from_config)
                .collect(),
        )
    }

    /// Providers in trial order.
    pub fn active_providers(&self) -> &[ProviderDescriptor] {
        &self.providers
    }

    pub fn len(&self) -> usize {
        self.providers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }

    /// Names in trial order.
    pub fn names(&self) -> Vec<&str> {
        self.providers.iter().map(|p| p.name.as_str()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    fn descriptor(name: &str, key: &str) -> ProviderDescriptor {
        ProviderDescriptor::new(name, key, "model", "http://localhost", 1000, 3)
    }

    #[test]
    fn test_blank_keys_are_filtered() {
        let catalog = ProviderCatalog::new(vec![
            descriptor("a", "key-a"),
            descriptor("b", ""),
            descriptor("c", "   "),
            descriptor("d", "key-d"),
        ]);
        assert_eq!(catalog.names(), vec!["a", "d"]);
        assert_eq!(catalog.len(), 2);
    }

    #[test]
    fn test_empty_catalog_is_valid() {
        let catalog = ProviderCatalog::new(vec![descriptor("a", "")]);
        assert!(catalog.is_empty());
        assert!(catalog.active_providers().is_empty());
    }

    #[test]
    fn test_order_is_preserved() {
        let catalog = ProviderCatalog::new(vec![
            descriptor("third", "k"),
            descriptor("first", "k"),
            descriptor("second", "k"),
        ]);
        assert_eq!(catalog.names(), vec!["third", "first", "second"]);
    }

    #[test]
    fn test_builder_setters() {
        let provider = descriptor("a", "k")
            .with_timeout(Duration::from_secs(10))
            .with_connect_timeout(Duration::from_secs(2))
            .with_inter_chunk_delay(Duration::from_millis(250));
        assert_eq!(provider.timeout, Duration::from_secs(10));
        assert_eq!(provider.connect_timeout, Duration::from_secs(2));
        assert_eq!(provider.inter_chunk_delay, Duration::from_millis(250));
    }

    #[test]
    fn test_debug_masks_key() {
        let provider = descriptor("groq", "gsk_1234567890abcd");
        let debug = format!("{:?}", provider);
        assert!(!debug.contains("gsk_1234567890abcd"));
        assert!(debug.contains("****abcd"));
        assert_eq!(descriptor("x", "short").masked_key(), "****");
    }

    #[test]
    #[serial]
    fn test_from_config_resolves_env_keys() {
        std::env::remove_var("GROQ_API_KEY_PRIMARY");
        std::env::remove_var("GROQ_API_KEY_FALLBACK");
        std::env::set_var("CEREBRAS_API_KEY", "csk-test-key");

        let catalog = ProviderCatalog::from_config(&SummarizerConfig::builtin_defaults());
        std::env::remove_var("CEREBRAS_API_KEY");

        assert_eq!(catalog.names(), vec!["Cerebras"]);
        let cerebras = &catalog.active_providers()[0];
        assert_eq!(cerebras.api_key, "csk-test-key");
        assert_eq!(cerebras.inter_chunk_delay, Duration::from_millis(500));
        assert_eq!(cerebras.max_chunks, 6);
    }

    #[test]
    fn test_disabled_providers_are_skipped() {
        let mut config = SummarizerConfig::builtin_defaults();
        for provider in &mut config.providers {
            provider.api_key = Some("inline".to_string());
        }
        config.providers[1].enabled = false;

        let catalog = ProviderCatalog::from_config(&config);
        assert_eq!(
            catalog.names(),
            vec!["Groq Primary (70B)", "Groq Fallback (8B)"]
        );
    }
}
