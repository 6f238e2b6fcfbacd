//! Summarizer configuration.
//!
//! TOML-based configuration for providers, generation parameters, retry
//! policy and input validation.
//!
//! # Configuration File Location
//!
//! The config file is loaded from (in order of priority):
//! 1. `WEBNOVEL_SUMMARIZER_CONFIG` environment variable
//! 2. `./summarizer.toml` (current working directory)
//! 3. `~/.webnovel-summarizer/summarizer.toml` (user config)
//! 4. Built-in default configuration
//!
//! # Example Configuration
//!
//! ```toml
//! [generation]
//! temperature = 0.7
//!
//! [retry]
//! max_attempts = 3
//!
//! [[providers]]
//! name = "Groq Primary (70B)"
//! api_key_env = "GROQ_API_KEY_PRIMARY"
//! model = "llama-3.3-70b-versatile"
//! base_url = "https://api.groq.com/openai/v1"
//! max_content_chars = 450000
//! max_chunks = 3
//! chunk_delay_ms = 3000
//! ```
//!
//! Provider order in the file is trial order.

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::path::Path;
use thiserror::Error;

use crate::error::{SummaryError, RATE_LIMIT_BACKOFF_STEP, SERVER_ERROR_BACKOFF_STEP};
use crate::prompts::DEFAULT_SYSTEM_PROMPT;

/// Environment variable pointing at a config file.
pub const CONFIG_ENV: &str = "WEBNOVEL_SUMMARIZER_CONFIG";

/// File name searched in the working and user directories.
pub const CONFIG_FILE_NAME: &str = "summarizer.toml";

// ============================================================================
// Error Types
// ============================================================================

/// Errors that can occur while loading configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to read configuration file.
    #[error("Failed to read config file: {0}")]
    IoError(#[from] std::io::Error),

    /// Failed to parse TOML configuration.
    #[error("Failed to parse TOML config: {0}")]
    ParseError(String),

    /// Invalid configuration values.
    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

impl From<ConfigError> for SummaryError {
    fn from(err: ConfigError) -> Self {
        SummaryError::Config(err.to_string())
    }
}

// ============================================================================
// Provider Configuration
// ============================================================================

/// Configuration for one OpenAI-compatible backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Display name, also used in logs and errors.
    pub name: String,

    /// Inline API key. Takes precedence over `api_key_env`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Environment variable holding the API key.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key_env: Option<String>,

    /// Model identifier sent in the request body.
    pub model: String,

    /// Base URL; `/chat/completions` is appended.
    pub base_url: String,

    /// Largest input (in chars) sent in one call.
    pub max_content_chars: usize,

    /// Largest number of chunks processed for one document.
    #[serde(default = "default_max_chunks")]
    pub max_chunks: usize,

    /// Pause between successive chunk calls, in milliseconds.
    #[serde(default = "default_chunk_delay_ms")]
    pub chunk_delay_ms: u64,

    /// Total request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,

    /// Connection timeout in seconds.
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_seconds: u64,

    /// Whether this provider takes part in the fallback chain.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Extra HTTP headers sent with every request.
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub headers: HashMap<String, String>,
}

fn default_max_chunks() -> usize {
    5
}

fn default_chunk_delay_ms() -> u64 {
    1000
}

fn default_timeout() -> u64 {
    90
}

fn default_connect_timeout() -> u64 {
    30
}

fn default_true() -> bool {
    true
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            name: "unknown".to_string(),
            api_key: None,
            api_key_env: None,
            model: String::new(),
            base_url: String::new(),
            max_content_chars: 100_000,
            max_chunks: default_max_chunks(),
            chunk_delay_ms: default_chunk_delay_ms(),
            timeout_seconds: default_timeout(),
            connect_timeout_seconds: default_connect_timeout(),
            enabled: true,
            headers: HashMap::new(),
        }
    }
}

impl ProviderConfig {
    /// Resolve the API key: inline value first, then the environment.
    ///
    /// Returns an empty string when neither yields a non-blank key; the
    /// catalog drops such providers.
    pub fn resolve_api_key(&self) -> String {
        if let Some(key) = self.api_key.as_deref().filter(|k| !k.trim().is_empty()) {
            return key.trim().to_string();
        }
        self.api_key_env
            .as_deref()
            .and_then(|var| std::env::var(var).ok())
            .map(|key| key.trim().to_string())
            .unwrap_or_default()
    }
}

// ============================================================================
// Generation / Retry / Input
// ============================================================================

/// Sampling parameters shared by every request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationConfig {
    #[serde(default = "default_system_prompt")]
    pub system_prompt: String,

    #[serde(default = "default_temperature")]
    pub temperature: f32,

    #[serde(default = "default_top_p")]
    pub top_p: f32,
}

fn default_system_prompt() -> String {
    DEFAULT_SYSTEM_PROMPT.to_string()
}

fn default_temperature() -> f32 {
    0.7
}

fn default_top_p() -> f32 {
    1.0
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            system_prompt: default_system_prompt(),
            temperature: default_temperature(),
            top_p: default_top_p(),
        }
    }
}

/// Per-call retry policy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Attempts per completion call, including the first.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// 429 backoff unit (multiplied by the attempt number).
    #[serde(default = "default_rate_limit_backoff_ms")]
    pub rate_limit_backoff_ms: u64,

    /// 5xx backoff unit (multiplied by the attempt number).
    #[serde(default = "default_server_error_backoff_ms")]
    pub server_error_backoff_ms: u64,
}

fn default_max_attempts() -> u32 {
    3
}

fn default_rate_limit_backoff_ms() -> u64 {
    RATE_LIMIT_BACKOFF_STEP.as_millis() as u64
}

fn default_server_error_backoff_ms() -> u64 {
    SERVER_ERROR_BACKOFF_STEP.as_millis() as u64
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            rate_limit_backoff_ms: default_rate_limit_backoff_ms(),
            server_error_backoff_ms: default_server_error_backoff_ms(),
        }
    }
}

/// Caller-side input rules.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InputConfig {
    /// Minimum extracted text length accepted for summarization.
    #[serde(default = "default_min_content_chars")]
    pub min_content_chars: usize,

    /// Retry once with a short summary when a request is too large.
    #[serde(default = "default_true")]
    pub downgrade_on_payload_too_large: bool,
}

fn default_min_content_chars() -> usize {
    100
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            min_content_chars: default_min_content_chars(),
            downgrade_on_payload_too_large: true,
        }
    }
}

// ============================================================================
// Root Configuration
// ============================================================================

/// Root configuration structure for `summarizer.toml`.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct SummarizerConfig {
    #[serde(default)]
    pub generation: GenerationConfig,

    #[serde(default)]
    pub retry: RetryConfig,

    #[serde(default)]
    pub input: InputConfig,

    /// Providers in trial order.
    #[serde(default)]
    pub providers: Vec<ProviderConfig>,
}

impl SummarizerConfig {
    /// Load configuration from the default location.
    ///
    /// Searches in order:
    /// 1. `WEBNOVEL_SUMMARIZER_CONFIG` environment variable
    /// 2. `./summarizer.toml`
    /// 3. `~/.webnovel-summarizer/summarizer.toml`
    /// 4. Built-in defaults
    pub fn load() -> Result<Self, ConfigError> {
        if let Ok(path) = std::env::var(CONFIG_ENV) {
            if Path::new(&path).exists() {
                return Self::from_file(&path);
            }
        }

        let local_path = Path::new(CONFIG_FILE_NAME);
        if local_path.exists() {
            return Self::from_file(local_path);
        }

        if let Some(home) = dirs::home_dir() {
            let user_path = home.join(".webnovel-summarizer").join(CONFIG_FILE_NAME);
            if user_path.exists() {
                return Self::from_file(&user_path);
            }
        }

        Ok(Self::builtin_defaults())
    }

    /// Load configuration from a specific file path.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::from_toml(&content)
    }

    /// Parse and validate configuration from a TOML string.
    pub fn from_toml(toml_str: &str) -> Result<Self, ConfigError> {
        let config: Self =
            toml::from_str(toml_str).map_err(|e| ConfigError::ParseError(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize configuration to a TOML string.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::ParseError(e.to_string()))
    }

    /// Built-in three-tier chain: Groq 70B, Cerebras, Groq 8B.
    ///
    /// Keys come from `GROQ_API_KEY_PRIMARY`, `CEREBRAS_API_KEY` and
    /// `GROQ_API_KEY_FALLBACK`; unset keys simply drop that tier.
    pub fn builtin_defaults() -> Self {
        Self {
            providers: vec![
                ProviderConfig {
                    name: "Groq Primary (70B)".to_string(),
                    api_key_env: Some("GROQ_API_KEY_PRIMARY".to_string()),
                    model: "llama-3.3-70b-versatile".to_string(),
                    base_url: "https://api.groq.com/openai/v1".to_string(),
                    max_content_chars: 450_000,
                    max_chunks: 3,
                    chunk_delay_ms: 3000,
                    ..Default::default()
                },
                ProviderConfig {
                    name: "Cerebras".to_string(),
                    api_key_env: Some("CEREBRAS_API_KEY".to_string()),
                    model: "llama-3.3-70b".to_string(),
                    base_url: "https://api.cerebras.ai/v1".to_string(),
                    max_content_chars: 240_000,
                    max_chunks: 6,
                    chunk_delay_ms: 500,
                    ..Default::default()
                },
                ProviderConfig {
                    name: "Groq Fallback (8B)".to_string(),
                    api_key_env: Some("GROQ_API_KEY_FALLBACK".to_string()),
                    model: "llama-3.1-8b-instant".to_string(),
                    base_url: "https://api.groq.com/openai/v1".to_string(),
                    max_content_chars: 450_000,
                    max_chunks: 4,
                    chunk_delay_ms: 3000,
                    ..Default::default()
                },
            ],
            ..Default::default()
        }
    }

    /// Get a provider by name.
    pub fn get_provider(&self, name: &str) -> Option<&ProviderConfig> {
        self.providers.iter().find(|p| p.name == name)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut seen = HashSet::new();
        for provider in &self.providers {
            if !seen.insert(&provider.name) {
                return Err(ConfigError::ValidationError(format!(
                    "Duplicate provider name: '{}'",
                    provider.name
                )));
            }
            if provider.max_content_chars == 0 {
                return Err(ConfigError::ValidationError(format!(
                    "Provider '{}' must have max_content_chars > 0",
                    provider.name
                )));
            }
            if provider.max_chunks == 0 {
                return Err(ConfigError::ValidationError(format!(
                    "Provider '{}' must have max_chunks > 0",
                    provider.name
                )));
            }
            if provider.base_url.trim().is_empty() {
                return Err(ConfigError::ValidationError(format!(
                    "Provider '{}' requires a base_url",
                    provider.name
                )));
            }
        }

        if self.retry.max_attempts == 0 {
            return Err(ConfigError::ValidationError(
                "retry.max_attempts must be at least 1".to_string(),
            ));
        }

        if !(0.0..=2.0).contains(&self.generation.temperature) {
            return Err(ConfigError::ValidationError(format!(
                "generation.temperature must be within 0.0..=2.0, got {}",
                self.generation.temperature
            )));
        }

        Ok(())
    }
}
