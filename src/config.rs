//! Configuration System
//!
//! Layered configuration: built-in defaults, the user's global file, workspace files and
//! finally `AUGUR__SECTION__KEY` environment variables. Everything is validated at once so a
//! misconfigured run reports every problem before it starts.

use crate::chain::retry::RetryPolicy;
use crate::logging::LoggingConfig;
use crate::provider::MediaSize;
use crate::source::{SourceMode, TopicQuery};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

mod loader;
mod merge;
mod sources;

pub use loader::ConfigLoader;

/// Root configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AugurConfig {
    #[serde(default)]
    pub pipeline: PipelineConfig,

    /// Retry policy shared by every capability call
    #[serde(default)]
    pub retry: RetryPolicy,

    #[serde(default)]
    pub generation: GenerationConfig,

    #[serde(default)]
    pub source: SourceConfig,

    #[serde(default)]
    pub store: StoreConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// What one run forecasts
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// One chain per topic
    #[serde(default = "default_topics")]
    pub topics: Vec<TopicQuery>,

    /// Maximum stages per chain
    #[serde(default = "default_stop_count")]
    pub stop_count: usize,

    /// Tags attached to every record
    #[serde(default = "default_record_tags")]
    pub record_tags: Vec<String>,

    /// Abandon chains still running after this many seconds
    #[serde(default)]
    pub run_deadline_secs: Option<u64>,
}

fn default_topics() -> Vec<TopicQuery> {
    vec![
        TopicQuery::new(["stocks", "market performance"]),
        TopicQuery::new(["crypto", "bitcoin", "ethereum"]),
        TopicQuery::new(["apple", "microsoft"]),
    ]
}

fn default_stop_count() -> usize {
    3
}

fn default_record_tags() -> Vec<String> {
    vec!["forecast".to_string()]
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            topics: default_topics(),
            stop_count: default_stop_count(),
            record_tags: default_record_tags(),
            run_deadline_secs: None,
        }
    }
}

impl PipelineConfig {
    pub fn run_deadline(&self) -> Option<Duration> {
        self.run_deadline_secs.map(Duration::from_secs)
    }
}

/// Completion, summary and image backend settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationConfig {
    #[serde(default = "default_model")]
    pub model: String,

    #[serde(default = "default_model")]
    pub summary_model: String,

    #[serde(default = "default_image_model")]
    pub image_model: String,

    /// Falls back to `OPENAI_API_KEY`
    #[serde(default)]
    pub api_key: Option<String>,

    #[serde(default)]
    pub base_url: Option<String>,

    #[serde(default)]
    pub temperature: Option<f32>,

    /// Upper bound on record title length, in tokens
    #[serde(default = "default_summary_tokens")]
    pub summary_tokens: u32,

    #[serde(default)]
    pub media_size: MediaSize,
}

fn default_model() -> String {
    "gpt-3.5-turbo".to_string()
}

fn default_image_model() -> String {
    "dall-e-2".to_string()
}

fn default_summary_tokens() -> u32 {
    16
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            model: default_model(),
            summary_model: default_model(),
            image_model: default_image_model(),
            api_key: None,
            base_url: None,
            temperature: None,
            summary_tokens: default_summary_tokens(),
            media_size: MediaSize::default(),
        }
    }
}

/// News source settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    #[serde(default)]
    pub mode: SourceMode,

    /// Falls back to `NEWSAPI_KEY`
    #[serde(default)]
    pub api_key: Option<String>,

    #[serde(default)]
    pub base_url: Option<String>,

    #[serde(default = "default_language")]
    pub language: String,

    /// Articles requested per topic
    #[serde(default = "default_page_limit")]
    pub page_limit: usize,
}

fn default_language() -> String {
    "en".to_string()
}

fn default_page_limit() -> usize {
    100
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            mode: SourceMode::default(),
            api_key: None,
            base_url: None,
            language: default_language(),
            page_limit: default_page_limit(),
        }
    }
}

/// Document store settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    #[serde(default = "default_store_path")]
    pub path: PathBuf,

    /// Partitions older than this many days are dropped after each run
    #[serde(default = "default_retention_days")]
    pub retention_days: u32,
}

fn default_store_path() -> PathBuf {
    PathBuf::from(".augur/store")
}

fn default_retention_days() -> u32 {
    30
}

/// Upper bound on `store.retention_days` (100 years)
pub const MAX_RETENTION_DAYS: u32 = 36_500;

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: default_store_path(),
            retention_days: default_retention_days(),
        }
    }
}

/// Configuration validation errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigValidationError {
    Pipeline(String),
    Retry(String),
    Generation(String),
    Source(String),
    Store(String),
    Logging(String),
}

impl fmt::Display for ConfigValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigValidationError::Pipeline(msg) => write!(f, "pipeline: {}", msg),
            ConfigValidationError::Retry(msg) => write!(f, "retry: {}", msg),
            ConfigValidationError::Generation(msg) => write!(f, "generation: {}", msg),
            ConfigValidationError::Source(msg) => write!(f, "source: {}", msg),
            ConfigValidationError::Store(msg) => write!(f, "store: {}", msg),
            ConfigValidationError::Logging(msg) => write!(f, "logging: {}", msg),
        }
    }
}

impl std::error::Error for ConfigValidationError {}

fn is_blank(value: &Option<String>) -> bool {
    value.as_deref().map_or(true, |v| v.trim().is_empty())
}

impl AugurConfig {
    /// Validate the entire configuration
    pub fn validate(&self) -> Result<(), Vec<ConfigValidationError>> {
        let mut errors = Vec::new();

        if self.pipeline.topics.is_empty() {
            errors.push(ConfigValidationError::Pipeline(
                "at least one topic is required".to_string(),
            ));
        }
        if self.pipeline.stop_count == 0 {
            errors.push(ConfigValidationError::Pipeline(
                "stop_count must be at least 1".to_string(),
            ));
        }
        if self.pipeline.run_deadline_secs == Some(0) {
            errors.push(ConfigValidationError::Pipeline(
                "run_deadline_secs must be positive when set".to_string(),
            ));
        }

        if let Err(e) = self.retry.validate() {
            errors.push(ConfigValidationError::Retry(e));
        }

        if is_blank(&self.generation.api_key) {
            errors.push(ConfigValidationError::Generation(
                "api_key is missing (set it or OPENAI_API_KEY)".to_string(),
            ));
        }
        if self.generation.model.trim().is_empty() {
            errors.push(ConfigValidationError::Generation(
                "model cannot be empty".to_string(),
            ));
        }

        if is_blank(&self.source.api_key) {
            errors.push(ConfigValidationError::Source(
                "api_key is missing (set it or NEWSAPI_KEY)".to_string(),
            ));
        }
        if self.source.page_limit == 0 {
            errors.push(ConfigValidationError::Source(
                "page_limit must be at least 1".to_string(),
            ));
        }

        if self.store.path.as_os_str().is_empty() {
            errors.push(ConfigValidationError::Store(
                "path cannot be empty".to_string(),
            ));
        }
        if self.store.retention_days > MAX_RETENTION_DAYS {
            errors.push(ConfigValidationError::Store(format!(
                "retention_days must be at most {}",
                MAX_RETENTION_DAYS
            )));
        }

        if let Err(e) = self.logging.validate() {
            errors.push(ConfigValidationError::Logging(e));
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}
