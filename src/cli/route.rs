//! CLI route: run context and dispatch. Builds the concrete adapters from configuration and
//! hands them to the pipeline.

use crate::aggregate::StopwordLabelExtractor;
use crate::cli::parse::Commands;
use crate::config::{AugurConfig, ConfigLoader};
use crate::error::PipelineError;
use crate::pipeline::{Capabilities, Pipeline, PipelineSettings, RunReport};
use crate::provider::{CompletionSummarizer, OpenAiClient};
use crate::source::{NewsApiSource, SourceMode, TopicQuery};
use crate::store::SledDocumentStore;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

/// Runtime context for CLI execution: workspace and the loaded configuration.
pub struct RunContext {
    workspace_root: PathBuf,
    config: AugurConfig,
}

impl RunContext {
    /// Load configuration from `config_path` if given, otherwise from the layered sources.
    pub fn new(workspace_root: PathBuf, config_path: Option<PathBuf>) -> Result<Self, PipelineError> {
        let config = match config_path {
            Some(ref path) => ConfigLoader::load_from_file(path)?,
            None => ConfigLoader::load(&workspace_root)?,
        };
        Ok(Self {
            workspace_root,
            config,
        })
    }

    pub fn config(&self) -> &AugurConfig {
        &self.config
    }

    pub async fn execute(&self, command: &Commands) -> Result<RunReport, PipelineError> {
        match command {
            Commands::Run {
                topics,
                stop_count,
                headlines,
                deadline_secs,
            } => {
                let config = apply_run_overrides(
                    self.config.clone(),
                    topics,
                    *stop_count,
                    *headlines,
                    *deadline_secs,
                );
                validate(&config)?;

                let capabilities = build_capabilities(&config, &self.workspace_root)?;
                let settings = PipelineSettings::from_config(&config);
                info!(
                    topics = settings.topics.len(),
                    max_depth = settings.max_depth,
                    mode = %settings.mode,
                    "Starting run"
                );
                Pipeline::new(capabilities, settings).run().await
            }
        }
    }
}

/// Fold `run` flags into the loaded configuration.
pub fn apply_run_overrides(
    mut config: AugurConfig,
    topics: &[String],
    stop_count: Option<usize>,
    headlines: bool,
    deadline_secs: Option<u64>,
) -> AugurConfig {
    if !topics.is_empty() {
        config.pipeline.topics = topics
            .iter()
            .map(|topic| TopicQuery::new(topic.split(',').map(str::trim)))
            .collect();
    }
    if let Some(stop_count) = stop_count {
        config.pipeline.stop_count = stop_count;
    }
    if headlines {
        config.source.mode = SourceMode::Headlines;
    }
    if deadline_secs.is_some() {
        config.pipeline.run_deadline_secs = deadline_secs;
    }
    config
}

fn validate(config: &AugurConfig) -> Result<(), PipelineError> {
    config.validate().map_err(|errors| {
        PipelineError::Configuration(
            errors
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join("; "),
        )
    })
}

fn resolve_store_path(workspace_root: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        workspace_root.join(path)
    }
}

/// Build the production adapters. Expects a validated configuration.
pub fn build_capabilities(
    config: &AugurConfig,
    workspace_root: &Path,
) -> Result<Capabilities, PipelineError> {
    let generation_cfg = &config.generation;
    let openai_key = generation_cfg
        .api_key
        .clone()
        .ok_or_else(|| PipelineError::Configuration("generation.api_key is missing".to_string()))?;
    let news_key = config
        .source
        .api_key
        .clone()
        .ok_or_else(|| PipelineError::Configuration("source.api_key is missing".to_string()))?;

    let mut generation = OpenAiClient::new(
        generation_cfg.model.clone(),
        openai_key.clone(),
        generation_cfg.base_url.clone(),
    )?;
    if let Some(temperature) = generation_cfg.temperature {
        generation = generation.with_temperature(temperature);
    }
    let summary_client = OpenAiClient::new(
        generation_cfg.summary_model.clone(),
        openai_key.clone(),
        generation_cfg.base_url.clone(),
    )?
    .with_max_tokens(generation_cfg.summary_tokens);
    let media = OpenAiClient::new(
        generation_cfg.image_model.clone(),
        openai_key,
        generation_cfg.base_url.clone(),
    )?;

    let source = NewsApiSource::new(
        news_key,
        config.source.base_url.clone(),
        config.source.language.clone(),
    )?;
    let store = SledDocumentStore::open(resolve_store_path(workspace_root, &config.store.path))?;

    Ok(Capabilities {
        source: Arc::new(source),
        generation: Arc::new(generation),
        media: Arc::new(media),
        summarizer: Arc::new(CompletionSummarizer::new(
            Arc::new(summary_client),
            generation_cfg.summary_tokens,
        )),
        labels: Arc::new(StopwordLabelExtractor),
        store: Arc::new(store),
    })
}
