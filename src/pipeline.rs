//! Run orchestration.
//!
//! One run walks `BUILD → DISPATCH → AGGREGATE → DEDUPE → PERSIST → CLEANUP` exactly once.
//! Per-topic, per-chain and per-text failures are absorbed by the phase they happen in and
//! show up in the [`RunReport`]. Only configuration problems abort a run, and even then
//! CLEANUP still runs.

use crate::aggregate::{AggregateInput, LabelExtractor, ResultAggregator};
use crate::chain::builder::ChainBuilder;
use crate::chain::retry::RetryPolicy;
use crate::chain::runner::ConcurrentRunner;
use crate::chain::stage::{PromptFraming, Stage};
use crate::config::AugurConfig;
use crate::error::{ChainError, PipelineError, StoreError};
use crate::provider::{GenerationService, MediaService, MediaSize, Summarizer};
use crate::record::RecordSet;
use crate::source::{ContentSource, SourceMode, TopicQuery};
use crate::store::{expire_partitions, DocumentStore, RecordSink};
use chrono::{Local, NaiveDate};
use futures::StreamExt;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{error, info, warn};

/// Phases of a run, in execution order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunPhase {
    Build,
    Dispatch,
    Aggregate,
    Dedupe,
    Persist,
    Cleanup,
}

impl fmt::Display for RunPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RunPhase::Build => "build",
            RunPhase::Dispatch => "dispatch",
            RunPhase::Aggregate => "aggregate",
            RunPhase::Dedupe => "dedupe",
            RunPhase::Persist => "persist",
            RunPhase::Cleanup => "cleanup",
        };
        f.write_str(name)
    }
}

/// The external collaborators of a run
pub struct Capabilities {
    pub source: Arc<dyn ContentSource>,
    pub generation: Arc<dyn GenerationService>,
    pub media: Arc<dyn MediaService>,
    pub summarizer: Arc<dyn Summarizer>,
    pub labels: Arc<dyn LabelExtractor>,
    pub store: Arc<dyn DocumentStore>,
}

/// Run parameters
#[derive(Debug, Clone)]
pub struct PipelineSettings {
    pub topics: Vec<TopicQuery>,
    pub mode: SourceMode,
    pub max_depth: usize,
    pub page_limit: usize,
    pub framing: PromptFraming,
    pub media_size: MediaSize,
    pub record_tags: Vec<String>,
    pub retention_days: u32,
    pub run_deadline: Option<Duration>,
    pub retry: RetryPolicy,
}

impl PipelineSettings {
    pub fn from_config(config: &AugurConfig) -> Self {
        Self {
            topics: config.pipeline.topics.clone(),
            mode: config.source.mode,
            max_depth: config.pipeline.stop_count,
            page_limit: config.source.page_limit,
            framing: PromptFraming::default(),
            media_size: config.generation.media_size,
            record_tags: config.pipeline.record_tags.clone(),
            retention_days: config.store.retention_days,
            run_deadline: config.pipeline.run_deadline(),
            retry: config.retry.clone(),
        }
    }
}

/// What one run did
#[derive(Debug)]
pub struct RunReport {
    pub date: NaiveDate,
    /// Phases entered, in order
    pub phases: Vec<RunPhase>,
    pub chains: usize,
    pub stages: usize,
    /// Chains that produced a final result
    pub results: usize,
    pub chain_failures: Vec<ChainError>,
    /// Deduplicated records of this run, kept even when persisting fails
    pub records: RecordSet,
    pub duplicates: usize,
    pub persisted: usize,
    pub persist_error: Option<StoreError>,
    pub expired_partitions: Vec<String>,
    pub cleanup_failures: Vec<String>,
}

impl RunReport {
    fn new(date: NaiveDate) -> Self {
        Self {
            date,
            phases: Vec::new(),
            chains: 0,
            stages: 0,
            results: 0,
            chain_failures: Vec::new(),
            records: RecordSet::new(),
            duplicates: 0,
            persisted: 0,
            persist_error: None,
            expired_partitions: Vec::new(),
            cleanup_failures: Vec::new(),
        }
    }

    fn enter(&mut self, phase: RunPhase) {
        info!(phase = %phase, "Entering phase");
        self.phases.push(phase);
    }

    /// Whether PERSIST handed every record to the store.
    pub fn persist_succeeded(&self) -> bool {
        self.persist_error.is_none()
    }
}

pub struct Pipeline {
    source: Arc<dyn ContentSource>,
    store: Arc<dyn DocumentStore>,
    builder: ChainBuilder,
    runner: ConcurrentRunner,
    aggregator: ResultAggregator,
    settings: PipelineSettings,
    date: Option<NaiveDate>,
}

impl Pipeline {
    pub fn new(capabilities: Capabilities, settings: PipelineSettings) -> Self {
        let retry = settings.retry.clone();
        let builder = ChainBuilder::new(Arc::clone(&capabilities.source), retry.clone())
            .with_framing(settings.framing.clone())
            .with_page_limit(settings.page_limit);
        let runner = ConcurrentRunner::new(capabilities.generation, retry.clone())
            .with_deadline(settings.run_deadline);
        let aggregator = ResultAggregator::new(
            capabilities.summarizer,
            capabilities.media,
            capabilities.labels,
            retry,
        )
        .with_media_size(settings.media_size)
        .with_tags(settings.record_tags.iter().cloned());

        Self {
            source: capabilities.source,
            store: capabilities.store,
            builder,
            runner,
            aggregator,
            settings,
            date: None,
        }
    }

    /// Run as if today were `date`.
    pub fn with_date(mut self, date: NaiveDate) -> Self {
        self.aggregator = self.aggregator.with_date(date);
        self.date = Some(date);
        self
    }

    /// Execute one full run. CLEANUP runs whether or not the earlier phases succeeded.
    pub async fn run(&self) -> Result<RunReport, PipelineError> {
        let started = Instant::now();
        let date = self.date.unwrap_or_else(|| Local::now().date_naive());
        let mut report = RunReport::new(date);

        let outcome = self.execute(&mut report).await;
        if let Err(err) = &outcome {
            error!(error = %err, "Run aborted");
        }
        self.cleanup(&mut report).await;

        info!(
            elapsed_ms = started.elapsed().as_millis() as u64,
            records = report.records.len(),
            persisted = report.persisted,
            persist_ok = report.persist_succeeded(),
            "Run finished"
        );
        outcome.map(|()| report)
    }

    async fn execute(&self, report: &mut RunReport) -> Result<(), PipelineError> {
        report.enter(RunPhase::Build);
        let chains = self
            .builder
            .build(&self.settings.topics, self.settings.mode, self.settings.max_depth)
            .await?;
        report.chains = chains.len();
        report.stages = chains.iter().map(Vec::len).sum();
        let contexts: Vec<(String, Vec<String>)> = self
            .settings
            .topics
            .iter()
            .zip(&chains)
            .map(|(topic, stages)| (topic.to_string(), source_urls(stages)))
            .collect();

        report.enter(RunPhase::Dispatch);
        let outcomes = self.runner.run_all(chains).await;

        report.enter(RunPhase::Aggregate);
        let mut inputs = Vec::new();
        for (outcome, (description, urls)) in outcomes.into_iter().zip(contexts) {
            match outcome {
                Ok(Some(text)) => inputs.push(AggregateInput::new(text, description, urls)),
                Ok(None) => {}
                Err(err) => report.chain_failures.push(err),
            }
        }
        report.results = inputs.len();
        let mut records = self.aggregator.aggregate(inputs).await;

        report.enter(RunPhase::Dedupe);
        while let Some(record) = records.next().await {
            if !report.records.insert(record) {
                report.duplicates += 1;
            }
        }
        info!(
            records = report.records.len(),
            duplicates = report.duplicates,
            "Records deduplicated"
        );

        report.enter(RunPhase::Persist);
        match RecordSink::new(Arc::clone(&self.store)).persist(&report.records, report.date) {
            Ok(written) => report.persisted = written,
            Err(err) => {
                error!(error = %err, records = report.records.len(), "Persisting records failed");
                report.persist_error = Some(err);
            }
        }
        Ok(())
    }

    async fn cleanup(&self, report: &mut RunReport) {
        report.enter(RunPhase::Cleanup);

        if let Err(err) = self.source.close().await {
            warn!(error = %err, "Closing content source failed");
            report.cleanup_failures.push(format!("source close: {}", err));
        }

        match expire_partitions(self.store.as_ref(), self.settings.retention_days, report.date) {
            Ok(dropped) => report.expired_partitions = dropped,
            Err(err) => {
                warn!(error = %err, "Expiring old partitions failed");
                report.cleanup_failures.push(format!("partition expiry: {}", err));
            }
        }

        if let Err(err) = self.store.close() {
            warn!(error = %err, "Closing document store failed");
            report.cleanup_failures.push(format!("store close: {}", err));
        }
    }
}

fn source_urls(stages: &[Stage]) -> Vec<String> {
    stages
        .iter()
        .filter_map(|stage| stage.source_url().map(str::to_string))
        .collect()
}
