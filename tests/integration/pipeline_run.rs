//! End-to-end runs against a real sled store with scripted services

use augur::aggregate::StopwordLabelExtractor;
use augur::chain::{PromptFraming, RetryPolicy};
use augur::pipeline::{Capabilities, Pipeline, PipelineSettings, RunPhase};
use augur::provider::MediaSize;
use augur::record::Media;
use augur::source::{SourceMode, TopicQuery};
use augur::store::{DocumentStore, SledDocumentStore};
use augur::testing::{
    article, ScriptedGeneration, ScriptedMedia, ScriptedSource, ScriptedSummarizer,
};
use chrono::NaiveDate;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

fn run_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 9, 1).unwrap()
}

fn settings(topics: Vec<TopicQuery>, max_depth: usize) -> PipelineSettings {
    PipelineSettings {
        topics,
        mode: SourceMode::Everything,
        max_depth,
        page_limit: 100,
        framing: PromptFraming::none(),
        media_size: MediaSize::default(),
        record_tags: vec!["forecast".to_string()],
        retention_days: 30,
        run_deadline: None,
        retry: RetryPolicy::new(2, Duration::from_millis(10), 2),
    }
}

struct Harness {
    source: Arc<ScriptedSource>,
    generation: Arc<ScriptedGeneration>,
    media: Arc<ScriptedMedia>,
    store: Arc<SledDocumentStore>,
}

impl Harness {
    fn new(source: ScriptedSource, generation: ScriptedGeneration, media: ScriptedMedia, store_dir: &TempDir) -> Self {
        Self {
            source: Arc::new(source),
            generation: Arc::new(generation),
            media: Arc::new(media),
            store: Arc::new(SledDocumentStore::open(store_dir.path()).unwrap()),
        }
    }

    fn pipeline(&self, settings: PipelineSettings) -> Pipeline {
        Pipeline::new(
            Capabilities {
                source: self.source.clone(),
                generation: self.generation.clone(),
                media: self.media.clone(),
                summarizer: Arc::new(ScriptedSummarizer::new()),
                labels: Arc::new(StopwordLabelExtractor),
                store: self.store.clone(),
            },
            settings,
        )
        .with_date(run_date())
    }
}

#[tokio::test(start_paused = true)]
async fn test_run_writes_enriched_records_to_dated_partition() {
    let store_dir = TempDir::new().unwrap();
    let harness = Harness::new(
        ScriptedSource::new()
            .with_items("gold, silver", vec![article("g1"), article("g2")])
            .with_items("oil", vec![article("o1")]),
        ScriptedGeneration::new()
            .respond("body of g2", "gold prices climb past record highs")
            .respond("body of o1", "crude output falls sharply this quarter"),
        ScriptedMedia::new(),
        &store_dir,
    );
    let topics = vec![TopicQuery::new(["gold", "silver"]), TopicQuery::new(["oil"])];

    let report = harness.pipeline(settings(topics, 2)).run().await.unwrap();

    assert_eq!(report.phases.last(), Some(&RunPhase::Cleanup));
    assert_eq!(report.results, 2);
    assert_eq!(report.persisted, 2);
    assert!(report.chain_failures.is_empty());
    assert!(report.cleanup_failures.is_empty());

    let mut stored = harness.store.records("2024-09-01").unwrap();
    stored.sort_by(|a, b| a.description().cmp(b.description()));
    assert_eq!(stored.len(), 2);

    let gold = &stored[0];
    assert_eq!(gold.description(), "gold, silver");
    assert_eq!(gold.content(), "gold prices climb past record highs");
    assert_eq!(gold.title(), "gold prices climb past");
    assert_eq!(
        gold.media(),
        Some(&Media::Bytes(b"gold prices climb past".to_vec()))
    );
    assert_eq!(
        gold.urls(),
        &[
            "https://news.example/g1".to_string(),
            "https://news.example/g2".to_string()
        ]
    );
    assert!(gold.labels().contains("gold"));
    assert!(gold.tags().contains("forecast"));
    assert_eq!(gold.date(), run_date());

    assert_eq!(stored[1].description(), "oil");
    assert_ne!(stored[0].id(), stored[1].id());
}

#[tokio::test(start_paused = true)]
async fn test_media_outage_still_persists_records() {
    let store_dir = TempDir::new().unwrap();
    let harness = Harness::new(
        ScriptedSource::new().with_items("gold", vec![article("g1")]),
        ScriptedGeneration::new(),
        ScriptedMedia::failing(),
        &store_dir,
    );

    let report = harness
        .pipeline(settings(vec![TopicQuery::new(["gold"])], 3))
        .run()
        .await
        .unwrap();

    assert!(report.persist_succeeded());
    let stored = harness.store.records("2024-09-01").unwrap();
    assert_eq!(stored.len(), 1);
    assert!(stored[0].media().is_none());
    assert!(!harness.media.prompts().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_cleanup_expires_old_partitions_and_closes_store() {
    let store_dir = TempDir::new().unwrap();
    let harness = Harness::new(
        ScriptedSource::new(),
        ScriptedGeneration::new(),
        ScriptedMedia::new(),
        &store_dir,
    );
    let stale = augur::record::Record::new("stale", "", "old forecast", run_date());
    harness.store.bulk_insert("2024-07-01", &[stale.clone()]).unwrap();
    harness.store.bulk_insert("2024-08-15", &[stale]).unwrap();

    let report = harness
        .pipeline(settings(vec![TopicQuery::new(["quiet"])], 3))
        .run()
        .await
        .unwrap();

    assert_eq!(report.results, 0);
    assert_eq!(report.persisted, 0);
    assert_eq!(report.expired_partitions, vec!["2024-07-01".to_string()]);
    assert_eq!(
        harness.store.list_partitions().unwrap(),
        vec!["2024-08-15".to_string()]
    );
    assert_eq!(harness.source.close_calls(), 1);
    assert!(harness.store.bulk_insert("2024-09-01", &[]).is_err());
}

#[tokio::test(start_paused = true)]
async fn test_headline_mode_reaches_the_source() {
    let store_dir = TempDir::new().unwrap();
    let harness = Harness::new(
        ScriptedSource::new().with_items("markets", vec![article("m1")]),
        ScriptedGeneration::new(),
        ScriptedMedia::new(),
        &store_dir,
    );
    let mut settings = settings(vec![TopicQuery::new(["markets"])], 1);
    settings.mode = SourceMode::Headlines;

    let report = harness.pipeline(settings).run().await.unwrap();

    assert_eq!(harness.source.modes(), vec![SourceMode::Headlines]);
    assert_eq!(report.persisted, 1);
    assert_eq!(harness.generation.calls_for("body of m1"), 1);
}
