//! Integration tests for chain building and concurrent dispatch

use augur::chain::{ChainBuilder, ConcurrentRunner, PromptFraming, RetryPolicy, Role};
use augur::error::ChainError;
use augur::source::{SourceMode, TopicQuery};
use augur::testing::{article, ScriptedGeneration, ScriptedSource};
use std::sync::Arc;
use std::time::Duration;

fn retry() -> RetryPolicy {
    RetryPolicy::new(3, Duration::from_millis(10), 2)
}

fn topics(names: &[&str]) -> Vec<TopicQuery> {
    names.iter().map(|name| TopicQuery::new([*name])).collect()
}

async fn build(source: ScriptedSource, names: &[&str], depth: usize) -> Vec<Vec<augur::Stage>> {
    ChainBuilder::new(Arc::new(source), retry())
        .with_framing(PromptFraming::none())
        .build(&topics(names), SourceMode::Everything, depth)
        .await
        .unwrap()
}

/// Topic a has three articles and b none; depth 2 gives chains of 2 and 0 stages
#[tokio::test(start_paused = true)]
async fn test_depth_limited_chains_produce_results_in_topic_order() {
    let source = ScriptedSource::new().with_items(
        "a",
        vec![article("a1"), article("a2"), article("a3")],
    );
    let chains = build(source, &["a", "b"], 2).await;
    assert_eq!(chains.iter().map(Vec::len).collect::<Vec<_>>(), vec![2, 0]);

    let generation = Arc::new(ScriptedGeneration::new());
    let outcomes = ConcurrentRunner::new(generation.clone(), retry())
        .run_all(chains)
        .await;

    assert_eq!(
        outcomes,
        vec![Ok(Some("forecast: body of a2".to_string())), Ok(None)]
    );
    assert_eq!(generation.calls().len(), 2);
    assert_eq!(generation.calls_for("body of a3"), 0);
}

/// A stage that exhausts its retries leaves no trace in the history seen by later stages
#[tokio::test(start_paused = true)]
async fn test_failed_middle_stage_is_skipped() {
    let source = ScriptedSource::new().with_items(
        "gold",
        vec![article("g1"), article("g2"), article("g3")],
    );
    let chains = build(source, &["gold"], 3).await;

    let generation = Arc::new(ScriptedGeneration::new().fail_always("body of g2"));
    let outcomes = ConcurrentRunner::new(generation.clone(), retry())
        .run_all(chains)
        .await;

    assert_eq!(outcomes, vec![Ok(Some("forecast: body of g3".to_string()))]);
    assert_eq!(generation.calls_for("body of g2"), 3);

    let last = generation
        .calls()
        .into_iter()
        .find(|call| call.prompt == "body of g3")
        .unwrap();
    assert_eq!(last.history.len(), 2);
    assert_eq!(last.history[0].role, Role::User);
    assert_eq!(last.history[0].content, "body of g1");
    assert_eq!(last.history[1].role, Role::System);
    assert_eq!(last.history[1].content, "forecast: body of g1");
}

/// Transient failures are absorbed by the retry policy on both sides of the engine
#[tokio::test(start_paused = true)]
async fn test_transient_failures_recover() {
    let source = ScriptedSource::new()
        .with_items("oil", vec![article("o1")])
        .failing("gas");
    let chains = build(source, &["oil", "gas"], 3).await;
    assert_eq!(chains.iter().map(Vec::len).collect::<Vec<_>>(), vec![1, 0]);

    let generation = Arc::new(ScriptedGeneration::new().fail_times("body of o1", 2));
    let outcomes = ConcurrentRunner::new(generation.clone(), retry())
        .run_all(chains)
        .await;

    assert_eq!(outcomes, vec![Ok(Some("forecast: body of o1".to_string())), Ok(None)]);
    assert_eq!(generation.calls_for("body of o1"), 3);
}

/// A slow chain misses the deadline while the fast one still reports its result
#[tokio::test(start_paused = true)]
async fn test_deadline_only_affects_slow_chain() {
    let source = ScriptedSource::new()
        .with_items("fast", vec![article("f1")])
        .with_items("slow", vec![article("s1")]);
    let chains = build(source, &["fast", "slow"], 1).await;

    let generation = Arc::new(
        ScriptedGeneration::new().delay("body of s1", Duration::from_secs(600)),
    );
    let outcomes = ConcurrentRunner::new(generation, retry())
        .with_deadline(Some(Duration::from_secs(30)))
        .run_all(chains)
        .await;

    assert_eq!(outcomes[0], Ok(Some("forecast: body of f1".to_string())));
    assert_eq!(outcomes[1], Err(ChainError::DeadlineExceeded { index: 1 }));
}
