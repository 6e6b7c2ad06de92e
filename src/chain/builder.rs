//! Chain builder: turns topics into stage sequences.
//!
//! One chain per topic, in topic order. A topic whose fetch fails still gets a slot, it is
//! just empty.

use crate::chain::retry::{with_retry, RetryPolicy};
use crate::chain::stage::{PromptFraming, Stage};
use crate::error::PipelineError;
use crate::source::{ContentItem, ContentSource, SourceMode, TopicQuery};
use futures::future::join_all;
use std::sync::Arc;
use tracing::{info, warn};

/// Title the news API substitutes for retracted articles
const REMOVED_PLACEHOLDER: &str = "[Removed]";

pub struct ChainBuilder {
    source: Arc<dyn ContentSource>,
    retry: RetryPolicy,
    framing: PromptFraming,
    page_limit: usize,
}

impl ChainBuilder {
    pub const DEFAULT_PAGE_LIMIT: usize = 100;

    pub fn new(source: Arc<dyn ContentSource>, retry: RetryPolicy) -> Self {
        Self {
            source,
            retry,
            framing: PromptFraming::default(),
            page_limit: Self::DEFAULT_PAGE_LIMIT,
        }
    }

    pub fn with_framing(mut self, framing: PromptFraming) -> Self {
        self.framing = framing;
        self
    }

    pub fn with_page_limit(mut self, page_limit: usize) -> Self {
        self.page_limit = page_limit;
        self
    }

    /// Build one stage sequence per topic, each at most `max_depth` long.
    pub async fn build(
        &self,
        topics: &[TopicQuery],
        mode: SourceMode,
        max_depth: usize,
    ) -> Result<Vec<Vec<Stage>>, PipelineError> {
        if max_depth == 0 {
            return Err(PipelineError::Configuration(
                "max chain depth must be at least 1".to_string(),
            ));
        }

        let chains = join_all(
            topics
                .iter()
                .map(|topic| self.build_chain(topic, mode, max_depth)),
        )
        .await;

        info!(
            topics = topics.len(),
            stages = chains.iter().map(Vec::len).sum::<usize>(),
            "Chains built"
        );
        Ok(chains)
    }

    async fn build_chain(&self, topic: &TopicQuery, mode: SourceMode, max_depth: usize) -> Vec<Stage> {
        if topic.is_empty() {
            warn!("Skipping topic without search terms");
            return Vec::new();
        }

        let source = &self.source;
        let page_limit = self.page_limit;
        let fetched = with_retry(&self.retry, "source.fetch", move || {
            source.fetch(topic, mode, page_limit)
        })
        .await;

        match fetched {
            Ok(items) => {
                let stages: Vec<Stage> = items
                    .into_iter()
                    .filter(|item| item.title != REMOVED_PLACEHOLDER)
                    .take(max_depth)
                    .map(|item| self.stage_from_item(topic, item))
                    .collect();
                info!(topic = %topic, stages = stages.len(), "Chain built");
                stages
            }
            Err(err) => {
                warn!(topic = %topic, error = %err, "Content source failed, topic yields no stages");
                Vec::new()
            }
        }
    }

    fn stage_from_item(&self, topic: &TopicQuery, item: ContentItem) -> Stage {
        let query = if item.body.trim().is_empty() {
            &item.title
        } else {
            &item.body
        };
        Stage::new(
            item.title.clone(),
            item.description.clone(),
            self.framing.frame(query),
        )
        .with_tags(topic.terms().iter().cloned())
        .with_source_url(item.url)
    }
}
