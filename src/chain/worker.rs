//! Sequential chain worker.
//!
//! Feeds the stages of one chain to the generation service in order, threading the chain's
//! history through every call. A stage that fails is skipped without touching the history;
//! only the last stage decides the chain's result.

use crate::chain::history::History;
use crate::chain::retry::{with_retry, RetryPolicy};
use crate::chain::stage::Stage;
use crate::provider::GenerationService;
use std::sync::Arc;
use tracing::{debug, info, warn};

pub struct ChainWorker {
    generation: Arc<dyn GenerationService>,
    retry: RetryPolicy,
    history: History,
}

impl ChainWorker {
    /// Worker with a fresh, empty history.
    pub fn new(generation: Arc<dyn GenerationService>, retry: RetryPolicy) -> Self {
        Self::with_history(generation, retry, History::new())
    }

    /// Worker that continues an existing transcript.
    pub fn with_history(
        generation: Arc<dyn GenerationService>,
        retry: RetryPolicy,
        history: History,
    ) -> Self {
        Self {
            generation,
            retry,
            history,
        }
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    pub fn into_history(self) -> History {
        self.history
    }

    /// Process every stage in order and return the last stage's result.
    ///
    /// Earlier results only matter through the history they leave behind.
    pub async fn run(&mut self, stages: &[Stage]) -> Option<String> {
        let last = stages.len().checked_sub(1)?;
        let mut final_result = None;
        for (index, stage) in stages.iter().enumerate() {
            let stage_result = self.process_stage(index, stage).await;
            if index == last {
                final_result = stage_result;
            }
        }

        info!(
            stages = stages.len(),
            exchanges = self.history.exchanges(),
            produced = final_result.is_some(),
            "Chain exhausted"
        );
        final_result
    }

    async fn process_stage(&mut self, index: usize, stage: &Stage) -> Option<String> {
        if let Err(err) = stage.validate() {
            warn!(index, error = %err, "Skipping invalid stage");
            return None;
        }

        info!(index, stage = stage.name(), "Processing stage");
        let generation = &self.generation;
        let history = &self.history;
        let query = stage.query();
        let outcome = with_retry(&self.retry, "generation.complete", move || {
            generation.complete(history.records(), query)
        })
        .await;

        match outcome {
            Ok(response) => {
                self.history.push_exchange(query, response.clone());
                debug!(
                    index,
                    stage = stage.name(),
                    history_len = self.history.len(),
                    "Stage completed"
                );
                Some(response)
            }
            Err(err) => {
                warn!(
                    index,
                    stage = stage.name(),
                    error = %err,
                    "Stage failed after retries, continuing with next stage"
                );
                None
            }
        }
    }
}
