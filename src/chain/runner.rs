//! Concurrent chain runner.
//!
//! One tokio task per non-empty chain, each with its own [`ChainWorker`] and history, joined
//! at a single barrier. Output slot `i` always belongs to input chain `i`.

use crate::chain::retry::RetryPolicy;
use crate::chain::stage::Stage;
use crate::chain::worker::ChainWorker;
use crate::error::ChainError;
use crate::provider::GenerationService;
use futures::future::join_all;
use std::any::Any;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinError;
use tokio::time::{timeout_at, Instant};
use tracing::{error, info, warn};

/// Outcome of one chain: its final result, or why it produced no outcome at all
pub type ChainOutcome = Result<Option<String>, ChainError>;

pub struct ConcurrentRunner {
    generation: Arc<dyn GenerationService>,
    retry: RetryPolicy,
    deadline: Option<Duration>,
}

impl ConcurrentRunner {
    pub fn new(generation: Arc<dyn GenerationService>, retry: RetryPolicy) -> Self {
        Self {
            generation,
            retry,
            deadline: None,
        }
    }

    /// Bound the whole run. Chains still working when it passes are abandoned.
    pub fn with_deadline(mut self, deadline: Option<Duration>) -> Self {
        self.deadline = deadline;
        self
    }

    /// Run every chain concurrently and wait for all of them.
    pub async fn run_all(&self, chains: Vec<Vec<Stage>>) -> Vec<ChainOutcome> {
        let deadline = self.deadline.map(|window| Instant::now() + window);
        let total = chains.len();

        let handles: Vec<_> = chains
            .into_iter()
            .enumerate()
            .map(|(index, stages)| {
                if stages.is_empty() {
                    return None;
                }
                let generation = Arc::clone(&self.generation);
                let retry = self.retry.clone();
                Some(tokio::spawn(async move {
                    let mut worker = ChainWorker::new(generation, retry);
                    match deadline {
                        Some(at) => timeout_at(at, worker.run(&stages))
                            .await
                            .map_err(|_| ChainError::DeadlineExceeded { index }),
                        None => Ok(worker.run(&stages).await),
                    }
                }))
            })
            .collect();

        let dispatched = handles.iter().filter(|handle| handle.is_some()).count();
        info!(chains = total, dispatched, "Chains dispatched");

        let outcomes = join_all(handles.into_iter().enumerate().map(|(index, handle)| async move {
            match handle {
                None => Ok(None),
                Some(handle) => handle
                    .await
                    .unwrap_or_else(|err| Err(chain_error(index, err))),
            }
        }))
        .await;

        for err in outcomes.iter().filter_map(|outcome| outcome.as_ref().err()) {
            match err {
                ChainError::Panicked { .. } => error!(error = %err, "Chain aborted"),
                _ => warn!(error = %err, "Chain produced no outcome"),
            }
        }
        info!(
            chains = total,
            results = outcomes.iter().filter(|o| matches!(o, Ok(Some(_)))).count(),
            "All chains joined"
        );
        outcomes
    }
}

fn chain_error(index: usize, err: JoinError) -> ChainError {
    if err.is_panic() {
        ChainError::Panicked {
            index,
            message: panic_message(err.into_panic()),
        }
    } else {
        ChainError::Cancelled { index }
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}
