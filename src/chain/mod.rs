//! Staged orchestration engine: stages, histories, workers and the concurrent runner.

pub mod builder;
pub mod history;
pub mod retry;
pub mod runner;
pub mod stage;
pub mod worker;

pub use builder::ChainBuilder;
pub use history::{History, HistoryRecord, Role};
pub use retry::{with_retry, RetryPolicy};
pub use runner::{ChainOutcome, ConcurrentRunner};
pub use stage::{PromptFraming, Stage};
pub use worker::ChainWorker;
