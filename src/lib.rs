//! Augur: staged news forecasting
//!
//! For every topic, a short sequence of articles is fed one by one into a conversational
//! completion service that carries its own earlier predictions forward. The final prediction
//! of each chain becomes an identity-keyed record in a date-partitioned document store.
//!
//! The engine lives in [`chain`], [`aggregate`] and [`pipeline`] and only talks to the outside
//! world through the capability traits in [`source`], [`provider`] and [`store`].

pub mod aggregate;
pub mod chain;
pub mod cli;
pub mod config;
pub mod error;
pub mod http;
pub mod logging;
pub mod pipeline;
pub mod provider;
pub mod record;
pub mod source;
pub mod store;
#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use aggregate::{AggregateInput, LabelExtractor, ResultAggregator, StopwordLabelExtractor};
pub use chain::{ChainBuilder, ChainWorker, ConcurrentRunner, History, RetryPolicy, Stage};
pub use error::{ChainError, PipelineError, ServiceError, StoreError, ValidationError};
pub use pipeline::{Capabilities, Pipeline, PipelineSettings, RunPhase, RunReport};
pub use record::{Media, Record, RecordId, RecordSet};
