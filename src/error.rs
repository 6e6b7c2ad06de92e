//! Error types for the Augur forecast pipeline.
//!
//! Each layer owns its error enum. Per-unit failures (a stage, a topic, a text) are absorbed
//! and logged where they happen; only [`PipelineError`] escapes a pipeline run.

use thiserror::Error;

/// A stage that cannot be sent to the generation service.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Stage name is empty")]
    EmptyName,

    #[error("Stage '{0}' has an empty query")]
    EmptyQuery(String),
}

/// Failures of the external capabilities (content source, generation, media).
#[derive(Debug, Clone, Error)]
pub enum ServiceError {
    #[error("Generation failed: {0}")]
    GenerationFailed(String),

    #[error("Media generation failed: {0}")]
    MediaGenerationFailed(String),

    #[error("Content source unavailable: {0}")]
    SourceUnavailable(String),

    #[error("Authentication failed: {0}")]
    AuthFailed(String),

    #[error("Rate limit exceeded: {0}")]
    RateLimited(String),
}

impl ServiceError {
    /// Whether another attempt could succeed. Credentials do not fix themselves.
    pub fn is_retryable(&self) -> bool {
        !matches!(self, ServiceError::AuthFailed(_))
    }
}

/// Document store errors
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("Record encoding failed: {0}")]
    Codec(String),

    #[error("Invalid partition name: {0}")]
    InvalidPartition(String),
}

impl From<sled::Error> for StoreError {
    fn from(err: sled::Error) -> Self {
        StoreError::StoreUnavailable(err.to_string())
    }
}

impl From<bincode::Error> for StoreError {
    fn from(err: bincode::Error) -> Self {
        StoreError::Codec(err.to_string())
    }
}

/// A chain that could not produce an outcome at all.
///
/// Distinct from a chain that ran and produced no result: these are recorded in the
/// chain's output slot by the runner and never abort sibling chains.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChainError {
    #[error("Chain {index} panicked: {message}")]
    Panicked { index: usize, message: String },

    #[error("Chain {index} was cancelled")]
    Cancelled { index: usize },

    #[error("Chain {index} missed the run deadline")]
    DeadlineExceeded { index: usize },
}

/// Fatal errors that abort a whole run.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Service error: {0}")]
    Service(#[from] ServiceError),
}

impl From<config::ConfigError> for PipelineError {
    fn from(err: config::ConfigError) -> Self {
        PipelineError::Configuration(err.to_string())
    }
}
