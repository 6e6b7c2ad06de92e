//! Merge rules: defaults first, later sources override earlier ones key by key.

use config::builder::DefaultState;
use config::Config;
use config::ConfigBuilder;
use config::ConfigError;

/// Create a Config builder with the scalar defaults applied.
///
/// Structured defaults (topics, tags) come from the serde defaults of the config structs.
pub fn builder_with_defaults() -> Result<ConfigBuilder<DefaultState>, ConfigError> {
    Config::builder()
        .set_default("pipeline.stop_count", 3)?
        .set_default("retry.max_attempts", 3)?
        .set_default("retry.initial_delay_ms", 1000)?
        .set_default("retry.backoff_factor", 2)?
        .set_default("source.mode", "everything")?
        .set_default("source.language", "en")?
        .set_default("source.page_limit", 100)?
        .set_default("store.path", ".augur/store")?
        .set_default("store.retention_days", 30)
}
