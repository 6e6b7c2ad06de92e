//! Config loading: merges every source into an [`AugurConfig`].

use super::merge::merge_policy;
use super::sources::{environment, global_file, workspace_file};
use super::AugurConfig;
use config::{ConfigError, File};
use std::path::{Path, PathBuf};
use tracing::debug;

pub const OPENAI_KEY_VAR: &str = "OPENAI_API_KEY";
pub const NEWSAPI_KEY_VAR: &str = "NEWSAPI_KEY";

pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration for a run started in `workspace_root`.
    ///
    /// Precedence (lowest to highest): defaults, `~/.config/augur/config.toml`,
    /// `config/config.toml`, `config/{AUGUR_ENV}.toml`, `AUGUR__*` environment variables.
    pub fn load(workspace_root: &Path) -> Result<AugurConfig, ConfigError> {
        let builder = merge_policy::builder_with_defaults()?;
        let builder = global_file::add_to_builder(builder)?;
        let builder = workspace_file::add_to_builder(builder, workspace_root)?;
        let builder = environment::add_to_builder(builder);

        let mut config: AugurConfig = builder.build()?.try_deserialize()?;
        apply_key_fallbacks(&mut config);
        debug!(workspace = %workspace_root.display(), "Configuration loaded");
        Ok(config)
    }

    /// Load a single file on top of the defaults. Environment variables are not consulted
    /// except for the API key fallbacks.
    pub fn load_from_file(path: &Path) -> Result<AugurConfig, ConfigError> {
        let mut config: AugurConfig = merge_policy::builder_with_defaults()?
            .add_source(File::from(path))
            .build()?
            .try_deserialize()?;
        apply_key_fallbacks(&mut config);
        Ok(config)
    }

    pub fn xdg_config_path() -> Option<PathBuf> {
        global_file::global_config_path()
    }

    /// Defaults only.
    pub fn defaults() -> Result<AugurConfig, ConfigError> {
        merge_policy::builder_with_defaults()?.build()?.try_deserialize()
    }
}

fn apply_key_fallbacks(config: &mut AugurConfig) {
    fill_from_env(&mut config.generation.api_key, OPENAI_KEY_VAR);
    fill_from_env(&mut config.source.api_key, NEWSAPI_KEY_VAR);
}

fn fill_from_env(key: &mut Option<String>, var: &str) {
    if key.as_deref().map_or(true, |k| k.trim().is_empty()) {
        if let Ok(value) = std::env::var(var) {
            if !value.trim().is_empty() {
                debug!(var, "API key taken from environment");
                *key = Some(value);
            }
        }
    }
}
