//! Integration tests for Configuration System

use super::test_utils::with_isolated_env;
use augur::config::{ConfigLoader, ConfigValidationError};
use augur::pipeline::PipelineSettings;
use augur::source::{SourceMode, TopicQuery};
use std::time::Duration;
use tempfile::TempDir;

#[test]
fn test_config_file_drives_pipeline_settings() {
    let temp_dir = TempDir::new().unwrap();
    let config_file = temp_dir.path().join("augur.toml");

    std::fs::write(
        &config_file,
        r#"
[pipeline]
topics = [["gold"], ["oil", "opec"]]
stop_count = 2
record_tags = ["forecast", "commodities"]
run_deadline_secs = 120

[retry]
max_attempts = 4
initial_delay_ms = 250
backoff_factor = 3

[generation]
api_key = "sk-test"

[source]
api_key = "news-test"
mode = "headlines"
page_limit = 20
"#,
    )
    .unwrap();

    let config = with_isolated_env(&temp_dir, |_| ConfigLoader::load_from_file(&config_file)).unwrap();
    assert!(config.validate().is_ok());

    let settings = PipelineSettings::from_config(&config);
    assert_eq!(
        settings.topics,
        vec![TopicQuery::new(["gold"]), TopicQuery::new(["oil", "opec"])]
    );
    assert_eq!(settings.max_depth, 2);
    assert_eq!(settings.mode, SourceMode::Headlines);
    assert_eq!(settings.page_limit, 20);
    assert_eq!(settings.run_deadline, Some(Duration::from_secs(120)));
    assert_eq!(settings.retry.max_attempts, 4);
    assert_eq!(settings.retry.delay_after(1), Duration::from_millis(750));
    assert_eq!(
        settings.record_tags,
        vec!["forecast".to_string(), "commodities".to_string()]
    );
}

#[test]
fn test_workspace_layers_override_global_file() {
    let temp_dir = TempDir::new().unwrap();
    let workspace = temp_dir.path().join("ws");
    std::fs::create_dir_all(workspace.join("config")).unwrap();
    std::fs::write(
        workspace.join("config").join("config.toml"),
        "[pipeline]\nstop_count = 4\n[store]\nretention_days = 7\n",
    )
    .unwrap();
    std::fs::write(
        workspace.join("config").join("production.toml"),
        "[pipeline]\nstop_count = 6\n",
    )
    .unwrap();

    let config = with_isolated_env(&temp_dir, |home| {
        let global_dir = home.join(".config").join("augur");
        std::fs::create_dir_all(&global_dir).unwrap();
        std::fs::write(
            global_dir.join("config.toml"),
            "[pipeline]\nstop_count = 9\n[source]\nlanguage = \"de\"\n",
        )
        .unwrap();

        std::env::set_var("AUGUR_ENV", "production");
        ConfigLoader::load(&workspace)
    })
    .unwrap();

    assert_eq!(config.pipeline.stop_count, 6);
    assert_eq!(config.store.retention_days, 7);
    assert_eq!(config.source.language, "de");
}

#[test]
fn test_api_keys_fall_back_to_environment() {
    let temp_dir = TempDir::new().unwrap();
    let workspace = temp_dir.path().join("ws");
    std::fs::create_dir_all(&workspace).unwrap();

    let config = with_isolated_env(&temp_dir, |_| {
        std::env::set_var("OPENAI_API_KEY", "sk-from-env");
        std::env::set_var("NEWSAPI_KEY", "news-from-env");
        ConfigLoader::load(&workspace)
    })
    .unwrap();

    assert_eq!(config.generation.api_key.as_deref(), Some("sk-from-env"));
    assert_eq!(config.source.api_key.as_deref(), Some("news-from-env"));
    assert!(config.validate().is_ok());
}

#[test]
fn test_missing_keys_reported_together() {
    let temp_dir = TempDir::new().unwrap();
    let workspace = temp_dir.path().join("ws");
    std::fs::create_dir_all(&workspace).unwrap();

    let config = with_isolated_env(&temp_dir, |_| ConfigLoader::load(&workspace)).unwrap();
    let errors = config.validate().unwrap_err();

    assert!(errors
        .iter()
        .any(|e| matches!(e, ConfigValidationError::Generation(msg) if msg.contains("api_key"))));
    assert!(errors
        .iter()
        .any(|e| matches!(e, ConfigValidationError::Source(msg) if msg.contains("api_key"))));
}

#[test]
fn test_config_validation_errors() {
    let temp_dir = TempDir::new().unwrap();
    let config_file = temp_dir.path().join("augur.toml");
    std::fs::write(
        &config_file,
        r#"
[pipeline]
topics = []
stop_count = 0

[retry]
max_attempts = 0

[generation]
api_key = "sk-test"

[source]
api_key = "news-test"
"#,
    )
    .unwrap();

    let config = with_isolated_env(&temp_dir, |_| ConfigLoader::load_from_file(&config_file)).unwrap();
    let errors = config.validate().unwrap_err();

    assert_eq!(
        errors
            .iter()
            .filter(|e| matches!(e, ConfigValidationError::Pipeline(_)))
            .count(),
        2
    );
    assert!(errors
        .iter()
        .any(|e| matches!(e, ConfigValidationError::Retry(_))));
}
