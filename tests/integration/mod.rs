//! Integration tests for the augur forecast pipeline

mod chain_engine;
mod config_integration;
mod logging_default;
mod pipeline_run;
mod store_integration;
mod test_utils;
