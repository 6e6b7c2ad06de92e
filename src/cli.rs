//! CLI domain: parse, route and output only. The pipeline itself lives in `crate::pipeline`.

mod output;
mod parse;
mod route;

pub use output::{format_run_report, map_error};
pub use parse::{Cli, Commands};
pub use route::{apply_run_overrides, build_capabilities, RunContext};
