//! CLI output: run summaries and error mapping.

use crate::error::PipelineError;
use crate::pipeline::RunReport;

/// Map a fatal run error to the line printed on stderr.
pub fn map_error(e: &PipelineError) -> String {
    match e {
        PipelineError::Configuration(msg) => format!("Configuration problem: {}", msg),
        other => other.to_string(),
    }
}

/// Human-readable summary of a finished run.
pub fn format_run_report(report: &RunReport) -> String {
    let mut lines = vec![
        format!("Run {}", report.date),
        format!(
            "  chains: {} ({} stages, {} with a forecast)",
            report.chains, report.stages, report.results
        ),
        format!(
            "  records: {} ({} duplicates dropped)",
            report.records.len(),
            report.duplicates
        ),
    ];

    match &report.persist_error {
        None => lines.push(format!("  persisted: {}", report.persisted)),
        Some(err) => lines.push(format!("  persist FAILED: {}", err)),
    }
    for failure in &report.chain_failures {
        lines.push(format!("  chain failure: {}", failure));
    }
    if !report.expired_partitions.is_empty() {
        lines.push(format!(
            "  expired partitions: {}",
            report.expired_partitions.join(", ")
        ));
    }
    for failure in &report.cleanup_failures {
        lines.push(format!("  cleanup failure: {}", failure));
    }
    lines.join("\n")
}
