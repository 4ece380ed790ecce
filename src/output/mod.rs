//! Output module for run reports
//!
//! This module handles:
//! - Aggregating job results into run and batch statistics
//! - Recording completed batches in the run ledger
//! - Exporting results as CSV and a markdown summary
//! - Printing summaries to the console

mod aggregator;
mod csv_report;
mod markdown;
mod sqlite_output;
pub mod stats;
mod traits;

pub use aggregator::{BatchSummary, ResultAggregator, RunSummary};
pub use csv_report::{generate_csv_report, write_csv_report};
pub use markdown::{format_markdown_summary, generate_markdown_summary, RunInfo};
pub use sqlite_output::LedgerSink;
pub use stats::{load_statistics, print_statistics, print_summary, LedgerStatistics};
pub use traits::{OutputError, OutputResult, ResultSink};

use crate::HarvestError;
use std::path::{Path, PathBuf};

/// File name of the CSV report
pub const CSV_REPORT_FILE: &str = "harvest_report.csv";

/// File name of the markdown summary
pub const MARKDOWN_SUMMARY_FILE: &str = "harvest_summary.md";

/// Paths of the reports written for a run
#[derive(Debug, Clone)]
pub struct ReportPaths {
    pub csv: PathBuf,
    pub markdown: PathBuf,
}

/// Writes the CSV report and the markdown summary into `report_dir`
///
/// # Arguments
///
/// * `report_dir` - Directory for the reports (created if missing)
/// * `info` - Run metadata for the summary header
/// * `aggregator` - The collected results
///
/// # Returns
///
/// * `Ok(ReportPaths)` - Both reports were written
/// * `Err(HarvestError)` - Failed to write a report
pub fn write_reports(
    report_dir: &Path,
    info: &RunInfo,
    aggregator: &ResultAggregator,
) -> Result<ReportPaths, HarvestError> {
    std::fs::create_dir_all(report_dir)?;

    let results = aggregator.results();
    let summary = aggregator.summarize();

    let paths = ReportPaths {
        csv: report_dir.join(CSV_REPORT_FILE),
        markdown: report_dir.join(MARKDOWN_SUMMARY_FILE),
    };

    generate_csv_report(&results, &paths.csv)?;
    generate_markdown_summary(info, &summary, &results, &paths.markdown)?;

    tracing::info!(
        "Reports written to {} and {}",
        paths.csv.display(),
        paths.markdown.display()
    );

    Ok(paths)
}
