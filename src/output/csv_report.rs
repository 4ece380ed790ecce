//! Tabular export of job results

use crate::job::JobResult;
use crate::output::traits::OutputResult;
use serde::Serialize;
use std::io::Write;
use std::path::Path;

/// Column names, in `ReportRow` field order
const HEADER: [&str; 11] = [
    "course_id",
    "lesson_id",
    "status",
    "error_kind",
    "error_detail",
    "duration_secs",
    "batch_index",
    "credential_index",
    "credential",
    "artifact_count",
    "failed_assets",
];

/// One row of the CSV report
#[derive(Debug, Serialize)]
struct ReportRow<'a> {
    course_id: &'a str,
    lesson_id: &'a str,
    status: &'static str,
    error_kind: Option<&'static str>,
    error_detail: Option<&'a str>,
    duration_secs: String,
    batch_index: usize,
    credential_index: usize,
    credential: &'a str,
    artifact_count: usize,
    failed_assets: usize,
}

impl<'a> From<&'a JobResult> for ReportRow<'a> {
    fn from(result: &'a JobResult) -> Self {
        Self {
            course_id: &result.course_id,
            lesson_id: &result.lesson_id,
            status: result.status.to_db_string(),
            error_kind: result.error_kind.map(|k| k.to_db_string()),
            error_detail: result.error_detail.as_deref(),
            duration_secs: format!("{:.2}", result.duration.as_secs_f64()),
            // Reported 1-based, like the log lines
            batch_index: result.batch_index + 1,
            credential_index: result.credential_index,
            credential: &result.credential_label,
            artifact_count: result.artifact_paths.len(),
            failed_assets: result.failed_assets,
        }
    }
}

/// Writes results as CSV with a header row
///
/// The header is written even when there are no results.
pub fn write_csv_report<W: Write>(results: &[JobResult], writer: W) -> OutputResult<()> {
    let mut csv_writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(writer);
    csv_writer.write_record(HEADER)?;
    for result in results {
        csv_writer.serialize(ReportRow::from(result))?;
    }
    csv_writer.flush()?;
    Ok(())
}

/// Writes the CSV report to a file
pub fn generate_csv_report(results: &[JobResult], output_path: &Path) -> OutputResult<()> {
    let file = std::fs::File::create(output_path)?;
    write_csv_report(results, file)
}
