//! Markdown summary generation
//!
//! This module generates human-readable markdown summaries of a harvest run,
//! including overall and per-batch statistics and the failed jobs.

use crate::job::JobResult;
use crate::output::aggregator::RunSummary;
use crate::output::traits::OutputResult;
use std::fs::File;
use std::io::Write;
use std::path::Path;

/// Run metadata shown at the top of the summary
#[derive(Debug, Clone, Default)]
pub struct RunInfo {
    pub run_id: Option<i64>,
    pub started_at: String,
    pub status: String,
    pub config_hash: String,
    pub pool_size: usize,
    pub cooldown_secs: u64,
}

/// Generates a markdown summary file
///
/// # Arguments
///
/// * `info` - Run metadata
/// * `summary` - The aggregated statistics
/// * `results` - All job results, in export order
/// * `output_path` - Path where the markdown file should be written
pub fn generate_markdown_summary(
    info: &RunInfo,
    summary: &RunSummary,
    results: &[JobResult],
    output_path: &Path,
) -> OutputResult<()> {
    let markdown = format_markdown_summary(info, summary, results);

    let mut file = File::create(output_path)?;
    file.write_all(markdown.as_bytes())?;

    Ok(())
}

/// Formats a run summary as markdown
pub fn format_markdown_summary(info: &RunInfo, summary: &RunSummary, results: &[JobResult]) -> String {
    let mut md = String::new();

    md.push_str("# Course Harvest Summary\n\n");

    md.push_str("## Run Information\n\n");
    if let Some(run_id) = info.run_id {
        md.push_str(&format!("- **Run ID**: {}\n", run_id));
    }
    md.push_str(&format!("- **Started**: {}\n", info.started_at));
    md.push_str(&format!("- **Status**: {}\n", info.status));
    md.push_str(&format!("- **Credential Pool**: {}\n", info.pool_size));
    md.push_str(&format!("- **Cooldown**: {}s\n", info.cooldown_secs));
    md.push_str(&format!("- **Config Hash**: {}\n\n", info.config_hash));

    md.push_str("## Overall Statistics\n\n");
    md.push_str(&format!("- **Total Jobs**: {}\n", summary.total_jobs));
    md.push_str(&format!("- **Succeeded**: {}\n", summary.succeeded));
    md.push_str(&format!("- **Failed**: {}\n", summary.failed));
    md.push_str(&format!("- **Rate Limited**: {}\n", summary.rate_limited));
    md.push_str(&format!("- **Success Rate**: {:.2}%\n", summary.success_rate()));
    md.push_str(&format!("- **Artifacts Written**: {}\n", summary.artifacts));
    md.push_str(&format!("- **Failed Assets**: {}\n", summary.failed_assets));
    md.push_str(&format!(
        "- **Mean Job Duration**: {:.2}s\n",
        summary.mean_duration.as_secs_f64()
    ));
    md.push_str(&format!(
        "- **Wall Time**: {:.2} seconds ({:.2} minutes)\n",
        summary.wall_time.as_secs_f64(),
        summary.wall_time.as_secs_f64() / 60.0
    ));
    md.push_str(&format!(
        "- **Processing Rate**: {:.2} jobs/minute\n",
        summary.processing_rate()
    ));
    md.push_str(&format!(
        "- **Speedup vs Sequential**: {:.2}x\n\n",
        summary.speedup()
    ));

    if !summary.batches.is_empty() {
        md.push_str("## Batches\n\n");
        md.push_str("| Batch | Jobs | Succeeded | Failed | Rate Limited | Mean Duration | Wall Time |\n");
        md.push_str("|-------|------|-----------|--------|--------------|---------------|-----------|\n");
        for batch in &summary.batches {
            md.push_str(&format!(
                "| {} | {} | {} | {} | {} | {:.2}s | {:.2}s |\n",
                batch.batch_index + 1,
                batch.jobs,
                batch.succeeded,
                batch.failed,
                batch.rate_limited,
                batch.mean_duration.as_secs_f64(),
                batch.wall_time.as_secs_f64()
            ));
        }
        md.push('\n');
    }

    if !summary.error_breakdown.is_empty() {
        md.push_str("## Error Summary\n\n");
        md.push_str("| Error Type | Count |\n");
        md.push_str("|------------|-------|\n");
        for (kind, count) in &summary.error_breakdown {
            md.push_str(&format!("| {} | {} |\n", kind, count));
        }
        md.push('\n');
    }

    let failures: Vec<&JobResult> = results.iter().filter(|r| !r.is_success()).collect();
    if !failures.is_empty() {
        md.push_str("## Failed Jobs\n\n");
        md.push_str("| Lesson | Course | Batch | Kind | Detail |\n");
        md.push_str("|--------|--------|-------|------|--------|\n");
        for result in failures {
            md.push_str(&format!(
                "| {} | {} | {} | {} | {} |\n",
                result.lesson_id,
                result.course_id,
                result.batch_index + 1,
                result
                    .error_kind
                    .map(|k| k.to_string())
                    .unwrap_or_default(),
                result
                    .error_detail
                    .as_deref()
                    .unwrap_or("")
                    .replace('|', "\\|")
            ));
        }
        md.push('\n');
    }

    md
}
