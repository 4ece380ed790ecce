//! Console statistics
//!
//! This module prints run summaries to stdout, either for the run that just
//! finished or for the latest run recorded in the ledger.

use crate::job::{ErrorKind, JobStatus};
use crate::output::aggregator::RunSummary;
use crate::storage::{RunRecord, Storage};
use crate::HarvestError;
use std::collections::BTreeMap;

/// Statistics of a recorded run, loaded from the ledger
#[derive(Debug, Clone)]
pub struct LedgerStatistics {
    pub run: RunRecord,
    pub recorded_jobs: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub error_summary: BTreeMap<ErrorKind, usize>,
    pub mean_duration_secs: f64,
    pub failed_lessons: Vec<String>,
}

impl LedgerStatistics {
    pub fn success_rate(&self) -> f64 {
        if self.recorded_jobs == 0 {
            return 0.0;
        }
        (self.succeeded as f64 / self.recorded_jobs as f64) * 100.0
    }
}

/// Loads statistics for the latest run
///
/// # Returns
///
/// * `Ok(Some(LedgerStatistics))` - Statistics of the latest run
/// * `Ok(None)` - The ledger holds no runs
/// * `Err(HarvestError)` - Failed to query the ledger
pub fn load_statistics(storage: &dyn Storage) -> Result<Option<LedgerStatistics>, HarvestError> {
    let Some(run) = storage.get_latest_run()? else {
        return Ok(None);
    };

    let records = storage.get_run_results(run.id)?;

    let mut error_summary = BTreeMap::new();
    let mut failed_lessons = Vec::new();
    let mut succeeded = 0;
    let mut total_ms: u64 = 0;

    for record in &records {
        total_ms += record.duration_ms;
        match record.status {
            JobStatus::Success => succeeded += 1,
            JobStatus::Failure => failed_lessons.push(record.lesson_id.clone()),
        }
        if let Some(kind) = record.error_kind {
            *error_summary.entry(kind).or_insert(0) += 1;
        }
    }

    let mean_duration_secs = if records.is_empty() {
        0.0
    } else {
        total_ms as f64 / records.len() as f64 / 1000.0
    };

    Ok(Some(LedgerStatistics {
        recorded_jobs: records.len(),
        succeeded,
        failed: records.len() - succeeded,
        error_summary,
        mean_duration_secs,
        failed_lessons,
        run,
    }))
}

/// Prints ledger statistics to stdout in a formatted manner
pub fn print_statistics(stats: &LedgerStatistics) {
    println!("=== Harvest Statistics ===\n");

    println!("Run {}:", stats.run.id);
    println!("  Started: {}", stats.run.started_at);
    if let Some(finished) = &stats.run.finished_at {
        println!("  Finished: {}", finished);
    }
    println!("  Status: {}", stats.run.status.to_db_string());
    println!(
        "  Planned: {} courses in {} batches (pool of {})",
        stats.run.course_count, stats.run.batch_count, stats.run.pool_size
    );
    println!();

    println!("Jobs:");
    println!("  Recorded: {}", stats.recorded_jobs);
    println!("  Succeeded: {}", stats.succeeded);
    println!("  Failed: {}", stats.failed);
    println!("  Mean duration: {:.1}s", stats.mean_duration_secs);
    println!();

    if !stats.error_summary.is_empty() {
        println!("Error Summary:");
        let mut error_counts: Vec<_> = stats.error_summary.iter().collect();
        error_counts.sort_by(|a, b| b.1.cmp(a.1));

        for (kind, count) in error_counts {
            println!("  {}: {}", kind, count);
        }
        println!();
    }

    if !stats.failed_lessons.is_empty() {
        println!("Failed Lessons ({}):", stats.failed_lessons.len());
        for lesson in &stats.failed_lessons {
            println!("  - {}", lesson);
        }
        println!();
    }

    println!(
        "Success Rate: {:.1}% ({} / {} jobs)",
        stats.success_rate(),
        stats.succeeded,
        stats.recorded_jobs
    );
}

/// Prints the summary of the run that just finished
pub fn print_summary(summary: &RunSummary) {
    println!("\n=== Harvest Summary ===\n");
    println!("  Jobs: {}", summary.total_jobs);
    println!(
        "  Succeeded: {} ({:.1}%)",
        summary.succeeded,
        summary.success_rate()
    );
    println!("  Failed: {}", summary.failed);
    println!("  Rate limited: {}", summary.rate_limited);
    println!("  Failed assets: {}", summary.failed_assets);
    println!("  Mean job duration: {:.1}s", summary.mean_duration.as_secs_f64());
    println!(
        "  Wall time: {:.1}s ({:.2} jobs/min, {:.2}x vs sequential)",
        summary.wall_time.as_secs_f64(),
        summary.processing_rate(),
        summary.speedup()
    );

    if !summary.error_breakdown.is_empty() {
        println!("\n  Errors:");
        for (kind, count) in &summary.error_breakdown {
            println!("    {}: {}", kind, count);
        }
    }

    if summary.batches.len() > 1 {
        println!("\n  Batches:");
        for batch in &summary.batches {
            println!(
                "    #{}: {}/{} ok, {} rate limited, {:.1}s",
                batch.batch_index + 1,
                batch.succeeded,
                batch.jobs,
                batch.rate_limited,
                batch.wall_time.as_secs_f64()
            );
        }
    }
    println!();
}
