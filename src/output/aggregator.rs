//! Result aggregation
//!
//! The aggregator is the only mutable state shared across a run. Results are
//! appended once and never changed; summaries are computed on demand.

use crate::job::{ErrorKind, JobResult};
use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

/// Statistics for one batch
#[derive(Debug, Clone, PartialEq)]
pub struct BatchSummary {
    pub batch_index: usize,
    pub jobs: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub rate_limited: usize,
    pub mean_duration: Duration,
    /// Time from the first job starting to the last job finishing
    pub wall_time: Duration,
}

impl BatchSummary {
    pub fn success_rate(&self) -> f64 {
        percentage(self.succeeded, self.jobs)
    }
}

/// Statistics for a whole run
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RunSummary {
    pub total_jobs: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub rate_limited: usize,
    pub failed_assets: usize,
    pub artifacts: usize,
    pub mean_duration: Duration,
    /// Sum of all job durations, i.e. the estimated sequential run time
    pub total_job_time: Duration,
    pub wall_time: Duration,
    pub error_breakdown: BTreeMap<ErrorKind, usize>,
    pub batches: Vec<BatchSummary>,
}

impl RunSummary {
    /// Returns the success rate as a percentage
    pub fn success_rate(&self) -> f64 {
        percentage(self.succeeded, self.total_jobs)
    }

    /// Jobs finished per minute of wall time
    pub fn processing_rate(&self) -> f64 {
        let minutes = self.wall_time.as_secs_f64() / 60.0;
        if minutes <= 0.0 {
            return 0.0;
        }
        self.total_jobs as f64 / minutes
    }

    /// Estimated sequential time divided by actual wall time
    pub fn speedup(&self) -> f64 {
        let wall = self.wall_time.as_secs_f64();
        if wall <= 0.0 {
            return 1.0;
        }
        self.total_job_time.as_secs_f64() / wall
    }
}

fn percentage(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        return 0.0;
    }
    (part as f64 / whole as f64) * 100.0
}

fn mean(total: Duration, count: usize) -> Duration {
    if count == 0 {
        return Duration::ZERO;
    }
    total / count as u32
}

#[derive(Debug, Default)]
struct AggregatorState {
    results: Vec<JobResult>,
    batch_wall_times: HashMap<usize, Duration>,
    finished: Option<Duration>,
}

/// Thread-safe, append-only collection of job results
#[derive(Debug)]
pub struct ResultAggregator {
    started: Instant,
    state: Mutex<AggregatorState>,
}

impl Default for ResultAggregator {
    fn default() -> Self {
        Self::new()
    }
}

impl ResultAggregator {
    pub fn new() -> Self {
        Self {
            started: Instant::now(),
            state: Mutex::new(AggregatorState::default()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, AggregatorState> {
        // Results are only ever appended, so a poisoned lock still holds valid data
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Appends a job result
    pub fn record(&self, result: JobResult) {
        self.lock().results.push(result);
    }

    /// Records how long a batch took from dispatch to its last job finishing
    pub fn record_batch_time(&self, batch_index: usize, wall_time: Duration) {
        self.lock().batch_wall_times.insert(batch_index, wall_time);
    }

    /// Freezes the run wall time; later summaries report the same value
    pub fn finish(&self) {
        let elapsed = self.started.elapsed();
        self.lock().finished.get_or_insert(elapsed);
    }

    pub fn len(&self) -> usize {
        self.lock().results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Snapshot of all results, ordered by batch then worker position
    pub fn results(&self) -> Vec<JobResult> {
        let mut results = self.lock().results.clone();
        results.sort_by_key(|r| (r.batch_index, r.credential_index));
        results
    }

    /// Computes run and per-batch statistics
    pub fn summarize(&self) -> RunSummary {
        let state = self.lock();
        let wall_time = state.finished.unwrap_or_else(|| self.started.elapsed());

        let mut summary = RunSummary {
            wall_time,
            ..RunSummary::default()
        };

        let mut by_batch: BTreeMap<usize, Vec<&JobResult>> = BTreeMap::new();
        for result in &state.results {
            summary.total_jobs += 1;
            if result.is_success() {
                summary.succeeded += 1;
            } else {
                summary.failed += 1;
            }
            if result.is_rate_limited() {
                summary.rate_limited += 1;
            }
            if let Some(kind) = result.error_kind {
                *summary.error_breakdown.entry(kind).or_insert(0) += 1;
            }
            summary.failed_assets += result.failed_assets;
            summary.artifacts += result.artifact_paths.len();
            summary.total_job_time += result.duration;
            by_batch.entry(result.batch_index).or_default().push(result);
        }
        summary.mean_duration = mean(summary.total_job_time, summary.total_jobs);

        summary.batches = by_batch
            .into_iter()
            .map(|(batch_index, results)| {
                let total: Duration = results.iter().map(|r| r.duration).sum();
                let longest = results.iter().map(|r| r.duration).max().unwrap_or_default();
                let succeeded = results.iter().filter(|r| r.is_success()).count();
                BatchSummary {
                    batch_index,
                    jobs: results.len(),
                    succeeded,
                    failed: results.len() - succeeded,
                    rate_limited: results.iter().filter(|r| r.is_rate_limited()).count(),
                    mean_duration: mean(total, results.len()),
                    wall_time: state
                        .batch_wall_times
                        .get(&batch_index)
                        .copied()
                        .unwrap_or(longest),
                }
            })
            .collect();

        summary
    }
}
