//! Batch execution
//!
//! Runs the course list batch by batch. Within a batch every course gets its
//! own task and the credential matching its position; the next batch starts
//! only after every task of the current one has been joined.

use crate::fetch::ContentFetcher;
use crate::input::{apply_limit, Course, CredentialPool};
use crate::job::{truncate_detail, ErrorKind, JobContext, JobResult, JobSettings, JobStatus, JobUnit};
use crate::output::{ResultAggregator, ResultSink};
use crate::scheduler::batch::partition;
use crate::scheduler::cooldown::{BatchOutcome, CooldownPolicy, FixedCooldown, DEFAULT_COOLDOWN};
use crate::transform::ContentTransformer;
use crate::HarvestError;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::JoinError;
use tokio_util::sync::CancellationToken;

/// Default limit on a single job's run time
pub const DEFAULT_JOB_TIMEOUT: Duration = Duration::from_secs(900);

/// Parameters of a scheduler run
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    pub limit: Option<usize>,
    pub cooldown: Duration,
    pub job_timeout: Duration,
    pub output_root: PathBuf,
    pub extra_assets: Vec<String>,
    pub fallback_json_count: u32,
}

impl SchedulerConfig {
    pub fn new(output_root: impl Into<PathBuf>) -> Self {
        Self {
            limit: None,
            cooldown: DEFAULT_COOLDOWN,
            job_timeout: DEFAULT_JOB_TIMEOUT,
            output_root: output_root.into(),
            extra_assets: vec!["assets/js/CPM.js".to_string(), "project.txt".to_string()],
            fallback_json_count: 50,
        }
    }

    pub fn with_limit(mut self, limit: Option<usize>) -> Self {
        self.limit = limit;
        self
    }

    pub fn with_cooldown(mut self, cooldown: Duration) -> Self {
        self.cooldown = cooldown;
        self
    }

    pub fn with_job_timeout(mut self, job_timeout: Duration) -> Self {
        self.job_timeout = job_timeout;
        self
    }

    pub fn with_extra_assets(mut self, extra_assets: Vec<String>) -> Self {
        self.extra_assets = extra_assets;
        self
    }

    pub fn with_fallback_json_count(mut self, count: u32) -> Self {
        self.fallback_json_count = count;
        self
    }

    fn job_settings(&self) -> JobSettings {
        JobSettings {
            output_root: self.output_root.clone(),
            job_timeout: self.job_timeout,
            extra_assets: self.extra_assets.clone(),
            fallback_json_count: self.fallback_json_count,
        }
    }
}

/// Runs courses in sequential batches sized to the credential pool
pub struct BatchScheduler {
    courses: Vec<Course>,
    pool: Arc<CredentialPool>,
    context: JobContext,
    cooldown: Arc<dyn CooldownPolicy>,
    sink: Option<Arc<dyn ResultSink>>,
    cancel: CancellationToken,
}

impl BatchScheduler {
    /// Creates a scheduler; the course limit is applied here
    pub fn new(
        courses: Vec<Course>,
        pool: Arc<CredentialPool>,
        fetcher: Arc<dyn ContentFetcher>,
        transformer: Arc<dyn ContentTransformer>,
        config: SchedulerConfig,
    ) -> Self {
        let courses = apply_limit(courses, config.limit);
        Self {
            courses,
            pool,
            context: JobContext {
                fetcher,
                transformer,
                settings: Arc::new(config.job_settings()),
            },
            cooldown: Arc::new(FixedCooldown::new(config.cooldown)),
            sink: None,
            cancel: CancellationToken::new(),
        }
    }

    /// Replaces the fixed cooldown with another policy
    pub fn with_cooldown_policy(mut self, policy: Arc<dyn CooldownPolicy>) -> Self {
        self.cooldown = policy;
        self
    }

    /// Sends every completed batch to `sink` as well as the aggregator
    pub fn with_sink(mut self, sink: Arc<dyn ResultSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    /// Uses an externally owned token to stop the run between batches
    pub fn with_cancellation_token(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn courses(&self) -> &[Course] {
        &self.courses
    }

    pub fn batches(&self) -> Vec<&[Course]> {
        partition(&self.courses, self.pool.size())
    }

    /// Runs every batch, recording results into `aggregator`
    ///
    /// # Returns
    ///
    /// * `Ok(usize)` - Number of batches run
    /// * `Err(HarvestError::Interrupted)` - Stopped between batches
    /// * `Err(HarvestError)` - The result sink failed; the run was aborted
    ///
    /// Whatever the outcome, every result of a completed batch is in the
    /// aggregator when this returns.
    pub async fn run(&self, aggregator: &ResultAggregator) -> Result<usize, HarvestError> {
        let outcome = self.run_batches(aggregator).await;
        aggregator.finish();
        outcome
    }

    async fn run_batches(&self, aggregator: &ResultAggregator) -> Result<usize, HarvestError> {
        let batches = self.batches();
        let total = batches.len();

        tracing::info!(
            "Running {} courses in {} batches of up to {}",
            self.courses.len(),
            total,
            self.pool.size()
        );

        for (batch_index, batch) in batches.into_iter().enumerate() {
            if self.cancel.is_cancelled() {
                tracing::warn!("Stop requested, skipping the remaining {} batches", total - batch_index);
                return Err(HarvestError::Interrupted {
                    completed_batches: batch_index,
                });
            }

            tracing::info!("Batch {}/{}: {} jobs", batch_index + 1, total, batch.len());

            let started = Instant::now();
            let results = self.run_batch(batch_index, batch).await;
            let wall_time = started.elapsed();

            let outcome = BatchOutcome::from_results(batch_index, &results);
            tracing::info!(
                "Batch {}/{} done in {:.1}s: {} ok, {} failed, {} rate limited",
                batch_index + 1,
                total,
                wall_time.as_secs_f64(),
                outcome.jobs - outcome.failed,
                outcome.failed,
                outcome.rate_limited
            );

            let sunk = match &self.sink {
                Some(sink) => sink.record_batch(batch_index, &results),
                None => Ok(()),
            };
            aggregator.record_batch_time(batch_index, wall_time);
            for result in results {
                aggregator.record(result);
            }
            sunk?;

            if batch_index + 1 < total {
                let pause = self.cooldown.cooldown_after(&outcome);
                if !pause.is_zero() {
                    tracing::info!("Cooling down for {:.1}s", pause.as_secs_f64());
                    tokio::select! {
                        _ = tokio::time::sleep(pause) => {}
                        _ = self.cancel.cancelled() => {
                            tracing::warn!("Stop requested during cooldown");
                            return Err(HarvestError::Interrupted {
                                completed_batches: batch_index + 1,
                            });
                        }
                    }
                }
            }
        }

        Ok(total)
    }

    /// Runs one batch to completion; never fails
    async fn run_batch(&self, batch_index: usize, batch: &[Course]) -> Vec<JobResult> {
        let mut handles = Vec::with_capacity(batch.len());

        for (position, course) in batch.iter().enumerate() {
            let Some(credential) = self.pool.get(position) else {
                // partition() never produces batches larger than the pool
                handles.push((course, None));
                continue;
            };
            let unit = JobUnit::new(
                course.clone(),
                credential.clone(),
                batch_index,
                position,
                self.context.clone(),
            );
            handles.push((course, Some(tokio::spawn(unit.run()))));
        }

        let mut results = Vec::with_capacity(handles.len());
        for (position, (course, handle)) in handles.into_iter().enumerate() {
            let result = match handle {
                Some(handle) => match handle.await {
                    Ok(result) => result,
                    Err(e) => {
                        tracing::error!("Job task for lesson {} did not complete: {}", course.lesson_id, e);
                        self.failed_task_result(course, batch_index, position, &task_failure(&e))
                    }
                },
                None => self.failed_task_result(
                    course,
                    batch_index,
                    position,
                    "no credential for worker position",
                ),
            };
            results.push(result);
        }

        results
    }

    fn failed_task_result(
        &self,
        course: &Course,
        batch_index: usize,
        position: usize,
        message: &str,
    ) -> JobResult {
        let error = HarvestError::Task {
            lesson_id: course.lesson_id.clone(),
            message: message.to_string(),
        };
        JobResult {
            course_id: course.course_id.clone(),
            lesson_id: course.lesson_id.clone(),
            slug: course.slug.clone(),
            status: JobStatus::Failure,
            error_kind: Some(ErrorKind::Internal),
            error_detail: Some(truncate_detail(&error.to_string())),
            duration: Duration::ZERO,
            batch_index,
            credential_index: position,
            credential_label: self.pool.masked(position).unwrap_or_default(),
            artifact_paths: Vec::new(),
            failed_assets: 0,
        }
    }
}

fn task_failure(error: &JoinError) -> String {
    if error.is_panic() {
        "job panicked".to_string()
    } else {
        error.to_string()
    }
}
