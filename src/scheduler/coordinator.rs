//! Run coordinator - ties inputs, scheduler, ledger and reports together
//!
//! This module contains the top-level run logic:
//! - Loading the course list and credential pool
//! - Narrowing the course list (lesson filter, failed lessons of the last run, limit)
//! - Opening a ledger run and streaming batch results into it
//! - Writing the reports, including after an interrupted or aborted run

use crate::config::Config;
use crate::fetch::{ApiFetcher, ContentFetcher};
use crate::input::{
    apply_lesson_filter, apply_limit, load_courses, load_lesson_filter, Course, CredentialPool,
};
use crate::output::{write_reports, LedgerSink, ReportPaths, ResultAggregator, ResultSink, RunInfo, RunSummary};
use crate::scheduler::batch::{batch_count, partition};
use crate::scheduler::runner::{BatchScheduler, SchedulerConfig};
use crate::storage::{NewRun, RunStatus, SqliteStorage, Storage};
use crate::transform::DefaultTransformer;
use crate::{ConfigError, HarvestError};
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Command-line adjustments to a configured run
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// Overrides `scheduler.limit`
    pub limit: Option<usize>,
    /// Overrides `scheduler.cooldown-secs`
    pub cooldown_secs: Option<u64>,
    /// Only run lessons that failed in the latest recorded run
    pub retry_failed: bool,
}

/// The inputs of a run after filtering
#[derive(Debug, Clone)]
pub struct RunPlan {
    pub courses: Vec<Course>,
    pub pool: CredentialPool,
    /// Lesson IDs requested by a filter but absent from the course list
    pub missing_lessons: Vec<String>,
}

impl RunPlan {
    pub fn batch_count(&self) -> usize {
        batch_count(self.courses.len(), self.pool.size())
    }

    /// Human-readable batch plan, one line per batch
    pub fn describe(&self) -> Vec<String> {
        partition(&self.courses, self.pool.size())
            .iter()
            .enumerate()
            .map(|(index, batch)| {
                let lessons: Vec<String> = batch
                    .iter()
                    .enumerate()
                    .map(|(position, course)| {
                        format!(
                            "{} -> {}",
                            course.lesson_id,
                            self.pool.masked(position).unwrap_or_default()
                        )
                    })
                    .collect();
                format!("Batch {}: {}", index + 1, lessons.join(", "))
            })
            .collect()
    }
}

/// Outcome of a finished (or stopped) run
#[derive(Debug)]
pub struct RunReport {
    pub run_id: i64,
    pub status: RunStatus,
    pub batches_run: usize,
    pub summary: RunSummary,
    pub reports: ReportPaths,
}

/// Main run coordinator structure
pub struct Coordinator {
    config: Config,
    config_hash: String,
    options: RunOptions,
    storage: Arc<Mutex<SqliteStorage>>,
}

impl Coordinator {
    /// Creates a new coordinator instance
    ///
    /// # Arguments
    ///
    /// * `config` - The validated configuration
    /// * `config_hash` - Hash of the configuration file, recorded in the ledger
    /// * `options` - Command-line overrides
    ///
    /// # Returns
    ///
    /// * `Ok(Coordinator)` - Successfully opened the ledger
    /// * `Err(HarvestError)` - Failed to initialize
    pub fn new(config: Config, config_hash: String, options: RunOptions) -> Result<Self, HarvestError> {
        let storage = SqliteStorage::new(Path::new(&config.output.database_path))?;
        Ok(Self {
            config,
            config_hash,
            options,
            storage: Arc::new(Mutex::new(storage)),
        })
    }

    /// Loads and narrows the run inputs
    pub fn plan(&self) -> Result<RunPlan, HarvestError> {
        let inputs = &self.config.inputs;

        let mut courses = load_courses(Path::new(&inputs.courses_csv))?;
        let pool = CredentialPool::load(Path::new(&inputs.credentials_file))?;
        tracing::info!(
            "Loaded {} courses and {} credentials",
            courses.len(),
            pool.size()
        );

        let mut missing_lessons = Vec::new();
        if let Some(filter_path) = &inputs.lesson_filter {
            let lesson_ids = load_lesson_filter(Path::new(filter_path))?;
            let (filtered, missing) = apply_lesson_filter(courses, &lesson_ids);
            tracing::info!(
                "Lesson filter kept {} of {} requested lessons",
                filtered.len(),
                lesson_ids.len()
            );
            courses = filtered;
            missing_lessons.extend(missing);
        }

        if self.options.retry_failed {
            let failed = self.failed_lessons_of_latest_run()?;
            let (filtered, missing) = apply_lesson_filter(courses, &failed);
            tracing::info!("Retrying {} failed lessons", filtered.len());
            courses = filtered;
            missing_lessons.extend(missing);
        }

        for lesson_id in &missing_lessons {
            tracing::warn!("Lesson {} is not in the course list", lesson_id);
        }

        let courses = apply_limit(courses, self.limit());

        Ok(RunPlan {
            courses,
            pool,
            missing_lessons,
        })
    }

    fn failed_lessons_of_latest_run(&self) -> Result<Vec<String>, HarvestError> {
        let storage = self.lock_storage()?;
        let Some(run) = storage.get_latest_run()? else {
            tracing::warn!("No previous run recorded, nothing to retry");
            return Ok(Vec::new());
        };
        let failed = storage.failed_lesson_ids(run.id)?;
        tracing::info!("Run {} recorded {} failed lessons", run.id, failed.len());
        Ok(failed)
    }

    fn lock_storage(&self) -> Result<std::sync::MutexGuard<'_, SqliteStorage>, HarvestError> {
        self.storage.lock().map_err(|e| {
            HarvestError::Storage(crate::storage::StorageError::Database(format!(
                "Failed to lock storage: {}",
                e
            )))
        })
    }

    fn limit(&self) -> Option<usize> {
        self.options.limit.or(self.config.scheduler.limit)
    }

    fn cooldown(&self) -> Duration {
        Duration::from_secs(
            self.options
                .cooldown_secs
                .unwrap_or(self.config.scheduler.cooldown_secs),
        )
    }

    fn scheduler_config(&self) -> SchedulerConfig {
        let assets = &self.config.assets;
        SchedulerConfig::new(&self.config.output.root_dir)
            .with_cooldown(self.cooldown())
            .with_job_timeout(Duration::from_secs(self.config.scheduler.job_timeout_secs))
            .with_extra_assets(assets.extra.clone())
            .with_fallback_json_count(assets.fallback_json_count)
    }

    /// Runs the harvest with the production fetcher
    pub async fn run(&self, cancel: CancellationToken) -> Result<RunReport, HarvestError> {
        let fetcher = Arc::new(ApiFetcher::new(&self.config.api)?);
        self.run_with_fetcher(fetcher, cancel).await
    }

    /// Runs the harvest
    ///
    /// Reports are written whatever happens once the first batch has been
    /// dispatched. An interrupted run returns `Ok` with status `interrupted`;
    /// a run aborted by a ledger failure returns the error after the reports
    /// have been written.
    pub async fn run_with_fetcher(
        &self,
        fetcher: Arc<dyn ContentFetcher>,
        cancel: CancellationToken,
    ) -> Result<RunReport, HarvestError> {
        let plan = self.plan()?;
        if plan.courses.is_empty() {
            return Err(ConfigError::Validation("No courses left to process".to_string()).into());
        }

        let pool_size = plan.pool.size();
        let batches = plan.batch_count();

        let run_id = self.lock_storage()?.create_run(&NewRun {
            config_hash: self.config_hash.clone(),
            course_count: plan.courses.len(),
            batch_count: batches,
            pool_size,
        })?;
        tracing::info!(
            "Starting run {}: {} courses, {} batches, pool of {}",
            run_id,
            plan.courses.len(),
            batches,
            pool_size
        );

        let sink = Arc::new(LedgerSink::new(self.storage.clone(), run_id));
        let transformer = Arc::new(DefaultTransformer::new(self.config.assets.min_image_bytes));
        let scheduler = BatchScheduler::new(
            plan.courses,
            Arc::new(plan.pool),
            fetcher,
            transformer,
            // The plan is already limited
            self.scheduler_config(),
        )
        .with_sink(sink.clone())
        .with_cancellation_token(cancel);

        let aggregator = ResultAggregator::new();
        let outcome = scheduler.run(&aggregator).await;

        let status = match &outcome {
            Ok(_) => RunStatus::Completed,
            Err(HarvestError::Interrupted { .. }) => RunStatus::Interrupted,
            Err(_) => RunStatus::Failed,
        };
        if let Err(e) = sink.finalize(status) {
            tracing::error!("Failed to finalize run {}: {}", run_id, e);
        }

        let started_at = self
            .lock_storage()?
            .get_run(run_id)
            .map(|run| run.started_at)
            .unwrap_or_default();
        let info = RunInfo {
            run_id: Some(run_id),
            started_at,
            status: status.to_db_string().to_string(),
            config_hash: self.config_hash.clone(),
            pool_size,
            cooldown_secs: self.cooldown().as_secs(),
        };
        let reports = write_reports(Path::new(&self.config.output.report_dir), &info, &aggregator)?;

        let batches_run = match outcome {
            Ok(count) => count,
            Err(HarvestError::Interrupted { completed_batches }) => {
                tracing::warn!("Run {} interrupted after {} batches", run_id, completed_batches);
                completed_batches
            }
            Err(e) => {
                tracing::error!("Run {} aborted: {}", run_id, e);
                return Err(e);
            }
        };

        Ok(RunReport {
            run_id,
            status,
            batches_run,
            summary: aggregator.summarize(),
            reports,
        })
    }
}
