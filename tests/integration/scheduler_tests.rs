//! Batch scheduler behavior

use crate::common::{courses, pool, MockFetcher, SIMPLE_MANIFEST};
use course_harvest::job::ErrorKind;
use course_harvest::output::{OutputError, OutputResult, ResultAggregator, ResultSink};
use course_harvest::scheduler::{BatchOutcome, BatchScheduler, CooldownPolicy, SchedulerConfig};
use course_harvest::storage::RunStatus;
use course_harvest::transform::DefaultTransformer;
use course_harvest::{HarvestError, JobResult};
use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

fn test_config(output_root: &Path) -> SchedulerConfig {
    SchedulerConfig::new(output_root)
        .with_cooldown(Duration::ZERO)
        .with_extra_assets(Vec::new())
        .with_job_timeout(Duration::from_secs(10))
}

fn fetcher() -> MockFetcher {
    MockFetcher::new(SIMPLE_MANIFEST).with_markdown("dr/img1.json", r#"{"slide": 1}"#)
}

fn scheduler(
    course_count: usize,
    pool_size: usize,
    fetcher: Arc<MockFetcher>,
    output_root: &Path,
) -> BatchScheduler {
    BatchScheduler::new(
        courses(course_count),
        Arc::new(pool(pool_size)),
        fetcher,
        Arc::new(DefaultTransformer::default()),
        test_config(output_root),
    )
}

/// Records every outcome it is asked about
#[derive(Default)]
struct CountingPolicy {
    seen: Mutex<Vec<BatchOutcome>>,
}

impl CooldownPolicy for CountingPolicy {
    fn cooldown_after(&self, batch: &BatchOutcome) -> Duration {
        self.seen.lock().unwrap().push(*batch);
        Duration::from_millis(10)
    }
}

/// Keeps the batches it receives, optionally failing from a given batch on
#[derive(Default)]
struct RecordingSink {
    batches: Mutex<Vec<(usize, Vec<JobResult>)>>,
    fail_from: Option<usize>,
}

impl ResultSink for RecordingSink {
    fn record_batch(&self, batch_index: usize, results: &[JobResult]) -> OutputResult<()> {
        if self.fail_from.is_some_and(|from| batch_index >= from) {
            return Err(OutputError::Storage("disk full".to_string()));
        }
        self.batches
            .lock()
            .unwrap()
            .push((batch_index, results.to_vec()));
        Ok(())
    }

    fn finalize(&self, _status: RunStatus) -> OutputResult<()> {
        Ok(())
    }
}

#[tokio::test]
async fn test_batch_count_follows_pool_size() {
    let temp = tempfile::tempdir().unwrap();
    let fetcher = Arc::new(fetcher());
    let scheduler = scheduler(5, 2, fetcher, temp.path());
    let aggregator = ResultAggregator::new();

    let batches = scheduler.run(&aggregator).await.unwrap();

    assert_eq!(batches, 3);
    let results = aggregator.results();
    assert_eq!(results.len(), 5);
    let batch_indices: Vec<usize> = results.iter().map(|r| r.batch_index).collect();
    assert_eq!(batch_indices, vec![0, 0, 1, 1, 2]);
    assert!(results.iter().all(|r| r.is_success()));
}

#[tokio::test]
async fn test_jobs_in_a_batch_never_share_a_credential() {
    let temp = tempfile::tempdir().unwrap();
    let fetcher = Arc::new(fetcher());
    let scheduler = scheduler(7, 3, fetcher.clone(), temp.path());
    let aggregator = ResultAggregator::new();

    scheduler.run(&aggregator).await.unwrap();

    let results = aggregator.results();
    let batch_of: HashMap<String, usize> = results
        .iter()
        .map(|r| (r.slug.clone(), r.batch_index))
        .collect();

    let mut tokens_by_batch: HashMap<usize, HashMap<String, HashSet<String>>> = HashMap::new();
    for call in fetcher.calls() {
        let slug = call.slug();
        let batch = batch_of[&slug];
        tokens_by_batch
            .entry(batch)
            .or_default()
            .entry(slug)
            .or_default()
            .insert(call.token);
    }

    for (batch, jobs) in tokens_by_batch {
        let mut batch_tokens = HashSet::new();
        for (slug, tokens) in jobs {
            // A job keeps one credential for all of its fetches
            assert_eq!(tokens.len(), 1, "{} used several credentials", slug);
            assert!(
                batch_tokens.insert(tokens.into_iter().next().unwrap()),
                "credential shared within batch {}",
                batch
            );
        }
    }

    for batch in results.chunks(3) {
        let positions: Vec<usize> = batch.iter().map(|r| r.credential_index).collect();
        assert_eq!(positions, (0..batch.len()).collect::<Vec<_>>());
    }
}

#[tokio::test]
async fn test_next_batch_waits_for_the_previous_one() {
    let temp = tempfile::tempdir().unwrap();
    let fetcher = Arc::new(fetcher().with_delay(Duration::from_millis(30)));
    let scheduler = scheduler(4, 2, fetcher.clone(), temp.path());
    let aggregator = ResultAggregator::new();

    scheduler.run(&aggregator).await.unwrap();

    let calls = fetcher.calls();
    let first_batch = ["MOD-1", "MOD-2"];
    let last_of_first = calls
        .iter()
        .filter(|c| first_batch.contains(&c.slug().as_str()))
        .map(|c| c.finished)
        .max()
        .unwrap();
    let first_of_second = calls
        .iter()
        .filter(|c| !first_batch.contains(&c.slug().as_str()))
        .map(|c| c.started)
        .min()
        .unwrap();

    assert!(first_of_second >= last_of_first);
}

#[tokio::test]
async fn test_failed_job_does_not_affect_its_batch() {
    let temp = tempfile::tempdir().unwrap();
    let fetcher = Arc::new(fetcher().failing("MOD-2"));
    let scheduler = scheduler(3, 3, fetcher, temp.path());
    let aggregator = ResultAggregator::new();

    scheduler.run(&aggregator).await.unwrap();

    let results = aggregator.results();
    assert_eq!(results.len(), 3);
    assert!(results[0].is_success());
    assert_eq!(results[1].error_kind, Some(ErrorKind::Fetch));
    assert!(results[1].error_detail.as_deref().unwrap().contains("500"));
    assert!(results[2].is_success());

    let summary = aggregator.summarize();
    assert_eq!(summary.succeeded, 2);
    assert_eq!(summary.failed, 1);
}

#[tokio::test]
async fn test_cooldown_policy_sees_each_batch_but_the_last() {
    let temp = tempfile::tempdir().unwrap();
    let fetcher = Arc::new(fetcher().rate_limited("MOD-3"));
    let policy = Arc::new(CountingPolicy::default());
    let scheduler =
        scheduler(5, 3, fetcher, temp.path()).with_cooldown_policy(policy.clone());
    let aggregator = ResultAggregator::new();

    scheduler.run(&aggregator).await.unwrap();

    let seen = policy.seen.lock().unwrap().clone();
    assert_eq!(
        seen,
        vec![BatchOutcome {
            batch_index: 0,
            jobs: 3,
            failed: 1,
            rate_limited: 1,
        }]
    );

    let summary = aggregator.summarize();
    let sizes: Vec<usize> = summary.batches.iter().map(|b| b.jobs).collect();
    assert_eq!(sizes, vec![3, 2]);
    assert_eq!(summary.rate_limited, 1);
}

#[tokio::test]
async fn test_cancelled_before_start_runs_nothing() {
    let temp = tempfile::tempdir().unwrap();
    let fetcher = Arc::new(fetcher());
    let scheduler = scheduler(4, 2, fetcher.clone(), temp.path());
    scheduler.cancellation_token().cancel();
    let aggregator = ResultAggregator::new();

    let outcome = scheduler.run(&aggregator).await;

    assert!(matches!(
        outcome,
        Err(HarvestError::Interrupted {
            completed_batches: 0
        })
    ));
    assert!(aggregator.is_empty());
    assert!(fetcher.calls().is_empty());
}

#[tokio::test]
async fn test_cancel_during_cooldown_keeps_finished_batches() {
    let temp = tempfile::tempdir().unwrap();
    let fetcher = Arc::new(fetcher());
    let scheduler = BatchScheduler::new(
        courses(4),
        Arc::new(pool(2)),
        fetcher,
        Arc::new(DefaultTransformer::default()),
        test_config(temp.path()).with_cooldown(Duration::from_secs(60)),
    );
    let token = scheduler.cancellation_token();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(200)).await;
        token.cancel();
    });
    let aggregator = ResultAggregator::new();

    let outcome = tokio::time::timeout(Duration::from_secs(10), scheduler.run(&aggregator))
        .await
        .expect("cooldown was not interrupted");

    assert!(matches!(
        outcome,
        Err(HarvestError::Interrupted {
            completed_batches: 1
        })
    ));
    assert_eq!(aggregator.len(), 2);
}

#[tokio::test]
async fn test_sink_receives_every_batch() {
    let temp = tempfile::tempdir().unwrap();
    let fetcher = Arc::new(fetcher());
    let sink = Arc::new(RecordingSink::default());
    let scheduler = scheduler(3, 2, fetcher, temp.path()).with_sink(sink.clone());
    let aggregator = ResultAggregator::new();

    scheduler.run(&aggregator).await.unwrap();

    let batches = sink.batches.lock().unwrap();
    let shape: Vec<(usize, usize)> = batches.iter().map(|(i, r)| (*i, r.len())).collect();
    assert_eq!(shape, vec![(0, 2), (1, 1)]);
}

#[tokio::test]
async fn test_sink_failure_aborts_the_run() {
    let temp = tempfile::tempdir().unwrap();
    let fetcher = Arc::new(fetcher());
    let sink = Arc::new(RecordingSink {
        fail_from: Some(0),
        ..RecordingSink::default()
    });
    let scheduler = scheduler(4, 2, fetcher.clone(), temp.path()).with_sink(sink);
    let aggregator = ResultAggregator::new();

    let outcome = scheduler.run(&aggregator).await;

    assert!(matches!(outcome, Err(HarvestError::Output(_))));
    // The failed batch is still aggregated, the next one never starts
    assert_eq!(aggregator.len(), 2);
    assert!(fetcher.calls().iter().all(|c| c.slug() == "MOD-1" || c.slug() == "MOD-2"));
}

#[tokio::test]
async fn test_jobs_in_a_batch_run_concurrently() {
    let temp = tempfile::tempdir().unwrap();
    let fetcher = Arc::new(fetcher().with_delay(Duration::from_millis(300)));
    let scheduler = scheduler(2, 2, fetcher.clone(), temp.path());
    let aggregator = ResultAggregator::new();

    scheduler.run(&aggregator).await.unwrap();

    // Each manifest fetch overlaps the other job's manifest fetch
    let manifests: Vec<_> = fetcher
        .calls()
        .into_iter()
        .filter(|c| c.url.path().ends_with("imsmanifest.xml"))
        .collect();
    assert_eq!(manifests.len(), 2);
    assert!(manifests[0].started < manifests[1].finished);
    assert!(manifests[1].started < manifests[0].finished);

    // Two fetches of 300ms per job, run side by side
    let batch = &aggregator.summarize().batches[0];
    assert!(batch.wall_time < Duration::from_millis(1100), "{:?}", batch.wall_time);
}

#[tokio::test]
async fn test_limit_truncates_before_partitioning() {
    let temp = tempfile::tempdir().unwrap();
    let fetcher = Arc::new(fetcher());
    let scheduler = BatchScheduler::new(
        courses(7),
        Arc::new(pool(3)),
        fetcher.clone(),
        Arc::new(DefaultTransformer::default()),
        test_config(temp.path()).with_limit(Some(4)),
    );
    assert_eq!(scheduler.courses().len(), 4);
    let aggregator = ResultAggregator::new();

    let batches = scheduler.run(&aggregator).await.unwrap();

    assert_eq!(batches, 2);
    let sizes: Vec<usize> = aggregator.summarize().batches.iter().map(|b| b.jobs).collect();
    assert_eq!(sizes, vec![3, 1]);
    let slugs: HashSet<String> = fetcher.calls().iter().map(|c| c.slug()).collect();
    assert!(!slugs.contains("MOD-5"));
}
