//! End-to-end runs: inputs, ledger and reports

use crate::common::{MockFetcher, SIMPLE_MANIFEST};
use course_harvest::config::{
    ApiConfig, AssetConfig, Config, InputConfig, OutputConfig, SchedulerSettings,
};
use course_harvest::scheduler::{Coordinator, RunOptions};
use course_harvest::storage::{RunStatus, SqliteStorage, Storage};
use std::fs;
use std::path::Path;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

const COURSES_CSV: &str = "\
courseid,coursename,lessonID,lessonname,link
C1,Safety,L1,Intro,https://cdn.example.com/lessons/MOD-1/imsmanifest.xml
C1,Safety,L2,Ladders,https://cdn.example.com/lessons/MOD-2/imsmanifest.xml
C2,Driving,L3,Basics,https://cdn.example.com/lessons/MOD-3/imsmanifest.xml
";

/// Writes the input files and returns a config pointing at them
fn create_test_config(dir: &Path) -> Config {
    fs::write(dir.join("courses.csv"), COURSES_CSV).unwrap();
    fs::write(
        dir.join("keys.txt"),
        "fc-first-key-aaaaaaaaaaaaaaaa\nfc-second-key-bbbbbbbbbbbbbbb\n",
    )
    .unwrap();

    Config {
        api: ApiConfig {
            base_url: "http://127.0.0.1:9".to_string(),
            request_timeout_secs: 5,
            user_agent: "TestHarvester/1.0".to_string(),
        },
        scheduler: SchedulerSettings::default(),
        inputs: InputConfig {
            courses_csv: dir.join("courses.csv").display().to_string(),
            credentials_file: dir.join("keys.txt").display().to_string(),
            lesson_filter: None,
        },
        output: OutputConfig {
            root_dir: dir.join("out").display().to_string(),
            report_dir: dir.join("reports").display().to_string(),
            database_path: dir.join("ledger.db").display().to_string(),
        },
        assets: AssetConfig {
            extra: Vec::new(),
            ..AssetConfig::default()
        },
    }
}

fn no_cooldown() -> RunOptions {
    RunOptions {
        cooldown_secs: Some(0),
        ..RunOptions::default()
    }
}

fn fetcher() -> MockFetcher {
    MockFetcher::new(SIMPLE_MANIFEST).with_markdown("dr/img1.json", r#"{"slide":1}"#)
}

#[tokio::test]
async fn test_full_run_writes_ledger_and_reports() {
    let temp = tempfile::tempdir().unwrap();
    let config = create_test_config(temp.path());
    let coordinator = Coordinator::new(config, "abc123".to_string(), no_cooldown()).unwrap();

    let report = coordinator
        .run_with_fetcher(Arc::new(fetcher().failing("MOD-2")), CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(report.status, RunStatus::Completed);
    assert_eq!(report.batches_run, 2);
    assert_eq!(report.summary.total_jobs, 3);
    assert_eq!(report.summary.succeeded, 2);
    assert_eq!(report.summary.failed, 1);
    assert!(temp.path().join("out/MOD-1/JSON/dr_img1.json").exists());

    let csv = fs::read_to_string(&report.reports.csv).unwrap();
    let lines: Vec<&str> = csv.lines().collect();
    assert_eq!(lines.len(), 4);
    assert!(lines[0].starts_with("course_id,lesson_id,status"));
    assert!(lines[2].starts_with("C1,L2,failure"));

    let markdown = fs::read_to_string(&report.reports.markdown).unwrap();
    assert!(markdown.contains("# Course Harvest Summary"));
    assert!(markdown.contains("abc123"));
    assert!(markdown.contains("L2"));
    drop(coordinator);

    let storage = SqliteStorage::new(&temp.path().join("ledger.db")).unwrap();
    let run = storage.get_latest_run().unwrap().unwrap();
    assert_eq!(run.id, report.run_id);
    assert_eq!(run.status, RunStatus::Completed);
    assert_eq!(run.course_count, 3);
    assert_eq!(run.batch_count, 2);
    assert_eq!(run.pool_size, 2);
    assert!(run.finished_at.is_some());

    let records = storage.get_run_results(run.id).unwrap();
    assert_eq!(records.len(), 3);
    assert_eq!(records[2].batch_index, 1);
    assert_eq!(records[2].credential_index, 0);
    assert_eq!(storage.failed_lesson_ids(run.id).unwrap(), vec!["L2"]);
}

#[tokio::test]
async fn test_retry_failed_reruns_only_failed_lessons() {
    let temp = tempfile::tempdir().unwrap();

    let first = Coordinator::new(create_test_config(temp.path()), "h".to_string(), no_cooldown())
        .unwrap();
    first
        .run_with_fetcher(Arc::new(fetcher().failing("MOD-3")), CancellationToken::new())
        .await
        .unwrap();
    drop(first);

    let options = RunOptions {
        retry_failed: true,
        ..no_cooldown()
    };
    let retry = Coordinator::new(create_test_config(temp.path()), "h".to_string(), options).unwrap();
    let fetcher = Arc::new(fetcher());

    let report = retry
        .run_with_fetcher(fetcher.clone(), CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(report.summary.total_jobs, 1);
    assert_eq!(report.summary.succeeded, 1);
    assert!(fetcher.calls().iter().all(|c| c.slug() == "MOD-3"));
}

#[tokio::test]
async fn test_interrupted_run_still_reports() {
    let temp = tempfile::tempdir().unwrap();
    let coordinator =
        Coordinator::new(create_test_config(temp.path()), "h".to_string(), no_cooldown()).unwrap();
    let cancel = CancellationToken::new();
    cancel.cancel();

    let report = coordinator
        .run_with_fetcher(Arc::new(fetcher()), cancel)
        .await
        .unwrap();

    assert_eq!(report.status, RunStatus::Interrupted);
    assert_eq!(report.batches_run, 0);
    assert_eq!(report.summary.total_jobs, 0);
    let csv = fs::read_to_string(&report.reports.csv).unwrap();
    let lines: Vec<&str> = csv.lines().collect();
    assert_eq!(lines.len(), 1);
    assert!(lines[0].starts_with("course_id,lesson_id,status"));
    assert!(report.reports.markdown.exists());
    drop(coordinator);

    let storage = SqliteStorage::new(&temp.path().join("ledger.db")).unwrap();
    let run = storage.get_latest_run().unwrap().unwrap();
    assert_eq!(run.status, RunStatus::Interrupted);
}

#[tokio::test]
async fn test_empty_plan_is_rejected() {
    let temp = tempfile::tempdir().unwrap();
    let mut config = create_test_config(temp.path());
    fs::write(temp.path().join("only.txt"), "L9\n").unwrap();
    config.inputs.lesson_filter = Some(temp.path().join("only.txt").display().to_string());
    let coordinator = Coordinator::new(config, "h".to_string(), no_cooldown()).unwrap();

    let outcome = coordinator
        .run_with_fetcher(Arc::new(fetcher()), CancellationToken::new())
        .await;

    assert!(outcome.is_err());
}
