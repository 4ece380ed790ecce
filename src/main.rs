//! Course-Harvest main entry point
//!
//! This is the command-line interface for the Course-Harvest batch scraper.

use anyhow::Context;
use clap::Parser;
use course_harvest::config::{load_config_with_hash, Config};
use course_harvest::scheduler::{Coordinator, RunOptions};
use course_harvest::storage::{RunStatus, SqliteStorage};
use std::path::{Path, PathBuf};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

/// Course-Harvest: batch extraction of e-learning course content
///
/// Course-Harvest scrapes course manifests, slide data, scripts and embedded
/// images for every lesson of a course list, spreading the work over a pool
/// of API credentials in rate-limit-friendly batches.
#[derive(Parser, Debug)]
#[command(name = "course-harvest")]
#[command(version = "1.0.0")]
#[command(about = "Batch scraper for e-learning course content", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Only process the first N courses (overrides the config)
    #[arg(long, value_name = "N")]
    limit: Option<usize>,

    /// Seconds to pause between batches (overrides the config)
    #[arg(long, value_name = "SECS")]
    cooldown: Option<u64>,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Validate inputs and print the batch plan without scraping
    #[arg(long, conflicts_with_all = ["stats", "retry_failed"])]
    dry_run: bool,

    /// Show statistics of the latest recorded run and exit
    #[arg(long, conflicts_with_all = ["dry_run", "retry_failed"])]
    stats: bool,

    /// Only process lessons that failed in the latest recorded run
    #[arg(long, conflicts_with_all = ["dry_run", "stats"])]
    retry_failed: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    // Load and validate configuration
    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (config, config_hash) = load_config_with_hash(&cli.config)
        .with_context(|| format!("Failed to load configuration from {}", cli.config.display()))?;
    tracing::info!("Configuration loaded successfully (hash: {})", config_hash);

    let options = RunOptions {
        limit: cli.limit,
        cooldown_secs: cli.cooldown,
        retry_failed: cli.retry_failed,
    };

    if cli.stats {
        handle_stats(&config)?;
    } else if cli.dry_run {
        handle_dry_run(config, config_hash, options)?;
    } else {
        handle_harvest(config, config_hash, options).await?;
    }

    Ok(())
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("course_harvest=info,warn"),
            1 => EnvFilter::new("course_harvest=debug,info"),
            2 => EnvFilter::new("course_harvest=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Handles the --dry-run mode: validates inputs and prints the batch plan
fn handle_dry_run(
    config: Config,
    config_hash: String,
    options: RunOptions,
) -> anyhow::Result<()> {
    println!("=== Course-Harvest Dry Run ===\n");

    println!("API:");
    println!("  Base URL: {}", config.api.base_url);
    println!("  Request timeout: {}s", config.api.request_timeout_secs);

    println!("\nScheduler:");
    println!(
        "  Cooldown: {}s",
        options.cooldown_secs.unwrap_or(config.scheduler.cooldown_secs)
    );
    println!("  Job timeout: {}s", config.scheduler.job_timeout_secs);
    if let Some(limit) = options.limit.or(config.scheduler.limit) {
        println!("  Limit: {} courses", limit);
    }

    println!("\nOutput:");
    println!("  Course root: {}", config.output.root_dir);
    println!("  Reports: {}", config.output.report_dir);
    println!("  Database: {}", config.output.database_path);

    println!("\nExtra assets ({}):", config.assets.extra.len());
    for asset in &config.assets.extra {
        println!("  - {}", asset);
    }

    let coordinator = Coordinator::new(config, config_hash, options)?;
    let plan = coordinator.plan()?;

    println!(
        "\nPlan: {} courses, {} credentials, {} batches",
        plan.courses.len(),
        plan.pool.size(),
        plan.batch_count()
    );
    for line in plan.describe() {
        println!("  {}", line);
    }
    if !plan.missing_lessons.is_empty() {
        println!("\nLessons not in the course list ({}):", plan.missing_lessons.len());
        for lesson in &plan.missing_lessons {
            println!("  - {}", lesson);
        }
    }

    println!("\n✓ Configuration and inputs are valid");

    Ok(())
}

/// Handles the --stats mode: shows statistics from the database
fn handle_stats(config: &Config) -> anyhow::Result<()> {
    use course_harvest::output::{load_statistics, print_statistics};

    println!("Database: {}\n", config.output.database_path);

    let storage = SqliteStorage::new(Path::new(&config.output.database_path))
        .with_context(|| format!("Failed to open database {}", config.output.database_path))?;

    match load_statistics(&storage)? {
        Some(stats) => print_statistics(&stats),
        None => println!("No runs recorded yet"),
    }

    Ok(())
}

/// Handles the main harvest operation
async fn handle_harvest(
    config: Config,
    config_hash: String,
    options: RunOptions,
) -> anyhow::Result<()> {
    use course_harvest::output::print_summary;

    let coordinator = Coordinator::new(config, config_hash, options)?;

    // First Ctrl-C stops the run between batches
    let cancel = CancellationToken::new();
    let signal_token = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupt received, stopping after the current batch");
            signal_token.cancel();
        }
    });

    match coordinator.run(cancel).await {
        Ok(report) => {
            print_summary(&report.summary);
            println!("Report: {}", report.reports.csv.display());
            println!("Summary: {}", report.reports.markdown.display());

            if report.status == RunStatus::Interrupted {
                tracing::warn!(
                    "Run {} interrupted after {} batches; rerun to continue",
                    report.run_id,
                    report.batches_run
                );
            } else {
                tracing::info!("Run {} completed", report.run_id);
            }
            Ok(())
        }
        Err(e) => Err(anyhow::Error::new(e).context("Harvest failed")),
    }
}
