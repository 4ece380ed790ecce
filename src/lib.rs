//! Course-Harvest: batch extraction of e-learning course content
//!
//! This crate scrapes course manifests, JSON data, JavaScript assets and embedded
//! images from a training-content host. Jobs are spread over a pool of API
//! credentials, run in sequential batches with bounded concurrency, and every
//! outcome is aggregated into a run report.

pub mod config;
pub mod fetch;
pub mod input;
pub mod job;
pub mod output;
pub mod scheduler;
pub mod storage;
pub mod transform;

use thiserror::Error;

/// Main error type for Course-Harvest operations
#[derive(Debug, Error)]
pub enum HarvestError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Fetch(#[from] fetch::FetchError),

    #[error("Job for lesson {lesson_id} timed out after {seconds}s")]
    Timeout { lesson_id: String, seconds: u64 },

    #[error("Transform error: {0}")]
    Transform(#[from] transform::TransformError),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] ::url::ParseError),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Storage error: {0}")]
    Storage(#[from] storage::StorageError),

    #[error("Output error: {0}")]
    Output(#[from] output::OutputError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Job task for lesson {lesson_id} failed: {message}")]
    Task { lesson_id: String, message: String },

    #[error("Run interrupted after {completed_batches} completed batch(es)")]
    Interrupted { completed_batches: usize },
}

impl HarvestError {
    /// Classifies this error for job result reporting
    pub fn kind(&self) -> job::ErrorKind {
        use job::ErrorKind;

        match self {
            Self::Fetch(fetch::FetchError::RateLimited { .. }) => ErrorKind::RateLimit,
            Self::Fetch(_) | Self::Reqwest(_) | Self::UrlParse(_) => ErrorKind::Fetch,
            Self::Timeout { .. } => ErrorKind::Timeout,
            Self::Transform(_) => ErrorKind::Transform,
            Self::Io(_) => ErrorKind::Io,
            Self::Config(_) => ErrorKind::Config,
            Self::Database(_)
            | Self::Storage(_)
            | Self::Output(_)
            | Self::Task { .. }
            | Self::Interrupted { .. } => ErrorKind::Internal,
        }
    }
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Failed to read course list: {0}")]
    Csv(#[from] csv::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),

    #[error("Credential list is empty")]
    EmptyCredentials,

    #[error("Credential at line {duplicate} duplicates the one at line {first}")]
    DuplicateCredential { first: usize, duplicate: usize },

    #[error("Malformed course list row {row}: {message}")]
    MalformedCourse { row: usize, message: String },
}

/// Result type alias for Course-Harvest operations
pub type Result<T> = std::result::Result<T, HarvestError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// Re-export commonly used types
pub use config::Config;
pub use input::{Course, Credential, CredentialPool};
pub use job::{JobResult, JobStatus};
pub use output::{ResultAggregator, RunSummary};
pub use scheduler::{BatchScheduler, SchedulerConfig};
