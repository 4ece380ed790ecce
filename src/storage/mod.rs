//! Storage module for the run ledger
//!
//! Every run is recorded in a SQLite database:
//! - run metadata (start and finish time, config hash, status, plan size)
//! - one row per job result, written after each batch completes
//!
//! The ledger backs the `--stats` and `--retry-failed` commands.

mod schema;
mod sqlite;
mod traits;

pub use sqlite::SqliteStorage;
pub use traits::{Storage, StorageError, StorageResult};

use crate::job::{ErrorKind, JobStatus};

/// Parameters of a run being started
#[derive(Debug, Clone)]
pub struct NewRun {
    pub config_hash: String,
    pub course_count: usize,
    pub batch_count: usize,
    pub pool_size: usize,
}

/// Represents a harvest run
#[derive(Debug, Clone)]
pub struct RunRecord {
    pub id: i64,
    pub started_at: String,
    pub finished_at: Option<String>,
    pub config_hash: String,
    pub status: RunStatus,
    pub course_count: usize,
    pub batch_count: usize,
    pub pool_size: usize,
}

/// A job result as stored in the ledger
#[derive(Debug, Clone, PartialEq)]
pub struct JobRecord {
    pub course_id: String,
    pub lesson_id: String,
    pub slug: String,
    pub status: JobStatus,
    pub error_kind: Option<ErrorKind>,
    pub error_detail: Option<String>,
    pub duration_ms: u64,
    pub batch_index: usize,
    pub credential_index: usize,
    pub credential_label: String,
    pub artifact_count: usize,
    pub failed_assets: usize,
}

/// Status of a harvest run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    Running,
    Completed,
    Interrupted,
    Failed,
}

impl RunStatus {
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Interrupted => "interrupted",
            Self::Failed => "failed",
        }
    }

    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "running" => Some(Self::Running),
            "completed" => Some(Self::Completed),
            "interrupted" => Some(Self::Interrupted),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }
}
