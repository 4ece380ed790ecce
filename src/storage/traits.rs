//! Storage traits and error types
//!
//! This module defines the trait interface for run ledger backends and
//! associated error types.

use crate::job::JobResult;
use crate::storage::{JobRecord, NewRun, RunRecord, RunStatus};
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Run not found: {0}")]
    RunNotFound(i64),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Trait for run ledger backends
pub trait Storage: Send {
    // ===== Run Management =====

    /// Creates a new run in the `running` state
    ///
    /// # Returns
    ///
    /// The ID of the newly created run
    fn create_run(&mut self, run: &NewRun) -> StorageResult<i64>;

    /// Gets a run by ID
    fn get_run(&self, run_id: i64) -> StorageResult<RunRecord>;

    /// Gets the most recently created run
    fn get_latest_run(&self) -> StorageResult<Option<RunRecord>>;

    /// Sets the final status and finish time of a run
    fn finish_run(&mut self, run_id: i64, status: RunStatus) -> StorageResult<()>;

    // ===== Job Results =====

    /// Records every result of a completed batch atomically
    fn record_batch(&mut self, run_id: i64, results: &[JobResult]) -> StorageResult<()>;

    /// All results of a run, ordered by batch then worker position
    fn get_run_results(&self, run_id: i64) -> StorageResult<Vec<JobRecord>>;

    /// Lesson IDs of the failed jobs of a run, in run order
    fn failed_lesson_ids(&self, run_id: i64) -> StorageResult<Vec<String>>;
}
