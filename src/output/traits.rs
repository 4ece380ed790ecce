//! Output sink traits and error types
//!
//! This module defines the trait interface for destinations that receive job
//! results while a run is in progress.

use crate::job::JobResult;
use crate::storage::RunStatus;
use thiserror::Error;

/// Errors that can occur during output operations
#[derive(Debug, Error)]
pub enum OutputError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Storage error: {0}")]
    Storage(String),
}

/// Result type for output operations
pub type OutputResult<T> = Result<T, OutputError>;

/// Receives results as batches complete
///
/// The scheduler calls `record_batch` once per batch, after every job of the
/// batch is terminal. A failing sink aborts the run. Implementations must be
/// thread-safe.
pub trait ResultSink: Send + Sync {
    /// Records the results of one completed batch
    fn record_batch(&self, batch_index: usize, results: &[JobResult]) -> OutputResult<()>;

    /// Finalizes the output with the final status of the run
    fn finalize(&self, status: RunStatus) -> OutputResult<()>;
}
