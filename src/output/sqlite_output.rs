//! SQLite-backed result sink
//!
//! Writes each completed batch to the run ledger so the recorded results
//! survive an aborted run.

use crate::job::JobResult;
use crate::output::traits::{OutputError, OutputResult, ResultSink};
use crate::storage::{RunStatus, Storage};
use std::sync::{Arc, Mutex};

/// Result sink that records batches in the run ledger
pub struct LedgerSink {
    storage: Arc<Mutex<dyn Storage>>,
    run_id: i64,
}

impl LedgerSink {
    /// Creates a new ledger sink
    ///
    /// # Arguments
    ///
    /// * `storage` - The storage backend to use
    /// * `run_id` - The current run ID
    pub fn new(storage: Arc<Mutex<dyn Storage>>, run_id: i64) -> Self {
        Self { storage, run_id }
    }
}

impl ResultSink for LedgerSink {
    fn record_batch(&self, batch_index: usize, results: &[JobResult]) -> OutputResult<()> {
        let mut storage = self
            .storage
            .lock()
            .map_err(|e| OutputError::Storage(format!("Failed to lock storage: {}", e)))?;

        storage
            .record_batch(self.run_id, results)
            .map_err(|e| OutputError::Storage(e.to_string()))?;

        tracing::debug!(
            "Ledger: recorded {} results of batch {} for run {}",
            results.len(),
            batch_index + 1,
            self.run_id
        );
        Ok(())
    }

    fn finalize(&self, status: RunStatus) -> OutputResult<()> {
        let mut storage = self
            .storage
            .lock()
            .map_err(|e| OutputError::Storage(format!("Failed to lock storage: {}", e)))?;

        storage
            .finish_run(self.run_id, status)
            .map_err(|e| OutputError::Storage(e.to_string()))
    }
}
