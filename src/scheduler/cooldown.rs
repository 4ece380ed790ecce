//! Pauses between batches
//!
//! The scheduler asks a [`CooldownPolicy`] how long to wait after each batch
//! except the last. The policy sees how the batch went, including how many of
//! its jobs were rate limited.

use crate::job::JobResult;
use std::time::Duration;

/// Default pause between batches
pub const DEFAULT_COOLDOWN: Duration = Duration::from_secs(30);

/// What a completed batch looked like
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchOutcome {
    pub batch_index: usize,
    pub jobs: usize,
    pub failed: usize,
    pub rate_limited: usize,
}

impl BatchOutcome {
    pub fn from_results(batch_index: usize, results: &[JobResult]) -> Self {
        Self {
            batch_index,
            jobs: results.len(),
            failed: results.iter().filter(|r| !r.is_success()).count(),
            rate_limited: results.iter().filter(|r| r.is_rate_limited()).count(),
        }
    }
}

/// Decides the pause after a batch
pub trait CooldownPolicy: Send + Sync {
    fn cooldown_after(&self, batch: &BatchOutcome) -> Duration;
}

/// The same pause after every batch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedCooldown {
    delay: Duration,
}

impl FixedCooldown {
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }
}

impl Default for FixedCooldown {
    fn default() -> Self {
        Self::new(DEFAULT_COOLDOWN)
    }
}

impl CooldownPolicy for FixedCooldown {
    fn cooldown_after(&self, _batch: &BatchOutcome) -> Duration {
        self.delay
    }
}
