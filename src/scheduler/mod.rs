//! Batch scheduling
//!
//! This module handles:
//! - Partitioning the course list into batches sized to the credential pool
//! - Running each batch's jobs concurrently, one credential per job
//! - Pausing between batches according to a [`CooldownPolicy`]
//! - Coordinating a full run: inputs, ledger and reports

mod batch;
mod cooldown;
mod coordinator;
mod runner;

pub use batch::{batch_count, partition};
pub use cooldown::{BatchOutcome, CooldownPolicy, FixedCooldown, DEFAULT_COOLDOWN};
pub use coordinator::{Coordinator, RunOptions, RunPlan, RunReport};
pub use runner::{BatchScheduler, SchedulerConfig, DEFAULT_JOB_TIMEOUT};
