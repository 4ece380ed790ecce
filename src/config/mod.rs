//! Configuration module for Course-Harvest
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//!
//! # Example
//!
//! ```no_run
//! use course_harvest::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("harvest.toml")).unwrap();
//! println!("Batches pause for {}s", config.scheduler.cooldown_secs);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{ApiConfig, AssetConfig, Config, InputConfig, OutputConfig, SchedulerSettings};

// Re-export parser functions
pub use parser::{compute_config_hash, load_config, load_config_with_hash};
