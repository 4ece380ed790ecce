//! Job outcomes
//!
//! A [`JobResult`] is created once when a job reaches a terminal state and is
//! never changed afterwards.

use serde::Serialize;
use std::path::PathBuf;
use std::time::Duration;

/// Maximum length of a recorded error detail, in characters
pub const MAX_ERROR_DETAIL_CHARS: usize = 200;

/// Terminal state of a job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Success,
    Failure,
}

impl JobStatus {
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Failure => "failure",
        }
    }

    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "success" => Some(Self::Success),
            "failure" => Some(Self::Failure),
            _ => None,
        }
    }
}

/// Category of a job failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Fetch,
    RateLimit,
    Timeout,
    Transform,
    Io,
    Config,
    Internal,
}

impl ErrorKind {
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Fetch => "fetch",
            Self::RateLimit => "rate_limit",
            Self::Timeout => "timeout",
            Self::Transform => "transform",
            Self::Io => "io",
            Self::Config => "config",
            Self::Internal => "internal",
        }
    }

    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "fetch" => Some(Self::Fetch),
            "rate_limit" => Some(Self::RateLimit),
            "timeout" => Some(Self::Timeout),
            "transform" => Some(Self::Transform),
            "io" => Some(Self::Io),
            "config" => Some(Self::Config),
            "internal" => Some(Self::Internal),
            _ => None,
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.to_db_string())
    }
}

/// Outcome of one job
#[derive(Debug, Clone, PartialEq)]
pub struct JobResult {
    pub course_id: String,
    pub lesson_id: String,
    pub slug: String,
    pub status: JobStatus,
    pub error_kind: Option<ErrorKind>,
    /// Bounded to [`MAX_ERROR_DETAIL_CHARS`] characters
    pub error_detail: Option<String>,
    pub duration: Duration,
    pub batch_index: usize,
    pub credential_index: usize,
    /// Masked credential, safe to log and export
    pub credential_label: String,
    pub artifact_paths: Vec<PathBuf>,
    pub failed_assets: usize,
}

impl JobResult {
    pub fn is_success(&self) -> bool {
        self.status == JobStatus::Success
    }

    pub fn is_rate_limited(&self) -> bool {
        self.error_kind == Some(ErrorKind::RateLimit)
    }
}

/// Shortens an error message to the recorded maximum
///
/// Cuts on a character boundary and marks the cut with `...`.
pub fn truncate_detail(detail: &str) -> String {
    if detail.chars().count() <= MAX_ERROR_DETAIL_CHARS {
        return detail.to_string();
    }
    let mut shortened: String = detail.chars().take(MAX_ERROR_DETAIL_CHARS - 3).collect();
    shortened.push_str("...");
    shortened
}
