use serde::Deserialize;

/// Main configuration structure for Course-Harvest
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub api: ApiConfig,
    #[serde(default)]
    pub scheduler: SchedulerSettings,
    pub inputs: InputConfig,
    pub output: OutputConfig,
    #[serde(default)]
    pub assets: AssetConfig,
}

/// Content-extraction API configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    /// Base URL of the conversion API (e.g. "https://api.firecrawl.dev")
    #[serde(rename = "base-url")]
    pub base_url: String,

    /// Timeout for a single HTTP request (seconds)
    #[serde(rename = "request-timeout-secs", default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// User agent sent with direct downloads
    #[serde(rename = "user-agent", default = "default_user_agent")]
    pub user_agent: String,
}

/// Batch scheduling configuration
#[derive(Debug, Clone, Deserialize)]
pub struct SchedulerSettings {
    /// Pause between batches (seconds)
    #[serde(rename = "cooldown-secs", default = "default_cooldown")]
    pub cooldown_secs: u64,

    /// Upper bound on a single course job (seconds)
    #[serde(rename = "job-timeout-secs", default = "default_job_timeout")]
    pub job_timeout_secs: u64,

    /// Only process the first N courses (smoke-test runs)
    #[serde(default)]
    pub limit: Option<usize>,
}

impl Default for SchedulerSettings {
    fn default() -> Self {
        Self {
            cooldown_secs: default_cooldown(),
            job_timeout_secs: default_job_timeout(),
            limit: None,
        }
    }
}

/// Input file locations
#[derive(Debug, Clone, Deserialize)]
pub struct InputConfig {
    /// CSV course list (courseid, coursename, lessonID, lessonname, link)
    #[serde(rename = "courses-csv")]
    pub courses_csv: String,

    /// Credential file, one token per line
    #[serde(rename = "credentials-file")]
    pub credentials_file: String,

    /// Optional file of lesson ids restricting the course list
    #[serde(rename = "lesson-filter", default)]
    pub lesson_filter: Option<String>,
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    /// Directory that receives one sub-directory per course
    #[serde(rename = "root-dir")]
    pub root_dir: String,

    /// Directory for the CSV and markdown run reports
    #[serde(rename = "report-dir")]
    pub report_dir: String,

    /// Path to the SQLite run ledger
    #[serde(rename = "database-path")]
    pub database_path: String,
}

/// Asset discovery and extraction settings
#[derive(Debug, Clone, Deserialize)]
pub struct AssetConfig {
    /// Assets fetched for every course, relative to the manifest
    #[serde(default = "default_extra_assets")]
    pub extra: Vec<String>,

    /// Number of `dr/imgN.json` files tried when the manifest lists none
    #[serde(rename = "fallback-json-count", default = "default_fallback_json_count")]
    pub fallback_json_count: u32,

    /// Decoded images at or below this size are skipped
    #[serde(rename = "min-image-bytes", default = "default_min_image_bytes")]
    pub min_image_bytes: usize,
}

impl Default for AssetConfig {
    fn default() -> Self {
        Self {
            extra: default_extra_assets(),
            fallback_json_count: default_fallback_json_count(),
            min_image_bytes: default_min_image_bytes(),
        }
    }
}

fn default_request_timeout() -> u64 {
    30
}

fn default_user_agent() -> String {
    format!("course-harvest/{}", env!("CARGO_PKG_VERSION"))
}

fn default_cooldown() -> u64 {
    30
}

fn default_job_timeout() -> u64 {
    900
}

fn default_extra_assets() -> Vec<String> {
    vec!["assets/js/CPM.js".to_string(), "project.txt".to_string()]
}

fn default_fallback_json_count() -> u32 {
    50
}

fn default_min_image_bytes() -> usize {
    100
}
