use crate::config::ApiConfig;
use reqwest::{redirect::Policy, Client};
use std::time::Duration;

/// Builds the HTTP client shared by all jobs
///
/// # Arguments
///
/// * `config` - The API configuration (timeouts and user agent)
///
/// # Returns
///
/// * `Ok(Client)` - Successfully built HTTP client
/// * `Err(reqwest::Error)` - Failed to build client
///
/// # Example
///
/// ```no_run
/// use course_harvest::config::ApiConfig;
/// use course_harvest::fetch::build_http_client;
///
/// let config = ApiConfig {
///     base_url: "https://api.firecrawl.dev".to_string(),
///     request_timeout_secs: 30,
///     user_agent: "course-harvest/1.0".to_string(),
/// };
///
/// let client = build_http_client(&config).unwrap();
/// ```
pub fn build_http_client(config: &ApiConfig) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(config.user_agent.clone())
        .timeout(Duration::from_secs(config.request_timeout_secs))
        .connect_timeout(Duration::from_secs(10))
        .redirect(Policy::limited(10))
        .gzip(true)
        .brotli(true)
        .build()
}
