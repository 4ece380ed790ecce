use crate::config::types::{ApiConfig, AssetConfig, Config, InputConfig, OutputConfig, SchedulerSettings};
use crate::ConfigError;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_api_config(&config.api)?;
    validate_scheduler_settings(&config.scheduler)?;
    validate_input_config(&config.inputs)?;
    validate_output_config(&config.output)?;
    validate_asset_config(&config.assets)?;
    Ok(())
}

/// Validates API configuration
fn validate_api_config(config: &ApiConfig) -> Result<(), ConfigError> {
    let url = Url::parse(&config.base_url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid base-url: {}", e)))?;

    if !matches!(url.scheme(), "http" | "https") {
        return Err(ConfigError::Validation(format!(
            "base-url must use http or https, got '{}'",
            url.scheme()
        )));
    }

    if config.request_timeout_secs < 1 {
        return Err(ConfigError::Validation(
            "request-timeout-secs must be >= 1".to_string(),
        ));
    }

    if config.user_agent.trim().is_empty() {
        return Err(ConfigError::Validation(
            "user-agent cannot be empty".to_string(),
        ));
    }

    Ok(())
}

/// Validates scheduler settings
fn validate_scheduler_settings(config: &SchedulerSettings) -> Result<(), ConfigError> {
    if config.job_timeout_secs < 1 {
        return Err(ConfigError::Validation(
            "job-timeout-secs must be >= 1".to_string(),
        ));
    }

    if config.cooldown_secs > 3600 {
        return Err(ConfigError::Validation(format!(
            "cooldown-secs must be <= 3600, got {}",
            config.cooldown_secs
        )));
    }

    if config.limit == Some(0) {
        return Err(ConfigError::Validation(
            "limit must be >= 1 when set".to_string(),
        ));
    }

    Ok(())
}

/// Validates input file locations
fn validate_input_config(config: &InputConfig) -> Result<(), ConfigError> {
    if config.courses_csv.is_empty() {
        return Err(ConfigError::Validation(
            "courses-csv cannot be empty".to_string(),
        ));
    }

    if config.credentials_file.is_empty() {
        return Err(ConfigError::Validation(
            "credentials-file cannot be empty".to_string(),
        ));
    }

    if matches!(config.lesson_filter.as_deref(), Some("")) {
        return Err(ConfigError::Validation(
            "lesson-filter cannot be an empty path".to_string(),
        ));
    }

    Ok(())
}

/// Validates output configuration
fn validate_output_config(config: &OutputConfig) -> Result<(), ConfigError> {
    if config.root_dir.is_empty() {
        return Err(ConfigError::Validation("root-dir cannot be empty".to_string()));
    }

    if config.report_dir.is_empty() {
        return Err(ConfigError::Validation(
            "report-dir cannot be empty".to_string(),
        ));
    }

    if config.database_path.is_empty() {
        return Err(ConfigError::Validation(
            "database-path cannot be empty".to_string(),
        ));
    }

    Ok(())
}

/// Validates asset settings
fn validate_asset_config(config: &AssetConfig) -> Result<(), ConfigError> {
    for asset in &config.extra {
        validate_asset_reference(asset)?;
    }

    if config.fallback_json_count > 1000 {
        return Err(ConfigError::Validation(format!(
            "fallback-json-count must be <= 1000, got {}",
            config.fallback_json_count
        )));
    }

    Ok(())
}

/// Asset references are resolved against the manifest URL, so they must be relative
fn validate_asset_reference(asset: &str) -> Result<(), ConfigError> {
    if asset.trim().is_empty() {
        return Err(ConfigError::Validation(
            "extra asset path cannot be empty".to_string(),
        ));
    }

    if asset.starts_with('/') || Url::parse(asset).is_ok() {
        return Err(ConfigError::Validation(format!(
            "extra asset '{}' must be relative to the manifest",
            asset
        )));
    }

    if asset.split('/').any(|segment| segment == "..") {
        return Err(ConfigError::Validation(format!(
            "extra asset '{}' cannot leave the course directory",
            asset
        )));
    }

    Ok(())
}
