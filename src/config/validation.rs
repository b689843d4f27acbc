use crate::config::types::{Config, CrawlerConfig, OutputConfig, RemoteConfig};
use crate::layout::is_safe_segment;
use crate::ConfigError;
use reqwest::header::{HeaderName, HeaderValue};
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_remote_config(&config.remote)?;
    validate_crawler_config(&config.crawler)?;
    validate_output_config(&config.output)?;
    Ok(())
}

/// Validates remote API configuration
fn validate_remote_config(config: &RemoteConfig) -> Result<(), ConfigError> {
    let url = Url::parse(&config.base_url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid base-url: {}", e)))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(ConfigError::InvalidUrl(format!(
            "base-url '{}' must use http or https",
            config.base_url
        )));
    }

    if config.user_agent.trim().is_empty() {
        return Err(ConfigError::Validation(
            "user-agent cannot be empty".to_string(),
        ));
    }

    if !config.root_path.starts_with('/') {
        return Err(ConfigError::Validation(format!(
            "root-path must start with '/', got '{}'",
            config.root_path
        )));
    }

    for (name, prefix) in [
        ("regions-prefix", &config.regions_prefix),
        ("results-prefix", &config.results_prefix),
        ("contests-prefix", &config.contests_prefix),
    ] {
        validate_prefix(name, prefix)?;
    }

    for (name, value) in &config.headers {
        HeaderName::from_bytes(name.as_bytes()).map_err(|_| {
            ConfigError::Validation(format!("Invalid header name '{}'", name))
        })?;
        HeaderValue::from_str(value).map_err(|_| {
            ConfigError::Validation(format!("Invalid value for header '{}'", name))
        })?;
    }

    Ok(())
}

/// Validates crawler configuration
fn validate_crawler_config(config: &CrawlerConfig) -> Result<(), ConfigError> {
    if config.workers < 1 || config.workers > 64 {
        return Err(ConfigError::Validation(format!(
            "workers must be between 1 and 64, got {}",
            config.workers
        )));
    }

    if config.queue_capacity < 1 {
        return Err(ConfigError::Validation(format!(
            "queue-capacity must be >= 1, got {}",
            config.queue_capacity
        )));
    }

    if config.request_timeout_secs == Some(0) {
        return Err(ConfigError::Validation(
            "request-timeout-secs must be > 0 when set".to_string(),
        ));
    }

    Ok(())
}

/// Validates output configuration
fn validate_output_config(config: &OutputConfig) -> Result<(), ConfigError> {
    if config.directory.is_empty() {
        return Err(ConfigError::Validation(
            "output directory cannot be empty".to_string(),
        ));
    }

    for (name, value) in [
        ("leaf-tier", &config.leaf_tier),
        ("results-dir", &config.results_dir),
        ("contests-dir", &config.contests_dir),
    ] {
        if !is_safe_segment(value) {
            return Err(ConfigError::Validation(format!(
                "{} must be a single directory name, got '{}'",
                name, value
            )));
        }
    }

    if config.results_dir == config.contests_dir {
        return Err(ConfigError::Validation(format!(
            "results-dir and contests-dir must differ, both are '{}'",
            config.results_dir
        )));
    }

    Ok(())
}

/// Remote prefixes are joined verbatim, so they must be absolute and end with '/'
fn validate_prefix(name: &str, prefix: &str) -> Result<(), ConfigError> {
    if !prefix.starts_with('/') || !prefix.ends_with('/') {
        return Err(ConfigError::Validation(format!(
            "{} must start and end with '/', got '{}'",
            name, prefix
        )));
    }
    Ok(())
}
