use crate::config::types::{ApiConfig, Config, DownloadConfig, SearchConfig};
use crate::ConfigError;
use url::Url;

/// Validates the entire configuration
///
/// The cookie is not inspected here; credential checks happen when a run
/// is started so that library callers get the same error as the CLI.
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_search_config(&config.search)?;
    validate_download_config(&config.download)?;
    validate_api_config(&config.api)?;
    Ok(())
}

/// Validates search configuration
fn validate_search_config(config: &SearchConfig) -> Result<(), ConfigError> {
    if config.tag.trim().is_empty() && config.filter.trim().is_empty() {
        return Err(ConfigError::Validation(
            "at least one of tag or filter must be set".to_string(),
        ));
    }

    if config.down_count == 0 {
        return Err(ConfigError::Validation(
            "down_count must be >= 1".to_string(),
        ));
    }

    Ok(())
}

/// Validates download configuration
fn validate_download_config(config: &DownloadConfig) -> Result<(), ConfigError> {
    if config.max_concurrent_requests < 1 || config.max_concurrent_requests > 100 {
        return Err(ConfigError::Validation(format!(
            "max_concurrent_requests must be between 1 and 100, got {}",
            config.max_concurrent_requests
        )));
    }

    if config.output_root.is_empty() {
        return Err(ConfigError::Validation(
            "output_root cannot be empty".to_string(),
        ));
    }

    Ok(())
}

/// Validates the remote endpoint
fn validate_api_config(config: &ApiConfig) -> Result<(), ConfigError> {
    let url = Url::parse(&config.base_url)
        .map_err(|e| ConfigError::Validation(format!("Invalid base_url: {}", e)))?;

    if !matches!(url.scheme(), "http" | "https") {
        return Err(ConfigError::Validation(format!(
            "base_url must use http or https, got '{}'",
            url.scheme()
        )));
    }

    Ok(())
}
