use crate::config::types::{Config, ExtractionConfig, FetcherConfig, StorageConfig};
use crate::ConfigError;

/// Upper bound on configured retries
const MAX_RETRIES_LIMIT: u32 = 10;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_fetcher_config(&config.fetcher)?;
    validate_extraction_config(&config.extraction)?;
    validate_storage_config(&config.storage)?;
    Ok(())
}

/// Validates fetcher configuration
fn validate_fetcher_config(config: &FetcherConfig) -> Result<(), ConfigError> {
    if config.timeout_ms == 0 {
        return Err(ConfigError::Validation(
            "timeout_ms must be greater than 0".to_string(),
        ));
    }

    if config.user_agent.trim().is_empty() {
        return Err(ConfigError::Validation(
            "user_agent cannot be empty".to_string(),
        ));
    }

    // Header values must be visible ASCII
    if !config
        .user_agent
        .chars()
        .all(|c| c.is_ascii() && !c.is_ascii_control())
    {
        return Err(ConfigError::Validation(format!(
            "user_agent must contain only printable ASCII characters, got '{}'",
            config.user_agent
        )));
    }

    if config.max_retries > MAX_RETRIES_LIMIT {
        return Err(ConfigError::Validation(format!(
            "max_retries must be at most {}, got {}",
            MAX_RETRIES_LIMIT, config.max_retries
        )));
    }

    Ok(())
}

/// Validates extraction configuration
fn validate_extraction_config(config: &ExtractionConfig) -> Result<(), ConfigError> {
    if config.max_year < 1900 {
        return Err(ConfigError::Validation(format!(
            "max_year must be >= 1900, got {}",
            config.max_year
        )));
    }

    Ok(())
}

/// Validates storage configuration
fn validate_storage_config(config: &StorageConfig) -> Result<(), ConfigError> {
    if config.database_path.is_empty() {
        return Err(ConfigError::Validation(
            "database_path cannot be empty".to_string(),
        ));
    }

    Ok(())
}
