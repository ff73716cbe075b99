use super::{types::Config, ConfigError};

/// Validate configuration
/// Currently validates:
/// - fuzzy_size_threshold is within [0, 1)
/// - fetch_timeout_secs is not 0
/// - max_parallel_fetches is at least 1
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    let threshold = config.matching.fuzzy_size_threshold;
    if !(0.0..1.0).contains(&threshold) {
        return Err(ConfigError::ValidationError(format!(
            "matching.fuzzy_size_threshold must be in [0, 1), got {}",
            threshold
        )));
    }

    if config.matching.fetch_timeout_secs == 0 {
        return Err(ConfigError::ValidationError(
            "matching.fetch_timeout_secs cannot be 0".to_string(),
        ));
    }

    if config.matching.max_parallel_fetches == 0 {
        return Err(ConfigError::ValidationError(
            "matching.max_parallel_fetches cannot be 0".to_string(),
        ));
    }

    Ok(())
}
