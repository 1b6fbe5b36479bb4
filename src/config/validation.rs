use crate::config::types::{Config, DatabaseConfig, EngineConfig, FetchConfig, RetryConfig};
use crate::ConfigError;

/// Upper bound on concurrent workers in one process
const MAX_WORKERS_LIMIT: u32 = 256;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_database_config(&config.database)?;
    validate_engine_config(&config.engine)?;
    validate_fetch_config(&config.fetch)?;
    validate_retry_config(&config.connect_retry)?;

    // A live claim must never look stale, so the threshold has to outlast a fetch
    if config.engine.stale_claim_after_secs <= config.fetch.timeout_secs {
        return Err(ConfigError::Validation(format!(
            "stale-claim-after-secs ({}) must be greater than fetch timeout-secs ({})",
            config.engine.stale_claim_after_secs, config.fetch.timeout_secs
        )));
    }

    Ok(())
}

fn validate_database_config(config: &DatabaseConfig) -> Result<(), ConfigError> {
    if config.path.trim().is_empty() {
        return Err(ConfigError::Validation(
            "database path cannot be empty".to_string(),
        ));
    }
    Ok(())
}

fn validate_engine_config(config: &EngineConfig) -> Result<(), ConfigError> {
    if config.max_workers < 1 || config.max_workers > MAX_WORKERS_LIMIT {
        return Err(ConfigError::Validation(format!(
            "max-workers must be between 1 and {}, got {}",
            MAX_WORKERS_LIMIT, config.max_workers
        )));
    }

    if config.poll_interval_ms < 10 {
        return Err(ConfigError::Validation(format!(
            "poll-interval-ms must be >= 10ms, got {}ms",
            config.poll_interval_ms
        )));
    }

    Ok(())
}

fn validate_fetch_config(config: &FetchConfig) -> Result<(), ConfigError> {
    if config.timeout_secs < 1 || config.timeout_secs > 3600 {
        return Err(ConfigError::Validation(format!(
            "fetch timeout-secs must be between 1 and 3600, got {}",
            config.timeout_secs
        )));
    }

    if config.user_agent.trim().is_empty() {
        return Err(ConfigError::Validation(
            "user-agent cannot be empty".to_string(),
        ));
    }

    Ok(())
}

fn validate_retry_config(config: &RetryConfig) -> Result<(), ConfigError> {
    if config.max_retries > 100 {
        return Err(ConfigError::Validation(format!(
            "connect-retry max-retries must be <= 100, got {}",
            config.max_retries
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        assert!(validate(&Config::default()).is_ok());
    }

    #[test]
    fn test_max_workers_bounds() {
        let mut config = Config::default();
        config.engine.max_workers = 0;
        assert!(validate(&config).is_err());

        config.engine.max_workers = MAX_WORKERS_LIMIT + 1;
        assert!(validate(&config).is_err());

        config.engine.max_workers = 1;
        assert!(validate(&config).is_ok());
    }

    #[test]
    fn test_stale_claim_must_outlast_fetch() {
        let mut config = Config::default();
        config.fetch.timeout_secs = 120;
        config.engine.stale_claim_after_secs = 120;
        assert!(matches!(
            validate(&config).unwrap_err(),
            ConfigError::Validation(_)
        ));
    }

    #[test]
    fn test_empty_database_path() {
        let mut config = Config::default();
        config.database.path = "  ".to_string();
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_fetch_timeout_bounds() {
        let mut config = Config::default();
        config.fetch.timeout_secs = 0;
        assert!(validate(&config).is_err());
    }
}
