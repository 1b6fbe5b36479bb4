use crate::config::types::Config;
use crate::config::validation::validate;
use crate::ConfigError;
use sha2::{Digest, Sha256};
use std::path::Path;

/// Loads and parses a configuration file from the given path
///
/// # Arguments
///
/// * `path` - Path to the TOML configuration file
///
/// # Returns
///
/// * `Ok(Config)` - Successfully loaded and validated configuration
/// * `Err(ConfigError)` - Failed to load, parse, or validate the configuration
///
/// # Example
///
/// ```no_run
/// use std::path::Path;
/// use hostgraph::config::load_config;
///
/// let config = load_config(Path::new("hostgraph.toml")).unwrap();
/// println!("Max workers: {}", config.engine.max_workers);
/// ```
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    parse_config(&content)
}

/// Parses and validates configuration from TOML text
pub fn parse_config(content: &str) -> Result<Config, ConfigError> {
    let config: Config = toml::from_str(content)?;
    validate(&config)?;
    Ok(config)
}

/// Computes a SHA-256 hash of the configuration file content
///
/// Logged at startup so that engines sharing one database can be checked
/// for running the same configuration.
pub fn compute_config_hash(path: &Path) -> Result<String, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    let result = hasher.finalize();
    Ok(hex::encode(result))
}

/// Loads a configuration and returns both the config and its hash
pub fn load_config_with_hash(path: &Path) -> Result<(Config, String), ConfigError> {
    let config = load_config(path)?;
    let hash = compute_config_hash(path)?;
    Ok((config, hash))
}

/// Applies command-line overrides on top of a loaded configuration
///
/// The result is validated again, since an override can break an invariant
/// the file satisfied.
pub fn apply_overrides(
    mut config: Config,
    database_path: Option<&str>,
    max_workers: Option<u32>,
) -> Result<Config, ConfigError> {
    if let Some(path) = database_path {
        config.database.path = path.to_string();
    }
    if let Some(workers) = max_workers {
        config.engine.max_workers = workers;
    }
    validate(&config)?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SchedulingMode;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn create_temp_config(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file.flush().unwrap();
        file
    }

    #[test]
    fn test_load_valid_config() {
        let config_content = r#"
[database]
path = "./crawl.db"
busy-timeout-ms = 2000

[engine]
max-workers = 8
poll-interval-ms = 250
stale-claim-after-secs = 900
scheduling = "continuous"

[fetch]
timeout-secs = 60
user-agent = "TestCrawler/1.0"

[connect-retry]
max-retries = 2
initial-delay-secs = 1
delay-step-secs = 1
"#;

        let file = create_temp_config(config_content);
        let config = load_config(file.path()).unwrap();

        assert_eq!(config.database.path, "./crawl.db");
        assert_eq!(config.engine.max_workers, 8);
        assert_eq!(config.engine.scheduling, SchedulingMode::Continuous);
        assert_eq!(config.fetch.timeout_secs, 60);
        assert_eq!(config.connect_retry.max_retries, 2);
    }

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = parse_config("").unwrap();
        assert_eq!(config.engine.max_workers, 20);
        assert_eq!(config.engine.scheduling, SchedulingMode::Batch);
        assert_eq!(config.fetch.timeout_secs, 120);
        assert_eq!(config.connect_retry.max_retries, 4);
    }

    #[test]
    fn test_load_config_with_invalid_path() {
        let result = load_config(Path::new("/nonexistent/hostgraph.toml"));
        assert!(matches!(result.unwrap_err(), ConfigError::Io(_)));
    }

    #[test]
    fn test_load_config_with_invalid_toml() {
        let file = create_temp_config("this is not valid TOML {{{");
        let result = load_config(file.path());
        assert!(matches!(result.unwrap_err(), ConfigError::Parse(_)));
    }

    #[test]
    fn test_load_config_with_validation_error() {
        let file = create_temp_config("[engine]\nmax-workers = 0\n");
        let result = load_config(file.path());
        assert!(matches!(result.unwrap_err(), ConfigError::Validation(_)));
    }

    #[test]
    fn test_unknown_scheduling_mode_rejected() {
        let result = parse_config("[engine]\nscheduling = \"eager\"\n");
        assert!(matches!(result.unwrap_err(), ConfigError::Parse(_)));
    }

    #[test]
    fn test_overrides_are_validated() {
        let config = apply_overrides(Config::default(), Some("/tmp/x.db"), Some(4)).unwrap();
        assert_eq!(config.database.path, "/tmp/x.db");
        assert_eq!(config.engine.max_workers, 4);

        assert!(apply_overrides(Config::default(), None, Some(0)).is_err());
    }

    #[test]
    fn test_compute_config_hash() {
        let file = create_temp_config("test content");

        let hash1 = compute_config_hash(file.path()).unwrap();
        let hash2 = compute_config_hash(file.path()).unwrap();

        assert_eq!(hash1, hash2);
        assert_eq!(hash1.len(), 64);
    }
}
