use serde::Deserialize;
use std::time::Duration;

/// Main configuration structure for hostgraph
///
/// Every section is optional; a missing section takes its defaults.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub engine: EngineConfig,
    #[serde(default)]
    pub fetch: FetchConfig,
    #[serde(default, rename = "connect-retry")]
    pub connect_retry: RetryConfig,
}

/// Storage location configuration
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Path to the SQLite database file shared by all engine processes
    #[serde(default = "default_database_path")]
    pub path: String,

    /// How long a connection waits for another writer's lock (milliseconds)
    #[serde(rename = "busy-timeout-ms", default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,
}

/// How the scheduling loop hands tasks to workers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SchedulingMode {
    /// Claim up to max-workers tasks, wait for the whole batch, repeat
    #[default]
    Batch,
    /// Keep max-workers slots busy, claiming a new task whenever one frees up
    Continuous,
}

/// Crawl engine behavior configuration
#[derive(Debug, Clone, Deserialize)]
pub struct EngineConfig {
    /// Maximum number of tasks worked on concurrently by this process
    #[serde(rename = "max-workers", default = "default_max_workers")]
    pub max_workers: u32,

    /// Pause after a cycle that found no work (milliseconds)
    #[serde(rename = "poll-interval-ms", default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Age after which an IN_PROGRESS claim is considered orphaned (seconds)
    #[serde(
        rename = "stale-claim-after-secs",
        default = "default_stale_claim_after_secs"
    )]
    pub stale_claim_after_secs: u64,

    #[serde(default)]
    pub scheduling: SchedulingMode,
}

/// HTTP fetch configuration
#[derive(Debug, Clone, Deserialize)]
pub struct FetchConfig {
    /// Hard timeout for a single page fetch, body included (seconds)
    #[serde(rename = "timeout-secs", default = "default_fetch_timeout_secs")]
    pub timeout_secs: u64,

    #[serde(rename = "user-agent", default = "default_user_agent")]
    pub user_agent: String,
}

/// Bounded retry policy for opening the database at startup
#[derive(Debug, Clone, Deserialize)]
pub struct RetryConfig {
    /// Attempts made after the first failure before giving up
    #[serde(rename = "max-retries", default = "default_max_retries")]
    pub max_retries: u32,

    /// Delay before the first retry (seconds)
    #[serde(rename = "initial-delay-secs", default = "default_initial_delay_secs")]
    pub initial_delay_secs: u64,

    /// Amount added to the delay after every retry (seconds)
    #[serde(rename = "delay-step-secs", default = "default_delay_step_secs")]
    pub delay_step_secs: u64,
}

impl EngineConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn stale_claim_after(&self) -> Duration {
        Duration::from_secs(self.stale_claim_after_secs)
    }
}

impl FetchConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_database_path(),
            busy_timeout_ms: default_busy_timeout_ms(),
        }
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_workers: default_max_workers(),
            poll_interval_ms: default_poll_interval_ms(),
            stale_claim_after_secs: default_stale_claim_after_secs(),
            scheduling: SchedulingMode::default(),
        }
    }
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_fetch_timeout_secs(),
            user_agent: default_user_agent(),
        }
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            initial_delay_secs: default_initial_delay_secs(),
            delay_step_secs: default_delay_step_secs(),
        }
    }
}

fn default_database_path() -> String {
    "./hostgraph.db".to_string()
}

fn default_busy_timeout_ms() -> u64 {
    5_000
}

fn default_max_workers() -> u32 {
    20
}

fn default_poll_interval_ms() -> u64 {
    1_000
}

fn default_stale_claim_after_secs() -> u64 {
    600
}

fn default_fetch_timeout_secs() -> u64 {
    120
}

fn default_user_agent() -> String {
    format!("hostgraph/{}", env!("CARGO_PKG_VERSION"))
}

fn default_max_retries() -> u32 {
    4
}

fn default_initial_delay_secs() -> u64 {
    5
}

fn default_delay_step_secs() -> u64 {
    3
}
