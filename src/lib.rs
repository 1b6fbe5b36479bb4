//! hostgraph: a depth-bounded web crawler backed by a shared task queue
//!
//! Crawl requests are expanded breadth-first into tasks stored in SQLite.
//! Any number of engine workers (and engine processes sharing the same
//! database file) claim those tasks atomically, unfold pages into a global
//! link graph, and enqueue the next level. Finished requests are summarized
//! as per-host visit counts.

pub mod config;
pub mod crawler;
pub mod output;
pub mod requests;
pub mod state;
pub mod storage;
pub mod url;

use thiserror::Error;

/// Main error type for hostgraph operations
#[derive(Debug, Error)]
pub enum CrawlError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("HTTP error for {url}: {source}")]
    Http { url: String, source: reqwest::Error },

    #[error("Request timeout for {url}")]
    Timeout { url: String },

    #[error("Unexpected HTTP status {status} for {url}")]
    HttpStatus { url: String, status: u16 },

    #[error("Storage error: {0}")]
    Storage(#[from] storage::StorageError),

    #[error("URL error: {0}")]
    Url(#[from] UrlError),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("Aggregation error: {0}")]
    Aggregate(#[from] output::AggregateError),

    #[error("Worker panicked or was aborted: {0}")]
    Join(#[from] tokio::task::JoinError),

    #[error("Crawl engine is shutting down")]
    Cancelled,
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),
}

/// URL-specific errors
#[derive(Debug, Error)]
pub enum UrlError {
    #[error("Failed to parse URL: {0}")]
    Parse(String),

    #[error("Invalid URL scheme: {0}")]
    InvalidScheme(String),

    #[error("Missing host in URL: {0}")]
    MissingHost(String),
}

/// Result type alias for hostgraph operations
pub type Result<T> = std::result::Result<T, CrawlError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Result type alias for URL operations
pub type UrlResult<T> = std::result::Result<T, UrlError>;

// Re-export commonly used types
pub use config::Config;
pub use crawler::Engine;
pub use state::TaskStatus;
pub use url::{extract_host, normalize_root_url, resolve_link};
