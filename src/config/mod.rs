//! Configuration module for hostgraph
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//! Every section is optional, so an engine can also run from command-line flags alone.
//!
//! # Example
//!
//! ```no_run
//! use hostgraph::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("hostgraph.toml")).unwrap();
//! println!("Engine will run {} workers", config.engine.max_workers);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{
    Config, DatabaseConfig, EngineConfig, FetchConfig, RetryConfig, SchedulingMode,
};

// Re-export parser functions
pub use parser::{
    apply_overrides, compute_config_hash, load_config, load_config_with_hash, parse_config,
};
