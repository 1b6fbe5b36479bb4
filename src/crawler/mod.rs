//! Crawler module for task processing
//!
//! This module contains the core crawling logic, including:
//! - HTTP fetching with a bounded timeout
//! - HTML parsing and link extraction
//! - Per-task processing (fetch or graph reuse, child task creation)
//! - The scheduling loop that claims tasks and runs workers

mod engine;
mod fetcher;
mod parser;
mod worker;

pub use engine::{Engine, RunSummary};
pub use fetcher::{build_http_client, fetch_page, MAX_REDIRECTS};
pub use parser::{extract_hrefs, extract_links};
pub use worker::{process_task, TaskOutcome};

use crate::config::Config;
use crate::storage::{SharedStorage, Storage};
use crate::CrawlError;

/// Builds an engine from a loaded configuration
///
/// # Arguments
///
/// * `config` - The crawler configuration
/// * `storage` - Shared storage backend
///
/// # Returns
///
/// * `Ok(Engine)` - Engine ready to run
/// * `Err(CrawlError)` - The HTTP client could not be built
pub fn engine_from_config<S>(
    config: &Config,
    storage: SharedStorage<S>,
) -> Result<Engine<S>, CrawlError>
where
    S: Storage + Send + 'static,
{
    let client = build_http_client(&config.fetch)?;
    Ok(Engine::new(storage, client, config.engine.clone()))
}
