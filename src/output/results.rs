//! Per-host result aggregation
//!
//! A finished crawl request is summarized as the number of tasks that landed
//! on each host other than the root's own host.

use crate::storage::{CrawlRequestRecord, TaskRecord};
use crate::url::host_of;
use std::collections::BTreeMap;
use thiserror::Error;

/// Errors that can occur while aggregating results
#[derive(Debug, Error, PartialEq, Eq)]
pub enum AggregateError {
    #[error("Crawl request {crawl_request_id} is not finished ({active} tasks still active)")]
    NotCompleted { crawl_request_id: i64, active: usize },

    #[error("Root URL of crawl request {crawl_request_id} has no host: {url}")]
    InvalidRoot { crawl_request_id: i64, url: String },
}

/// Counts tasks per host, excluding the root host
///
/// Every task contributes one occurrence, including tasks flagged as seen
/// and tasks that failed. Task URLs without a parseable host are skipped
/// with a warning.
///
/// # Arguments
///
/// * `request` - The crawl request being summarized
/// * `tasks` - Every task of that request
///
/// # Returns
///
/// * `Ok(BTreeMap)` - Host to task count, ordered by host
/// * `Err(AggregateError::NotCompleted)` - Some task is NOT_STARTED or IN_PROGRESS
pub fn host_counts(
    request: &CrawlRequestRecord,
    tasks: &[TaskRecord],
) -> Result<BTreeMap<String, u64>, AggregateError> {
    let active = tasks.iter().filter(|t| t.status.is_active()).count();
    if active > 0 {
        return Err(AggregateError::NotCompleted {
            crawl_request_id: request.id,
            active,
        });
    }

    let root_host = host_of(&request.url).ok_or_else(|| AggregateError::InvalidRoot {
        crawl_request_id: request.id,
        url: request.url.clone(),
    })?;

    let mut counts = BTreeMap::new();
    for task in tasks {
        match host_of(&task.page_url) {
            Some(host) if host == root_host => {}
            Some(host) => *counts.entry(host).or_insert(0) += 1,
            None => tracing::warn!(
                "Skipping task {} with unparseable URL {}",
                task.id,
                task.page_url
            ),
        }
    }

    Ok(counts)
}
