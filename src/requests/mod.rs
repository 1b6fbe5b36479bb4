//! Crawl request operations
//!
//! The external surface of the crawler: submit a root URL with a depth
//! bound, ask how far a request has progressed, and read its per-host
//! results once it has finished.

use crate::output::{host_counts, CrawlStatus};
use crate::storage::Storage;
use crate::url::normalize_root_url;
use crate::CrawlError;
use std::collections::BTreeMap;

/// Creates a crawl request and queues its root task
///
/// The URL is normalized first: a missing scheme defaults to `http` and the
/// fragment is dropped.
///
/// # Arguments
///
/// * `storage` - The storage backend
/// * `url` - Root URL as supplied by the user
/// * `levels` - Depth bound; 0 records the root without fetching it
///
/// # Returns
///
/// * `Ok(i64)` - ID of the new crawl request
/// * `Err(CrawlError)` - The URL was rejected or storage failed
///
/// # Example
///
/// ```
/// use hostgraph::requests::{create_crawl_request, crawl_status};
/// use hostgraph::storage::SqliteStorage;
///
/// let mut storage = SqliteStorage::new_in_memory().unwrap();
/// let id = create_crawl_request(&mut storage, "example.com#top", 2).unwrap();
/// let status = crawl_status(&storage, id).unwrap();
/// assert_eq!(status.url, "http://example.com/");
/// assert_eq!(status.total, 0);
/// ```
pub fn create_crawl_request(
    storage: &mut dyn Storage,
    url: &str,
    levels: u32,
) -> Result<i64, CrawlError> {
    let root = normalize_root_url(url)?;
    let id = storage.create_crawl_request(root.as_str(), levels)?;

    tracing::info!("Created crawl request {} for {} ({} levels)", id, root, levels);
    Ok(id)
}

/// Reports the progress of a crawl request
pub fn crawl_status(storage: &dyn Storage, crawl_request_id: i64) -> Result<CrawlStatus, CrawlError> {
    let request = storage.get_crawl_request(crawl_request_id)?;
    let counts = storage.status_counts(crawl_request_id)?;
    Ok(CrawlStatus::new(&request, &counts))
}

/// Returns host -> task count for a finished crawl request
///
/// Fails with [`crate::output::AggregateError::NotCompleted`] while any task
/// is still queued or running.
pub fn crawl_results(
    storage: &dyn Storage,
    crawl_request_id: i64,
) -> Result<BTreeMap<String, u64>, CrawlError> {
    let request = storage.get_crawl_request(crawl_request_id)?;
    let tasks = storage.list_tasks(crawl_request_id)?;
    Ok(host_counts(&request, &tasks)?)
}
