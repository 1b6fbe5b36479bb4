//! Storage traits and error types
//!
//! This module defines the trait interface for storage backends and
//! associated error types.

use crate::state::TaskStatus;
use crate::storage::{CrawlRequestRecord, EdgeRecord, NewTask, PageRecord, StatusCounts, TaskRecord};
use chrono::{DateTime, Utc};
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Crawl request not found: {0}")]
    CrawlRequestNotFound(i64),

    #[error("Task not found: {0}")]
    TaskNotFound(i64),

    #[error("Page not found: {0}")]
    PageNotFound(i64),

    #[error("Invalid transition for task {task_id}: {from} -> {to}")]
    InvalidTransition {
        task_id: i64,
        from: TaskStatus,
        to: TaskStatus,
    },

    #[error("Task level {level} exceeds depth bound {levels} of crawl request {crawl_request_id}")]
    LevelOutOfRange {
        crawl_request_id: i64,
        level: u32,
        levels: u32,
    },

    #[error("Malformed stored data: {0}")]
    Corrupt(String),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Trait for storage backend implementations
///
/// This trait defines every database operation the crawl engine and the
/// request boundary need. Write operations that touch several rows are
/// expected to be atomic: either all of their effects become visible or none.
pub trait Storage {
    // ===== Crawl Requests =====

    /// Creates a crawl request together with its level-0 root task
    ///
    /// # Arguments
    ///
    /// * `url` - The already normalized root URL
    /// * `levels` - Depth bound for the crawl
    ///
    /// # Returns
    ///
    /// The ID of the newly created crawl request
    fn create_crawl_request(&mut self, url: &str, levels: u32) -> StorageResult<i64>;

    /// Gets a crawl request by ID
    fn get_crawl_request(&self, crawl_request_id: i64) -> StorageResult<CrawlRequestRecord>;

    // ===== Task Queue =====

    /// Inserts a single task in state NOT_STARTED
    fn create_task(
        &mut self,
        crawl_request_id: i64,
        url: &str,
        level: u32,
        seen: bool,
    ) -> StorageResult<i64>;

    /// Inserts a batch of tasks at one level in a single transaction
    fn create_tasks(
        &mut self,
        crawl_request_id: i64,
        level: u32,
        tasks: &[NewTask],
    ) -> StorageResult<Vec<i64>>;

    /// Atomically claims the oldest NOT_STARTED task
    ///
    /// The task with the lowest crawl request id (then lowest task id) moves
    /// to IN_PROGRESS, stamped with `claimant` and the claim time, and its row
    /// is returned. `Ok(None)` means no task is available.
    fn claim_next_task(&mut self, claimant: &str) -> StorageResult<Option<TaskRecord>>;

    /// Moves a task to `status`, rejecting anything outside the transition table
    fn set_task_status(&mut self, task_id: i64, status: TaskStatus) -> StorageResult<()>;

    /// Hands a claimed task back to the queue (IN_PROGRESS -> NOT_STARTED)
    fn release_task(&mut self, task_id: i64) -> StorageResult<()>;

    /// Requeues IN_PROGRESS tasks claimed before `claimed_before`
    ///
    /// # Returns
    ///
    /// The number of tasks moved back to NOT_STARTED
    fn requeue_stale_tasks(&mut self, claimed_before: DateTime<Utc>) -> StorageResult<usize>;

    /// Gets every task of a crawl request, in creation order
    fn list_tasks(&self, crawl_request_id: i64) -> StorageResult<Vec<TaskRecord>>;

    /// Counts tasks by status, ignoring tasks sitting at the depth bound
    fn status_counts(&self, crawl_request_id: i64) -> StorageResult<StatusCounts>;

    // ===== Page Graph =====

    /// Inserts a new page or gets the existing page ID
    fn upsert_page(&mut self, url: &str) -> StorageResult<i64>;

    /// Gets a page by ID
    fn get_page(&self, page_id: i64) -> StorageResult<PageRecord>;

    /// Gets all outgoing edges from a page, in insertion order
    fn edges_from(&self, page_id: i64) -> StorageResult<Vec<EdgeRecord>>;

    /// Records the outlinks of a freshly fetched page
    ///
    /// Upserts each target page, inserts missing (source, target) edges
    /// (skipping self links), then marks the source page as crawled. The
    /// whole operation is one transaction.
    fn record_outlinks(&mut self, page_id: i64, urls: &[String]) -> StorageResult<()>;

    // ===== Statistics =====

    /// Gets total page count
    fn count_pages(&self) -> StorageResult<u64>;

    /// Counts the total number of edges
    fn count_edges(&self) -> StorageResult<u64>;
}
