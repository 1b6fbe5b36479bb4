//! Storage module for persisting crawl data
//!
//! This module handles all database operations for the crawler, including:
//! - SQLite database initialization and schema management
//! - Crawl requests and their task queue, with atomic claiming
//! - The global page graph (pages and edges)
//! - Bounded retry when opening the database at startup

mod retry;
mod schema;
mod sqlite;
mod traits;

pub use retry::{connect_with_retry, RetryPolicy};
pub use sqlite::SqliteStorage;
pub use traits::{Storage, StorageError, StorageResult};

use crate::config::Config;
use crate::state::TaskStatus;

use std::sync::{Arc, Mutex, MutexGuard};

/// Storage handle shared between the engine and its workers
pub type SharedStorage<S> = Arc<Mutex<S>>;

/// Wraps a storage backend for sharing across workers
pub fn share<S>(storage: S) -> SharedStorage<S> {
    Arc::new(Mutex::new(storage))
}

/// Locks a shared storage handle
///
/// A worker that panicked while holding the lock leaves the connection in a
/// usable state (every multi-row write is a transaction), so poisoning is
/// ignored.
pub fn lock<S>(storage: &Mutex<S>) -> MutexGuard<'_, S> {
    storage.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Opens the configured database, retrying per the connect-retry policy
///
/// # Arguments
///
/// * `config` - The loaded configuration
///
/// # Returns
///
/// * `Ok(SqliteStorage)` - Successfully opened storage
/// * `Err(StorageError)` - Every attempt failed; the last error is returned
pub async fn open_storage(config: &Config) -> Result<SqliteStorage, StorageError> {
    let policy = RetryPolicy::from_config(&config.connect_retry);
    let path = std::path::PathBuf::from(&config.database.path);
    let busy_timeout = std::time::Duration::from_millis(config.database.busy_timeout_ms);

    connect_with_retry(&policy, &config.database.path, || {
        SqliteStorage::open(&path, busy_timeout)
    })
    .await
}

/// Represents a crawl request in the database
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrawlRequestRecord {
    pub id: i64,
    pub url: String,
    pub levels: u32,
    pub created_at: String,
}

/// Represents a task in the database
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskRecord {
    pub id: i64,
    pub crawl_request_id: i64,
    pub page_url: String,
    pub current_level: u32,
    pub status: TaskStatus,
    pub seen_url: bool,
    pub claimed_at: Option<String>,
    pub claimed_by: Option<String>,
}

/// A child task waiting to be inserted
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTask {
    pub url: String,
    pub seen: bool,
}

/// Represents a page node in the graph
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRecord {
    pub id: i64,
    pub url: String,
    pub crawled: bool,
}

/// Represents a link between two pages
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EdgeRecord {
    pub id: i64,
    pub source_id: i64,
    pub target_id: i64,
}

/// Per-status task counts for one crawl request
///
/// Only tasks below the request's depth bound are counted; tasks at the
/// bound exist for host accounting and are never crawled.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatusCounts {
    pub not_started: u64,
    pub in_progress: u64,
    pub completed: u64,
    pub failed: u64,
}

impl StatusCounts {
    /// Tasks that have been attempted: completed + failed + in progress
    pub fn total(&self) -> u64 {
        self.completed + self.failed + self.in_progress
    }

    pub(crate) fn add(&mut self, status: TaskStatus, count: u64) {
        match status {
            TaskStatus::NotStarted => self.not_started += count,
            TaskStatus::InProgress => self.in_progress += count,
            TaskStatus::Completed => self.completed += count,
            TaskStatus::Failed => self.failed += count,
        }
    }
}
