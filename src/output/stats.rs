//! Progress statistics for crawl requests and the page graph
//!
//! This module provides functionality for extracting and displaying
//! crawl statistics from the storage layer.

use crate::storage::{CrawlRequestRecord, StatusCounts, Storage};
use crate::CrawlError;
use serde::Serialize;

/// Progress of one crawl request
///
/// Counts cover only tasks below the depth bound; `total` is
/// completed + failed + in progress.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CrawlStatus {
    pub url: String,
    pub completed: u64,
    pub failed: u64,
    pub in_progress: u64,
    pub total: u64,
}

impl CrawlStatus {
    pub fn new(request: &CrawlRequestRecord, counts: &StatusCounts) -> Self {
        Self {
            url: request.url.clone(),
            completed: counts.completed,
            failed: counts.failed,
            in_progress: counts.in_progress,
            total: counts.total(),
        }
    }
}

/// Size of the shared page graph
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct GraphStatistics {
    pub pages: u64,
    pub edges: u64,
}

/// Loads graph statistics from storage
///
/// # Arguments
///
/// * `storage` - The storage backend to query
///
/// # Returns
///
/// * `Ok(GraphStatistics)` - Successfully loaded statistics
/// * `Err(CrawlError)` - Failed to query statistics
pub fn load_graph_statistics(storage: &dyn Storage) -> Result<GraphStatistics, CrawlError> {
    Ok(GraphStatistics {
        pages: storage.count_pages()?,
        edges: storage.count_edges()?,
    })
}

/// Prints a crawl request's progress to stdout
pub fn print_status(id: i64, status: &CrawlStatus, graph: &GraphStatistics) {
    println!("=== Crawl Request {} ===\n", id);
    println!("URL: {}", status.url);
    println!();

    println!("Tasks:");
    println!("  Completed:   {}", status.completed);
    println!("  Failed:      {}", status.failed);
    println!("  In progress: {}", status.in_progress);
    println!("  Total:       {}", status.total);
    println!();

    let finished = status.completed + status.failed;
    let percentage = if status.total > 0 {
        (finished as f64 / status.total as f64) * 100.0
    } else {
        0.0
    };
    println!(
        "Finished: {:.1}% ({} / {} tasks)",
        percentage, finished, status.total
    );
    println!();

    println!("Page graph: {} pages, {} links", graph.pages, graph.edges);
}
