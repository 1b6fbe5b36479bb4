//! Output module for reporting on crawl requests
//!
//! This module handles:
//! - Progress statistics for a crawl request and the page graph
//! - Aggregating a finished request into per-host counts

mod results;
pub mod stats;

pub use results::{host_counts, AggregateError};
pub use stats::{load_graph_statistics, print_status, CrawlStatus, GraphStatistics};
