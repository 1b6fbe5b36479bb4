//! Integration tests for hostgraph
//!
//! Crawls run against wiremock servers and file-backed databases created in
//! temporary directories.

mod claim_tests;
mod common;
mod crawl_tests;
