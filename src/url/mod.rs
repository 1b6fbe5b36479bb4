//! URL handling module
//!
//! This module provides root URL normalization for new crawl requests,
//! link resolution for extracted hrefs, and hostname extraction.

mod host;
mod normalize;

// Re-export main functions
pub use host::{extract_host, host_of};
pub use normalize::{normalize_links, normalize_root_url, resolve_link};
