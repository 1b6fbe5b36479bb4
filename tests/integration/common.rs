//! Shared setup for the integration tests

use hostgraph::config::{EngineConfig, FetchConfig, SchedulingMode};
use hostgraph::crawler::{build_http_client, Engine};
use hostgraph::storage::{SharedStorage, SqliteStorage};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tempfile::TempDir;

/// A database file in its own temporary directory
pub struct TestDatabase {
    _dir: TempDir,
    pub path: PathBuf,
}

impl TestDatabase {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        let path = dir.path().join("hostgraph.db");
        Self { _dir: dir, path }
    }

    pub fn open(&self) -> SqliteStorage {
        open_at(&self.path)
    }
}

pub fn open_at(path: &Path) -> SqliteStorage {
    SqliteStorage::open(path, Duration::from_secs(10)).expect("Failed to open database")
}

pub fn engine_config(scheduling: SchedulingMode) -> EngineConfig {
    EngineConfig {
        max_workers: 4,
        poll_interval_ms: 20,
        stale_claim_after_secs: 600,
        scheduling,
    }
}

pub fn test_engine(
    storage: &SharedStorage<SqliteStorage>,
    scheduling: SchedulingMode,
) -> Engine<SqliteStorage> {
    let client = build_http_client(&FetchConfig {
        timeout_secs: 10,
        user_agent: "hostgraph-tests/1.0".to_string(),
    })
    .expect("Failed to build client");

    Engine::new(storage.clone(), client, engine_config(scheduling))
}

/// An HTML page with one anchor per href
pub fn page_linking_to(hrefs: &[&str]) -> String {
    let anchors: String = hrefs
        .iter()
        .map(|href| format!(r#"<a href="{}">link</a>"#, href))
        .collect();
    format!("<html><body>{}</body></html>", anchors)
}
