//! Database schema definitions
//!
//! This module contains all SQL schema definitions for the hostgraph database.
//! The task queue and the page graph live in the same file so that one
//! database can be shared by every engine process.

/// SQL schema for the database
pub const SCHEMA_SQL: &str = r#"
-- User-submitted crawl requests
CREATE TABLE IF NOT EXISTS crawl_requests (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    url TEXT NOT NULL,
    levels INTEGER NOT NULL CHECK (levels >= 0),
    created_at TEXT NOT NULL
);

-- One row per (request, url, level) unit of work
CREATE TABLE IF NOT EXISTS tasks (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    crawl_request_id INTEGER NOT NULL REFERENCES crawl_requests(id),
    page_url TEXT NOT NULL,
    current_level INTEGER NOT NULL CHECK (current_level >= 0),
    status TEXT NOT NULL
        CHECK (status IN ('NOT_STARTED', 'IN_PROGRESS', 'COMPLETED', 'FAILED')),
    seen_url INTEGER NOT NULL DEFAULT 0,
    claimed_at TEXT,
    claimed_by TEXT
);

CREATE INDEX IF NOT EXISTS idx_tasks_claim ON tasks(status, crawl_request_id, id);
CREATE INDEX IF NOT EXISTS idx_tasks_request ON tasks(crawl_request_id);

-- Global page graph: one node per distinct URL
CREATE TABLE IF NOT EXISTS page_nodes (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    url TEXT NOT NULL UNIQUE,
    crawled_status INTEGER NOT NULL DEFAULT 0
);

-- Directed links between pages
CREATE TABLE IF NOT EXISTS edges (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    source_id INTEGER NOT NULL REFERENCES page_nodes(id),
    target_id INTEGER NOT NULL REFERENCES page_nodes(id),
    UNIQUE(source_id, target_id),
    CHECK (source_id <> target_id)
);

CREATE INDEX IF NOT EXISTS idx_edges_source ON edges(source_id);
"#;

/// Initializes the database schema
///
/// # Arguments
///
/// * `conn` - The database connection
///
/// # Returns
///
/// * `Ok(())` - Schema initialized successfully
/// * `Err(rusqlite::Error)` - Failed to initialize schema
pub fn initialize_schema(conn: &rusqlite::Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(SCHEMA_SQL)?;
    Ok(())
}
