//! SQLite storage implementation
//!
//! This module provides a SQLite-based implementation of the Storage trait.
//! Every engine process opens its own connection to the same database file;
//! WAL mode plus a busy timeout lets them share the task queue, and claims
//! run inside IMMEDIATE transactions so two claimants never receive the same
//! task.

use crate::state::TaskStatus;
use crate::storage::schema::initialize_schema;
use crate::storage::traits::{Storage, StorageError, StorageResult};
use crate::storage::{
    CrawlRequestRecord, EdgeRecord, NewTask, PageRecord, StatusCounts, TaskRecord,
};
use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::types::{Type, Value};
use rusqlite::{
    params, params_from_iter, Connection, OptionalExtension, Row, TransactionBehavior,
};
use std::path::Path;
use std::time::Duration;

const TASK_COLUMNS: &str =
    "id, crawl_request_id, page_url, current_level, status, seen_url, claimed_at, claimed_by";

/// SQLite storage backend
pub struct SqliteStorage {
    conn: Connection,
}

impl SqliteStorage {
    /// Opens (or creates) a database file
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the SQLite database file
    /// * `busy_timeout` - How long to wait on a lock held by another connection
    ///
    /// # Returns
    ///
    /// * `Ok(SqliteStorage)` - Successfully opened/created database
    /// * `Err(StorageError)` - Failed to open database
    pub fn open(path: &Path, busy_timeout: Duration) -> StorageResult<Self> {
        let conn = Connection::open(path)?;
        conn.busy_timeout(busy_timeout)?;

        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA foreign_keys = ON;
            PRAGMA temp_store = MEMORY;
        ",
        )?;

        initialize_schema(&conn)?;

        Ok(Self { conn })
    }

    /// Creates an in-memory database
    pub fn new_in_memory() -> StorageResult<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        initialize_schema(&conn)?;
        Ok(Self { conn })
    }

    fn levels_of(&self, crawl_request_id: i64) -> StorageResult<u32> {
        self.conn
            .query_row(
                "SELECT levels FROM crawl_requests WHERE id = ?1",
                params![crawl_request_id],
                |row| row.get(0),
            )
            .optional()?
            .ok_or(StorageError::CrawlRequestNotFound(crawl_request_id))
    }

    /// Explains why a guarded status update touched no row
    fn transition_error(&self, task_id: i64, to: TaskStatus) -> StorageError {
        let current = self
            .conn
            .query_row(
                "SELECT status FROM tasks WHERE id = ?1",
                params![task_id],
                |row| row.get::<_, String>(0),
            )
            .optional();

        match current {
            Ok(Some(raw)) => match TaskStatus::from_db_string(&raw) {
                Some(from) => StorageError::InvalidTransition { task_id, from, to },
                None => StorageError::Corrupt(format!(
                    "task {} has unknown status '{}'",
                    task_id, raw
                )),
            },
            Ok(None) => StorageError::TaskNotFound(task_id),
            Err(e) => e.into(),
        }
    }
}

fn now_timestamp() -> String {
    timestamp(Utc::now())
}

/// Fixed-width RFC 3339 so stored timestamps compare correctly as text
fn timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn task_from_row(row: &Row<'_>) -> rusqlite::Result<TaskRecord> {
    let raw_status: String = row.get(4)?;
    let status = TaskStatus::from_db_string(&raw_status).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            4,
            Type::Text,
            format!("unknown task status '{}'", raw_status).into(),
        )
    })?;

    Ok(TaskRecord {
        id: row.get(0)?,
        crawl_request_id: row.get(1)?,
        page_url: row.get(2)?,
        current_level: row.get(3)?,
        status,
        seen_url: row.get(5)?,
        claimed_at: row.get(6)?,
        claimed_by: row.get(7)?,
    })
}

impl Storage for SqliteStorage {
    // ===== Crawl Requests =====

    fn create_crawl_request(&mut self, url: &str, levels: u32) -> StorageResult<i64> {
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;

        tx.execute(
            "INSERT INTO crawl_requests (url, levels, created_at) VALUES (?1, ?2, ?3)",
            params![url, levels, now_timestamp()],
        )?;
        let crawl_request_id = tx.last_insert_rowid();

        tx.execute(
            "INSERT INTO tasks (crawl_request_id, page_url, current_level, status, seen_url)
             VALUES (?1, ?2, 0, ?3, 0)",
            params![crawl_request_id, url, TaskStatus::NotStarted.to_db_string()],
        )?;

        tx.commit()?;
        Ok(crawl_request_id)
    }

    fn get_crawl_request(&self, crawl_request_id: i64) -> StorageResult<CrawlRequestRecord> {
        self.conn
            .query_row(
                "SELECT id, url, levels, created_at FROM crawl_requests WHERE id = ?1",
                params![crawl_request_id],
                |row| {
                    Ok(CrawlRequestRecord {
                        id: row.get(0)?,
                        url: row.get(1)?,
                        levels: row.get(2)?,
                        created_at: row.get(3)?,
                    })
                },
            )
            .optional()?
            .ok_or(StorageError::CrawlRequestNotFound(crawl_request_id))
    }

    // ===== Task Queue =====

    fn create_task(
        &mut self,
        crawl_request_id: i64,
        url: &str,
        level: u32,
        seen: bool,
    ) -> StorageResult<i64> {
        let ids = self.create_tasks(
            crawl_request_id,
            level,
            &[NewTask {
                url: url.to_string(),
                seen,
            }],
        )?;
        ids.into_iter()
            .next()
            .ok_or_else(|| StorageError::Corrupt("task insert returned no id".to_string()))
    }

    fn create_tasks(
        &mut self,
        crawl_request_id: i64,
        level: u32,
        tasks: &[NewTask],
    ) -> StorageResult<Vec<i64>> {
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;

        let levels: u32 = tx
            .query_row(
                "SELECT levels FROM crawl_requests WHERE id = ?1",
                params![crawl_request_id],
                |row| row.get(0),
            )
            .optional()?
            .ok_or(StorageError::CrawlRequestNotFound(crawl_request_id))?;

        if level > levels {
            return Err(StorageError::LevelOutOfRange {
                crawl_request_id,
                level,
                levels,
            });
        }

        let mut ids = Vec::with_capacity(tasks.len());
        {
            let mut stmt = tx.prepare_cached(
                "INSERT INTO tasks (crawl_request_id, page_url, current_level, status, seen_url)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
            )?;
            for task in tasks {
                let id = stmt.insert(params![
                    crawl_request_id,
                    task.url,
                    level,
                    TaskStatus::NotStarted.to_db_string(),
                    task.seen,
                ])?;
                ids.push(id);
            }
        }

        tx.commit()?;
        Ok(ids)
    }

    fn claim_next_task(&mut self, claimant: &str) -> StorageResult<Option<TaskRecord>> {
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;

        let sql = format!(
            "UPDATE tasks SET status = ?1, claimed_at = ?2, claimed_by = ?3
             WHERE id = (
                 SELECT id FROM tasks WHERE status = ?4
                 ORDER BY crawl_request_id ASC, id ASC LIMIT 1
             )
             RETURNING {}",
            TASK_COLUMNS
        );
        let task = tx
            .query_row(
                &sql,
                params![
                    TaskStatus::InProgress.to_db_string(),
                    now_timestamp(),
                    claimant,
                    TaskStatus::NotStarted.to_db_string(),
                ],
                task_from_row,
            )
            .optional()?;

        tx.commit()?;
        Ok(task)
    }

    fn set_task_status(&mut self, task_id: i64, status: TaskStatus) -> StorageResult<()> {
        let predecessors = status.predecessors();
        if predecessors.is_empty() {
            return Err(self.transition_error(task_id, status));
        }

        let mut sql = String::from("UPDATE tasks SET status = ?");
        let mut values = vec![Value::from(status.to_db_string().to_string())];
        if status == TaskStatus::InProgress {
            sql.push_str(", claimed_at = ?");
            values.push(Value::from(now_timestamp()));
        }

        let placeholders = vec!["?"; predecessors.len()].join(", ");
        sql.push_str(&format!(" WHERE id = ? AND status IN ({})", placeholders));
        values.push(Value::from(task_id));
        values.extend(
            predecessors
                .iter()
                .map(|from| Value::from(from.to_db_string().to_string())),
        );

        let changed = self.conn.execute(&sql, params_from_iter(values))?;
        if changed == 0 {
            return Err(self.transition_error(task_id, status));
        }
        Ok(())
    }

    fn release_task(&mut self, task_id: i64) -> StorageResult<()> {
        let changed = self.conn.execute(
            "UPDATE tasks SET status = ?1, claimed_at = NULL, claimed_by = NULL
             WHERE id = ?2 AND status = ?3",
            params![
                TaskStatus::NotStarted.to_db_string(),
                task_id,
                TaskStatus::InProgress.to_db_string(),
            ],
        )?;
        if changed == 0 {
            return Err(self.transition_error(task_id, TaskStatus::NotStarted));
        }
        Ok(())
    }

    fn requeue_stale_tasks(&mut self, claimed_before: DateTime<Utc>) -> StorageResult<usize> {
        let changed = self.conn.execute(
            "UPDATE tasks SET status = ?1, claimed_at = NULL, claimed_by = NULL
             WHERE status = ?2 AND (claimed_at IS NULL OR claimed_at < ?3)",
            params![
                TaskStatus::NotStarted.to_db_string(),
                TaskStatus::InProgress.to_db_string(),
                timestamp(claimed_before),
            ],
        )?;
        Ok(changed)
    }

    fn list_tasks(&self, crawl_request_id: i64) -> StorageResult<Vec<TaskRecord>> {
        self.levels_of(crawl_request_id)?;

        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM tasks WHERE crawl_request_id = ?1 ORDER BY id",
            TASK_COLUMNS
        ))?;
        let tasks = stmt
            .query_map(params![crawl_request_id], task_from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(tasks)
    }

    fn status_counts(&self, crawl_request_id: i64) -> StorageResult<StatusCounts> {
        let levels = self.levels_of(crawl_request_id)?;

        let mut stmt = self.conn.prepare(
            "SELECT status, COUNT(*) FROM tasks
             WHERE crawl_request_id = ?1 AND current_level < ?2
             GROUP BY status",
        )?;
        let rows = stmt.query_map(params![crawl_request_id, levels], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
        })?;

        let mut counts = StatusCounts::default();
        for row in rows {
            let (raw, count) = row?;
            let status = TaskStatus::from_db_string(&raw)
                .ok_or_else(|| StorageError::Corrupt(format!("unknown task status '{}'", raw)))?;
            counts.add(status, count as u64);
        }

        Ok(counts)
    }

    // ===== Page Graph =====

    fn upsert_page(&mut self, url: &str) -> StorageResult<i64> {
        self.conn.execute(
            "INSERT OR IGNORE INTO page_nodes (url) VALUES (?1)",
            params![url],
        )?;
        let id = self.conn.query_row(
            "SELECT id FROM page_nodes WHERE url = ?1",
            params![url],
            |row| row.get(0),
        )?;
        Ok(id)
    }

    fn get_page(&self, page_id: i64) -> StorageResult<PageRecord> {
        self.conn
            .query_row(
                "SELECT id, url, crawled_status FROM page_nodes WHERE id = ?1",
                params![page_id],
                |row| {
                    Ok(PageRecord {
                        id: row.get(0)?,
                        url: row.get(1)?,
                        crawled: row.get(2)?,
                    })
                },
            )
            .optional()?
            .ok_or(StorageError::PageNotFound(page_id))
    }

    fn edges_from(&self, page_id: i64) -> StorageResult<Vec<EdgeRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, source_id, target_id FROM edges WHERE source_id = ?1 ORDER BY id",
        )?;
        let edges = stmt
            .query_map(params![page_id], |row| {
                Ok(EdgeRecord {
                    id: row.get(0)?,
                    source_id: row.get(1)?,
                    target_id: row.get(2)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(edges)
    }

    fn record_outlinks(&mut self, page_id: i64, urls: &[String]) -> StorageResult<()> {
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;

        let exists = tx
            .query_row(
                "SELECT 1 FROM page_nodes WHERE id = ?1",
                params![page_id],
                |_| Ok(()),
            )
            .optional()?;
        if exists.is_none() {
            return Err(StorageError::PageNotFound(page_id));
        }

        {
            let mut insert_page =
                tx.prepare_cached("INSERT OR IGNORE INTO page_nodes (url) VALUES (?1)")?;
            let mut select_page = tx.prepare_cached("SELECT id FROM page_nodes WHERE url = ?1")?;
            let mut insert_edge = tx.prepare_cached(
                "INSERT OR IGNORE INTO edges (source_id, target_id) VALUES (?1, ?2)",
            )?;

            for url in urls {
                insert_page.execute(params![url])?;
                let target_id: i64 = select_page.query_row(params![url], |row| row.get(0))?;
                if target_id != page_id {
                    insert_edge.execute(params![page_id, target_id])?;
                }
            }
        }

        tx.execute(
            "UPDATE page_nodes SET crawled_status = 1 WHERE id = ?1 AND crawled_status = 0",
            params![page_id],
        )?;

        tx.commit()?;
        Ok(())
    }

    // ===== Statistics =====

    fn count_pages(&self) -> StorageResult<u64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM page_nodes", [], |row| row.get(0))?;
        Ok(count as u64)
    }

    fn count_edges(&self) -> StorageResult<u64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM edges", [], |row| row.get(0))?;
        Ok(count as u64)
    }
}
