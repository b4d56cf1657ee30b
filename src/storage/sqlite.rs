//! SQLite implementation of [`CrawlStore`]
//!
//! Timestamps are stored as UTC milliseconds and identifiers as hyphenated
//! UUID text. Multi-statement operations run inside `IMMEDIATE` transactions
//! so the write lock is taken up front and concurrent nodes serialize on it.

use std::path::Path;
use std::str::FromStr;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use chrono::{DateTime, Utc};
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row, TransactionBehavior};
use uuid::Uuid;

use super::repository::{Assignment, ChildInsert, CrawlStore};
use super::{StoreError, StoreResult};
use crate::models::{
    CrawlResult, Job, JobStatus, Node, StatusParseError, Task, TaskCounts, TaskStatus,
    TransitionError,
};

const SCHEMA: &str = r#"
    CREATE TABLE IF NOT EXISTS crawl_jobs (
        id TEXT PRIMARY KEY,
        seed_url TEXT NOT NULL,
        max_depth INTEGER NOT NULL,
        max_pages INTEGER NOT NULL,
        status TEXT NOT NULL,
        owner TEXT NOT NULL,
        created_at INTEGER NOT NULL,
        started_at INTEGER,
        completed_at INTEGER
    );

    CREATE INDEX IF NOT EXISTS idx_crawl_jobs_status ON crawl_jobs(status);
    CREATE INDEX IF NOT EXISTS idx_crawl_jobs_owner ON crawl_jobs(owner);

    CREATE TABLE IF NOT EXISTS crawl_tasks (
        id TEXT PRIMARY KEY,
        job_id TEXT NOT NULL REFERENCES crawl_jobs(id) ON DELETE CASCADE,
        url TEXT NOT NULL,
        depth INTEGER NOT NULL,
        status TEXT NOT NULL,
        assigned_node TEXT,
        created_at INTEGER NOT NULL,
        assigned_at INTEGER,
        completed_at INTEGER,
        UNIQUE (job_id, url)
    );

    CREATE INDEX IF NOT EXISTS idx_crawl_tasks_status ON crawl_tasks(status, created_at);
    CREATE INDEX IF NOT EXISTS idx_crawl_tasks_node ON crawl_tasks(assigned_node, status);

    CREATE TABLE IF NOT EXISTS crawl_results (
        id TEXT PRIMARY KEY,
        job_id TEXT NOT NULL REFERENCES crawl_jobs(id) ON DELETE CASCADE,
        task_id TEXT NOT NULL UNIQUE REFERENCES crawl_tasks(id) ON DELETE CASCADE,
        url TEXT NOT NULL,
        status_code INTEGER NOT NULL,
        title TEXT,
        link_count INTEGER NOT NULL DEFAULT 0,
        error_message TEXT,
        crawled_at INTEGER NOT NULL
    );

    CREATE INDEX IF NOT EXISTS idx_crawl_results_job ON crawl_results(job_id, crawled_at);

    CREATE TABLE IF NOT EXISTS crawler_nodes (
        id TEXT PRIMARY KEY,
        label TEXT NOT NULL UNIQUE,
        hostname TEXT NOT NULL,
        last_heartbeat INTEGER NOT NULL,
        status TEXT NOT NULL,
        is_leader INTEGER NOT NULL DEFAULT 0
    );

    CREATE INDEX IF NOT EXISTS idx_crawler_nodes_liveness ON crawler_nodes(status, last_heartbeat);
"#;

const JOB_COLUMNS: &str =
    "id, seed_url, max_depth, max_pages, status, owner, created_at, started_at, completed_at";

const TASK_COLUMNS: &str =
    "id, job_id, url, depth, status, assigned_node, created_at, assigned_at, completed_at";

const RESULT_COLUMNS: &str =
    "id, job_id, task_id, url, status_code, title, link_count, error_message, crawled_at";

const NODE_COLUMNS: &str = "id, label, hostname, last_heartbeat, status, is_leader";

/// Shared store backed by a single SQLite database file
///
/// Uses `Mutex` to serialize access to the connection within one process;
/// cross-process safety comes from SQLite locking.
pub struct SqliteCrawlStore {
    conn: Mutex<Connection>,
}

impl SqliteCrawlStore {
    /// Open (or create) the database at `path`
    pub fn new(path: impl AsRef<Path>, busy_timeout: Duration) -> StoreResult<Self> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open(path)?;
        conn.busy_timeout(busy_timeout)?;

        // WAL lets readers on other nodes proceed during a write
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL;")?;

        let store = Self::with_connection(conn)?;
        tracing::info!(path = %path.display(), "SQLite crawl store initialized");
        Ok(store)
    }

    /// Create an in-memory store (for testing)
    pub fn in_memory() -> StoreResult<Self> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> StoreResult<Self> {
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> StoreResult<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| StoreError::LockPoisoned)
    }
}

// ============================================================================
// Row mapping
// ============================================================================

fn millis(at: DateTime<Utc>) -> i64 {
    at.timestamp_millis()
}

fn opt_millis(at: Option<DateTime<Utc>>) -> Option<i64> {
    at.map(millis)
}

fn time_at(row: &Row<'_>, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let ms: i64 = row.get(idx)?;
    DateTime::from_timestamp_millis(ms).ok_or(rusqlite::Error::IntegralValueOutOfRange(idx, ms))
}

fn opt_time_at(row: &Row<'_>, idx: usize) -> rusqlite::Result<Option<DateTime<Utc>>> {
    match row.get::<_, Option<i64>>(idx)? {
        Some(ms) => DateTime::from_timestamp_millis(ms)
            .map(Some)
            .ok_or(rusqlite::Error::IntegralValueOutOfRange(idx, ms)),
        None => Ok(None),
    }
}

fn uuid_at(row: &Row<'_>, idx: usize) -> rusqlite::Result<Uuid> {
    let text: String = row.get(idx)?;
    Uuid::parse_str(&text)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn opt_uuid_at(row: &Row<'_>, idx: usize) -> rusqlite::Result<Option<Uuid>> {
    match row.get::<_, Option<String>>(idx)? {
        Some(text) => Uuid::parse_str(&text)
            .map(Some)
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e))),
        None => Ok(None),
    }
}

fn status_at<S>(row: &Row<'_>, idx: usize) -> rusqlite::Result<S>
where
    S: FromStr<Err = StatusParseError>,
{
    let text: String = row.get(idx)?;
    text.parse()
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn job_from_row(row: &Row<'_>) -> rusqlite::Result<Job> {
    Ok(Job {
        id: uuid_at(row, 0)?,
        seed_url: row.get(1)?,
        max_depth: row.get(2)?,
        max_pages: row.get(3)?,
        status: status_at(row, 4)?,
        owner: row.get(5)?,
        created_at: time_at(row, 6)?,
        started_at: opt_time_at(row, 7)?,
        completed_at: opt_time_at(row, 8)?,
    })
}

fn task_from_row(row: &Row<'_>) -> rusqlite::Result<Task> {
    Ok(Task {
        id: uuid_at(row, 0)?,
        job_id: uuid_at(row, 1)?,
        url: row.get(2)?,
        depth: row.get(3)?,
        status: status_at(row, 4)?,
        assigned_node: opt_uuid_at(row, 5)?,
        created_at: time_at(row, 6)?,
        assigned_at: opt_time_at(row, 7)?,
        completed_at: opt_time_at(row, 8)?,
    })
}

fn result_from_row(row: &Row<'_>) -> rusqlite::Result<CrawlResult> {
    Ok(CrawlResult {
        id: uuid_at(row, 0)?,
        job_id: uuid_at(row, 1)?,
        task_id: uuid_at(row, 2)?,
        url: row.get(3)?,
        status_code: row.get(4)?,
        title: row.get(5)?,
        link_count: row.get(6)?,
        error_message: row.get(7)?,
        crawled_at: time_at(row, 8)?,
    })
}

fn node_from_row(row: &Row<'_>) -> rusqlite::Result<Node> {
    Ok(Node {
        id: uuid_at(row, 0)?,
        label: row.get(1)?,
        hostname: row.get(2)?,
        last_heartbeat: time_at(row, 3)?,
        status: status_at(row, 4)?,
        is_leader: row.get(5)?,
    })
}

fn query_list<T, P>(
    conn: &Connection,
    sql: &str,
    params: P,
    map: fn(&Row<'_>) -> rusqlite::Result<T>,
) -> StoreResult<Vec<T>>
where
    P: rusqlite::Params,
{
    let mut stmt = conn.prepare_cached(sql)?;
    let rows = stmt.query_map(params, map)?;
    let items = rows.collect::<rusqlite::Result<Vec<T>>>()?;
    Ok(items)
}

fn insert_task_row(conn: &Connection, task: &Task) -> rusqlite::Result<usize> {
    conn.execute(
        &format!("INSERT OR IGNORE INTO crawl_tasks ({TASK_COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)"),
        params![
            task.id.to_string(),
            task.job_id.to_string(),
            task.url,
            task.depth,
            task.status.as_str(),
            task.assigned_node.map(|id| id.to_string()),
            millis(task.created_at),
            opt_millis(task.assigned_at),
            opt_millis(task.completed_at),
        ],
    )
}

fn illegal(entity: &'static str, from: impl ToString, to: impl ToString) -> StoreError {
    StoreError::IllegalTransition(TransitionError {
        entity,
        from: from.to_string(),
        to: to.to_string(),
    })
}

// ============================================================================
// CrawlStore
// ============================================================================

impl CrawlStore for SqliteCrawlStore {
    fn create_job(&self, job: &Job, seed: &Task) -> StoreResult<()> {
        let mut conn = self.conn()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        tx.execute(
            &format!("INSERT INTO crawl_jobs ({JOB_COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)"),
            params![
                job.id.to_string(),
                job.seed_url,
                job.max_depth,
                job.max_pages,
                job.status.as_str(),
                job.owner,
                millis(job.created_at),
                opt_millis(job.started_at),
                opt_millis(job.completed_at),
            ],
        )?;
        insert_task_row(&tx, seed)?;

        tx.commit()?;
        Ok(())
    }

    fn get_job(&self, id: Uuid) -> StoreResult<Option<Job>> {
        let conn = self.conn()?;
        let job = conn
            .query_row(
                &format!("SELECT {JOB_COLUMNS} FROM crawl_jobs WHERE id = ?1"),
                params![id.to_string()],
                job_from_row,
            )
            .optional()?;
        Ok(job)
    }

    fn list_jobs_by_owner(&self, owner: &str) -> StoreResult<Vec<Job>> {
        let conn = self.conn()?;
        query_list(
            &conn,
            &format!("SELECT {JOB_COLUMNS} FROM crawl_jobs WHERE owner = ?1 ORDER BY created_at DESC, id"),
            params![owner],
            job_from_row,
        )
    }

    fn list_jobs_by_status(&self, status: JobStatus) -> StoreResult<Vec<Job>> {
        let conn = self.conn()?;
        query_list(
            &conn,
            &format!("SELECT {JOB_COLUMNS} FROM crawl_jobs WHERE status = ?1 ORDER BY created_at, id"),
            params![status.as_str()],
            job_from_row,
        )
    }

    fn list_jobs(&self) -> StoreResult<Vec<Job>> {
        let conn = self.conn()?;
        query_list(
            &conn,
            &format!("SELECT {JOB_COLUMNS} FROM crawl_jobs ORDER BY created_at DESC, id"),
            [],
            job_from_row,
        )
    }

    fn transition_job(&self, id: Uuid, from: JobStatus, to: JobStatus, at: DateTime<Utc>) -> StoreResult<bool> {
        if !from.can_transition_to(to) {
            return Err(illegal("job", from, to));
        }

        let sql = match to {
            JobStatus::Running => {
                "UPDATE crawl_jobs SET status = ?1, started_at = ?2 WHERE id = ?3 AND status = ?4"
            }
            JobStatus::Completed => {
                "UPDATE crawl_jobs SET status = ?1, completed_at = ?2 WHERE id = ?3 AND status = ?4"
            }
            JobStatus::Pending => return Err(illegal("job", from, to)),
        };

        let conn = self.conn()?;
        let changed = conn.execute(
            sql,
            params![to.as_str(), millis(at), id.to_string(), from.as_str()],
        )?;
        Ok(changed == 1)
    }

    fn delete_job(&self, id: Uuid) -> StoreResult<bool> {
        let conn = self.conn()?;
        let changed = conn.execute("DELETE FROM crawl_jobs WHERE id = ?1", params![id.to_string()])?;
        Ok(changed == 1)
    }

    fn get_task(&self, id: Uuid) -> StoreResult<Option<Task>> {
        let conn = self.conn()?;
        let task = conn
            .query_row(
                &format!("SELECT {TASK_COLUMNS} FROM crawl_tasks WHERE id = ?1"),
                params![id.to_string()],
                task_from_row,
            )
            .optional()?;
        Ok(task)
    }

    fn insert_task(&self, task: &Task) -> StoreResult<bool> {
        let conn = self.conn()?;
        Ok(insert_task_row(&conn, task)? == 1)
    }

    fn insert_child_task(&self, task: &Task, max_pages: u32) -> StoreResult<ChildInsert> {
        let mut conn = self.conn()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let job_id = task.job_id.to_string();

        let exists: bool = tx.query_row(
            "SELECT EXISTS(SELECT 1 FROM crawl_tasks WHERE job_id = ?1 AND url = ?2)",
            params![job_id, task.url],
            |row| row.get(0),
        )?;
        if exists {
            return Ok(ChildInsert::Duplicate);
        }

        let total: i64 = tx.query_row(
            "SELECT COUNT(*) FROM crawl_tasks WHERE job_id = ?1",
            params![job_id],
            |row| row.get(0),
        )?;
        if total >= i64::from(max_pages) {
            return Ok(ChildInsert::BudgetExhausted);
        }

        let outcome = if insert_task_row(&tx, task)? == 1 {
            ChildInsert::Inserted
        } else {
            ChildInsert::Duplicate
        };

        tx.commit()?;
        Ok(outcome)
    }

    fn task_exists(&self, job_id: Uuid, url: &str) -> StoreResult<bool> {
        let conn = self.conn()?;
        let exists = conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM crawl_tasks WHERE job_id = ?1 AND url = ?2)",
            params![job_id.to_string(), url],
            |row| row.get(0),
        )?;
        Ok(exists)
    }

    fn count_tasks(&self, job_id: Uuid, status: Option<TaskStatus>) -> StoreResult<u64> {
        let conn = self.conn()?;
        let count: i64 = match status {
            Some(status) => conn.query_row(
                "SELECT COUNT(*) FROM crawl_tasks WHERE job_id = ?1 AND status = ?2",
                params![job_id.to_string(), status.as_str()],
                |row| row.get(0),
            )?,
            None => conn.query_row(
                "SELECT COUNT(*) FROM crawl_tasks WHERE job_id = ?1",
                params![job_id.to_string()],
                |row| row.get(0),
            )?,
        };
        Ok(count.max(0) as u64)
    }

    fn task_counts(&self, job_id: Uuid) -> StoreResult<TaskCounts> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare_cached(
            "SELECT status, COUNT(*) FROM crawl_tasks WHERE job_id = ?1 GROUP BY status",
        )?;
        let rows = stmt.query_map(params![job_id.to_string()], |row| {
            Ok((status_at::<TaskStatus>(row, 0)?, row.get::<_, i64>(1)?))
        })?;

        let mut counts = TaskCounts::default();
        for row in rows {
            let (status, count) = row?;
            counts.add(status, count.max(0) as u64);
        }
        Ok(counts)
    }

    fn list_tasks_by_status(&self, status: TaskStatus, limit: usize) -> StoreResult<Vec<Task>> {
        let conn = self.conn()?;
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        query_list(
            &conn,
            &format!(
                "SELECT {TASK_COLUMNS} FROM crawl_tasks WHERE status = ?1 ORDER BY created_at, id LIMIT ?2"
            ),
            params![status.as_str(), limit],
            task_from_row,
        )
    }

    fn list_tasks_for_node(&self, node_id: Uuid, status: TaskStatus) -> StoreResult<Vec<Task>> {
        let conn = self.conn()?;
        query_list(
            &conn,
            &format!(
                "SELECT {TASK_COLUMNS} FROM crawl_tasks WHERE assigned_node = ?1 AND status = ?2 ORDER BY assigned_at, id"
            ),
            params![node_id.to_string(), status.as_str()],
            task_from_row,
        )
    }

    fn list_tasks_for_job(&self, job_id: Uuid) -> StoreResult<Vec<Task>> {
        let conn = self.conn()?;
        query_list(
            &conn,
            &format!("SELECT {TASK_COLUMNS} FROM crawl_tasks WHERE job_id = ?1 ORDER BY depth, created_at, id"),
            params![job_id.to_string()],
            task_from_row,
        )
    }

    fn assign_task(&self, task_id: Uuid, node_id: Uuid, at: DateTime<Utc>) -> StoreResult<Assignment> {
        let mut conn = self.conn()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let changed = tx.execute(
            "UPDATE crawl_tasks SET status = ?1, assigned_node = ?2, assigned_at = ?3
             WHERE id = ?4 AND status = ?5",
            params![
                TaskStatus::Assigned.as_str(),
                node_id.to_string(),
                millis(at),
                task_id.to_string(),
                TaskStatus::Pending.as_str(),
            ],
        )?;
        if changed == 0 {
            return Ok(Assignment::Taken);
        }

        let started = tx.execute(
            "UPDATE crawl_jobs SET status = ?1, started_at = ?2
             WHERE id = (SELECT job_id FROM crawl_tasks WHERE id = ?3) AND status = ?4",
            params![
                JobStatus::Running.as_str(),
                millis(at),
                task_id.to_string(),
                JobStatus::Pending.as_str(),
            ],
        )?;

        tx.commit()?;
        Ok(Assignment::Assigned {
            job_started: started == 1,
        })
    }

    fn finish_task(
        &self,
        task_id: Uuid,
        node_id: Uuid,
        outcome: TaskStatus,
        result: Option<&CrawlResult>,
        at: DateTime<Utc>,
    ) -> StoreResult<bool> {
        // Assigned -> Pending belongs to reclaim, not to a worker
        if !outcome.is_terminal() || !TaskStatus::Assigned.can_transition_to(outcome) {
            return Err(illegal("task", TaskStatus::Assigned, outcome));
        }

        let mut conn = self.conn()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let changed = tx.execute(
            "UPDATE crawl_tasks SET status = ?1, completed_at = ?2
             WHERE id = ?3 AND status = ?4 AND assigned_node = ?5",
            params![
                outcome.as_str(),
                millis(at),
                task_id.to_string(),
                TaskStatus::Assigned.as_str(),
                node_id.to_string(),
            ],
        )?;
        if changed == 0 {
            return Ok(false);
        }

        if let Some(result) = result {
            tx.execute(
                &format!("INSERT INTO crawl_results ({RESULT_COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)"),
                params![
                    result.id.to_string(),
                    result.job_id.to_string(),
                    result.task_id.to_string(),
                    result.url,
                    result.status_code,
                    result.title,
                    result.link_count,
                    result.error_message,
                    millis(result.crawled_at),
                ],
            )?;
        }

        tx.commit()?;
        Ok(true)
    }

    fn reclaim_orphaned_tasks(&self) -> StoreResult<usize> {
        let conn = self.conn()?;
        let moved = conn.execute(
            "UPDATE crawl_tasks SET status = ?1, assigned_node = NULL, assigned_at = NULL
             WHERE status = ?2
               AND (assigned_node IS NULL
                    OR assigned_node NOT IN (SELECT id FROM crawler_nodes WHERE status = 'ACTIVE'))",
            params![TaskStatus::Pending.as_str(), TaskStatus::Assigned.as_str()],
        )?;
        Ok(moved)
    }

    fn list_results(&self, job_id: Uuid) -> StoreResult<Vec<CrawlResult>> {
        let conn = self.conn()?;
        query_list(
            &conn,
            &format!("SELECT {RESULT_COLUMNS} FROM crawl_results WHERE job_id = ?1 ORDER BY crawled_at, id"),
            params![job_id.to_string()],
            result_from_row,
        )
    }

    fn upsert_node(&self, node: &Node) -> StoreResult<()> {
        let conn = self.conn()?;
        conn.execute(
            &format!(
                "INSERT INTO crawler_nodes ({NODE_COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                 ON CONFLICT(id) DO UPDATE SET
                    label = excluded.label,
                    hostname = excluded.hostname,
                    last_heartbeat = excluded.last_heartbeat,
                    status = excluded.status"
            ),
            params![
                node.id.to_string(),
                node.label,
                node.hostname,
                millis(node.last_heartbeat),
                node.status.as_str(),
                node.is_leader,
            ],
        )?;
        Ok(())
    }

    fn get_node(&self, id: Uuid) -> StoreResult<Option<Node>> {
        let conn = self.conn()?;
        let node = conn
            .query_row(
                &format!("SELECT {NODE_COLUMNS} FROM crawler_nodes WHERE id = ?1"),
                params![id.to_string()],
                node_from_row,
            )
            .optional()?;
        Ok(node)
    }

    fn touch_node(&self, id: Uuid, at: DateTime<Utc>) -> StoreResult<bool> {
        let conn = self.conn()?;
        let changed = conn.execute(
            "UPDATE crawler_nodes SET last_heartbeat = ?1, status = 'ACTIVE' WHERE id = ?2",
            params![millis(at), id.to_string()],
        )?;
        Ok(changed == 1)
    }

    fn find_leader(&self) -> StoreResult<Option<Node>> {
        let conn = self.conn()?;
        let node = conn
            .query_row(
                &format!(
                    "SELECT {NODE_COLUMNS} FROM crawler_nodes WHERE is_leader = 1
                     ORDER BY last_heartbeat DESC, id LIMIT 1"
                ),
                [],
                node_from_row,
            )
            .optional()?;
        Ok(node)
    }

    fn list_live_nodes(&self, threshold: DateTime<Utc>) -> StoreResult<Vec<Node>> {
        let conn = self.conn()?;
        query_list(
            &conn,
            &format!(
                "SELECT {NODE_COLUMNS} FROM crawler_nodes
                 WHERE status = 'ACTIVE' AND last_heartbeat > ?1
                 ORDER BY last_heartbeat, id"
            ),
            params![millis(threshold)],
            node_from_row,
        )
    }

    fn list_nodes(&self) -> StoreResult<Vec<Node>> {
        let conn = self.conn()?;
        query_list(
            &conn,
            &format!("SELECT {NODE_COLUMNS} FROM crawler_nodes ORDER BY last_heartbeat DESC, id"),
            [],
            node_from_row,
        )
    }

    fn mark_stale_nodes_offline(&self, threshold: DateTime<Utc>) -> StoreResult<usize> {
        let conn = self.conn()?;
        let changed = conn.execute(
            "UPDATE crawler_nodes SET status = 'OFFLINE', is_leader = 0
             WHERE status = 'ACTIVE' AND last_heartbeat < ?1",
            params![millis(threshold)],
        )?;
        Ok(changed)
    }

    fn demote_leader(&self, node_id: Uuid, observed_heartbeat: DateTime<Utc>) -> StoreResult<bool> {
        let conn = self.conn()?;
        let changed = conn.execute(
            "UPDATE crawler_nodes SET is_leader = 0
             WHERE id = ?1 AND is_leader = 1 AND last_heartbeat = ?2",
            params![node_id.to_string(), millis(observed_heartbeat)],
        )?;
        Ok(changed == 1)
    }

    fn try_acquire_leadership(&self, node_id: Uuid, threshold: DateTime<Utc>) -> StoreResult<bool> {
        let conn = self.conn()?;
        let changed = conn.execute(
            "UPDATE crawler_nodes SET is_leader = 1
             WHERE id = ?1 AND status = 'ACTIVE' AND last_heartbeat > ?2
               AND NOT EXISTS (
                   SELECT 1 FROM crawler_nodes
                   WHERE is_leader = 1 AND status = 'ACTIVE' AND last_heartbeat > ?2
               )",
            params![node_id.to_string(), millis(threshold)],
        )?;
        Ok(changed == 1)
    }

    fn delete_all_nodes(&self) -> StoreResult<usize> {
        let conn = self.conn()?;
        Ok(conn.execute("DELETE FROM crawler_nodes", [])?)
    }
}
