//! Task repository contract and SQLite implementation.
//!
//! # Responsibility
//! - Provide atomic put/get-and-modify/delete/list over the `task` collection.
//! - Keep SQL and JSON encoding inside the persistence boundary.
//!
//! # Invariants
//! - Each operation runs in exactly one transaction: IMMEDIATE for writes,
//!   DEFERRED for reads. Results are returned only after commit.
//! - Listing walks `by_status` descending; ties keep ascending id order.
//! - A missing id is never an error for `get_and_modify` or `delete`.
//! - Every failure is logged before it is returned.

use crate::db::migrations::current_user_version;
use crate::db::DbError;
use crate::model::mutation::TaskCommit;
use crate::model::task::{Task, TaskId};
use chrono::Utc;
use log::{debug, error};
use rusqlite::{params, Connection, OptionalExtension, Transaction, TransactionBehavior};
use std::time::Instant;
use thiserror::Error;

pub const TASK_COLLECTION: &str = "task";
pub const BY_STATUS_INDEX: &str = "by_status";

const LIST_BY_STATUS_SQL: &str = "SELECT id, body
FROM task
ORDER BY json_extract(body, '$.status') DESC, id ASC;";

pub type RepoResult<T> = Result<T, RepoError>;

/// Repository error for task persistence and queries.
#[derive(Debug, Error)]
pub enum RepoError {
    #[error(transparent)]
    Db(#[from] DbError),
    /// A CRUD transaction was rejected and rolled back.
    #[error("task transaction failed: {0}")]
    Transaction(#[from] rusqlite::Error),
    #[error("invalid persisted task data: {0}")]
    InvalidData(String),
    #[error("connection is not initialized: expected schema version >= {expected_version}, found {actual_version}")]
    UninitializedConnection {
        expected_version: u32,
        actual_version: u32,
    },
    #[error("required table `{0}` is missing")]
    MissingRequiredTable(&'static str),
    #[error("required index `{0}` is missing")]
    MissingRequiredIndex(&'static str),
}

/// Repository interface for task operations.
pub trait TaskRepository {
    /// Upserts `task`, assigning the current timestamp as id when absent.
    ///
    /// Two id-less puts within the same millisecond collide and the second
    /// overwrites the first.
    fn put(&self, task: Task) -> RepoResult<Task>;

    /// Reads the record at `id` and hands it to `mutate` in the same write
    /// transaction. Only a record passed to [`TaskCommit::commit`] is written.
    ///
    /// Returns the written record, or `None` when nothing was committed.
    fn get_and_modify<F>(&self, id: TaskId, mutate: F) -> RepoResult<Option<Task>>
    where
        F: FnOnce(Option<Task>, &mut TaskCommit);

    /// Removes the record at `id`. Returns whether a record existed.
    fn delete(&self, id: TaskId) -> RepoResult<bool>;

    /// Visits every task in `by_status` descending order.
    fn list<F>(&self, visit: F) -> RepoResult<()>
    where
        F: FnMut(Task);

    fn get(&self, id: TaskId) -> RepoResult<Option<Task>>;

    fn count(&self) -> RepoResult<usize>;

    /// Collects [`TaskRepository::list`] into a vector.
    fn list_all(&self) -> RepoResult<Vec<Task>> {
        let mut tasks = Vec::new();
        self.list(|task| tasks.push(task))?;
        Ok(tasks)
    }
}

/// SQLite-backed task repository. Owns its connection.
pub struct SqliteTaskRepository {
    conn: Connection,
}

impl std::fmt::Debug for SqliteTaskRepository {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteTaskRepository")
            .field("path", &self.conn.path())
            .finish()
    }
}

impl SqliteTaskRepository {
    /// Constructs a repository from a migrated connection.
    ///
    /// # Errors
    /// - `UninitializedConnection` when `user_version` is 0.
    /// - `MissingRequiredTable` / `MissingRequiredIndex` when the shape is
    ///   incomplete even though a version is recorded.
    pub fn try_new(conn: Connection) -> RepoResult<Self> {
        if let Err(err) = ensure_task_connection_ready(&conn) {
            error!(
                "event=repo_init module=repo status=error error_code=connection_not_ready error={}",
                err
            );
            return Err(err);
        }
        Ok(Self { conn })
    }

    /// Schema version the underlying store is at.
    pub fn schema_version(&self) -> RepoResult<u32> {
        Ok(current_user_version(&self.conn)?)
    }

    fn write_tx(&self) -> rusqlite::Result<Transaction<'_>> {
        Transaction::new_unchecked(&self.conn, TransactionBehavior::Immediate)
    }

    fn read_tx(&self) -> rusqlite::Result<Transaction<'_>> {
        Transaction::new_unchecked(&self.conn, TransactionBehavior::Deferred)
    }

    fn put_inner(&self, mut task: Task) -> RepoResult<Task> {
        task.id.get_or_insert_with(now_millis);
        let tx = self.write_tx()?;
        upsert_task(&tx, &task)?;
        tx.commit()?;
        Ok(task)
    }

    fn get_and_modify_inner<F>(&self, id: TaskId, mutate: F) -> RepoResult<Option<Task>>
    where
        F: FnOnce(Option<Task>, &mut TaskCommit),
    {
        let tx = self.write_tx()?;
        let current = select_task(&tx, id)?;

        let mut commit = TaskCommit::new();
        mutate(current, &mut commit);

        let written = match commit.into_staged() {
            Some(mut task) => {
                task.id.get_or_insert(id);
                upsert_task(&tx, &task)?;
                Some(task)
            }
            None => None,
        };
        tx.commit()?;
        Ok(written)
    }

    fn delete_inner(&self, id: TaskId) -> RepoResult<bool> {
        let tx = self.write_tx()?;
        let removed = tx.execute("DELETE FROM task WHERE id = ?1;", [id])?;
        tx.commit()?;
        Ok(removed > 0)
    }

    fn list_inner<F>(&self, mut visit: F) -> RepoResult<usize>
    where
        F: FnMut(Task),
    {
        let tx = self.read_tx()?;
        let mut visited = 0;
        {
            let mut stmt = tx.prepare(LIST_BY_STATUS_SQL)?;
            let mut rows = stmt.query([])?;
            while let Some(row) = rows.next()? {
                let task = decode_task(row.get(0)?, &row.get::<_, String>(1)?)?;
                visit(task);
                visited += 1;
            }
        }
        tx.commit()?;
        Ok(visited)
    }

    fn get_inner(&self, id: TaskId) -> RepoResult<Option<Task>> {
        let tx = self.read_tx()?;
        let task = select_task(&tx, id)?;
        tx.commit()?;
        Ok(task)
    }

    fn count_inner(&self) -> RepoResult<usize> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM task;", [], |row| row.get(0))?;
        usize::try_from(count).map_err(|_| RepoError::InvalidData(format!("row count {count}")))
    }
}

impl TaskRepository for SqliteTaskRepository {
    fn put(&self, task: Task) -> RepoResult<Task> {
        let started_at = Instant::now();
        let result = self.put_inner(task);
        log_outcome("task_put", started_at, &result, |task| {
            format!("id={}", task.id.unwrap_or_default())
        });
        result
    }

    fn get_and_modify<F>(&self, id: TaskId, mutate: F) -> RepoResult<Option<Task>>
    where
        F: FnOnce(Option<Task>, &mut TaskCommit),
    {
        let started_at = Instant::now();
        let result = self.get_and_modify_inner(id, mutate);
        log_outcome("task_modify", started_at, &result, |written| {
            format!("id={id} committed={}", written.is_some())
        });
        result
    }

    fn delete(&self, id: TaskId) -> RepoResult<bool> {
        let started_at = Instant::now();
        let result = self.delete_inner(id);
        log_outcome("task_delete", started_at, &result, |removed| {
            format!("id={id} removed={removed}")
        });
        result
    }

    fn list<F>(&self, visit: F) -> RepoResult<()>
    where
        F: FnMut(Task),
    {
        let started_at = Instant::now();
        let result = self.list_inner(visit);
        log_outcome("task_list", started_at, &result, |visited| {
            format!("visited={visited}")
        });
        result.map(|_| ())
    }

    fn get(&self, id: TaskId) -> RepoResult<Option<Task>> {
        let started_at = Instant::now();
        let result = self.get_inner(id);
        log_outcome("task_get", started_at, &result, |task| {
            format!("id={id} found={}", task.is_some())
        });
        result
    }

    fn count(&self) -> RepoResult<usize> {
        let started_at = Instant::now();
        let result = self.count_inner();
        log_outcome("task_count", started_at, &result, |count| format!("count={count}"));
        result
    }
}

/// Verifies the connection carries a migrated task store.
pub(crate) fn ensure_task_connection_ready(conn: &Connection) -> RepoResult<()> {
    let actual_version = current_user_version(conn)?;
    if actual_version == 0 {
        return Err(RepoError::UninitializedConnection {
            expected_version: 1,
            actual_version,
        });
    }

    if !schema_object_exists(conn, "table", TASK_COLLECTION)? {
        return Err(RepoError::MissingRequiredTable(TASK_COLLECTION));
    }
    if !schema_object_exists(conn, "index", BY_STATUS_INDEX)? {
        return Err(RepoError::MissingRequiredIndex(BY_STATUS_INDEX));
    }
    Ok(())
}

fn schema_object_exists(conn: &Connection, kind: &str, name: &str) -> RepoResult<bool> {
    let exists: i64 = conn.query_row(
        "SELECT EXISTS(
            SELECT 1 FROM sqlite_master WHERE type = ?1 AND name = ?2
        );",
        params![kind, name],
        |row| row.get(0),
    )?;
    Ok(exists == 1)
}

fn select_task(tx: &Transaction<'_>, id: TaskId) -> RepoResult<Option<Task>> {
    let body: Option<String> = tx
        .query_row("SELECT body FROM task WHERE id = ?1;", [id], |row| row.get(0))
        .optional()?;
    body.map(|body| decode_task(id, &body)).transpose()
}

fn upsert_task(tx: &Transaction<'_>, task: &Task) -> RepoResult<()> {
    let id = task
        .id
        .ok_or_else(|| RepoError::InvalidData("task id must be assigned before write".to_string()))?;
    let body = serde_json::to_string(task)
        .map_err(|err| RepoError::InvalidData(format!("failed to encode task {id}: {err}")))?;
    tx.execute(
        "INSERT INTO task (id, body) VALUES (?1, ?2)
         ON CONFLICT(id) DO UPDATE SET body = excluded.body;",
        params![id, body],
    )?;
    Ok(())
}

fn decode_task(id: TaskId, body: &str) -> RepoResult<Task> {
    let mut task: Task = serde_json::from_str(body)
        .map_err(|err| RepoError::InvalidData(format!("task {id}: {err}")))?;
    match task.id {
        None => task.id = Some(id),
        Some(stored) if stored != id => {
            return Err(RepoError::InvalidData(format!(
                "task {id}: body carries mismatched id {stored}"
            )));
        }
        Some(_) => {}
    }
    Ok(task)
}

fn now_millis() -> TaskId {
    Utc::now().timestamp_millis()
}

fn log_outcome<T>(
    event: &str,
    started_at: Instant,
    result: &RepoResult<T>,
    describe: impl FnOnce(&T) -> String,
) {
    match result {
        Ok(value) => debug!(
            "event={} module=repo status=ok {} duration_ms={}",
            event,
            describe(value),
            started_at.elapsed().as_millis()
        ),
        Err(err) => error!(
            "event={} module=repo status=error duration_ms={} error_code=transaction_failed error={}",
            event,
            started_at.elapsed().as_millis(),
            err
        ),
    }
}
