//! Connection bootstrap and store opening.
//!
//! # Responsibility
//! - Open file or in-memory SQLite connections.
//! - Run the schema upgrade before anything else touches the connection.
//! - Wrap ready connections in a `SqliteTaskRepository`.
//!
//! # Invariants
//! - Returned connections are at the requested schema version.
//! - `open_store*` only return repositories that passed the readiness check.

use super::migrations::migrate;
use super::{DbError, DbResult};
use crate::repo::task_repo::{RepoResult, SqliteTaskRepository};
use log::{error, info};
use rusqlite::Connection;
use std::path::Path;
use std::time::{Duration, Instant};

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Opens a SQLite database file and upgrades it to `target_version`.
///
/// Parent directories are not created here; callers own path layout.
pub fn open_db(path: impl AsRef<Path>, target_version: u32) -> DbResult<Connection> {
    bootstrap("file", target_version, || Connection::open(path.as_ref()))
}

/// Opens an in-memory SQLite database and upgrades it to `target_version`.
pub fn open_db_in_memory(target_version: u32) -> DbResult<Connection> {
    bootstrap("memory", target_version, Connection::open_in_memory)
}

/// Opens the task store at `path` and returns a ready repository.
///
/// Any failure here is an initialization failure: callers should report it
/// and stop rather than retry.
pub fn open_store(path: impl AsRef<Path>, target_version: u32) -> RepoResult<SqliteTaskRepository> {
    let conn = open_db(path, target_version)?;
    SqliteTaskRepository::try_new(conn)
}

/// In-memory variant of [`open_store`]. Data lives as long as the repository.
pub fn open_store_in_memory(target_version: u32) -> RepoResult<SqliteTaskRepository> {
    let conn = open_db_in_memory(target_version)?;
    SqliteTaskRepository::try_new(conn)
}

fn bootstrap(
    mode: &'static str,
    target_version: u32,
    connect: impl FnOnce() -> rusqlite::Result<Connection>,
) -> DbResult<Connection> {
    let started_at = Instant::now();
    info!(
        "event=db_open module=db status=start mode={} target_version={}",
        mode, target_version
    );

    let mut conn = match connect() {
        Ok(conn) => conn,
        Err(err) => {
            error!(
                "event=db_open module=db status=error mode={} duration_ms={} error_code=db_open_failed error={}",
                mode,
                started_at.elapsed().as_millis(),
                err
            );
            return Err(err.into());
        }
    };

    let prepared = conn
        .busy_timeout(BUSY_TIMEOUT)
        .map_err(DbError::from)
        .and_then(|()| migrate(&mut conn, target_version));

    match prepared {
        Ok(report) => {
            info!(
                "event=db_open module=db status=ok mode={} from_version={} to_version={} upgraded={} duration_ms={}",
                mode,
                report.from_version,
                report.to_version,
                report.upgraded,
                started_at.elapsed().as_millis()
            );
            Ok(conn)
        }
        Err(err) => {
            error!(
                "event=db_open module=db status=error mode={} duration_ms={} error_code=db_bootstrap_failed error={}",
                mode,
                started_at.elapsed().as_millis(),
                err
            );
            Err(err)
        }
    }
}
