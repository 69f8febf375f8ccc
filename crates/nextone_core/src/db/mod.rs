//! SQLite storage bootstrap and schema migration entry points.
//!
//! # Responsibility
//! - Open and configure SQLite connections for the task store.
//! - Bring the store to the target schema version in one upgrade transaction.
//! - Hand callers a ready repository instead of raw connection state.
//!
//! # Invariants
//! - Schema version is tracked via `PRAGMA user_version`.
//! - No task operation runs before migrations and the readiness check succeed.
//! - A failed upgrade leaves the stored version and records untouched.

pub mod migrations;
mod open;

pub use open::{open_db, open_db_in_memory, open_store, open_store_in_memory};

use thiserror::Error;

pub type DbResult<T> = Result<T, DbError>;

/// Connection and schema-level failures.
#[derive(Debug, Error)]
pub enum DbError {
    #[error(transparent)]
    Sqlite(#[from] rusqlite::Error),
    /// The upgrade transaction was rolled back. Fatal for the session.
    #[error("schema migration from version {from} to {to} failed: {source}")]
    Migration {
        from: u32,
        to: u32,
        #[source]
        source: MigrationError,
    },
    #[error("database schema version {db_version} is newer than supported {latest_supported}")]
    UnsupportedSchemaVersion {
        db_version: u32,
        latest_supported: u32,
    },
    #[error("target schema version {requested} is older than the minimum {minimum} this build can produce")]
    UnsupportedTargetVersion { requested: u32, minimum: u32 },
}

/// Failure inside one migration step.
#[derive(Debug, Error)]
pub enum MigrationError {
    #[error("step `{step}` failed: {source}")]
    Step {
        step: &'static str,
        #[source]
        source: rusqlite::Error,
    },
    #[error("step `{step}` found invalid record {id}: {reason}")]
    InvalidRecord {
        step: &'static str,
        id: i64,
        reason: String,
    },
    #[error("failed to finalize upgrade: {0}")]
    Finalize(#[source] rusqlite::Error),
}
