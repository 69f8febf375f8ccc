//! Schema migration registry and executor.
//!
//! # Responsibility
//! - Register schema steps in strictly increasing version order.
//! - Apply every step inside one IMMEDIATE upgrade transaction.
//!
//! # Invariants
//! - `version` values must remain monotonic.
//! - Every step is idempotent, so a store with a partial prior schema converges
//!   to the full shape and re-running an upgrade changes nothing.
//! - Record transforms rewrite only the records they changed.
//! - The target version is mirrored to `PRAGMA user_version` only after all
//!   steps succeed.

use crate::db::{DbError, DbResult, MigrationError};
use log::{error, info};
use rusqlite::{params, Connection, Transaction, TransactionBehavior};
use serde_json::{Map, Value};
use std::time::Instant;

/// Schema version this build opens stores at.
pub const SCHEMA_VERSION: u32 = 6;

/// Pure rewrite of one stored record. Returns `true` when the record changed.
pub type RecordTransform = fn(&mut Map<String, Value>) -> bool;

/// One unit of schema evolution.
#[derive(Debug, Clone, Copy)]
pub enum MigrationStep {
    /// Idempotent DDL.
    Sql(&'static str),
    /// Transform applied to every record of the task collection.
    Records(RecordTransform),
}

#[derive(Debug, Clone, Copy)]
pub struct Migration {
    pub version: u32,
    pub name: &'static str,
    pub step: MigrationStep,
}

const MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        name: "create_task_collection",
        step: MigrationStep::Sql(
            "CREATE TABLE IF NOT EXISTS task (
                id INTEGER PRIMARY KEY NOT NULL,
                body TEXT NOT NULL
            );",
        ),
    },
    Migration {
        version: 3,
        name: "default_task_status",
        step: MigrationStep::Records(default_task_status),
    },
    Migration {
        version: 6,
        name: "create_by_status_index",
        step: MigrationStep::Sql(
            "CREATE INDEX IF NOT EXISTS by_status ON task (json_extract(body, '$.status'));",
        ),
    },
];

/// Summary of one `migrate` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MigrationReport {
    pub from_version: u32,
    pub to_version: u32,
    /// Records rewritten by record transforms.
    pub records_rewritten: usize,
    /// `false` when the store was already at the target version.
    pub upgraded: bool,
}

/// Returns the registered migrations in apply order.
pub fn migrations() -> &'static [Migration] {
    MIGRATIONS
}

/// Returns the latest migration version known by this binary.
pub fn latest_version() -> u32 {
    MIGRATIONS.last().map_or(0, |migration| migration.version)
}

/// Fills a missing or null `status` with `pending`.
pub fn default_task_status(record: &mut Map<String, Value>) -> bool {
    match record.get("status") {
        None | Some(Value::Null) => {
            record.insert("status".to_string(), Value::String("pending".to_string()));
            true
        }
        Some(_) => false,
    }
}

/// Brings `conn` to `target_version`.
///
/// # Errors
/// - `UnsupportedTargetVersion` when `target_version < SCHEMA_VERSION`.
/// - `UnsupportedSchemaVersion` when the stored version is newer than the target.
/// - `Migration` when any step fails; the transaction is rolled back.
pub fn migrate(conn: &mut Connection, target_version: u32) -> DbResult<MigrationReport> {
    if target_version < SCHEMA_VERSION {
        return Err(DbError::UnsupportedTargetVersion {
            requested: target_version,
            minimum: SCHEMA_VERSION,
        });
    }

    let current_version = current_user_version(conn)?;
    if current_version > target_version {
        return Err(DbError::UnsupportedSchemaVersion {
            db_version: current_version,
            latest_supported: target_version,
        });
    }

    if current_version == target_version {
        return Ok(MigrationReport {
            from_version: current_version,
            to_version: target_version,
            records_rewritten: 0,
            upgraded: false,
        });
    }

    let started_at = Instant::now();
    info!(
        "event=db_migrate module=db status=start from_version={} to_version={}",
        current_version, target_version
    );

    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
    let result = run_upgrade(&tx).and_then(|rewritten| {
        tx.pragma_update(None, "user_version", target_version)
            .map_err(MigrationError::Finalize)?;
        tx.commit().map_err(MigrationError::Finalize)?;
        Ok(rewritten)
    });

    match result {
        Ok(records_rewritten) => {
            info!(
                "event=db_migrate module=db status=ok from_version={} to_version={} records_rewritten={} duration_ms={}",
                current_version,
                target_version,
                records_rewritten,
                started_at.elapsed().as_millis()
            );
            Ok(MigrationReport {
                from_version: current_version,
                to_version: target_version,
                records_rewritten,
                upgraded: true,
            })
        }
        Err(source) => {
            error!(
                "event=db_migrate module=db status=error from_version={} to_version={} duration_ms={} error_code=migration_failed error={}",
                current_version,
                target_version,
                started_at.elapsed().as_millis(),
                source
            );
            Err(DbError::Migration {
                from: current_version,
                to: target_version,
                source,
            })
        }
    }
}

/// Reads the engine-owned schema version.
pub fn current_user_version(conn: &Connection) -> DbResult<u32> {
    let version = conn.query_row("PRAGMA user_version;", [], |row| row.get::<_, u32>(0))?;
    Ok(version)
}

fn run_upgrade(tx: &Transaction<'_>) -> Result<usize, MigrationError> {
    let mut rewritten = 0;
    for migration in MIGRATIONS {
        match migration.step {
            MigrationStep::Sql(sql) => {
                tx.execute_batch(sql).map_err(|source| MigrationError::Step {
                    step: migration.name,
                    source,
                })?;
            }
            MigrationStep::Records(transform) => {
                rewritten += apply_record_transform(tx, migration.name, transform)?;
            }
        }
    }
    Ok(rewritten)
}

fn apply_record_transform(
    tx: &Transaction<'_>,
    step: &'static str,
    transform: RecordTransform,
) -> Result<usize, MigrationError> {
    let step_error = |source: rusqlite::Error| MigrationError::Step { step, source };

    // Collect first; rewriting rows under an open cursor on the same table is
    // not guaranteed to visit each row exactly once.
    let mut changed = Vec::new();
    {
        let mut stmt = tx
            .prepare("SELECT id, body FROM task ORDER BY id ASC;")
            .map_err(step_error)?;
        let mut rows = stmt.query([]).map_err(step_error)?;
        while let Some(row) = rows.next().map_err(step_error)? {
            let id: i64 = row.get(0).map_err(step_error)?;
            let body: String = row.get(1).map_err(step_error)?;
            let mut record = match serde_json::from_str::<Value>(&body) {
                Ok(Value::Object(record)) => record,
                Ok(_) => {
                    return Err(MigrationError::InvalidRecord {
                        step,
                        id,
                        reason: "record body is not a JSON object".to_string(),
                    });
                }
                Err(err) => {
                    return Err(MigrationError::InvalidRecord {
                        step,
                        id,
                        reason: err.to_string(),
                    });
                }
            };

            if transform(&mut record) {
                let encoded = serde_json::to_string(&record).map_err(|err| {
                    MigrationError::InvalidRecord {
                        step,
                        id,
                        reason: err.to_string(),
                    }
                })?;
                changed.push((id, encoded));
            }
        }
    }

    for (id, body) in &changed {
        tx.execute("UPDATE task SET body = ?2 WHERE id = ?1;", params![id, body])
            .map_err(step_error)?;
    }

    Ok(changed.len())
}

#[cfg(test)]
mod tests {
    use super::{default_task_status, latest_version, migrations, MigrationStep, SCHEMA_VERSION};
    use serde_json::{json, Map, Value};

    fn record(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            other => panic!("expected object, got {other}"),
        }
    }

    #[test]
    fn versions_are_strictly_increasing() {
        let versions: Vec<u32> = migrations().iter().map(|m| m.version).collect();
        assert!(versions.windows(2).all(|pair| pair[0] < pair[1]));
        assert_eq!(latest_version(), SCHEMA_VERSION);
    }

    #[test]
    fn ddl_steps_are_rerunnable() {
        for migration in migrations() {
            if let MigrationStep::Sql(sql) = migration.step {
                assert!(
                    sql.contains("IF NOT EXISTS"),
                    "step {} must be idempotent",
                    migration.name
                );
            }
        }
    }

    #[test]
    fn default_status_fills_missing_field_only() {
        let mut legacy = record(json!({ "id": 10, "text": "legacy", "note": "keep" }));
        assert!(default_task_status(&mut legacy));
        assert_eq!(
            Value::Object(legacy),
            json!({ "id": 10, "text": "legacy", "note": "keep", "status": "pending" })
        );
    }

    #[test]
    fn default_status_replaces_null() {
        let mut legacy = record(json!({ "id": 11, "text": "x", "status": null }));
        assert!(default_task_status(&mut legacy));
        assert_eq!(legacy["status"], json!("pending"));
    }

    #[test]
    fn default_status_is_noop_on_current_records() {
        let mut current = record(json!({ "id": 12, "text": "x", "status": "done" }));
        assert!(!default_task_status(&mut current));
        assert_eq!(current["status"], json!("done"));
    }
}
