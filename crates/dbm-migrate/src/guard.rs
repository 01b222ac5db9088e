//! Concurrency guards that keep two runs from migrating one schema at once.
//!
//! Two strategies exist and they fail differently:
//!
//! - [`GuardStrategy::Transactional`] wraps the whole run in one transaction.
//!   A failure anywhere rolls back every script and version update.
//! - [`GuardStrategy::ExplicitLock`] takes a non-blocking per-schema lock row
//!   in `__dbmigratelock`, then commits each migration on its own. A failure
//!   leaves the schema at the last migration that succeeded.

use crate::error::{MigrateError, MigrateResult};
use crate::store::table_exists;
use dbm_db::{Database, DbError, SqlValue};
use serde::{Deserialize, Serialize};

/// Name of the lock table used by [`GuardStrategy::ExplicitLock`].
pub const MIGRATION_LOCK_TABLE: &str = "__dbmigratelock";

pub(crate) const CREATE_LOCK_TABLE_SQL: &str = r#"CREATE TABLE IF NOT EXISTS "__dbmigratelock" (
    "schema" VARCHAR(100) PRIMARY KEY,
    "holder" VARCHAR NOT NULL,
    "acquired_at" TIMESTAMP NOT NULL DEFAULT now()
)"#;
pub(crate) const ACQUIRE_LOCK_SQL: &str =
    r#"INSERT INTO "__dbmigratelock" ("schema", "holder") VALUES (?, ?)"#;
pub(crate) const RELEASE_LOCK_SQL: &str = r#"DELETE FROM "__dbmigratelock" WHERE "schema" = ?"#;
pub(crate) const LOCK_HELD_SQL: &str =
    r#"SELECT COUNT(*) FROM "__dbmigratelock" WHERE "schema" = ?"#;

/// How a run establishes mutual exclusion.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GuardStrategy {
    /// One enclosing transaction; all-or-nothing.
    #[default]
    Transactional,
    /// Non-blocking lock row; each migration is durable on its own.
    ExplicitLock,
}

impl std::fmt::Display for GuardStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GuardStrategy::Transactional => write!(f, "transactional"),
            GuardStrategy::ExplicitLock => write!(f, "explicit_lock"),
        }
    }
}

/// Create the lock table if it does not exist.
pub fn ensure_lock_table(db: &dyn Database) -> MigrateResult<()> {
    db.execute_batch(CREATE_LOCK_TABLE_SQL)
        .map_err(|source| MigrateError::Lock {
            operation: "create table for",
            schema: "*".to_string(),
            source,
        })
}

/// Take the lock for `schema` without waiting.
///
/// Fails with [`MigrateError::Busy`] if another run already holds it.
pub fn acquire_lock(db: &dyn Database, schema: &str) -> MigrateResult<()> {
    let holder = format!("pid {}", std::process::id());
    match db.execute(
        ACQUIRE_LOCK_SQL,
        &[SqlValue::Text(schema), SqlValue::Text(&holder)],
    ) {
        Ok(_) => {
            log::debug!("Acquired migration lock for schema '{schema}' ({holder})");
            Ok(())
        }
        Err(e) if e.is_contention() => {
            log::warn!("Migration lock for schema '{schema}' is held by another run");
            Err(MigrateError::Busy {
                schema: schema.to_string(),
            })
        }
        Err(source) => Err(MigrateError::Lock {
            operation: "acquire",
            schema: schema.to_string(),
            source,
        }),
    }
}

/// Release the lock for `schema`. Returns whether a lock row existed.
pub fn release_lock(db: &dyn Database, schema: &str) -> Result<bool, DbError> {
    let removed = db.execute(RELEASE_LOCK_SQL, &[SqlValue::Text(schema)])?;
    Ok(removed > 0)
}

/// Whether some run currently holds the lock for `schema`.
pub fn is_locked(db: &dyn Database, schema: &str) -> MigrateResult<bool> {
    let held = db
        .query_i64(LOCK_HELD_SQL, &[SqlValue::Text(schema)])
        .map_err(|source| MigrateError::Lock {
            operation: "inspect",
            schema: schema.to_string(),
            source,
        })?;
    Ok(held.unwrap_or(0) > 0)
}

/// Whether the lock table has been created yet.
pub fn lock_table_exists(db: &dyn Database) -> MigrateResult<bool> {
    table_exists(db, MIGRATION_LOCK_TABLE).map_err(|source| MigrateError::Lock {
        operation: "inspect table for",
        schema: "*".to_string(),
        source,
    })
}

/// Remove a lock left behind by a run that died before releasing it.
///
/// Returns whether a lock was actually removed.
pub fn force_unlock(db: &dyn Database, schema: &str) -> MigrateResult<bool> {
    ensure_lock_table(db)?;
    let removed = release_lock(db, schema).map_err(|source| MigrateError::Lock {
        operation: "force-release",
        schema: schema.to_string(),
        source,
    })?;
    if removed {
        log::warn!("Forcibly released migration lock for schema '{schema}'");
    }
    Ok(removed)
}

/// Run `body` inside one transaction: commit on success, roll back on error.
///
/// A rollback that fails is reported together with the error that caused it.
pub(crate) fn run_transactional<T>(
    db: &dyn Database,
    schema: &str,
    body: impl FnOnce() -> MigrateResult<T>,
) -> MigrateResult<T> {
    db.begin().map_err(|e| transaction_error(schema, e))?;

    let result = body();

    match result {
        Ok(value) => match db.commit() {
            Ok(()) => Ok(value),
            Err(commit_err) => {
                // A failed COMMIT usually ends the transaction already.
                if let Err(rollback) = db.rollback() {
                    log::debug!("Rollback after failed commit on schema '{schema}': {rollback}");
                }
                Err(transaction_error(schema, commit_err))
            }
        },
        Err(err) => Err(rollback_after(db, err)),
    }
}

/// Run `body` while holding the schema lock, releasing it regardless of
/// outcome.
pub(crate) fn run_locked<T>(
    db: &dyn Database,
    schema: &str,
    body: impl FnOnce() -> MigrateResult<T>,
) -> MigrateResult<T> {
    acquire_lock(db, schema)?;

    let result = body();

    match (result, release_lock(db, schema)) {
        (Ok(value), Ok(_)) => {
            log::debug!("Released migration lock for schema '{schema}'");
            Ok(value)
        }
        (Ok(_), Err(source)) => Err(MigrateError::Lock {
            operation: "release",
            schema: schema.to_string(),
            source,
        }),
        (Err(err), Ok(_)) => Err(err),
        (Err(err), Err(unlock)) => {
            log::warn!("Failed to release migration lock for schema '{schema}': {unlock}");
            Err(MigrateError::UnlockFailed {
                error: Box::new(err),
                unlock,
            })
        }
    }
}

fn rollback_after(db: &dyn Database, err: MigrateError) -> MigrateError {
    match db.rollback() {
        Ok(()) => err,
        Err(rollback) => {
            log::warn!("Rollback failed after migration error: {rollback}");
            MigrateError::RollbackFailed {
                error: Box::new(err),
                rollback,
            }
        }
    }
}

fn transaction_error(schema: &str, source: DbError) -> MigrateError {
    if source.is_contention() {
        return MigrateError::Busy {
            schema: schema.to_string(),
        };
    }
    MigrateError::Transaction {
        schema: schema.to_string(),
        source,
    }
}

#[cfg(test)]
#[path = "guard_test.rs"]
mod tests;
